use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use docs_storage_core::{
    AccessToken, RegexListMatcher, SslSettings, StorageError, StorageSecurityConfig,
};

/// Configuration for the docs-storage command-line tool.
#[derive(Parser, Debug, Clone)]
#[command(name = "docs-storage")]
#[command(about = "Open a document through the storage layer: select, fetch metadata, load, optionally save back")]
pub struct Config {
    /// Document URI (file path, file:// or WOPI URL)
    pub uri: String,

    /// Allow opening arbitrary local files
    #[arg(long, env = "STORAGE_ALLOW_FILESYSTEM")]
    pub allow_filesystem: bool,

    /// Allow WOPI hosts
    #[arg(long, env = "STORAGE_ALLOW_WOPI")]
    pub allow_wopi: bool,

    /// Allowed WOPI host (exact name or regex), repeatable
    #[arg(long = "wopi-host")]
    pub wopi_hosts: Vec<String>,

    /// Denied WOPI host (exact name or regex), repeatable; wins over allow entries
    #[arg(long = "wopi-deny")]
    pub wopi_deny: Vec<String>,

    /// Use TLS client settings for storage connections
    #[arg(long, env = "STORAGE_SSL_ENABLE")]
    pub ssl_enable: bool,

    #[arg(long, env = "STORAGE_SSL_CERT_FILE")]
    pub ssl_cert_file: Option<PathBuf>,

    #[arg(long, env = "STORAGE_SSL_KEY_FILE")]
    pub ssl_key_file: Option<PathBuf>,

    /// CA bundle; without it server certificates are not verified
    #[arg(long, env = "STORAGE_SSL_CA_FILE")]
    pub ssl_ca_file: Option<PathBuf>,

    #[arg(long, env = "STORAGE_SSL_CIPHER_LIST")]
    pub ssl_cipher_list: Option<String>,

    /// Timeout of every storage HTTP request (seconds)
    #[arg(long, default_value = "60", env = "STORAGE_TIMEOUT_SECS")]
    pub timeout_secs: u64,

    /// Minimum free disk space (percent) required to load a document
    #[arg(long, default_value = "5.0", env = "STORAGE_MIN_FREE_DISK_PERCENT")]
    pub min_free_disk_percent: f64,

    /// Anonymize file and user names in logs
    #[arg(long, env = "ANONYMIZE_USER_DATA")]
    pub anonymize: bool,

    #[arg(long, default_value = "82589933", env = "ANONYMIZATION_SALT")]
    pub anonymization_salt: u64,

    /// WOPI access token, sent as the access_token query parameter
    #[arg(long, env = "WOPI_ACCESS_TOKEN", conflicts_with = "access_header")]
    pub access_token: Option<String>,

    /// Raw authorization header line(s), CRLF separated
    #[arg(long, env = "WOPI_ACCESS_HEADER")]
    pub access_header: Option<String>,

    /// Local store root the jails live under
    #[arg(long, default_value = "./jails", env = "STORAGE_JAIL_ROOT")]
    pub jail_root: PathBuf,

    /// Jail-relative directory for the working copy
    #[arg(long, default_value = "/user/docs", env = "STORAGE_JAIL_PATH")]
    pub jail_path: String,

    /// Write the working copy back after loading
    #[arg(long)]
    pub save_back: bool,
}

impl Config {
    pub fn security_config(&self) -> Result<StorageSecurityConfig, StorageError> {
        let mut hosts = RegexListMatcher::new();
        for pattern in &self.wopi_hosts {
            hosts.try_allow(pattern)?;
        }
        for pattern in &self.wopi_deny {
            hosts.try_deny(pattern)?;
        }

        Ok(StorageSecurityConfig::default()
            .with_filesystem(self.allow_filesystem)
            .with_wopi(self.allow_wopi, hosts)
            .with_ssl(SslSettings {
                enabled: self.ssl_enable,
                cert_file_path: self.ssl_cert_file.clone(),
                key_file_path: self.ssl_key_file.clone(),
                ca_file_path: self.ssl_ca_file.clone(),
                cipher_list: self.ssl_cipher_list.clone(),
            })
            .with_request_timeout(Duration::from_secs(self.timeout_secs))
            .with_min_free_disk_percent(self.min_free_disk_percent)
            .with_anonymization(self.anonymize, self.anonymization_salt))
    }

    pub fn access_token(&self) -> AccessToken {
        match (&self.access_token, &self.access_header) {
            (Some(token), _) => AccessToken::Token(token.clone()),
            (None, Some(header)) => AccessToken::Header(header.clone()),
            (None, None) => AccessToken::None,
        }
    }
}
