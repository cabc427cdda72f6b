use std::path::PathBuf;
use std::time::Duration;

use crate::host::{HostMatcher, RegexListMatcher};

/// Default bound on every storage HTTP request.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// Minimum free space, in percent of the filesystem, required to materialize a document.
const DEFAULT_MIN_FREE_DISK_PERCENT: f64 = 5.0;

/// Client-side TLS settings for storage connections.
#[derive(Debug, Clone, Default)]
pub struct SslSettings {
    pub enabled: bool,
    pub cert_file_path: Option<PathBuf>,
    pub key_file_path: Option<PathBuf>,
    /// Without a CA, server certificates are not verified.
    pub ca_file_path: Option<PathBuf>,
    pub cipher_list: Option<String>,
}

/// Process-wide storage policy.
///
/// Built once at startup and shared read-only (behind an `Arc`) by the
/// selector and every backend instance.
#[derive(Debug, Clone)]
pub struct StorageSecurityConfig {
    pub filesystem_allowed: bool,
    pub wopi_allowed: bool,
    pub wopi_hosts: RegexListMatcher,
    pub ssl: SslSettings,
    pub request_timeout: Duration,
    pub min_free_disk_percent: f64,
    pub anonymize_user_data: bool,
    pub anonymization_salt: u64,
}

impl Default for StorageSecurityConfig {
    fn default() -> Self {
        Self {
            filesystem_allowed: false,
            wopi_allowed: false,
            wopi_hosts: RegexListMatcher::new(),
            ssl: SslSettings::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            min_free_disk_percent: DEFAULT_MIN_FREE_DISK_PERCENT,
            anonymize_user_data: false,
            anonymization_salt: 82589933,
        }
    }
}

impl StorageSecurityConfig {
    pub fn with_filesystem(mut self, allowed: bool) -> Self {
        self.filesystem_allowed = allowed;
        self
    }

    pub fn with_wopi(mut self, allowed: bool, hosts: RegexListMatcher) -> Self {
        self.wopi_allowed = allowed;
        self.wopi_hosts = hosts;
        self
    }

    pub fn with_ssl(mut self, ssl: SslSettings) -> Self {
        self.ssl = ssl;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_min_free_disk_percent(mut self, percent: f64) -> Self {
        self.min_free_disk_percent = percent;
        self
    }

    pub fn with_anonymization(mut self, enabled: bool, salt: u64) -> Self {
        self.anonymize_user_data = enabled;
        self.anonymization_salt = salt;
        self
    }

    /// True iff WOPI is enabled and `host` passes the allow/deny rules.
    pub fn allowed_wopi_host(&self, host: &str) -> bool {
        self.wopi_allowed && self.wopi_hosts.matches(host)
    }

    /// SSL flag after applying the `STORAGE_SSL_ENABLE` override (debug builds only).
    pub fn effective_ssl_enabled(&self) -> bool {
        #[cfg(debug_assertions)]
        if let Ok(value) = std::env::var("STORAGE_SSL_ENABLE") {
            if value.eq_ignore_ascii_case("true") {
                return true;
            }
            if value.eq_ignore_ascii_case("false") {
                return false;
            }
        }
        self.ssl.enabled
    }
}
