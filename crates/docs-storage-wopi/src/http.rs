use docs_storage_core::{StorageError, StorageSecurityConfig};
use reqwest::{Certificate, Client, Identity};
use tracing::{info, warn};

/// Build the HTTP client used for every WOPI request.
///
/// Storage connections follow their own SSL policy, independent of the
/// client-facing server settings. Redirects are not followed so a response
/// can never move a request to a host that was not vetted.
pub fn build_http_client(config: &StorageSecurityConfig) -> Result<Client, StorageError> {
    build_with_ssl(config, config.effective_ssl_enabled())
}

fn build_with_ssl(config: &StorageSecurityConfig, ssl_enabled: bool) -> Result<Client, StorageError> {
    let mut builder = Client::builder()
        .timeout(config.request_timeout)
        .redirect(reqwest::redirect::Policy::none());

    if ssl_enabled {
        let ssl = &config.ssl;

        match &ssl.ca_file_path {
            Some(ca_path) => {
                let pem = read_pem(ca_path)?;
                let ca = Certificate::from_pem(&pem).map_err(|e| {
                    StorageError::Config(format!("Invalid CA file {}: {}", ca_path.display(), e))
                })?;
                builder = builder.add_root_certificate(ca);
                info!("Storage SSL: verifying servers against {}", ca_path.display());
            }
            None => {
                warn!("Storage SSL: no CA configured, server certificates are not verified");
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        if let (Some(cert_path), Some(key_path)) = (&ssl.cert_file_path, &ssl.key_file_path) {
            let mut pem = read_pem(cert_path)?;
            pem.extend_from_slice(b"\n");
            pem.extend_from_slice(&read_pem(key_path)?);
            let identity = Identity::from_pem(&pem).map_err(|e| {
                StorageError::Config(format!("Invalid client certificate or key: {}", e))
            })?;
            builder = builder.identity(identity);
        }

        if let Some(ciphers) = &ssl.cipher_list {
            warn!("Storage SSL: cipher list [{}] ignored, using TLS defaults", ciphers);
        }
    } else {
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder
        .build()
        .map_err(|e| StorageError::Config(format!("Failed to create HTTP client: {}", e)))
}

fn read_pem(path: &std::path::Path) -> Result<Vec<u8>, StorageError> {
    std::fs::read(path)
        .map_err(|e| StorageError::Config(format!("Failed to read {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docs_storage_core::SslSettings;

    #[test]
    fn test_build_default_client() {
        let config = StorageSecurityConfig::default();
        assert!(build_http_client(&config).is_ok());
    }

    #[test]
    fn test_missing_ca_file_is_config_error() {
        let config = StorageSecurityConfig::default().with_ssl(SslSettings {
            enabled: true,
            ca_file_path: Some("/nonexistent/ca.pem".into()),
            ..Default::default()
        });
        assert!(matches!(
            build_with_ssl(&config, true),
            Err(StorageError::Config(_))
        ));
    }

    #[test]
    fn test_ssl_disabled_ignores_missing_ca_file() {
        let config = StorageSecurityConfig::default().with_ssl(SslSettings {
            enabled: false,
            ca_file_path: Some("/nonexistent/ca.pem".into()),
            ..Default::default()
        });
        assert!(build_with_ssl(&config, false).is_ok());
    }
}
