use std::path::{Component, Path};
use std::sync::Arc;

use docs_storage_core::{StorageBackend, StorageContext, StorageError, StorageHook};
use docs_storage_local::LocalStorage;
use docs_storage_wopi::{build_http_client, WopiStorage};
use reqwest::{Client, Url};
use tracing::{error, info, instrument};

use crate::host::is_localhost;

/// Picks the backend for a document URI under the configured policy.
///
/// Owns the pieces every backend shares: the policy/anonymization context
/// and one pooled HTTP client for all WOPI traffic.
#[derive(Clone)]
pub struct StorageSelector {
    ctx: StorageContext,
    http: Client,
    hook: Option<Arc<dyn StorageHook>>,
}

impl StorageSelector {
    pub fn new(ctx: StorageContext) -> Result<Self, StorageError> {
        let http = build_http_client(&ctx.config)?;
        Ok(Self {
            ctx,
            http,
            hook: None,
        })
    }

    /// Install a hook that gets first refusal on every URI.
    pub fn with_hook(mut self, hook: Arc<dyn StorageHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn context(&self) -> &StorageContext {
        &self.ctx
    }

    /// Create the backend for `uri`.
    ///
    /// # Errors
    /// - `BadRequest` for unparsable URIs, local paths outside the
    ///   conversion area when filesystem access is off, or when no storage
    ///   type is enabled for the URI
    /// - `Unauthorized` for WOPI hosts that are neither allowed nor local
    #[instrument(skip_all, level = "debug")]
    pub async fn select(
        &self,
        uri: &str,
        jail_root: &Path,
        jail_path: &str,
    ) -> Result<Box<dyn StorageBackend>, StorageError> {
        let anonymizer = &self.ctx.anonymizer;
        let uri = parse_uri(uri).map_err(|e| {
            StorageError::BadRequest(format!(
                "Invalid URI [{}]: {}",
                anonymizer.anonymize_url(uri),
                e
            ))
        })?;

        if let Some(hook) = &self.hook {
            if let Some(storage) = hook.try_create_storage(&uri, jail_root, jail_path) {
                info!("Storage load hooked");
                return Ok(storage);
            }
        }

        if uri.scheme() == "file" {
            info!(
                "Public URI [{}] is a file",
                anonymizer.anonymize_url(uri.as_str())
            );

            if self.ctx.config.filesystem_allowed {
                return Ok(Box::new(LocalStorage::new(
                    uri,
                    jail_root,
                    jail_path,
                    self.ctx.clone(),
                )));
            }

            if is_convert_to_path(&uri) {
                info!(
                    "Public URI [{}] is actually a convert-to tempfile",
                    anonymizer.anonymize_url(uri.as_str())
                );
                return Ok(Box::new(LocalStorage::new(
                    uri,
                    jail_root,
                    jail_path,
                    self.ctx.clone(),
                )));
            }

            error!("Local storage is disabled. Enable it in the configuration to open local files.");
        } else if self.ctx.config.wopi_allowed {
            info!(
                "Public URI [{}] considered WOPI",
                anonymizer.anonymize_url(uri.as_str())
            );

            let host = uri.host_str().unwrap_or_default();
            if self.ctx.config.allowed_wopi_host(host) || is_localhost(host).await {
                return Ok(Box::new(WopiStorage::new(
                    uri.clone(),
                    jail_root,
                    jail_path,
                    self.ctx.clone(),
                    self.http.clone(),
                )));
            }

            error!(
                "No acceptable WOPI hosts found matching the target host [{}] in config",
                host
            );
            return Err(StorageError::Unauthorized(format!(
                "No acceptable WOPI hosts found matching the target host [{}] in config.",
                host
            )));
        }

        Err(StorageError::BadRequest(
            "No storage configured or invalid URI.".to_string(),
        ))
    }
}

/// Parse a document URI; scheme-less input is a path resolved against
/// `file:///`, which also removes dot segments.
fn parse_uri(uri: &str) -> Result<Url, String> {
    Url::parse("file:///")
        .and_then(|base| base.join(uri))
        .map_err(|e| e.to_string())
}

/// `/tmp/convert-to/<id>/<name>`, exactly, checked on the decoded path
/// that will actually be opened.
fn is_convert_to_path(uri: &Url) -> bool {
    let Ok(path) = uri.to_file_path() else {
        return false;
    };
    let components: Vec<Component<'_>> = path.components().collect();
    match components.as_slice() {
        [
            Component::RootDir,
            Component::Normal(tmp),
            Component::Normal(convert_to),
            Component::Normal(_),
            Component::Normal(_),
        ] => *tmp == "tmp" && *convert_to == "convert-to",
        _ => false,
    }
}
