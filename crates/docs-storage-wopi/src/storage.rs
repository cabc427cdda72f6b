use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use docs_storage_core::{
    suggested_target, Authorization, BackendState, SaveResult, StorageBackend, StorageContext,
    StorageError, TargetNameEncoder, UserIdentity, Utf7Encoder, WopiFileInfo,
};
use reqwest::{Client, Url};
use tracing::{debug, error, info, instrument};

use crate::client::{UploadMode, WopiClient};

/// Storage backend for documents served by a WOPI host.
pub struct WopiStorage {
    state: BackendState,
    ctx: StorageContext,
    client: WopiClient,
    encoder: Arc<dyn TargetNameEncoder>,
    wopi_file_info: Option<WopiFileInfo>,
    /// Total time spent in GetFile requests
    load_duration: Duration,
}

impl WopiStorage {
    pub fn new(
        uri: Url,
        jail_root: &Path,
        jail_path: &str,
        ctx: StorageContext,
        http: Client,
    ) -> Self {
        let client = WopiClient::new(http, ctx.anonymizer.clone());
        Self {
            state: BackendState::new(uri, jail_root, jail_path),
            ctx,
            client,
            encoder: Arc::new(Utf7Encoder),
            wopi_file_info: None,
            load_duration: Duration::ZERO,
        }
    }

    /// Replace the encoder used for save-as and rename target names.
    pub fn with_encoder(mut self, encoder: Arc<dyn TargetNameEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn load_duration(&self) -> Duration {
        self.load_duration
    }

    /// File name safe to create inside the jail: the last path component
    /// of whatever the host reported.
    fn jail_filename(name: &str) -> Result<String, StorageError> {
        let last = name.rsplit(['/', '\\']).next().unwrap_or_default();
        if last.is_empty() || last == "." || last == ".." {
            return Err(StorageError::BadRequest(
                "WOPI host returned an unusable BaseFileName".to_string(),
            ));
        }
        Ok(last.to_string())
    }
}

#[async_trait]
impl StorageBackend for WopiStorage {
    fn kind(&self) -> &'static str {
        "wopi"
    }

    fn state(&self) -> &BackendState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut BackendState {
        &mut self.state
    }

    fn wopi_file_info(&self) -> Option<&WopiFileInfo> {
        self.wopi_file_info.as_ref()
    }

    #[instrument(skip_all, level = "debug")]
    async fn fetch_metadata(
        &mut self,
        auth: &dyn Authorization,
    ) -> Result<UserIdentity, StorageError> {
        let (mut file_info, wopi_info) = self.client.check_file_info(&self.state.uri, auth).await?;

        let filename = Self::jail_filename(&file_info.filename)?;
        if filename != file_info.filename {
            debug!(
                "Reduced BaseFileName to [{}]",
                self.ctx.anonymizer.anonymize_url(&filename)
            );
            file_info.filename = filename;
        }

        let identity = wopi_info.identity();
        self.state.file_info = Some(file_info);
        self.wopi_file_info = Some(wopi_info);
        Ok(identity)
    }

    #[instrument(skip_all, level = "debug")]
    async fn load_to_local(
        &mut self,
        auth: &dyn Authorization,
        template_uri: Option<&str>,
    ) -> Result<PathBuf, StorageError> {
        if self.state.file_info.is_none() {
            self.fetch_metadata(auth).await?;
        }
        let filename = match &self.state.file_info {
            Some(file_info) => file_info.filename.clone(),
            None => {
                return Err(StorageError::StorageConnection(
                    "WOPI::CheckFileInfo returned no file info".to_string(),
                ))
            }
        };

        let root_file_path = self.state.local_root_path().await?.join(&filename);
        self.state
            .set_root_file_path(root_file_path.clone(), &self.ctx.anonymizer);

        if template_uri.is_some() {
            // The document is created from the template elsewhere; only the
            // path is needed here.
            info!("Template reference {}", self.state.root_file_path_anonym);
            self.state.loaded = true;
            return Ok(self.state.jailed_path(&filename));
        }

        let start = Instant::now();
        let result = self
            .client
            .get_file(
                &self.state.uri,
                auth,
                &root_file_path,
                &self.state.root_file_path_anonym,
            )
            .await;
        self.load_duration += start.elapsed();
        result?;

        self.state.loaded = true;
        Ok(self.state.jailed_path(&filename))
    }

    #[instrument(skip(self, auth, save_as_path, save_as_filename), level = "debug")]
    async fn save_from_local(
        &mut self,
        auth: &dyn Authorization,
        save_as_path: Option<&Path>,
        save_as_filename: Option<&str>,
        is_rename: bool,
    ) -> SaveResult {
        let save_as = match (save_as_path, save_as_filename) {
            (Some(path), Some(name)) if !name.is_empty() => Some((path, name)),
            _ => None,
        };

        let file_path = match (save_as, &self.state.root_file_path) {
            (Some((path, _)), _) => path.to_path_buf(),
            (None, Some(root_file_path)) => root_file_path.clone(),
            (None, None) => {
                error!("Cannot save: document was never loaded");
                return SaveResult::Failed;
            }
        };
        let file_path_anonym = self
            .ctx
            .anonymizer
            .anonymize_url(&file_path.to_string_lossy());

        let mode = if save_as.is_some() || is_rename {
            let target = suggested_target(self.encoder.as_ref(), save_as_filename.unwrap_or_default());
            debug!(
                "Save target name [{}]",
                self.ctx.anonymizer.anonymize_url(save_as_filename.unwrap_or_default())
            );
            if is_rename {
                UploadMode::Rename {
                    requested_name: target,
                }
            } else {
                UploadMode::PutRelative {
                    suggested_target: target,
                }
            }
        } else {
            let flags = &self.state.save_flags;
            UploadMode::Put {
                flags,
                timestamp: self
                    .state
                    .file_info
                    .as_ref()
                    .filter(|_| !flags.force_save)
                    .map(|file_info| file_info.modified_time),
            }
        };

        let outcome = self
            .client
            .upload(&self.state.uri, auth, mode, &file_path, &file_path_anonym)
            .await;

        if outcome.result.is_ok() {
            if let (Some(file_info), Some(modified)) =
                (self.state.file_info.as_mut(), outcome.last_modified)
            {
                file_info.modified_time = modified;
            }
            self.state.save_flags.force_save = false;
        }

        outcome.result
    }
}
