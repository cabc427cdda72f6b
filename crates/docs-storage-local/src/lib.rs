//! Local filesystem storage backend.
//!
//! Documents addressed by `file://` URIs (or plain paths) are materialized in
//! the jail by hardlinking when possible, falling back to a full copy. Only a
//! fallback copy needs to be written back on save.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docs_storage_core::{
    Authorization, BackendState, FileInfo, SaveResult, StorageBackend, StorageContext,
    StorageError, UserIdentity,
};
use reqwest::Url;
use tokio::fs;
use tracing::{debug, error, info, instrument, trace, warn};

/// How the working copy is created inside the jail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkMode {
    /// Hardlink, falling back to a copy when linking fails
    #[default]
    HardLinkOrCopy,
    /// Always copy
    CopyOnly,
}

/// Storage backend for documents on the local filesystem.
pub struct LocalStorage {
    state: BackendState,
    ctx: StorageContext,
    link_mode: LinkMode,
    /// The working copy is a copy (not a hardlink) and must be written back on save
    is_copy: bool,
}

impl LocalStorage {
    pub fn new(uri: Url, jail_root: &Path, jail_path: &str, ctx: StorageContext) -> Self {
        Self {
            state: BackendState::new(uri, jail_root, jail_path),
            ctx,
            link_mode: LinkMode::default(),
            is_copy: false,
        }
    }

    pub fn with_link_mode(mut self, link_mode: LinkMode) -> Self {
        self.link_mode = link_mode;
        self
    }

    pub fn is_copy(&self) -> bool {
        self.is_copy
    }

    /// Path of the original document on the host.
    fn source_path(&self) -> Result<PathBuf, StorageError> {
        self.state.uri.to_file_path().map_err(|_| {
            StorageError::BadRequest(format!(
                "Not a local file URI: {}",
                self.ctx.anonymizer.anonymize_url(self.state.uri.as_str())
            ))
        })
    }

    fn source_filename(path: &Path) -> Result<String, StorageError> {
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| StorageError::BadRequest("Local URI has no file name".to_string()))
    }

    async fn stat(&self, path: &Path) -> Result<FileInfo, StorageError> {
        let metadata = fs::metadata(path).await.map_err(|e| {
            StorageError::Io(format!(
                "Failed to stat {}: {}",
                self.ctx.anonymizer.anonymize_url(&path.to_string_lossy()),
                e
            ))
        })?;

        Ok(FileInfo {
            filename: Self::source_filename(path)?,
            owner_id: "localhost".to_string(),
            modified_time: modified_time(&metadata),
            size: metadata.len(),
        })
    }

    /// Fail with `StorageSpaceLow` unless the jail filesystem has room for `needed` bytes
    /// and keeps at least the configured percentage free.
    fn check_disk_space(&self, dir: &Path, needed: u64) -> Result<(), StorageError> {
        let (available, total) = match (fs2::available_space(dir), fs2::total_space(dir)) {
            (Ok(available), Ok(total)) => (available, total),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Cannot determine free disk space, assuming enough: {}", e);
                return Ok(());
            }
        };

        let free_percent = if total == 0 {
            0.0
        } else {
            available as f64 * 100.0 / total as f64
        };

        if available < needed || free_percent < self.ctx.config.min_free_disk_percent {
            return Err(StorageError::StorageSpaceLow(format!(
                "Low disk space for {} ({} bytes free, {:.1}%)",
                self.state.root_file_path_anonym, available, free_percent
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    fn kind(&self) -> &'static str {
        "local"
    }

    fn state(&self) -> &BackendState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut BackendState {
        &mut self.state
    }

    #[instrument(skip(self, _auth), level = "debug")]
    async fn fetch_metadata(
        &mut self,
        _auth: &dyn Authorization,
    ) -> Result<UserIdentity, StorageError> {
        let path = self.source_path()?;
        debug!(
            "Getting info for local path [{}]",
            self.ctx.anonymizer.anonymize_url(&path.to_string_lossy())
        );

        let file_info = self.stat(&path).await?;
        self.state.file_info = Some(file_info);

        let id = self.ctx.local_user_ids.next_id();
        Ok(UserIdentity {
            user_id: format!("localhost{}", id),
            user_name: format!("LocalHost#{}", id),
        })
    }

    #[instrument(skip(self, _auth, _template_uri), level = "debug")]
    async fn load_to_local(
        &mut self,
        _auth: &dyn Authorization,
        _template_uri: Option<&str>,
    ) -> Result<PathBuf, StorageError> {
        let public_path = self.source_path()?;
        let filename = Self::source_filename(&public_path)?;
        let public_anonym = self
            .ctx
            .anonymizer
            .anonymize_url(&public_path.to_string_lossy());

        let local_root = self.state.local_root_path().await?;
        let root_file_path = local_root.join(&filename);
        self.state
            .set_root_file_path(root_file_path.clone(), &self.ctx.anonymizer);
        info!(
            "Public path [{}] jailed to [{}]",
            public_anonym, self.state.root_file_path_anonym
        );

        let source = self.stat(&public_path).await?;
        self.check_disk_space(&local_root, source.size)?;

        let exists = fs::try_exists(&root_file_path).await.unwrap_or(false);
        if !exists && self.link_mode == LinkMode::HardLinkOrCopy {
            info!("Linking {} to {}", public_anonym, self.state.root_file_path_anonym);
            if let Err(e) = fs::hard_link(&public_path, &root_file_path).await {
                warn!(
                    "Linking {} to {} failed, will copy: {}",
                    public_anonym, self.state.root_file_path_anonym, e
                );
            }
        }

        if !fs::try_exists(&root_file_path).await.unwrap_or(false) {
            info!("Copying {} to {}", public_anonym, self.state.root_file_path_anonym);
            fs::copy(&public_path, &root_file_path).await.map_err(|e| {
                error!(
                    "Copying {} to {} failed: {}",
                    public_anonym, self.state.root_file_path_anonym, e
                );
                StorageError::Io(format!(
                    "Failed to copy {} into the jail: {}",
                    public_anonym, e
                ))
            })?;
            self.is_copy = true;
        }

        if self.state.file_info.is_none() {
            self.state.file_info = Some(source);
        }
        self.state.loaded = true;

        Ok(self.state.jailed_path(&filename))
    }

    #[instrument(skip_all, level = "debug")]
    async fn save_from_local(
        &mut self,
        _auth: &dyn Authorization,
        _save_as_path: Option<&Path>,
        _save_as_filename: Option<&str>,
        _is_rename: bool,
    ) -> SaveResult {
        trace!(
            "Saving local file to local file storage (is_copy: {}) for {}",
            self.is_copy,
            self.state.root_file_path_anonym
        );

        let public_path = match self.source_path() {
            Ok(path) => path,
            Err(e) => {
                error!("Cannot save: {}", e);
                return SaveResult::Failed;
            }
        };
        let public_anonym = self
            .ctx
            .anonymizer
            .anonymize_url(&public_path.to_string_lossy());

        if self.is_copy {
            if let Some(root_file_path) = self.state.root_file_path.clone() {
                if fs::try_exists(&root_file_path).await.unwrap_or(false) {
                    info!("Copying {} to {}", self.state.root_file_path_anonym, public_anonym);
                    if let Err(e) = fs::copy(&root_file_path, &public_path).await {
                        error!(
                            "Copying {} to {} failed: {}",
                            self.state.root_file_path_anonym, public_anonym, e
                        );
                        return SaveResult::Failed;
                    }
                }
            }
        }

        // Refresh the timestamp used to detect changes made behind our back.
        match fs::metadata(&public_path).await {
            Ok(metadata) => {
                let modified = modified_time(&metadata);
                if let Some(file_info) = self.state.file_info.as_mut() {
                    file_info.modified_time = modified;
                    file_info.size = metadata.len();
                }
                trace!("New modified time in storage: {}", modified);
                SaveResult::Ok(None)
            }
            Err(e) => {
                error!("Failed to stat {} after save: {}", public_anonym, e);
                SaveResult::Failed
            }
        }
    }
}

fn modified_time(metadata: &std::fs::Metadata) -> DateTime<Utc> {
    metadata
        .modified()
        .unwrap_or(SystemTime::UNIX_EPOCH)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docs_storage_core::{AccessToken, StorageSecurityConfig};
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        source: PathBuf,
        jail_root: PathBuf,
        ctx: StorageContext,
    }

    async fn setup(content: &[u8]) -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let docs = temp_dir.path().join("docs");
        let jail_root = temp_dir.path().join("jails");
        fs::create_dir_all(&docs).await.unwrap();
        let source = docs.join("report.odt");
        fs::write(&source, content).await.unwrap();

        let config = StorageSecurityConfig::default()
            .with_filesystem(true)
            .with_min_free_disk_percent(0.0);
        Fixture {
            _temp_dir: temp_dir,
            source,
            jail_root,
            ctx: StorageContext::new(config),
        }
    }

    fn storage(fixture: &Fixture) -> LocalStorage {
        let uri = Url::from_file_path(&fixture.source).unwrap();
        LocalStorage::new(uri, &fixture.jail_root, "/user/doc/1", fixture.ctx.clone())
    }

    #[tokio::test]
    async fn test_fetch_metadata_twice() {
        let fixture = setup(b"0123456789").await;
        let mut storage = storage(&fixture);
        let auth = AccessToken::None;

        assert!(storage.file_info().is_none());

        let first_user = storage.fetch_metadata(&auth).await.unwrap();
        let first_info = storage.file_info().cloned().unwrap();
        let second_user = storage.fetch_metadata(&auth).await.unwrap();
        let second_info = storage.file_info().cloned().unwrap();

        assert_eq!(first_info, second_info);
        assert_eq!(first_info.filename, "report.odt");
        assert_eq!(first_info.owner_id, "localhost");
        assert_eq!(first_info.size, 10);

        let first_id: u32 = first_user.user_id.trim_start_matches("localhost").parse().unwrap();
        let second_id: u32 = second_user.user_id.trim_start_matches("localhost").parse().unwrap();
        assert!(second_id > first_id);
        assert_eq!(first_user.user_name, format!("LocalHost#{}", first_id));
    }

    #[tokio::test]
    async fn test_fetch_metadata_missing_file() {
        let fixture = setup(b"x").await;
        fs::remove_file(&fixture.source).await.unwrap();
        let mut storage = storage(&fixture);

        let result = storage.fetch_metadata(&AccessToken::None).await;
        assert!(matches!(result, Err(StorageError::Io(_))));
        assert!(storage.file_info().is_none());
    }

    #[tokio::test]
    async fn test_load_hardlinks_and_save_does_not_copy() {
        let fixture = setup(b"original").await;
        let mut storage = storage(&fixture);
        let auth = AccessToken::None;

        let jailed = storage.load_to_local(&auth, None).await.unwrap();
        assert_eq!(jailed, PathBuf::from("/user/doc/1/report.odt"));
        assert!(storage.is_loaded());
        assert!(!storage.is_copy());
        assert!(storage.file_info().is_some());

        let root_file = storage.root_file_path().unwrap().to_path_buf();
        assert_eq!(root_file, fixture.jail_root.join("user/doc/1/report.odt"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            let a = std::fs::metadata(&fixture.source).unwrap();
            let b = std::fs::metadata(&root_file).unwrap();
            assert_eq!(a.ino(), b.ino());
        }

        // Replace the source with an unrelated file: a save must not overwrite it.
        fs::remove_file(&fixture.source).await.unwrap();
        fs::write(&fixture.source, b"replaced").await.unwrap();

        let result = storage.save_from_local(&auth, None, None, false).await;
        assert_eq!(result, SaveResult::Ok(None));
        assert_eq!(fs::read(&fixture.source).await.unwrap(), b"replaced");
    }

    #[tokio::test]
    async fn test_copy_fallback_is_written_back() {
        let fixture = setup(b"original").await;
        let mut storage = storage(&fixture).with_link_mode(LinkMode::CopyOnly);
        let auth = AccessToken::None;

        storage.load_to_local(&auth, None).await.unwrap();
        assert!(storage.is_copy());

        let root_file = storage.root_file_path().unwrap().to_path_buf();
        fs::write(&root_file, b"edited in the jail").await.unwrap();
        // Untouched until saved
        assert_eq!(fs::read(&fixture.source).await.unwrap(), b"original");

        let result = storage.save_from_local(&auth, None, None, false).await;
        assert!(result.is_ok());
        assert_eq!(
            fs::read(&fixture.source).await.unwrap(),
            fs::read(&root_file).await.unwrap()
        );
        assert_eq!(storage.file_info().unwrap().size, 18);
    }

    #[tokio::test]
    async fn test_save_failure_is_a_value() {
        let fixture = setup(b"original").await;
        let mut storage = storage(&fixture).with_link_mode(LinkMode::CopyOnly);
        let auth = AccessToken::None;

        storage.load_to_local(&auth, None).await.unwrap();
        // Make the destination unwritable by turning it into a directory.
        fs::remove_file(&fixture.source).await.unwrap();
        fs::create_dir(&fixture.source).await.unwrap();

        let result = storage.save_from_local(&auth, None, None, false).await;
        assert_eq!(result, SaveResult::Failed);
    }

    #[tokio::test]
    async fn test_low_disk_space() {
        let mut fixture = setup(b"original").await;
        fixture.ctx = StorageContext::new(
            StorageSecurityConfig::default()
                .with_filesystem(true)
                .with_min_free_disk_percent(101.0),
        );
        let mut storage = storage(&fixture);

        let result = storage.load_to_local(&AccessToken::None, None).await;
        assert!(matches!(result, Err(StorageError::StorageSpaceLow(_))));
        assert!(!storage.is_loaded());
    }
}
