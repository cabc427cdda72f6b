use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;

use crate::anonymize::Anonymizer;
use crate::auth::Authorization;
use crate::config::StorageSecurityConfig;
use crate::error::StorageError;
use crate::types::{FileInfo, SaveFlags, SaveResult, UserIdentity, WopiFileInfo};

/// Process-wide counter used to synthesize identities for local files,
/// which carry no authorship of their own.
#[derive(Debug, Default)]
pub struct LocalUserIds {
    next: AtomicU64,
}

impl LocalUserIds {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Returns the next id; strictly increasing across all callers.
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// Shared, process-lifetime state handed to the selector and every backend.
#[derive(Debug, Clone)]
pub struct StorageContext {
    pub config: Arc<StorageSecurityConfig>,
    pub anonymizer: Arc<Anonymizer>,
    pub local_user_ids: Arc<LocalUserIds>,
}

impl StorageContext {
    pub fn new(config: StorageSecurityConfig) -> Self {
        let anonymizer = Anonymizer::new(config.anonymize_user_data, config.anonymization_salt);
        Self {
            config: Arc::new(config),
            anonymizer: Arc::new(anonymizer),
            local_user_ids: Arc::new(LocalUserIds::new()),
        }
    }
}

/// State every backend keeps about its document.
#[derive(Debug, Clone)]
pub struct BackendState {
    /// Document URI; fixed for the lifetime of the backend
    pub uri: Url,
    /// Local store root the jail lives under
    pub local_store_root: PathBuf,
    /// Jail-relative directory of the working copy
    pub jail_path: String,
    pub file_info: Option<FileInfo>,
    /// Absolute path of the working copy under the local store root
    pub root_file_path: Option<PathBuf>,
    /// Anonymized form of `root_file_path`, safe to log
    pub root_file_path_anonym: String,
    pub loaded: bool,
    pub save_flags: SaveFlags,
}

impl BackendState {
    pub fn new(uri: Url, local_store_root: &Path, jail_path: &str) -> Self {
        Self {
            uri,
            local_store_root: local_store_root.to_path_buf(),
            jail_path: jail_path.to_string(),
            file_info: None,
            root_file_path: None,
            root_file_path_anonym: String::new(),
            loaded: false,
            save_flags: SaveFlags::default(),
        }
    }

    /// Jail directory on the host, created on demand.
    pub async fn local_root_path(&self) -> Result<PathBuf, StorageError> {
        jailed_root(&self.jail_path, &self.local_store_root).await
    }

    /// Path of `filename` as seen from inside the jail.
    pub fn jailed_path(&self, filename: &str) -> PathBuf {
        Path::new(&self.jail_path).join(filename)
    }

    pub fn set_root_file_path(&mut self, path: PathBuf, anonymizer: &Anonymizer) {
        self.root_file_path_anonym = anonymizer.anonymize_url(&path.to_string_lossy());
        self.root_file_path = Some(path);
    }
}

/// Join `jail_path` under `local_store_root` and make sure the directory exists.
///
/// One leading separator is stripped from `jail_path`; anything that would
/// still leave the store root is rejected.
pub async fn jailed_root(jail_path: &str, local_store_root: &Path) -> Result<PathBuf, StorageError> {
    let relative = jail_path.strip_prefix('/').unwrap_or(jail_path);
    let relative = Path::new(relative);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(StorageError::BadRequest(format!(
            "Jail path escapes the local store root: {}",
            jail_path
        )));
    }

    let root = local_store_root.join(relative);
    tokio::fs::create_dir_all(&root).await.map_err(|e| {
        StorageError::Io(format!(
            "Failed to create jail directory {}: {}",
            root.display(),
            e
        ))
    })?;
    Ok(root)
}

/// Common contract of all storage backends.
///
/// One instance is created per opened document and is exclusively owned by
/// that document's session; operations take `&mut self`.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short backend name for logging ("local", "wopi", "webdav").
    fn kind(&self) -> &'static str;

    fn state(&self) -> &BackendState;

    fn state_mut(&mut self) -> &mut BackendState;

    /// Fetch document metadata and the editing user's identity.
    async fn fetch_metadata(
        &mut self,
        auth: &dyn Authorization,
    ) -> Result<UserIdentity, StorageError>;

    /// Materialize the document under the jail.
    ///
    /// # Returns
    /// The jail-relative path of the working copy
    async fn load_to_local(
        &mut self,
        auth: &dyn Authorization,
        template_uri: Option<&str>,
    ) -> Result<PathBuf, StorageError>;

    /// Store the working copy (or `save_as_path`) back.
    ///
    /// With both `save_as_path` and `save_as_filename` this is a save-as;
    /// with `is_rename` the document is renamed to `save_as_filename`.
    async fn save_from_local(
        &mut self,
        auth: &dyn Authorization,
        save_as_path: Option<&Path>,
        save_as_filename: Option<&str>,
        is_rename: bool,
    ) -> SaveResult;

    fn wopi_file_info(&self) -> Option<&WopiFileInfo> {
        None
    }

    fn uri(&self) -> &Url {
        &self.state().uri
    }

    fn file_info(&self) -> Option<&FileInfo> {
        self.state().file_info.as_ref()
    }

    fn root_file_path(&self) -> Option<&Path> {
        self.state().root_file_path.as_deref()
    }

    fn is_loaded(&self) -> bool {
        self.state().loaded
    }

    fn save_flags_mut(&mut self) -> &mut SaveFlags {
        &mut self.state_mut().save_flags
    }
}

/// Injection point letting tests supply their own backend for a URI.
pub trait StorageHook: Send + Sync {
    fn try_create_storage(
        &self,
        uri: &Url,
        jail_root: &Path,
        jail_path: &str,
    ) -> Option<Box<dyn StorageBackend>>;
}
