//! WebDAV storage placeholder.
//!
//! Carries the backend contract only: no data is transferred.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docs_storage_core::{
    Authorization, BackendState, FileInfo, SaveResult, StorageBackend, StorageError, UserIdentity,
};
use reqwest::Url;
use tracing::debug;

pub struct WebDavStorage {
    state: BackendState,
}

impl WebDavStorage {
    pub fn new(uri: Url, jail_root: &Path, jail_path: &str) -> Self {
        Self {
            state: BackendState::new(uri, jail_root, jail_path),
        }
    }
}

#[async_trait]
impl StorageBackend for WebDavStorage {
    fn kind(&self) -> &'static str {
        "webdav"
    }

    fn state(&self) -> &BackendState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut BackendState {
        &mut self.state
    }

    async fn fetch_metadata(
        &mut self,
        _auth: &dyn Authorization,
    ) -> Result<UserIdentity, StorageError> {
        let filename = self
            .state
            .uri
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string();

        self.state.file_info = Some(FileInfo {
            filename,
            owner_id: String::new(),
            modified_time: DateTime::<Utc>::UNIX_EPOCH,
            size: 0,
        });
        Ok(UserIdentity::default())
    }

    async fn load_to_local(
        &mut self,
        _auth: &dyn Authorization,
        _template_uri: Option<&str>,
    ) -> Result<PathBuf, StorageError> {
        debug!("WebDAV load is a no-op");
        self.state.loaded = true;
        Ok(PathBuf::from(self.state.uri.as_str()))
    }

    async fn save_from_local(
        &mut self,
        _auth: &dyn Authorization,
        _save_as_path: Option<&Path>,
        _save_as_filename: Option<&str>,
        _is_rename: bool,
    ) -> SaveResult {
        SaveResult::Ok(None)
    }
}
