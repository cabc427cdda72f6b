//! Document storage for collaborative editing sessions.
//!
//! [`StorageSelector`] turns a document URI into a [`StorageBackend`]
//! (local file, WOPI host or WebDAV placeholder) under the configured
//! security policy.

pub mod config;
mod host;
mod selector;
mod webdav;

pub use docs_storage_core::{
    AccessToken, Authorization, FileInfo, SaveResult, StorageBackend, StorageContext,
    StorageError, StorageHook, StorageSecurityConfig, UserIdentity, WopiFileInfo,
};
pub use host::is_localhost;
pub use selector::StorageSelector;
pub use webdav::WebDavStorage;
