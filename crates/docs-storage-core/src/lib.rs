//! Core traits and types for document storage backends.
//!
//! This crate defines the abstractions shared between the local, WOPI and WebDAV backends:
//! - `StorageBackend`: Metadata fetch, load into the jail and save back
//! - `Authorization`: Credential injection into URIs and requests
//! - `HostMatcher`: Allow/deny rules for remote storage hosts
//! - `Anonymizer`: PII mapping applied before anything reaches a log
//! - `StorageSecurityConfig`: Process-wide, read-only storage policy

mod anonymize;
mod auth;
mod backend;
mod config;
mod encode;
mod error;
mod host;
mod types;

pub use anonymize::Anonymizer;
pub use auth::{AccessToken, Authorization};
pub use backend::{
    jailed_root, BackendState, LocalUserIds, StorageBackend, StorageContext, StorageHook,
};
pub use config::{SslSettings, StorageSecurityConfig};
pub use encode::{suggested_target, EncodeError, TargetNameEncoder, Utf7Encoder};
pub use error::StorageError;
pub use host::{HostMatcher, RegexListMatcher};
pub use types::{
    FileInfo, SaveAsResult, SaveFlags, SaveResult, TriState, UserIdentity, WopiFileInfo,
};
