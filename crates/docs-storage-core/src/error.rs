/// Load-time storage errors.
///
/// Save-time failures are never reported through this type; they are
/// [`SaveResult`](crate::SaveResult) values.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Malformed or unroutable document URI.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Host or credentials rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Backend reachable but the request failed or returned non-200.
    #[error("Storage connection error: {0}")]
    StorageConnection(String),

    /// Not enough local disk to materialize the document.
    #[error("Storage space low: {0}")]
    StorageSpaceLow(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StorageError {
    /// Short machine-readable code, used by callers reporting to the user.
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::BadRequest(_) => "BAD_REQUEST",
            StorageError::Unauthorized(_) => "UNAUTHORIZED",
            StorageError::StorageConnection(_) => "STORAGE_CONNECTION",
            StorageError::StorageSpaceLow(_) => "STORAGE_SPACE_LOW",
            StorageError::Io(_) => "IO",
            StorageError::Config(_) => "CONFIG",
        }
    }
}
