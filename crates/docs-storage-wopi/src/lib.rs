//! WOPI storage backend.
//!
//! Talks to a WOPI host over HTTP(S):
//! ```text
//! GET  <uri>                                  CheckFileInfo
//! GET  <uri>/contents                         GetFile
//! POST <uri>/contents  X-WOPI-Override=PUT           PutFile
//! POST <uri>           X-WOPI-Override=PUT_RELATIVE  PutRelativeFile
//! POST <uri>           X-WOPI-Override=RENAME_FILE   RenameFile
//! ```

mod client;
mod http;
mod json;
mod storage;

pub use client::{UploadMode, UploadOutcome, WopiClient, DOC_CHANGED_STATUS_CODE, WOPI_AGENT};
pub use http::build_http_client;
pub use storage::WopiStorage;
