use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Basic metadata of a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Base file name (no directory part)
    pub filename: String,
    /// Owner identity as reported by the storage
    pub owner_id: String,
    /// Last modification time at the storage; refreshed after each successful save
    pub modified_time: DateTime<Utc>,
    /// Size in bytes
    pub size: u64,
}

/// Identity of the user editing the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: String,
    pub user_name: String,
}

/// Three-valued flag: absent from the response, or explicitly set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriState {
    #[default]
    Unset,
    True,
    False,
}

impl From<Option<bool>> for TriState {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => TriState::Unset,
            Some(true) => TriState::True,
            Some(false) => TriState::False,
        }
    }
}

/// Permission and UI flags from a WOPI CheckFileInfo response.
///
/// Immutable snapshot of one metadata fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WopiFileInfo {
    pub user_id: String,
    pub obfuscated_user_id: String,
    pub user_name: String,
    pub user_extra_info: String,
    pub watermark_text: String,
    pub template_save_as: String,
    pub template_source: String,
    pub can_write: bool,
    pub post_message_origin: String,
    pub hide_print_option: bool,
    pub hide_save_option: bool,
    pub hide_export_option: bool,
    pub enable_owner_termination: bool,
    pub disable_print: bool,
    pub disable_export: bool,
    pub disable_copy: bool,
    pub disable_inactive_messages: bool,
    pub download_as_post_message: bool,
    pub user_can_not_write_relative: bool,
    pub enable_insert_remote_image: bool,
    pub enable_share: bool,
    /// Kept verbatim: hosts send `"true"`, `"false"` or a mode list such as `"desktop,mobile"`.
    pub hide_user_list: String,
    pub disable_change_tracking_show: TriState,
    pub disable_change_tracking_record: TriState,
    pub hide_change_tracking_controls: TriState,
    pub supports_rename: bool,
    pub user_can_rename: bool,
    /// Round-trip time of the CheckFileInfo request
    pub call_duration: Duration,
}

impl Default for WopiFileInfo {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            obfuscated_user_id: String::new(),
            user_name: String::new(),
            user_extra_info: String::new(),
            watermark_text: String::new(),
            template_save_as: String::new(),
            template_source: String::new(),
            can_write: false,
            post_message_origin: String::new(),
            hide_print_option: false,
            hide_save_option: false,
            hide_export_option: false,
            enable_owner_termination: false,
            disable_print: false,
            disable_export: false,
            disable_copy: false,
            disable_inactive_messages: false,
            download_as_post_message: false,
            user_can_not_write_relative: true,
            enable_insert_remote_image: false,
            enable_share: false,
            hide_user_list: "false".to_string(),
            disable_change_tracking_show: TriState::Unset,
            disable_change_tracking_record: TriState::Unset,
            hide_change_tracking_controls: TriState::Unset,
            supports_rename: false,
            user_can_rename: false,
            call_duration: Duration::ZERO,
        }
    }
}

impl WopiFileInfo {
    pub fn identity(&self) -> UserIdentity {
        UserIdentity {
            user_id: self.user_id.clone(),
            user_name: self.user_name.clone(),
        }
    }
}

/// New name and location returned by a save-as or rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveAsResult {
    pub name: String,
    pub url: String,
}

/// Outcome of a save attempt. Saves never fail with an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveResult {
    /// Stored; carries the new name/URL for save-as and rename
    Ok(Option<SaveAsResult>),
    /// Storage has no room for the document (HTTP 413)
    DiskFull,
    /// Credentials rejected (HTTP 401)
    Unauthorized,
    /// Storage refused to overwrite (HTTP 409)
    Conflict,
    /// Conflict because the stored document changed since it was loaded
    DocChanged,
    Failed,
}

impl SaveResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, SaveResult::Ok(_))
    }

    /// True for both a plain conflict and its document-changed refinement.
    pub fn is_conflict(&self) -> bool {
        matches!(self, SaveResult::Conflict | SaveResult::DocChanged)
    }

    pub fn save_as(&self) -> Option<&SaveAsResult> {
        match self {
            SaveResult::Ok(save_as) => save_as.as_ref(),
            _ => None,
        }
    }
}

/// Per-document save request state, set by the session before a save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveFlags {
    pub user_modified: bool,
    pub autosave: bool,
    pub exit_save: bool,
    pub extended_data: String,
    /// Overwrite regardless of the stored timestamp; cleared after a successful save
    pub force_save: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tristate_from_option() {
        assert_eq!(TriState::from(None), TriState::Unset);
        assert_eq!(TriState::from(Some(true)), TriState::True);
        assert_eq!(TriState::from(Some(false)), TriState::False);
    }

    #[test]
    fn test_wopi_file_info_defaults() {
        let info = WopiFileInfo::default();
        assert!(!info.can_write);
        assert!(info.user_can_not_write_relative);
        assert_eq!(info.hide_user_list, "false");
        assert_eq!(info.hide_change_tracking_controls, TriState::Unset);
    }

    #[test]
    fn test_save_result_helpers() {
        let saved = SaveResult::Ok(Some(SaveAsResult {
            name: "b.odt".to_string(),
            url: "http://host/wopi/files/2".to_string(),
        }));
        assert!(saved.is_ok());
        assert_eq!(saved.save_as().map(|s| s.name.as_str()), Some("b.odt"));

        assert!(SaveResult::DocChanged.is_conflict());
        assert!(SaveResult::Conflict.is_conflict());
        assert!(!SaveResult::Failed.is_conflict());
        assert!(SaveResult::DiskFull.save_as().is_none());
    }
}
