//! WOPI protocol client.
//!
//! Every identity-bearing value (file names, user ids and names, URLs) goes
//! through the [`Anonymizer`] before it is logged.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, SecondsFormat, Utc};
use docs_storage_core::{
    Anonymizer, Authorization, FileInfo, SaveAsResult, SaveFlags, SaveResult, StorageError,
    TriState, WopiFileInfo,
};
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::{debug, enabled, error, info, instrument, trace, warn, Level};

use crate::json::{get_bool, get_string, get_u64, parse_object, Object};

/// User-Agent sent with every WOPI request.
pub const WOPI_AGENT: &str = concat!("LOOLWSD WOPI Agent ", env!("CARGO_PKG_VERSION"));

/// `LOOLStatusCode` a host returns with a 409 when the document changed
/// since it was loaded.
pub const DOC_CHANGED_STATUS_CODE: u64 = 1010;

/// Which of the three upload operations to perform.
#[derive(Debug, Clone)]
pub enum UploadMode<'a> {
    /// Overwrite the document in place. `timestamp` is the last known
    /// modification time; `None` forces the overwrite.
    Put {
        flags: &'a SaveFlags,
        timestamp: Option<DateTime<Utc>>,
    },
    /// Store as a new document next to the current one.
    PutRelative { suggested_target: String },
    /// Rename the current document.
    Rename { requested_name: String },
}

impl UploadMode<'_> {
    fn operation(&self) -> &'static str {
        match self {
            UploadMode::Put { .. } => "WOPI::PutFile",
            UploadMode::PutRelative { .. } => "WOPI::PutRelativeFile",
            UploadMode::Rename { .. } => "WOPI::RenameFile",
        }
    }

    fn returns_new_name(&self) -> bool {
        !matches!(self, UploadMode::Put { .. })
    }
}

/// Result of an upload: outcome plus the host's new modification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub result: SaveResult,
    pub last_modified: Option<DateTime<Utc>>,
}

impl UploadOutcome {
    fn failed() -> Self {
        Self {
            result: SaveResult::Failed,
            last_modified: None,
        }
    }
}

/// WOPI HTTP client (stateless, credentials provided per call).
#[derive(Clone)]
pub struct WopiClient {
    http: Client,
    anonymizer: Arc<Anonymizer>,
}

impl WopiClient {
    pub fn new(http: Client, anonymizer: Arc<Anonymizer>) -> Self {
        Self { http, anonymizer }
    }

    /// Start a request with the fixed headers every WOPI call carries.
    fn request(
        &self,
        builder: RequestBuilder,
        auth: &dyn Authorization,
    ) -> RequestBuilder {
        let builder = auth.authorize_request(builder.header("User-Agent", WOPI_AGENT));
        add_storage_debug_cookie(builder)
    }

    fn log_headers(&self, operation: &str, uri_anonym: &str, response: &Response) {
        if enabled!(Level::TRACE) {
            let headers = response
                .headers()
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v.to_str().unwrap_or("<binary>")))
                .collect::<Vec<_>>()
                .join(" / ");
            trace!("{} header for URI [{}]: {}", operation, uri_anonym, headers);
        }
    }

    /// CheckFileInfo: fetch document metadata and the user's permissions.
    #[instrument(skip_all, level = "debug")]
    pub async fn check_file_info(
        &self,
        uri: &Url,
        auth: &dyn Authorization,
    ) -> Result<(FileInfo, WopiFileInfo), StorageError> {
        let mut uri_object = uri.clone();
        auth.authorize_uri(&mut uri_object);
        let uri_anonym = self
            .anonymizer
            .anonymize_url(uri_without_query(uri).as_str());

        debug!("Getting info for wopi uri [{}]", uri_anonym);

        let start = Instant::now();
        let response = self
            .request(self.http.get(uri_object), auth)
            .send()
            .await
            .map_err(|e| {
                error!(
                    "Cannot get file info from WOPI storage uri [{}]. Error: {}",
                    uri_anonym, e
                );
                StorageError::StorageConnection(format!("WOPI::CheckFileInfo failed: {}", e))
            })?;

        self.log_headers("WOPI::CheckFileInfo", &uri_anonym, &response);

        let status = response.status();
        if status != StatusCode::OK {
            error!("WOPI::CheckFileInfo failed with {}", status);
            return Err(StorageError::StorageConnection(format!(
                "WOPI::CheckFileInfo failed with {}",
                status
            )));
        }

        let body = response.text().await.map_err(|e| {
            error!(
                "Cannot read file info from WOPI storage uri [{}]. Error: {}",
                uri_anonym, e
            );
            StorageError::StorageConnection(format!("WOPI::CheckFileInfo failed: {}", e))
        })?;
        let call_duration = start.elapsed();
        let call_ms = call_duration.as_secs_f64() * 1000.0;

        let Some(object) = parse_object(&body) else {
            let logged = if self.anonymizer.is_enabled() {
                "obfuscated"
            } else {
                body.as_str()
            };
            error!(
                "WOPI::CheckFileInfo ({:.3} ms) failed or no valid JSON payload returned. \
                 Access denied. Original response: [{}]",
                call_ms, logged
            );
            return Err(StorageError::Unauthorized(format!(
                "Access denied. WOPI::CheckFileInfo failed on: {}",
                uri_anonym
            )));
        };

        let (file_info, wopi_info) = self.parse_check_file_info(uri, &object, call_duration);

        if self.anonymizer.is_enabled() {
            let logged = Value::Object(self.anonymized_check_file_info(&object)).to_string();
            debug!("WOPI::CheckFileInfo ({:.3} ms): {}", call_ms, logged);
        } else {
            debug!("WOPI::CheckFileInfo ({:.3} ms): {}", call_ms, body);
        }

        Ok((file_info, wopi_info))
    }

    /// Build FileInfo/WopiFileInfo and register anonymization mappings.
    fn parse_check_file_info(
        &self,
        uri: &Url,
        object: &Object,
        call_duration: Duration,
    ) -> (FileInfo, WopiFileInfo) {
        let filename = get_string(object, "BaseFileName").unwrap_or_default();
        let owner_id = get_string(object, "OwnerId").unwrap_or_default();
        let user_id = get_string(object, "UserId").unwrap_or_default();
        let user_name = get_string(object, "UserFriendlyName").unwrap_or_default();
        let obfuscated_user_id = get_string(object, "ObfuscatedUserId").unwrap_or_default();

        // Mappings must exist before anything derived from this response is logged.
        if self.anonymizer.is_enabled() {
            self.anonymizer.map_anonymized(
                &Anonymizer::filename_from_url(&filename),
                &Anonymizer::filename_from_url(uri.as_str()),
            );
            if !obfuscated_user_id.is_empty() {
                self.anonymizer.map_anonymized(&owner_id, &obfuscated_user_id);
                self.anonymizer.map_anonymized(&user_id, &obfuscated_user_id);
                self.anonymizer.map_anonymized(&user_name, &obfuscated_user_id);
            }
        }

        let last_modified = get_string(object, "LastModifiedTime").unwrap_or_default();
        let modified_time = parse_timestamp(&last_modified, "LastModifiedTime");

        let file_info = FileInfo {
            filename,
            owner_id,
            modified_time,
            size: get_u64(object, "Size").unwrap_or(0),
        };

        let defaults = WopiFileInfo::default();
        let flag = |key: &str, default: bool| get_bool(object, key).unwrap_or(default);
        let wopi_info = WopiFileInfo {
            user_id,
            obfuscated_user_id,
            user_name,
            user_extra_info: get_string(object, "UserExtraInfo").unwrap_or_default(),
            watermark_text: get_string(object, "WatermarkText").unwrap_or_default(),
            template_save_as: get_string(object, "TemplateSaveAs").unwrap_or_default(),
            template_source: get_string(object, "TemplateSource").unwrap_or_default(),
            can_write: flag("UserCanWrite", defaults.can_write),
            post_message_origin: get_string(object, "PostMessageOrigin").unwrap_or_default(),
            hide_print_option: flag("HidePrintOption", defaults.hide_print_option),
            hide_save_option: flag("HideSaveOption", defaults.hide_save_option),
            hide_export_option: flag("HideExportOption", defaults.hide_export_option),
            enable_owner_termination: flag(
                "EnableOwnerTermination",
                defaults.enable_owner_termination,
            ),
            disable_print: flag("DisablePrint", defaults.disable_print),
            disable_export: flag("DisableExport", defaults.disable_export),
            disable_copy: flag("DisableCopy", defaults.disable_copy),
            disable_inactive_messages: flag(
                "DisableInactiveMessages",
                defaults.disable_inactive_messages,
            ),
            download_as_post_message: flag(
                "DownloadAsPostMessage",
                defaults.download_as_post_message,
            ),
            user_can_not_write_relative: flag(
                "UserCanNotWriteRelative",
                defaults.user_can_not_write_relative,
            ),
            enable_insert_remote_image: flag(
                "EnableInsertRemoteImage",
                defaults.enable_insert_remote_image,
            ),
            enable_share: flag("EnableShare", defaults.enable_share),
            hide_user_list: get_string(object, "HideUserList").unwrap_or(defaults.hide_user_list),
            disable_change_tracking_show: TriState::from(get_bool(
                object,
                "DisableChangeTrackingShow",
            )),
            disable_change_tracking_record: TriState::from(get_bool(
                object,
                "DisableChangeTrackingRecord",
            )),
            hide_change_tracking_controls: TriState::from(get_bool(
                object,
                "HideChangeTrackingControls",
            )),
            supports_rename: flag("SupportsRename", defaults.supports_rename),
            user_can_rename: flag("UserCanRename", defaults.user_can_rename),
            call_duration,
        };

        (file_info, wopi_info)
    }

    /// Copy of a CheckFileInfo body that is safe to log.
    fn anonymized_check_file_info(&self, object: &Object) -> Object {
        let mut logged = object.clone();

        for key in ["BaseFileName", "TemplateSaveAs", "TemplateSource"] {
            if let Some(value) = get_string(object, key) {
                logged.insert(key.to_string(), Value::String(self.anonymizer.anonymize_url(&value)));
            }
        }
        for key in ["OwnerId", "UserId", "UserFriendlyName"] {
            if let Some(value) = get_string(object, key) {
                logged.insert(
                    key.to_string(),
                    Value::String(self.anonymizer.anonymize_username(&value)),
                );
            }
        }
        logged.remove("ObfuscatedUserId");
        logged.remove("UserExtraInfo");

        logged
    }

    /// GetFile: stream the document body into `destination`.
    ///
    /// # Returns
    /// Number of bytes written
    #[instrument(skip_all, level = "debug")]
    pub async fn get_file(
        &self,
        uri: &Url,
        auth: &dyn Authorization,
        destination: &Path,
        destination_anonym: &str,
    ) -> Result<u64, StorageError> {
        let mut uri_object = contents_uri(uri);
        auth.authorize_uri(&mut uri_object);
        let uri_anonym = format!(
            "{}/contents",
            self.anonymizer.anonymize_url(uri_without_query(uri).as_str())
        );

        debug!("Wopi requesting: {}", uri_anonym);

        let start = Instant::now();
        let response = self
            .request(self.http.get(uri_object), auth)
            .send()
            .await
            .map_err(|e| {
                error!(
                    "Cannot load document from WOPI storage uri [{}]. Error: {}",
                    uri_anonym, e
                );
                StorageError::StorageConnection(format!("WOPI::GetFile failed: {}", e))
            })?;

        self.log_headers("WOPI::GetFile", &uri_anonym, &response);

        let status = response.status();
        if status != StatusCode::OK {
            error!("WOPI::GetFile failed with {}", status);
            return Err(StorageError::StorageConnection(format!(
                "WOPI::GetFile failed with {}",
                status
            )));
        }

        let mut file = tokio::fs::File::create(destination).await.map_err(|e| {
            StorageError::Io(format!("Failed to create {}: {}", destination_anonym, e))
        })?;

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                error!(
                    "Cannot load document from WOPI storage uri [{}]. Error: {}",
                    uri_anonym, e
                );
                StorageError::StorageConnection(format!("WOPI::GetFile failed: {}", e))
            })?;
            file.write_all(&chunk).await.map_err(|e| {
                StorageError::Io(format!("Failed to write {}: {}", destination_anonym, e))
            })?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| {
            StorageError::Io(format!("Failed to write {}: {}", destination_anonym, e))
        })?;

        info!(
            "WOPI::GetFile downloaded {} bytes from [{}] -> {} in {:.3}s",
            written,
            uri_anonym,
            destination_anonym,
            start.elapsed().as_secs_f64()
        );

        Ok(written)
    }

    /// PutFile / PutRelativeFile / RenameFile.
    ///
    /// Never fails: transport errors and unexpected statuses come back as
    /// [`SaveResult::Failed`].
    #[instrument(skip_all, level = "debug", fields(operation = mode.operation()))]
    pub async fn upload(
        &self,
        uri: &Url,
        auth: &dyn Authorization,
        mode: UploadMode<'_>,
        file_path: &Path,
        file_path_anonym: &str,
    ) -> UploadOutcome {
        let operation = mode.operation();
        let mut uri_object = match mode {
            UploadMode::Put { .. } => contents_uri(uri),
            _ => uri.clone(),
        };
        let uri_anonym = self
            .anonymizer
            .anonymize_url(uri_without_query(&uri_object).as_str());
        auth.authorize_uri(&mut uri_object);

        info!("Uploading URI via WOPI [{}] from [{}]", uri_anonym, file_path_anonym);

        let data = match tokio::fs::read(file_path).await {
            Ok(data) => data,
            Err(e) => {
                error!("Cannot read [{}] for {}: {}", file_path_anonym, operation, e);
                return UploadOutcome::failed();
            }
        };
        let size = data.len();

        let mut request = self.request(self.http.post(uri_object), auth);
        request = match &mode {
            UploadMode::Put { flags, timestamp } => {
                let mut request = request
                    .header("X-WOPI-Override", "PUT")
                    .header("X-LOOL-WOPI-IsModifiedByUser", bool_header(flags.user_modified))
                    .header("X-LOOL-WOPI-IsAutosave", bool_header(flags.autosave))
                    .header("X-LOOL-WOPI-IsExitSave", bool_header(flags.exit_save));
                if !flags.extended_data.is_empty() {
                    request = request.header("X-LOOL-WOPI-ExtendedData", flags.extended_data.as_str());
                }
                if let Some(timestamp) = timestamp {
                    // The host refuses to overwrite when its copy is newer than this.
                    request = request.header("X-LOOL-WOPI-Timestamp", format_timestamp(timestamp));
                }
                request
            }
            UploadMode::PutRelative { suggested_target } => request
                .header("X-WOPI-Override", "PUT_RELATIVE")
                .header("X-WOPI-Size", size.to_string())
                .header("X-WOPI-SuggestedTarget", suggested_target.as_str()),
            UploadMode::Rename { requested_name } => request
                .header("X-WOPI-Override", "RENAME_FILE")
                .header("X-WOPI-RequestedName", requested_name.as_str()),
        };

        let response = match request
            .header("Content-Type", "application/octet-stream")
            .body(data)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(
                    "Cannot save file to WOPI storage uri [{}]. Error: {}",
                    uri_anonym, e
                );
                return UploadOutcome::failed();
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                error!(
                    "Cannot read {} response from [{}]. Error: {}",
                    operation, uri_anonym, e
                );
                return UploadOutcome::failed();
            }
        };

        if enabled!(Level::INFO) {
            info!("{} response: {}", operation, self.loggable_save_response(&body));
            info!(
                "{} uploaded {} bytes from [{}] -> [{}]: {}",
                operation, size, file_path_anonym, uri_anonym, status
            );
        }

        self.classify_response(operation, mode.returns_new_name(), status, &body)
    }

    /// Map a save response to its outcome.
    fn classify_response(
        &self,
        operation: &str,
        returns_new_name: bool,
        status: StatusCode,
        body: &str,
    ) -> UploadOutcome {
        match status {
            StatusCode::OK => {
                let Some(object) = parse_object(body) else {
                    warn!("Invalid or missing JSON in {} HTTP_OK response", operation);
                    return UploadOutcome {
                        result: SaveResult::Ok(None),
                        last_modified: None,
                    };
                };

                let last_modified = get_string(&object, "LastModifiedTime")
                    .map(|ts| parse_timestamp(&ts, "LastModifiedTime"));
                trace!("{} returns LastModifiedTime [{:?}]", operation, last_modified);

                let save_as = returns_new_name.then(|| {
                    let name = get_string(&object, "Name").unwrap_or_default();
                    let url = get_string(&object, "Url").unwrap_or_default();
                    trace!(
                        "{} returns Name [{}] Url [{}]",
                        operation,
                        self.anonymizer.anonymize_url(&name),
                        self.anonymizer.anonymize_url(strip_query(&url))
                    );
                    SaveAsResult { name, url }
                });

                UploadOutcome {
                    result: SaveResult::Ok(save_as),
                    last_modified,
                }
            }
            StatusCode::PAYLOAD_TOO_LARGE => UploadOutcome {
                result: SaveResult::DiskFull,
                last_modified: None,
            },
            StatusCode::UNAUTHORIZED => UploadOutcome {
                result: SaveResult::Unauthorized,
                last_modified: None,
            },
            StatusCode::CONFLICT => {
                let result = match parse_object(body) {
                    Some(object)
                        if get_u64(&object, "LOOLStatusCode") == Some(DOC_CHANGED_STATUS_CODE) =>
                    {
                        SaveResult::DocChanged
                    }
                    Some(_) => SaveResult::Conflict,
                    None => {
                        warn!("Invalid or missing JSON in {} HTTP_CONFLICT response", operation);
                        SaveResult::Conflict
                    }
                };
                UploadOutcome {
                    result,
                    last_modified: None,
                }
            }
            other => {
                error!("{} failed with unexpected status {}", operation, other);
                UploadOutcome::failed()
            }
        }
    }

    /// Save response body with the new name and location anonymized.
    fn loggable_save_response(&self, body: &str) -> String {
        if !self.anonymizer.is_enabled() {
            return body.to_string();
        }
        let Some(mut object) = parse_object(body) else {
            return "obfuscated".to_string();
        };

        let url = get_string(&object, "Url");
        let name = get_string(&object, "Name");
        if let (Some(url), Some(name)) = (&url, &name) {
            // The file id in the returned URL stands in for the new file name.
            let decoded = urlencoding::decode(url)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| url.clone());
            let file_id = Anonymizer::filename_from_url(&decoded);
            self.anonymizer.map_anonymized(&file_id, &file_id);
            self.anonymizer
                .map_anonymized(&Anonymizer::filename_from_url(name), &file_id);
        }
        if let Some(name) = &name {
            object.insert("Name".to_string(), Value::String(self.anonymizer.anonymize_url(name)));
        }
        if let Some(url) = &url {
            object.insert(
                "Url".to_string(),
                Value::String(self.anonymizer.anonymize_url(strip_query(url))),
            );
        }

        Value::Object(object).to_string()
    }
}

/// `<uri>/contents`, keeping the query.
fn contents_uri(uri: &Url) -> Url {
    let mut contents = uri.clone();
    contents.set_path(&format!("{}/contents", uri.path().trim_end_matches('/')));
    contents
}

fn uri_without_query(uri: &Url) -> Url {
    let mut stripped = uri.clone();
    stripped.set_query(None);
    stripped
}

fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

fn bool_header(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// ISO 8601 with microseconds, as WOPI hosts compare it.
fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an ISO 8601 timestamp; missing or invalid values become the epoch.
fn parse_timestamp(value: &str, field: &str) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(e) => {
            if !value.is_empty() {
                warn!("Invalid {} [{}]: {}", field, value, e);
            }
            DateTime::<Utc>::UNIX_EPOCH
        }
    }
}

/// Debug builds: add the cookie given as `LOOL_STORAGE_COOKIE=name:value`.
fn add_storage_debug_cookie(request: RequestBuilder) -> RequestBuilder {
    #[cfg(debug_assertions)]
    if let Ok(cookie) = std::env::var("LOOL_STORAGE_COOKIE") {
        if let Some((name, value)) = cookie.split_once(':') {
            trace!("Added storage debug cookie [{}={}]", name, value);
            return request.header("Cookie", format!("{}={}", name, value));
        }
    }
    request
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(anonymize: bool) -> WopiClient {
        WopiClient::new(Client::new(), Arc::new(Anonymizer::new(anonymize, 7)))
    }

    #[test]
    fn test_contents_uri() {
        let uri = Url::parse("https://h/wopi/files/42?access_token=t").unwrap();
        assert_eq!(
            contents_uri(&uri).as_str(),
            "https://h/wopi/files/42/contents?access_token=t"
        );
        assert_eq!(
            uri_without_query(&uri).as_str(),
            "https://h/wopi/files/42"
        );
    }

    #[test]
    fn test_timestamps() {
        let ts = parse_timestamp("2024-03-01T10:20:30.123456Z", "LastModifiedTime");
        assert_eq!(format_timestamp(&ts), "2024-03-01T10:20:30.123456Z");
        assert_eq!(parse_timestamp("", "x"), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(parse_timestamp("yesterday", "x"), DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_classify_statuses() {
        let client = client(false);
        let classify = |status: u16, body: &str| {
            client
                .classify_response("WOPI::PutFile", false, StatusCode::from_u16(status).unwrap(), body)
                .result
        };

        assert_eq!(classify(200, "{}"), SaveResult::Ok(None));
        assert_eq!(classify(200, "not json"), SaveResult::Ok(None));
        assert_eq!(classify(413, ""), SaveResult::DiskFull);
        assert_eq!(classify(401, ""), SaveResult::Unauthorized);
        assert_eq!(classify(409, r#"{"LOOLStatusCode":1010}"#), SaveResult::DocChanged);
        assert_eq!(classify(409, r#"{"LOOLStatusCode":1011}"#), SaveResult::Conflict);
        assert_eq!(classify(409, "garbage"), SaveResult::Conflict);
        assert_eq!(classify(500, ""), SaveResult::Failed);
        assert_eq!(classify(404, ""), SaveResult::Failed);
    }

    #[test]
    fn test_classify_save_as_captures_name() {
        let outcome = client(false).classify_response(
            "WOPI::PutRelativeFile",
            true,
            StatusCode::OK,
            r#"{"Name":"copy.odt","Url":"https://h/wopi/files/77?access_token=x","LastModifiedTime":"2024-03-01T10:20:30Z"}"#,
        );
        assert_eq!(
            outcome.result,
            SaveResult::Ok(Some(SaveAsResult {
                name: "copy.odt".to_string(),
                url: "https://h/wopi/files/77?access_token=x".to_string(),
            }))
        );
        assert!(outcome.last_modified.is_some());
    }

    #[test]
    fn test_anonymized_check_file_info_strips_identities() {
        let client = client(true);
        let uri = Url::parse("https://h/wopi/files/file-99").unwrap();
        let object = parse_object(
            r#"{"BaseFileName":"Salaries 2024.ods","OwnerId":"alice","UserId":"bob",
                "UserFriendlyName":"Bob Smith","ObfuscatedUserId":"u-123",
                "UserExtraInfo":"{\"mail\":\"bob@example.org\"}","Size":1}"#,
        )
        .unwrap();

        let (file_info, wopi_info) = client.parse_check_file_info(&uri, &object, Duration::ZERO);
        assert_eq!(file_info.filename, "Salaries 2024.ods");
        assert_eq!(wopi_info.user_name, "Bob Smith");

        let logged = Value::Object(client.anonymized_check_file_info(&object)).to_string();
        for secret in ["Salaries", "alice", "bob", "Bob Smith", "example.org"] {
            assert!(!logged.contains(secret), "{} leaked into {}", secret, logged);
        }
        assert!(logged.contains("file-99.ods"));
        assert!(logged.contains("u-123"));
    }

    #[test]
    fn test_loggable_save_response() {
        let anonymizing = client(true);
        let logged = anonymizing.loggable_save_response(
            r#"{"Name":"Secret Plan.odt","Url":"https://h/wopi/files/abc%20def?access_token=tok"}"#,
        );
        assert!(!logged.contains("Secret Plan"));
        assert!(!logged.contains("tok"));
        assert!(logged.contains("abc def.odt"));

        assert_eq!(anonymizing.loggable_save_response("<html>"), "obfuscated");
        assert_eq!(client(false).loggable_save_response("<html>"), "<html>");
    }
}
