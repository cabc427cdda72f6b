//! Backend selection under the storage security policy.

use std::path::Path;
use std::sync::Arc;

use docs_storage::{
    AccessToken, SaveResult, StorageBackend, StorageContext, StorageError, StorageHook,
    StorageSecurityConfig, StorageSelector, WebDavStorage,
};
use docs_storage_core::RegexListMatcher;
use pretty_assertions::assert_eq;
use reqwest::Url;
use rstest::{fixture, rstest};
use tempfile::TempDir;

#[fixture]
fn jail() -> TempDir {
    TempDir::new().unwrap()
}

fn selector(config: StorageSecurityConfig) -> StorageSelector {
    StorageSelector::new(StorageContext::new(config)).unwrap()
}

fn wopi_config(allow: &[&str], deny: &[&str]) -> StorageSecurityConfig {
    let mut hosts = RegexListMatcher::new();
    for pattern in allow {
        hosts.allow(pattern);
    }
    for pattern in deny {
        hosts.deny(pattern);
    }
    StorageSecurityConfig::default().with_wopi(true, hosts)
}

async fn select_kind(
    selector: &StorageSelector,
    uri: &str,
    jail: &Path,
) -> Result<&'static str, StorageError> {
    selector
        .select(uri, jail, "/user/docs/1")
        .await
        .map(|storage| storage.kind())
}

// =========================================================================
// Local files
// =========================================================================

#[rstest]
#[case("/tmp/convert-to/abc123/report.docx")]
#[case("file:///tmp/convert-to/abc123/report.docx")]
#[case("/tmp/./convert-to/abc123/report.docx")]
#[tokio::test]
async fn test_convert_to_files_allowed_without_filesystem(jail: TempDir, #[case] uri: &str) {
    let selector = selector(StorageSecurityConfig::default().with_wopi(true, RegexListMatcher::new()));
    assert_eq!(select_kind(&selector, uri, jail.path()).await.unwrap(), "local");
}

#[rstest]
#[case("/etc/passwd")]
#[case("file:///home/alice/secret.odt")]
#[case("/tmp/convert-to/abc123")]
#[case("/tmp/convert-to/a/b/c.docx")]
#[case("/tmp/convert-to/../../etc/passwd")]
#[case("/tmp/convert-to/x%2F..%2F..%2F/secret_file.txt")]
#[case("file:///tmp/convert-to/x%2F..%2F..%2Fetc/passwd")]
#[case("relative/doc.odt")]
#[tokio::test]
async fn test_other_local_files_rejected_without_filesystem(jail: TempDir, #[case] uri: &str) {
    let selector = selector(StorageSecurityConfig::default().with_wopi(true, RegexListMatcher::new()));
    assert!(matches!(
        select_kind(&selector, uri, jail.path()).await,
        Err(StorageError::BadRequest(_))
    ));
}

#[rstest]
#[tokio::test]
async fn test_filesystem_allowed_selects_local(jail: TempDir) {
    let selector = selector(StorageSecurityConfig::default().with_filesystem(true));
    assert_eq!(
        select_kind(&selector, "/home/alice/report.odt", jail.path())
            .await
            .unwrap(),
        "local"
    );
}

#[rstest]
#[tokio::test]
async fn test_local_round_trip(jail: TempDir) {
    let source_dir = TempDir::new().unwrap();
    let source = source_dir.path().join("report.odt");
    std::fs::write(&source, b"content").unwrap();

    let selector = selector(
        StorageSecurityConfig::default()
            .with_filesystem(true)
            .with_min_free_disk_percent(0.0),
    );
    let mut storage = selector
        .select(source.to_str().unwrap(), jail.path(), "/user/docs/1")
        .await
        .unwrap();
    let auth = AccessToken::None;

    let first = storage.fetch_metadata(&auth).await.unwrap();
    let second = storage.fetch_metadata(&auth).await.unwrap();
    assert!(first.user_id.starts_with("localhost"));
    assert!(second.user_name.starts_with("LocalHost#"));
    assert_ne!(first.user_id, second.user_id);

    let jailed = storage.load_to_local(&auth, None).await.unwrap();
    assert_eq!(jailed, Path::new("/user/docs/1/report.odt"));
    assert_eq!(
        std::fs::read(jail.path().join("user/docs/1/report.odt")).unwrap(),
        b"content"
    );

    assert_eq!(
        storage.save_from_local(&auth, None, None, false).await,
        SaveResult::Ok(None)
    );
}

// =========================================================================
// WOPI hosts
// =========================================================================

#[rstest]
#[case(&["wopi.example.org"], &[], "https://wopi.example.org/wopi/files/1")]
#[case(&[r".*\.example\.org"], &[], "https://docs.example.org/wopi/files/1")]
#[case(&[r".*\.example\.org"], &[r"evil\.example\.org"], "https://docs.example.org/wopi/files/1")]
#[tokio::test]
async fn test_allowed_wopi_hosts(
    jail: TempDir,
    #[case] allow: &[&str],
    #[case] deny: &[&str],
    #[case] uri: &str,
) {
    let selector = selector(wopi_config(allow, deny));
    assert_eq!(select_kind(&selector, uri, jail.path()).await.unwrap(), "wopi");
}

#[rstest]
#[case(&["wopi.example.org"], &[], "https://other.example.net/wopi/files/1")]
#[case(&[r".*\.example\.org"], &[r"evil\.example\.org"], "https://evil.example.org/wopi/files/1")]
#[case(&[r"wopi\.example\.org"], &[], "https://wopi.example.org.attacker.net/wopi/files/1")]
#[tokio::test]
async fn test_rejected_wopi_hosts(
    jail: TempDir,
    #[case] allow: &[&str],
    #[case] deny: &[&str],
    #[case] uri: &str,
) {
    let selector = selector(wopi_config(allow, deny));
    match select_kind(&selector, uri, jail.path()).await {
        Err(StorageError::Unauthorized(message)) => {
            let host = Url::parse(uri).unwrap().host_str().unwrap().to_string();
            assert!(message.contains(&host), "{}", message);
        }
        other => panic!("expected Unauthorized, got {:?}", other),
    }
}

#[rstest]
#[tokio::test]
async fn test_loopback_wopi_host_allowed_without_rules(jail: TempDir) {
    let selector = selector(wopi_config(&[], &[]));
    assert_eq!(
        select_kind(&selector, "http://127.0.0.1:9980/wopi/files/1", jail.path())
            .await
            .unwrap(),
        "wopi"
    );
}

#[rstest]
#[tokio::test]
async fn test_wopi_disabled_is_bad_request(jail: TempDir) {
    let selector = selector(StorageSecurityConfig::default().with_filesystem(true));
    assert!(matches!(
        select_kind(&selector, "https://wopi.example.org/wopi/files/1", jail.path()).await,
        Err(StorageError::BadRequest(_))
    ));
}

// =========================================================================
// Hook
// =========================================================================

struct WebDavHook;

impl StorageHook for WebDavHook {
    fn try_create_storage(
        &self,
        uri: &Url,
        jail_root: &Path,
        jail_path: &str,
    ) -> Option<Box<dyn StorageBackend>> {
        (uri.scheme() == "https").then(|| {
            Box::new(WebDavStorage::new(uri.clone(), jail_root, jail_path))
                as Box<dyn StorageBackend>
        })
    }
}

#[rstest]
#[tokio::test]
async fn test_hook_gets_first_refusal(jail: TempDir) {
    // Nothing is enabled: only the hook can produce a backend
    let selector = selector(StorageSecurityConfig::default()).with_hook(Arc::new(WebDavHook));

    assert_eq!(
        select_kind(&selector, "https://dav.example.org/doc.odt", jail.path())
            .await
            .unwrap(),
        "webdav"
    );
    assert!(matches!(
        select_kind(&selector, "http://dav.example.org/doc.odt", jail.path()).await,
        Err(StorageError::BadRequest(_))
    ));
}
