//! Anonymization of personally identifying strings.
//!
//! When enabled, file names, user names and ids are replaced by opaque tokens
//! before they reach a log line. Tokens are stable for the process lifetime:
//! the first token computed (or explicitly mapped) for a string is reused.

use dashmap::DashMap;
use sha2::{Digest, Sha256};

/// Maps identifying strings to opaque tokens.
#[derive(Debug, Default)]
pub struct Anonymizer {
    enabled: bool,
    salt: u64,
    mappings: DashMap<String, String>,
}

impl Anonymizer {
    pub fn new(enabled: bool, salt: u64) -> Self {
        Self {
            enabled,
            salt,
            mappings: DashMap::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(false, 0)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record that `plain` must be logged as `anonymized` from now on.
    pub fn map_anonymized(&self, plain: &str, anonymized: &str) {
        if !self.enabled || plain.is_empty() || anonymized.is_empty() {
            return;
        }
        self.mappings
            .insert(plain.to_string(), anonymized.to_string());
    }

    /// Anonymize a free-standing string; identity when disabled.
    pub fn anonymize(&self, text: &str) -> String {
        if !self.enabled || text.is_empty() {
            return text.to_string();
        }
        self.mappings
            .entry(text.to_string())
            .or_insert_with(|| self.token(text))
            .value()
            .clone()
    }

    pub fn anonymize_username(&self, username: &str) -> String {
        self.anonymize(username)
    }

    /// Anonymize only the file-name stem of a URL or path, keeping the
    /// directory, extension and query intact.
    pub fn anonymize_url(&self, url: &str) -> String {
        if !self.enabled {
            return url.to_string();
        }
        let parts = UrlParts::split(url);
        format!(
            "{}{}{}{}",
            parts.base,
            self.anonymize(parts.stem),
            parts.ext,
            parts.params
        )
    }

    /// File-name stem of a URL or path (no directory, extension or query).
    pub fn filename_from_url(url: &str) -> String {
        UrlParts::split(url).stem.to_string()
    }

    fn token(&self, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.to_le_bytes());
        hasher.update(text.as_bytes());
        let digest = hasher.finalize();
        format!("#{}#", hex::encode(&digest[..8]))
    }
}

struct UrlParts<'a> {
    base: &'a str,
    stem: &'a str,
    ext: &'a str,
    params: &'a str,
}

impl<'a> UrlParts<'a> {
    fn split(url: &'a str) -> Self {
        let (path, params) = match url.find('?') {
            Some(idx) => url.split_at(idx),
            None => (url, ""),
        };
        let (base, name) = match path.rfind('/') {
            Some(idx) => path.split_at(idx + 1),
            None => ("", path),
        };
        let (stem, ext) = match name.rfind('.') {
            Some(idx) if idx > 0 => name.split_at(idx),
            _ => (name, ""),
        };
        Self {
            base,
            stem,
            ext,
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_is_identity() {
        let anonymizer = Anonymizer::disabled();
        assert_eq!(anonymizer.anonymize("alice"), "alice");
        assert_eq!(
            anonymizer.anonymize_url("/tmp/doc/report.odt"),
            "/tmp/doc/report.odt"
        );
    }

    #[test]
    fn test_tokens_are_stable_and_opaque() {
        let anonymizer = Anonymizer::new(true, 42);
        let first = anonymizer.anonymize("alice");
        assert_ne!(first, "alice");
        assert!(!first.contains("alice"));
        assert_eq!(anonymizer.anonymize("alice"), first);
        assert_ne!(anonymizer.anonymize("bob"), first);
    }

    #[test]
    fn test_salt_changes_tokens() {
        let a = Anonymizer::new(true, 1).anonymize("alice");
        let b = Anonymizer::new(true, 2).anonymize("alice");
        assert_ne!(a, b);
    }

    #[test]
    fn test_explicit_mapping_wins() {
        let anonymizer = Anonymizer::new(true, 42);
        anonymizer.map_anonymized("alice", "user-7f3a");
        assert_eq!(anonymizer.anonymize_username("alice"), "user-7f3a");
    }

    #[test]
    fn test_anonymize_url_keeps_structure() {
        let anonymizer = Anonymizer::new(true, 42);
        anonymizer.map_anonymized("Quarterly Report", "file-17");
        assert_eq!(
            anonymizer.anonymize_url("/jail/user/doc/Quarterly Report.odt"),
            "/jail/user/doc/file-17.odt"
        );
        assert_eq!(
            anonymizer.anonymize_url("https://host/wopi/files/Quarterly Report?access_token=x"),
            "https://host/wopi/files/file-17?access_token=x"
        );
    }

    #[test]
    fn test_filename_from_url() {
        assert_eq!(Anonymizer::filename_from_url("https://h/wopi/files/123?a=b"), "123");
        assert_eq!(Anonymizer::filename_from_url("a.odt"), "a");
        assert_eq!(Anonymizer::filename_from_url(".hidden"), ".hidden");
    }
}
