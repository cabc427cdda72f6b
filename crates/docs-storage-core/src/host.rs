use regex::Regex;
use tracing::warn;

use crate::error::StorageError;

/// Decides whether a host name is an acceptable storage host.
pub trait HostMatcher: Send + Sync {
    fn matches(&self, host: &str) -> bool;
}

/// Allow/deny list of host patterns.
///
/// Each entry matches either literally or as a regex anchored to the whole
/// host name. Deny entries take precedence over allow entries, and a host
/// matching neither list is rejected.
#[derive(Debug, Clone, Default)]
pub struct RegexListMatcher {
    allow: Vec<Entry>,
    deny: Vec<Entry>,
}

#[derive(Debug, Clone)]
struct Entry {
    literal: String,
    regex: Option<Regex>,
}

impl Entry {
    fn new(pattern: &str) -> Self {
        // Entries that don't compile still match literally.
        let regex = match Regex::new(&format!("^(?:{})$", pattern)) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("Host pattern [{}] is not a valid regex, matching literally: {}", pattern, e);
                None
            }
        };
        Self {
            literal: pattern.to_string(),
            regex,
        }
    }

    fn matches(&self, host: &str) -> bool {
        self.literal == host || self.regex.as_ref().is_some_and(|re| re.is_match(host))
    }
}

impl RegexListMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(&mut self, pattern: &str) -> &mut Self {
        self.allow.push(Entry::new(pattern));
        self
    }

    pub fn deny(&mut self, pattern: &str) -> &mut Self {
        self.deny.push(Entry::new(pattern));
        self
    }

    /// Strict variant of [`allow`](Self::allow) for configuration input.
    pub fn try_allow(&mut self, pattern: &str) -> Result<&mut Self, StorageError> {
        Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
            StorageError::Config(format!("Invalid WOPI host pattern [{}]: {}", pattern, e))
        })?;
        Ok(self.allow(pattern))
    }

    /// Strict variant of [`deny`](Self::deny) for configuration input.
    pub fn try_deny(&mut self, pattern: &str) -> Result<&mut Self, StorageError> {
        Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
            StorageError::Config(format!("Invalid WOPI host pattern [{}]: {}", pattern, e))
        })?;
        Ok(self.deny(pattern))
    }

    pub fn clear(&mut self) {
        self.allow.clear();
        self.deny.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.allow.is_empty() && self.deny.is_empty()
    }
}

impl HostMatcher for RegexListMatcher {
    fn matches(&self, host: &str) -> bool {
        if self.deny.iter().any(|e| e.matches(host)) {
            return false;
        }
        self.allow.iter().any(|e| e.matches(host))
    }
}
