//! 7-bit encoding of target file names for save-as and rename requests.
//!
//! WOPI hosts expect `X-WOPI-SuggestedTarget` / `X-WOPI-RequestedName` in
//! UTF-7 (RFC 2152). When encoding is impossible the request still goes out
//! with just the file extension as the suggested name.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use tracing::{error, trace};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("encoder unavailable: {0}")]
    Unavailable(String),

    #[error("cannot encode empty name")]
    Empty,
}

/// Converts a native (UTF-8) file name into the encoding sent on the wire.
pub trait TargetNameEncoder: Send + Sync {
    fn encode(&self, name: &str) -> Result<String, EncodeError>;
}

/// RFC 2152 UTF-7 encoder.
///
/// Printable ASCII other than `+`, `\` and `~` is written directly, so plain
/// ASCII names come out unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf7Encoder;

impl Utf7Encoder {
    fn is_direct(c: char) -> bool {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' => true,
            '\'' | '(' | ')' | ',' | '-' | '.' | '/' | ':' | '?' => true,
            ' ' | '\t' | '\r' | '\n' => true,
            '!' | '"' | '#' | '$' | '%' | '&' | '*' | ';' | '<' | '=' | '>' | '@' | '['
            | ']' | '^' | '_' | '`' | '{' | '|' | '}' => true,
            _ => false,
        }
    }

    fn flush(out: &mut String, pending: &mut Vec<u16>) {
        if pending.is_empty() {
            return;
        }
        let bytes: Vec<u8> = pending.iter().flat_map(|unit| unit.to_be_bytes()).collect();
        out.push('+');
        out.push_str(&STANDARD_NO_PAD.encode(bytes));
        out.push('-');
        pending.clear();
    }
}

impl TargetNameEncoder for Utf7Encoder {
    fn encode(&self, name: &str) -> Result<String, EncodeError> {
        if name.is_empty() {
            return Err(EncodeError::Empty);
        }

        let mut out = String::with_capacity(name.len());
        let mut pending: Vec<u16> = Vec::new();
        for c in name.chars() {
            if Self::is_direct(c) {
                Self::flush(&mut out, &mut pending);
                out.push(c);
            } else if c == '+' && pending.is_empty() {
                out.push_str("+-");
            } else {
                let mut units = [0u16; 2];
                pending.extend_from_slice(c.encode_utf16(&mut units));
            }
        }
        Self::flush(&mut out, &mut pending);
        Ok(out)
    }
}

/// Wire name for a save-as/rename target, falling back to `.<ext>`.
pub fn suggested_target(encoder: &dyn TargetNameEncoder, filename: &str) -> String {
    let fallback = format!(
        ".{}",
        std::path::Path::new(filename)
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default()
    );

    match encoder.encode(filename) {
        Ok(encoded) => {
            trace!("Converted target name to UTF-7 ({} bytes)", encoded.len());
            encoded
        }
        Err(e) => {
            error!("Failed to convert target name to UTF-7 ({}), using [{}]", e, fallback);
            fallback
        }
    }
}
