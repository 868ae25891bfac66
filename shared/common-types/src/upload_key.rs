use std::fmt;

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use thiserror::Error;

/// Length of the random uniqueness token in every key
pub const SUFFIX_LEN: usize = 12;
/// Longest file name kept in a key, in bytes
pub const MAX_FILE_NAME_LEN: usize = 255;
const MAX_REQUESTER_LEN: usize = 128;

/// Errors produced while deriving or parsing an upload key
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadKeyError {
    /// File name is empty, too long or has no usable characters
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    /// Requester identity has no usable characters
    #[error("Invalid requester: {0}")]
    InvalidRequester(String),

    /// Key does not live under the expected prefix
    #[error("Unexpected key prefix in {0}")]
    UnexpectedPrefix(String),

    /// Key does not have the `{prefix}/{requester}/{issued_at}-{suffix}/{file_name}` shape
    #[error("Malformed upload key: {0}")]
    Malformed(String),
}

/// Object key an upload credential is bound to.
///
/// Layout: `{prefix}/{requester}/{issued_at_unix}-{suffix}/{file_name}`. The
/// issuance time is part of the key so the processor can re-derive the
/// credential expiry from configuration alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadKey {
    prefix: String,
    requester: String,
    issued_at: DateTime<Utc>,
    suffix: String,
    file_name: String,
}

impl UploadKey {
    /// Derives a key with a fresh random suffix
    ///
    /// # Errors
    ///
    /// Returns `UploadKeyError` if the file name or requester cannot be sanitized
    pub fn generate(
        prefix: &str,
        requester: &str,
        file_name: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<Self, UploadKeyError> {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SUFFIX_LEN)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();

        Self::new(prefix, requester, file_name, issued_at, suffix)
    }

    /// Derives a key from explicit parts
    ///
    /// # Errors
    ///
    /// Returns `UploadKeyError` if the file name or requester cannot be sanitized
    /// or the suffix is not a valid uniqueness token
    pub fn new(
        prefix: &str,
        requester: &str,
        file_name: &str,
        issued_at: DateTime<Utc>,
        suffix: String,
    ) -> Result<Self, UploadKeyError> {
        if file_name.is_empty() || file_name.len() > MAX_FILE_NAME_LEN {
            return Err(UploadKeyError::InvalidFileName(file_name.to_string()));
        }
        // Clients sometimes send full paths; only the last component is kept
        let base_name = file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(file_name);
        let file_name = sanitize_segment(base_name)
            .ok_or_else(|| UploadKeyError::InvalidFileName(file_name.to_string()))?;

        let requester = sanitize_segment(requester)
            .filter(|r| r.len() <= MAX_REQUESTER_LEN)
            .ok_or_else(|| UploadKeyError::InvalidRequester(requester.to_string()))?;

        if !is_valid_suffix(&suffix) {
            return Err(UploadKeyError::Malformed(format!("invalid suffix {suffix}")));
        }

        let issued_at = DateTime::from_timestamp(issued_at.timestamp(), 0).unwrap_or(issued_at);

        Ok(Self {
            prefix: prefix.to_string(),
            requester,
            issued_at,
            suffix,
            file_name,
        })
    }

    /// Parses an object key produced by [`UploadKey::generate`]
    ///
    /// # Errors
    ///
    /// Returns `UploadKeyError::UnexpectedPrefix` when the key is outside
    /// `expected_prefix`, `UploadKeyError::Malformed` for any other shape mismatch
    pub fn parse(expected_prefix: &str, key: &str) -> Result<Self, UploadKeyError> {
        let parts: Vec<&str> = key.split('/').collect();
        let [prefix, requester, token, file_name] = parts.as_slice() else {
            return Err(UploadKeyError::Malformed(key.to_string()));
        };

        if *prefix != expected_prefix {
            return Err(UploadKeyError::UnexpectedPrefix(key.to_string()));
        }

        let malformed = || UploadKeyError::Malformed(key.to_string());

        let (issued_at, suffix) = token.split_once('-').ok_or_else(malformed)?;
        let issued_at = issued_at
            .parse::<i64>()
            .ok()
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .ok_or_else(malformed)?;

        // Anything the issuer would have rewritten was not issued by it
        if sanitize_segment(requester).as_deref() != Some(*requester)
            || sanitize_segment(file_name).as_deref() != Some(*file_name)
            || !is_valid_suffix(suffix)
        {
            return Err(malformed());
        }

        Ok(Self {
            prefix: (*prefix).to_string(),
            requester: (*requester).to_string(),
            issued_at,
            suffix: suffix.to_string(),
            file_name: (*file_name).to_string(),
        })
    }

    /// Sanitized requester identity
    #[must_use]
    pub fn requester(&self) -> &str {
        &self.requester
    }

    /// Sanitized file name
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Issuance time, truncated to seconds
    #[must_use]
    pub const fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }
}

impl fmt::Display for UploadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}-{}/{}",
            self.prefix,
            self.requester,
            self.issued_at.timestamp(),
            self.suffix,
            self.file_name
        )
    }
}

/// Replaces every character outside `[A-Za-z0-9._-]` with `_`.
///
/// Returns `None` if nothing meaningful is left (empty, only separators, or a
/// relative path component such as `..`).
fn sanitize_segment(raw: &str) -> Option<String> {
    let sanitized: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.chars().any(|c| c.is_ascii_alphanumeric()) {
        Some(sanitized)
    } else {
        None
    }
}

fn is_valid_suffix(suffix: &str) -> bool {
    suffix.len() == SUFFIX_LEN
        && suffix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn issued_at() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_key_layout() {
        let key = UploadKey::new(
            "uploads",
            "user-42",
            "receipt.pdf",
            issued_at(),
            "abcdef123456".to_string(),
        )
        .unwrap();

        assert_eq!(
            key.to_string(),
            "uploads/user-42/1700000000-abcdef123456/receipt.pdf"
        );
    }

    #[test]
    fn test_generate_produces_distinct_keys() {
        let a = UploadKey::generate("uploads", "user", "a.png", issued_at()).unwrap();
        let b = UploadKey::generate("uploads", "user", "a.png", issued_at()).unwrap();

        assert_ne!(a.to_string(), b.to_string());
        assert!(a.to_string().ends_with("/a.png"));
    }

    #[test]
    fn test_file_name_is_sanitized() {
        let key = UploadKey::generate("uploads", "user", "../../etc/pass wd.png", issued_at())
            .unwrap();
        assert_eq!(key.file_name(), "pass_wd.png");

        let key = UploadKey::generate("uploads", "user", "C:\\docs\\my receipt.pdf", issued_at())
            .unwrap();
        assert_eq!(key.file_name(), "my_receipt.pdf");
    }

    #[test]
    fn test_invalid_file_names() {
        for name in ["", "..", "/", "???", &"a".repeat(MAX_FILE_NAME_LEN + 1)] {
            assert!(
                matches!(
                    UploadKey::generate("uploads", "user", name, issued_at()),
                    Err(UploadKeyError::InvalidFileName(_))
                ),
                "expected {name:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_invalid_requester() {
        assert!(matches!(
            UploadKey::generate("uploads", "   ", "a.png", issued_at()),
            Err(UploadKeyError::InvalidRequester(_))
        ));
    }

    #[test]
    fn test_parse_generated_key() {
        let key = UploadKey::generate("uploads", "user@example.com", "photo.jpg", issued_at())
            .unwrap();
        let parsed = UploadKey::parse("uploads", &key.to_string()).unwrap();

        assert_eq!(parsed, key);
        assert_eq!(parsed.requester(), "user_example.com");
        assert_eq!(parsed.issued_at(), issued_at());
    }

    #[test]
    fn test_parse_rejects_foreign_keys() {
        assert!(matches!(
            UploadKey::parse("uploads", "other/user/1700000000-abcdef123456/a.png"),
            Err(UploadKeyError::UnexpectedPrefix(_))
        ));

        for key in [
            "uploads/a.png",
            "uploads/user/a.png",
            "uploads/user/1700000000/a.png",
            "uploads/user/nope-abcdef123456/a.png",
            "uploads/user/1700000000-short/a.png",
            "uploads/user/1700000000-ABCDEF123456/a.png",
            "uploads/user/1700000000-abcdef123456/dir/a.png",
            "uploads/us er/1700000000-abcdef123456/a.png",
        ] {
            assert!(
                matches!(
                    UploadKey::parse("uploads", key),
                    Err(UploadKeyError::Malformed(_))
                ),
                "expected {key} to be malformed"
            );
        }
    }
}
