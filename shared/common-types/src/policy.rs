use std::collections::BTreeSet;
use std::env;

use chrono::TimeDelta;

use crate::content_type::{normalize_content_type, DEFAULT_ALLOWED_CONTENT_TYPES};

/// Default key prefix for uploaded objects
pub const DEFAULT_KEY_PREFIX: &str = "uploads";
/// Default maximum upload size - 15 MiB
pub const DEFAULT_MAX_UPLOAD_SIZE_BYTES: u64 = 15 * 1024 * 1024;
/// Default credential lifetime - 5 minutes
pub const DEFAULT_CREDENTIAL_EXPIRY_SECS: u64 = 5 * 60;
/// Credentials are short-lived by construction
pub const MAX_CREDENTIAL_EXPIRY_SECS: u64 = 60 * 60;

/// Upload settings shared between the credential issuer and the processor.
///
/// Both sides must agree on these values: the processor re-derives the
/// credential constraints from them instead of trusting object metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    /// First path segment of every upload key
    pub key_prefix: String,
    /// Normalized content types accepted for upload
    pub allowed_content_types: BTreeSet<String>,
    /// Largest object accepted, in bytes
    pub max_upload_size_bytes: u64,
    /// Lifetime of an upload credential in seconds
    pub credential_expiry_secs: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            allowed_content_types: DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(ToString::to_string)
                .collect(),
            max_upload_size_bytes: DEFAULT_MAX_UPLOAD_SIZE_BYTES,
            credential_expiry_secs: DEFAULT_CREDENTIAL_EXPIRY_SECS,
        }
    }
}

impl UploadPolicy {
    /// Builds the policy from environment variables, falling back to defaults
    ///
    /// Reads `UPLOAD_KEY_PREFIX`, `ALLOWED_CONTENT_TYPES` (comma separated),
    /// `MAX_UPLOAD_SIZE_BYTES` and `CREDENTIAL_EXPIRY_SECS`.
    ///
    /// # Panics
    ///
    /// Panics if a variable is set but invalid, or if the credential expiry
    /// exceeds one hour
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let key_prefix = env::var("UPLOAD_KEY_PREFIX")
            .map(|p| p.trim().trim_matches('/').to_string())
            .unwrap_or(defaults.key_prefix);
        assert!(
            !key_prefix.is_empty() && !key_prefix.contains('/'),
            "UPLOAD_KEY_PREFIX must be a single non-empty path segment"
        );

        let allowed_content_types = env::var("ALLOWED_CONTENT_TYPES").map_or(
            defaults.allowed_content_types,
            |raw| {
                raw.split(',')
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| {
                        normalize_content_type(v).unwrap_or_else(|| {
                            panic!("Invalid content type in ALLOWED_CONTENT_TYPES: {v}")
                        })
                    })
                    .collect()
            },
        );

        let max_upload_size_bytes = parse_var("MAX_UPLOAD_SIZE_BYTES")
            .unwrap_or(defaults.max_upload_size_bytes);

        let credential_expiry_secs = parse_var("CREDENTIAL_EXPIRY_SECS")
            .unwrap_or(defaults.credential_expiry_secs);
        assert!(
            (1..=MAX_CREDENTIAL_EXPIRY_SECS).contains(&credential_expiry_secs),
            "CREDENTIAL_EXPIRY_SECS must be between 1 and {MAX_CREDENTIAL_EXPIRY_SECS}"
        );

        Self {
            key_prefix,
            allowed_content_types,
            max_upload_size_bytes,
            credential_expiry_secs,
        }
    }

    /// Whether the normalized content type is on the allow-list
    #[must_use]
    pub fn allows_content_type(&self, content_type: &str) -> bool {
        self.allowed_content_types.contains(content_type)
    }

    /// Credential lifetime as a time delta
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn credential_expiry(&self) -> TimeDelta {
        TimeDelta::seconds(self.credential_expiry_secs as i64)
    }
}

fn parse_var(name: &str) -> Option<u64> {
    env::var(name).ok().map(|raw| {
        raw.trim()
            .parse::<u64>()
            .unwrap_or_else(|_| panic!("Invalid value for {name}: {raw}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        env::remove_var("UPLOAD_KEY_PREFIX");
        env::remove_var("ALLOWED_CONTENT_TYPES");
        env::remove_var("MAX_UPLOAD_SIZE_BYTES");
        env::remove_var("CREDENTIAL_EXPIRY_SECS");
    }

    #[test]
    #[serial]
    fn test_policy_defaults() {
        clear_env();
        let policy = UploadPolicy::from_env();

        assert_eq!(policy, UploadPolicy::default());
        assert_eq!(policy.credential_expiry(), TimeDelta::minutes(5));
        assert!(policy.allows_content_type("application/pdf"));
        assert!(!policy.allows_content_type("text/html"));
    }

    #[test]
    #[serial]
    fn test_policy_overrides() {
        clear_env();
        env::set_var("UPLOAD_KEY_PREFIX", "/incoming/");
        env::set_var("ALLOWED_CONTENT_TYPES", "image/PNG, image/webp,");
        env::set_var("MAX_UPLOAD_SIZE_BYTES", "1024");
        env::set_var("CREDENTIAL_EXPIRY_SECS", "60");

        let policy = UploadPolicy::from_env();
        assert_eq!(policy.key_prefix, "incoming");
        assert_eq!(
            policy.allowed_content_types,
            BTreeSet::from(["image/png".to_string(), "image/webp".to_string()])
        );
        assert_eq!(policy.max_upload_size_bytes, 1024);
        assert_eq!(policy.credential_expiry_secs, 60);

        clear_env();
    }

    #[test]
    #[serial]
    #[should_panic(expected = "CREDENTIAL_EXPIRY_SECS must be between 1 and 3600")]
    fn test_policy_rejects_long_expiry() {
        clear_env();
        env::set_var("CREDENTIAL_EXPIRY_SECS", "7200");
        let result = std::panic::catch_unwind(UploadPolicy::from_env);
        clear_env();
        if let Err(panic) = result {
            std::panic::resume_unwind(panic);
        }
    }
}
