//! Canonical cache keys.
//!
//! A key is the operation name, the literal separator `::`, then the
//! parameters as `key=value` pairs sorted by key and joined with `&`.
//! Parameter order at the call site never changes the key.

use std::collections::BTreeMap;
use std::fmt;

use orgcache_core::ValidationError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Separator between the operation name and its parameters.
pub const SEPARATOR: &str = "::";

/// Longest key LMDB accepts with its default build settings.
pub const MAX_STORAGE_KEY_LEN: usize = 511;

/// Marker that introduces a hashed parameter section.
const HASH_MARKER: char = '#';

/// A canonical cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    operation: String,
    canonical: String,
}

impl CacheKey {
    /// Build a key from an operation name and its parameters.
    ///
    /// # Errors
    ///
    /// Fails when the operation name is empty or contains the separator,
    /// since either would make keys ambiguous.
    pub fn new(
        operation: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<Self, ValidationError> {
        Self::validate_operation(operation)?;
        let joined = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        Ok(Self {
            operation: operation.to_string(),
            canonical: format!("{}{}{}", operation, SEPARATOR, joined),
        })
    }

    /// Build a key from unordered pairs. Later duplicates win.
    pub fn from_pairs<I, K, V>(operation: &str, pairs: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let params: BTreeMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::new(operation, &params)
    }

    pub fn validate_operation(operation: &str) -> Result<(), ValidationError> {
        if operation.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "operation_name".to_string(),
            });
        }
        if operation.contains(SEPARATOR) {
            return Err(ValidationError::InvalidValue {
                field: "operation_name".to_string(),
                reason: format!("must not contain '{}'", SEPARATOR),
            });
        }
        Ok(())
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// The full canonical text.
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// The key as stored by byte-limited backends.
    ///
    /// Keys within [`MAX_STORAGE_KEY_LEN`] are stored verbatim. Longer keys
    /// keep the operation prefix and replace the parameters with a SHA-256
    /// digest of the full canonical text, so prefix purges still find them.
    pub fn storage_key(&self) -> String {
        if self.canonical.len() <= MAX_STORAGE_KEY_LEN {
            return self.canonical.clone();
        }
        let digest = Sha256::digest(self.canonical.as_bytes());
        format!(
            "{}{}{}{}",
            self.operation,
            SEPARATOR,
            HASH_MARKER,
            hex::encode(digest)
        )
    }

    /// Prefix shared by every key of one operation.
    pub fn operation_prefix(operation: &str) -> String {
        format!("{}{}", operation, SEPARATOR)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}
