//! API key selection.
//!
//! A single key passed directly is used for every request. A pool loaded from
//! the config file is walked round-robin through an atomic cursor, so workers
//! never lock each other out to pick a key.

use crate::error::ReverseWhoisError;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Supplies one API key per request.
///
/// Built only through [`KeyRotator::fixed`] or [`KeyRotator::rotating`], so a
/// rotating pool is never empty.
#[derive(Debug)]
pub struct KeyRotator {
    source: KeySource,
}

#[derive(Debug)]
enum KeySource {
    /// The same key on every call
    Static(String),

    /// Round-robin over an immutable pool
    Rotating { keys: Vec<String>, cursor: AtomicUsize },
}

impl KeyRotator {
    /// Use one fixed key for the whole run.
    pub fn fixed<K: Into<String>>(key: K) -> Self {
        Self {
            source: KeySource::Static(key.into()),
        }
    }

    /// Rotate over a pool of keys. Empty entries are dropped.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if no non-empty key remains.
    pub fn rotating(keys: Vec<String>) -> Result<Self, ReverseWhoisError> {
        let keys: Vec<String> = keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        if keys.is_empty() {
            return Err(ReverseWhoisError::config(
                "No API key configured. Provide --api-key or add at least one key to .reverse-whois.toml (api_keys).",
            ));
        }

        Ok(Self {
            source: KeySource::Rotating {
                keys,
                cursor: AtomicUsize::new(0),
            },
        })
    }

    /// Next key to use. Each call advances the cursor exactly once.
    pub fn next(&self) -> &str {
        match &self.source {
            KeySource::Static(key) => key,
            KeySource::Rotating { keys, cursor } => {
                let n = cursor.fetch_add(1, Ordering::Relaxed);
                &keys[n % keys.len()]
            }
        }
    }

    /// Number of distinct keys in play.
    pub fn pool_size(&self) -> usize {
        match &self.source {
            KeySource::Static(_) => 1,
            KeySource::Rotating { keys, .. } => keys.len(),
        }
    }

    /// True when every call returns the same key.
    pub fn is_fixed(&self) -> bool {
        matches!(self.source, KeySource::Static(_))
    }
}
