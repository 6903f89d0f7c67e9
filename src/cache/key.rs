//! Composite cache keys for expensive build steps
//!
//! The key covers exactly the inputs that change the compiled output: the
//! builder tool version and the plugin set. Plugins are sorted first so the
//! order they are declared in never changes the key.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Hex-encoded SHA-256 over the build inputs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Plugins in the canonical order used for keys, metadata and SBOMs
pub fn sorted_plugins(plugins: &[String]) -> Vec<String> {
    let mut sorted = plugins.to_vec();
    sorted.sort();
    sorted
}

/// Derive the cache key for a tool version and plugin set
pub fn derive_key(tool_version: &str, plugins: &[String]) -> CacheKey {
    let sorted = sorted_plugins(plugins);

    let mut hasher = Sha256::new();
    hasher.update(tool_version.as_bytes());
    hasher.update(b":");
    hasher.update(sorted.join(",").as_bytes());

    CacheKey(hex::encode(hasher.finalize()))
}
