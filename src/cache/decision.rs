//! Cache hit/miss decisions
//!
//! Persisted metadata is untrusted: it only says what a previous build
//! claimed to produce. A hit also requires the binary to still be on disk.

use crate::cache::key::{derive_key, CacheKey};
use crate::layer::BuildMetadata;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Inputs of the current build that decide whether a previous result is reusable
#[derive(Debug, Clone)]
pub struct CacheInputs {
    pub key: CacheKey,
    pub buildpack_version: String,
}

impl CacheInputs {
    pub fn new(tool_version: &str, plugins: &[String], buildpack_version: &str) -> Self {
        Self {
            key: derive_key(tool_version, plugins),
            buildpack_version: buildpack_version.to_string(),
        }
    }
}

/// Why a previous build cannot be reused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissReason {
    /// No metadata, or metadata that does not parse
    NoMetadata,
    /// The buildpack itself was upgraded since the last build
    BuildpackChanged { previous: String, current: String },
    /// Tool version or plugin set differ
    InputsChanged,
    /// Metadata claims success but the binary is gone
    BinaryMissing(PathBuf),
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMetadata => write!(f, "no previous build metadata"),
            Self::BuildpackChanged { previous, current } => {
                write!(f, "buildpack changed from {} to {}", previous, current)
            }
            Self::InputsChanged => write!(f, "build inputs changed"),
            Self::BinaryMissing(path) => write!(f, "binary missing at {}", path.display()),
        }
    }
}

/// Outcome of a cache check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheDecision {
    Hit,
    Miss(MissReason),
}

impl CacheDecision {
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit)
    }
}

/// Decide whether the build recorded in `stored` can be reused
pub fn decide(
    inputs: &CacheInputs,
    stored: Option<&BuildMetadata>,
    binary: &Path,
) -> CacheDecision {
    let Some(stored) = stored else {
        return CacheDecision::Miss(MissReason::NoMetadata);
    };

    if stored.buildpack_version != inputs.buildpack_version {
        return CacheDecision::Miss(MissReason::BuildpackChanged {
            previous: stored.buildpack_version.clone(),
            current: inputs.buildpack_version.clone(),
        });
    }

    if inputs.key.as_str() != stored.build_hash {
        return CacheDecision::Miss(MissReason::InputsChanged);
    }

    if !is_present_file(binary) {
        return CacheDecision::Miss(MissReason::BinaryMissing(binary.to_path_buf()));
    }

    CacheDecision::Hit
}

fn is_present_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| !m.is_dir()).unwrap_or(false)
}
