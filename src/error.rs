//! Error types for layerforge
//!
//! All modules use `ForgeResult<T>` as their return type. The acquisition
//! stages (fetch, extract, toolchain build) carry their own error enums so
//! their contracts stay narrow; they convert into `ForgeError` at the
//! installer boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for layerforge operations
pub type ForgeResult<T> = Result<T, ForgeError>;

/// Failures while downloading an archive or binary
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{url} returned status {status}")]
    BadStatus { url: String, status: u16 },

    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("failed to read response body from {url}: {source}")]
    BodyReadFailure {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while unpacking an untrusted tar+gzip archive
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("corrupt gzip stream: {0}")]
    CorruptCompression(#[source] std::io::Error),

    #[error("corrupt tar header: {0}")]
    CorruptTarHeader(#[source] std::io::Error),

    #[error("archive entry escapes destination: {entry} (root {root})")]
    PathEscape { entry: PathBuf, root: PathBuf },

    #[error("unsupported tar entry {path} of type {kind}")]
    UnsupportedEntryType { path: PathBuf, kind: String },

    #[error("{context}: {source}")]
    Filesystem {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ArchiveError {
    pub(crate) fn fs(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Filesystem {
            context: context.into(),
            source,
        }
    }
}

/// Failures of the external toolchain that compiles custom binaries
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("{command} exited with {status}:\n{output}")]
    ToolchainFailed {
        command: String,
        status: String,
        output: String,
    },

    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("toolchain reported success but produced no binary at {0}")]
    OutputMissing(PathBuf),

    #[error("version query for {binary} failed: {output}")]
    VersionQuery { binary: PathBuf, output: String },

    #[error("{context}: {source}")]
    Filesystem {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// All errors that can occur in layerforge
#[derive(Error, Debug)]
pub enum ForgeError {
    // Platform errors
    #[error("Unsupported platform: {0}. No download asset is published for it.")]
    PlatformUnsupported(String),

    // Acquisition errors
    #[error("Download failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Archive extraction failed: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Toolchain build failed: {0}")]
    Build(#[from] BuildError),

    // Layer errors
    #[error("Layer not found: {name} (looked in {path})")]
    LayerNotFound { name: String, path: PathBuf },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("{0}")]
    User(String),
}

impl ForgeError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Name of the pipeline stage that failed, for the terminal message
    pub fn stage(&self) -> &'static str {
        match self {
            Self::PlatformUnsupported(_) => "platform",
            Self::Fetch(_) => "fetch",
            Self::Archive(_) => "extract",
            Self::Build(_) => "build",
            Self::LayerNotFound { .. } => "layer",
            Self::ConfigInvalid { .. } => "config",
            Self::Io { .. } => "filesystem",
            Self::Json(_) | Self::Yaml(_) | Self::TomlParse(_) | Self::TomlSerialize(_) => {
                "serialization"
            }
            Self::User(_) => "input",
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::PlatformUnsupported(_) => Some("Supported platforms: linux/amd64, linux/arm64"),
            Self::Archive(ArchiveError::PathEscape { .. }) => {
                Some("The archive is malicious or malformed; do not retry with the same source")
            }
            Self::Build(BuildError::Spawn { .. }) => {
                Some("Make sure the toolchain runner (default: pkgx) is on PATH")
            }
            Self::LayerNotFound { .. } => Some("Run: layerforge build <installer> first"),
            _ => None,
        }
    }
}
