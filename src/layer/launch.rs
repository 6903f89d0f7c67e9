//! Launch process declarations
//!
//! Installers that start something at container launch declare it here.
//! The declarations are written once per build to `<layers>/launch.toml`.

use crate::error::{ForgeError, ForgeResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A process executed directly, without a shell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectProcess {
    #[serde(rename = "type")]
    pub process_type: String,
    pub command: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub default: bool,
    #[serde(default = "default_direct")]
    pub direct: bool,
}

fn default_direct() -> bool {
    true
}

impl DirectProcess {
    pub fn new(process_type: impl Into<String>, command: Vec<String>, args: Vec<String>) -> Self {
        Self {
            process_type: process_type.into(),
            command,
            args,
            default: false,
            direct: true,
        }
    }

    /// Mark this process as the image's default entrypoint
    pub fn as_default(mut self) -> Self {
        self.default = true;
        self
    }
}

/// Contents of `launch.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchMetadata {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub processes: Vec<DirectProcess>,
}

impl LaunchMetadata {
    pub fn path(layers_dir: &Path) -> PathBuf {
        layers_dir.join("launch.toml")
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn write(&self, layers_dir: &Path) -> ForgeResult<()> {
        let path = Self::path(layers_dir);
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)
            .map_err(|e| ForgeError::io(format!("writing {}", path.display()), e))?;
        debug!("Declared {} launch process(es)", self.processes.len());
        Ok(())
    }

    pub fn load(layers_dir: &Path) -> ForgeResult<Self> {
        let path = Self::path(layers_dir);
        let content = fs::read_to_string(&path)
            .map_err(|e| ForgeError::io(format!("reading {}", path.display()), e))?;
        Ok(toml::from_str(&content)?)
    }
}
