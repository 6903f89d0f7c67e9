//! Layer handles
//!
//! A `LayerHandle` is the only way installers touch a layer: its directory,
//! its metadata file and its launch environment. Nothing relies on ambient
//! global paths.

use crate::error::{ForgeError, ForgeResult};
use crate::layer::metadata::{LayerRecord, LayerTypes};
use crate::util::create_dir_0755;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One layer directory plus its persisted metadata
#[derive(Debug, Clone)]
pub struct LayerHandle {
    name: String,
    path: PathBuf,
    metadata_path: PathBuf,
    /// Exposure flags written alongside the metadata
    pub types: LayerTypes,
}

impl LayerHandle {
    /// Open the layer `name` under `layers_dir` without modifying anything
    pub fn open(layers_dir: &Path, name: &str) -> ForgeResult<Self> {
        validate_layer_name(name)?;

        Ok(Self {
            name: name.to_string(),
            path: layers_dir.join(name),
            metadata_path: layers_dir.join(format!("{}.toml", name)),
            types: LayerTypes::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.path.join("bin")
    }

    pub fn config_dir(&self) -> PathBuf {
        self.path.join("config")
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    /// Whether a previous build left a metadata file for this layer
    pub fn has_metadata(&self) -> bool {
        self.metadata_path.is_file()
    }

    /// Discard all layer content and metadata, then recreate the empty directory
    pub fn reset(&mut self) -> ForgeResult<()> {
        debug!("Resetting layer {} at {}", self.name, self.path.display());

        if fs::symlink_metadata(&self.path).is_ok() {
            fs::remove_dir_all(&self.path).map_err(|e| {
                ForgeError::io(format!("removing layer {}", self.path.display()), e)
            })?;
        }
        if self.metadata_path.exists() {
            fs::remove_file(&self.metadata_path).map_err(|e| {
                ForgeError::io(format!("removing {}", self.metadata_path.display()), e)
            })?;
        }

        fs::create_dir_all(&self.path)
            .map_err(|e| ForgeError::io(format!("creating layer {}", self.path.display()), e))?;
        self.types = LayerTypes::default();
        Ok(())
    }

    /// Create a directory inside the layer (mode 0755) and return its path
    pub fn ensure_dir(&self, relative: &str) -> ForgeResult<PathBuf> {
        let dir = self.path.join(relative);
        create_dir_0755(&dir)
            .map_err(|e| ForgeError::io(format!("creating directory {}", dir.display()), e))?;
        Ok(dir)
    }

    /// Read the typed metadata of a previous build.
    ///
    /// Returns `None` when the file is absent or does not match `M`; stale
    /// or foreign metadata is treated as no metadata at all.
    pub fn read_metadata<M: DeserializeOwned>(&self) -> Option<M> {
        let content = fs::read_to_string(&self.metadata_path).ok()?;
        match toml::from_str::<LayerRecord<M>>(&content) {
            Ok(record) => Some(record.metadata),
            Err(e) => {
                warn!(
                    "Ignoring unreadable metadata {}: {}",
                    self.metadata_path.display(),
                    e
                );
                None
            }
        }
    }

    /// Read the metadata file untyped, for inventory output
    pub fn read_raw(&self) -> ForgeResult<toml::Table> {
        let content = fs::read_to_string(&self.metadata_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ForgeError::LayerNotFound {
                    name: self.name.clone(),
                    path: self.metadata_path.clone(),
                }
            } else {
                ForgeError::io(format!("reading {}", self.metadata_path.display()), e)
            }
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Persist `metadata` together with the current layer types
    pub fn write_metadata<M: Serialize>(&self, metadata: &M) -> ForgeResult<()> {
        let record = LayerRecord {
            types: self.types,
            metadata,
        };
        let content = toml::to_string_pretty(&record)?;

        if let Some(parent) = self.metadata_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ForgeError::io(format!("creating {}", parent.display()), e))?;
        }
        fs::write(&self.metadata_path, content).map_err(|e| {
            ForgeError::io(format!("writing {}", self.metadata_path.display()), e)
        })?;

        debug!("Wrote metadata for layer {}", self.name);
        Ok(())
    }

    /// Set a launch-time environment default (`env.launch/<NAME>.default`)
    pub fn launch_env_default(&self, name: &str, value: &str) -> ForgeResult<()> {
        let env_dir = self.ensure_dir("env.launch")?;
        let path = env_dir.join(format!("{}.default", name));
        fs::write(&path, value)
            .map_err(|e| ForgeError::io(format!("writing {}", path.display()), e))
    }
}

/// Validate that a layer name is safe (no path traversal, no special characters).
fn validate_layer_name(name: &str) -> ForgeResult<()> {
    if name.is_empty() {
        return Err(ForgeError::User("Layer name cannot be empty".to_string()));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ForgeError::User(format!(
            "Invalid layer name '{}': must contain only alphanumeric characters, hyphens, or underscores",
            name
        )));
    }
    Ok(())
}
