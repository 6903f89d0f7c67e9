//! CLI command implementations

pub mod build;
pub mod detect;
pub mod inspect;
pub mod key;

pub use build::execute as build;
pub use detect::execute as detect;
pub use inspect::execute as inspect;
pub use key::execute as key;

use crate::error::{ForgeError, ForgeResult};
use std::path::{Path, PathBuf};

/// Use `path` if given, else the process working directory
fn dir_or_cwd(path: Option<PathBuf>) -> ForgeResult<PathBuf> {
    match path {
        Some(path) => Ok(path),
        None => {
            std::env::current_dir().map_err(|e| ForgeError::io("getting current directory", e))
        }
    }
}

/// Absolute form of `path`, resolved against the working directory
fn absolute_dir(path: &Path) -> ForgeResult<PathBuf> {
    std::path::absolute(path)
        .map_err(|e| ForgeError::io(format!("resolving {}", path.display()), e))
}
