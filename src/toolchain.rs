//! External toolchain that compiles custom binaries
//!
//! The toolchain is treated as a black box with a narrow contract: given a
//! builder tool, an output path and a plugin list, either an executable
//! appears at the output path or the build fails with the toolchain's own
//! diagnostics.

use crate::error::BuildError;
use crate::util::set_mode;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tracing::{debug, info};

/// Compiles a binary from a builder tool plus a plugin set
pub trait Toolchain: Send + Sync {
    /// Run `tool` to produce an executable at `output` containing `plugins`
    fn build(&self, tool: &Path, output: &Path, plugins: &[String]) -> Result<(), BuildError>;

    /// Ask a produced binary for its version string
    fn self_reported_version(&self, binary: &Path) -> Result<String, BuildError>;
}

/// xcaddy run through a runner that provides Go (`pkgx +go` by default)
pub struct XcaddyToolchain {
    runner: String,
    runner_args: Vec<String>,
}

impl XcaddyToolchain {
    pub fn new(runner: impl Into<String>, runner_args: Vec<String>) -> Self {
        Self {
            runner: runner.into(),
            runner_args,
        }
    }

    /// Full argument vector passed to the runner
    fn build_args(&self, tool: &Path, output: &Path, plugins: &[String]) -> Vec<String> {
        let mut args = self.runner_args.clone();
        args.push(tool.display().to_string());
        args.push("build".to_string());
        args.push("--output".to_string());
        args.push(output.display().to_string());
        for plugin in plugins {
            args.push("--with".to_string());
            args.push(plugin.clone());
        }
        args
    }
}

impl Default for XcaddyToolchain {
    fn default() -> Self {
        Self::new("pkgx", vec!["+go".to_string()])
    }
}

impl Toolchain for XcaddyToolchain {
    fn build(&self, tool: &Path, output: &Path, plugins: &[String]) -> Result<(), BuildError> {
        // The command runs inside the output directory.
        let tool = absolute(tool)?;
        let output = &absolute(output)?;
        let args = self.build_args(&tool, output, plugins);
        let command = format!("{} {}", self.runner, args.join(" "));
        info!("Compiling {} with {} plugin(s)", output.display(), plugins.len());
        debug!("Executing: {}", command);

        let mut cmd = Command::new(&self.runner);
        cmd.args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = output.parent() {
            cmd.current_dir(dir);
        }

        let result = cmd.output().map_err(|e| BuildError::Spawn {
            command: command.clone(),
            source: e,
        })?;

        if !result.status.success() {
            return Err(BuildError::ToolchainFailed {
                command,
                status: result.status.to_string(),
                output: combined_output(&result),
            });
        }

        if !output.is_file() {
            return Err(BuildError::OutputMissing(output.to_path_buf()));
        }

        set_mode(output, 0o755).map_err(|e| BuildError::Filesystem {
            context: format!("making {} executable", output.display()),
            source: e,
        })
    }

    fn self_reported_version(&self, binary: &Path) -> Result<String, BuildError> {
        let result = Command::new(binary)
            .arg("version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| BuildError::Spawn {
                command: format!("{} version", binary.display()),
                source: e,
            })?;

        let output = combined_output(&result);
        if !result.status.success() {
            return Err(BuildError::VersionQuery {
                binary: binary.to_path_buf(),
                output,
            });
        }
        Ok(output)
    }
}

fn absolute(path: &Path) -> Result<PathBuf, BuildError> {
    std::path::absolute(path).map_err(|e| BuildError::Filesystem {
        context: format!("resolving {}", path.display()),
        source: e,
    })
}

/// stdout followed by stderr, trimmed
fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text.trim().to_string()
}
