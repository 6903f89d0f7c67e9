//! Platform identification
//!
//! Download targets are keyed by an `(os, arch)` pair in Go-style naming
//! (`linux`/`amd64`), which is what release assets on GitHub use. pkgx
//! publishes its archives under `uname` names (`Linux`/`x86_64`) instead.

use crate::error::{ForgeError, ForgeResult};
use std::fmt;

/// Operating system and CPU architecture of the build host
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Detect the platform this binary was compiled for
    pub fn current() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "darwin",
            other => other,
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "x86" => "386",
            other => other,
        };
        Self::new(os, arch)
    }

    /// Operating system as reported by `uname -s`
    pub fn uname_os(&self) -> String {
        match self.os.as_str() {
            "linux" => "Linux".to_string(),
            "darwin" => "Darwin".to_string(),
            "freebsd" => "FreeBSD".to_string(),
            other => other.to_string(),
        }
    }

    /// Machine name as reported by `uname -m`
    pub fn uname_arch(&self) -> String {
        match (self.os.as_str(), self.arch.as_str()) {
            (_, "amd64") => "x86_64".to_string(),
            ("darwin", "arm64") => "arm64".to_string(),
            (_, "arm64") => "aarch64".to_string(),
            (_, "386") => "i686".to_string(),
            (_, other) => other.to_string(),
        }
    }

    /// Select the ttyd release asset for this platform
    pub fn ttyd_asset(&self) -> ForgeResult<&'static str> {
        match (self.os.as_str(), self.arch.as_str()) {
            ("linux", "amd64") => Ok("ttyd.x86_64"),
            ("linux", "arm64") => Ok("ttyd.aarch64"),
            _ => Err(ForgeError::PlatformUnsupported(self.to_string())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}
