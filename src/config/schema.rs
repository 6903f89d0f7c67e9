//! Configuration schema for layerforge
//!
//! Configuration is stored at `~/.config/layerforge/config.toml`. Every
//! section is optional; omitted values fall back to the pinned defaults
//! below.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Download settings
    pub fetch: FetchConfig,

    /// pkgx installer
    pub pkgx: PkgxConfig,

    /// Custom-compiled caddy installer
    pub caddy: CaddyConfig,

    /// ttyd installer
    pub ttyd: TtydConfig,

    /// Process supervision runtime installer
    pub runtime: RuntimeConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Overall request timeout in seconds; unset keeps the transport default
    pub timeout_secs: Option<u64>,
}

impl FetchConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PkgxConfig {
    /// Archives are published at `<base_url>/<os>/<arch>.tgz`
    pub base_url: String,
}

impl Default for PkgxConfig {
    fn default() -> Self {
        Self {
            base_url: "https://pkgx.sh".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaddyConfig {
    /// xcaddy release used to compile caddy
    pub xcaddy_version: String,

    /// Plugin module paths compiled in (order is irrelevant)
    pub plugins: Vec<String>,

    /// xcaddy release download base
    pub release_base_url: String,

    /// Program that provides the Go toolchain to xcaddy
    pub runner: String,

    /// Arguments placed before the xcaddy invocation
    pub runner_args: Vec<String>,
}

impl Default for CaddyConfig {
    fn default() -> Self {
        Self {
            xcaddy_version: "v0.4.5".to_string(),
            plugins: vec!["github.com/ggicci/caddy-jwt".to_string()],
            release_base_url: "https://github.com/caddyserver/xcaddy/releases/download"
                .to_string(),
            runner: "pkgx".to_string(),
            runner_args: vec!["+go".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtydConfig {
    /// Version used when the override variable is unset or blank
    pub default_version: String,

    pub release_base_url: String,

    /// Environment variable that overrides `default_version`
    pub version_env: String,
}

impl Default for TtydConfig {
    fn default() -> Self {
        Self {
            default_version: "1.7.7".to_string(),
            release_base_url: "https://github.com/tsl0922/ttyd/releases/download".to_string(),
            version_env: "TTYD_VERSION".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Caddyfile produced by the caddy layer at launch time
    pub caddy_config_path: PathBuf,

    /// caddy binary produced by the caddy layer at launch time
    pub caddy_binary_path: PathBuf,

    /// process-compose log file inside the running container
    pub log_file: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            caddy_config_path: PathBuf::from(
                "/layers/dev.supervise.caddy/caddy/config/Caddyfile",
            ),
            caddy_binary_path: PathBuf::from("/layers/dev.supervise.caddy/caddy/bin/caddy"),
            log_file: "/tmp/process-compose.log".to_string(),
        }
    }
}
