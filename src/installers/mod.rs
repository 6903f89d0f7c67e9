//! Layer installers
//!
//! Every installer exposes the same two entry points the build pipeline
//! calls: `detect` (always passes) and `build` (populates one layer and
//! persists its metadata).

pub mod caddy;
pub mod pkgx;
pub mod runtime;
pub mod ttyd;

pub use caddy::CaddyInstaller;
pub use pkgx::PkgxInstaller;
pub use runtime::RuntimeInstaller;
pub use ttyd::TtydInstaller;

use crate::archive;
use crate::config::Config;
use crate::error::ForgeResult;
use crate::fetch::{Archive, Fetch, HttpFetcher};
use crate::layer::{LaunchMetadata, LayerHandle};
use crate::platform::Platform;
use crate::toolchain::XcaddyToolchain;
use clap::ValueEnum;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Inputs of a detect invocation
#[derive(Debug, Clone)]
pub struct DetectContext {
    pub working_dir: PathBuf,
}

/// Inputs of a build invocation
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Root under which layers and their metadata files live
    pub layers_dir: PathBuf,
    /// Installer's packaged resources (`config/`, `scripts/`)
    pub cnb_path: PathBuf,
    /// Application source directory
    pub working_dir: PathBuf,
    /// Version of the installer release, part of cache validity
    pub buildpack_version: String,
    pub platform: Platform,
}

/// What a build produced
#[derive(Debug, Default)]
pub struct BuildResult {
    pub layers: Vec<LayerHandle>,
    pub launch: LaunchMetadata,
}

impl BuildResult {
    pub fn layer(layer: LayerHandle) -> Self {
        Self {
            layers: vec![layer],
            launch: LaunchMetadata::default(),
        }
    }

    /// Write `launch.toml` when any process was declared
    pub fn persist_launch(&self, layers_dir: &Path) -> ForgeResult<()> {
        if self.launch.is_empty() {
            return Ok(());
        }
        self.launch.write(layers_dir)
    }
}

/// A build-time installer for one layer
pub trait Installer {
    /// Layer name, also the installer's identifier
    fn name(&self) -> &'static str;

    /// Detection always passes; installers may prepare the working directory
    fn detect(&self, _ctx: &DetectContext) -> ForgeResult<()> {
        Ok(())
    }

    /// Populate the layer
    fn build(&self, ctx: &BuildContext) -> ForgeResult<BuildResult>;
}

/// Installers selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InstallerKind {
    /// Generic package runner
    Pkgx,
    /// caddy compiled with plugins via xcaddy
    Caddy,
    /// Terminal sharing server
    Ttyd,
    /// process-compose supervision runtime
    Runtime,
}

impl InstallerKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pkgx => "pkgx",
            Self::Caddy => "caddy",
            Self::Ttyd => "ttyd",
            Self::Runtime => "runtime",
        }
    }
}

impl fmt::Display for InstallerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Create the installer for `kind` wired to the production fetcher and toolchain
pub fn create_installer(kind: InstallerKind, config: &Config) -> Box<dyn Installer> {
    let fetcher: Arc<dyn Fetch> = Arc::new(HttpFetcher::new(config.fetch.timeout()));

    match kind {
        InstallerKind::Pkgx => Box::new(PkgxInstaller::new(&config.pkgx, fetcher)),
        InstallerKind::Caddy => {
            let toolchain = Arc::new(XcaddyToolchain::new(
                config.caddy.runner.clone(),
                config.caddy.runner_args.clone(),
            ));
            Box::new(CaddyInstaller::new(&config.caddy, fetcher, toolchain))
        }
        InstallerKind::Ttyd => Box::new(TtydInstaller::new(&config.ttyd, fetcher)),
        InstallerKind::Runtime => Box::new(RuntimeInstaller::new(&config.runtime)),
    }
}

/// Download a tar+gzip archive and unpack it into `dest`
pub(crate) fn fetch_and_extract(
    fetcher: &dyn Fetch,
    url: &str,
    dest: &Path,
) -> ForgeResult<Archive> {
    let archive = fetcher.fetch(url)?;
    debug!(
        "Fetched {} ({} bytes, sha256 {})",
        archive.url,
        archive.bytes.len(),
        archive.digest
    );
    archive::extract(&archive.bytes, dest)?;
    Ok(archive)
}
