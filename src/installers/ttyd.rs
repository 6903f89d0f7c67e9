//! ttyd installer
//!
//! ttyd publishes statically linked binaries, not archives, so the download
//! is written straight to `bin/ttyd`.

use crate::config::schema::TtydConfig;
use crate::error::{ForgeError, ForgeResult};
use crate::fetch::Fetch;
use crate::installers::{BuildContext, BuildResult, Installer};
use crate::layer::{DownloadMetadata, LayerHandle, LayerTypes};
use crate::util::set_mode;
use std::fs;
use std::sync::Arc;
use tracing::{debug, info};

const LAYER_NAME: &str = "ttyd";

pub struct TtydInstaller {
    default_version: String,
    release_base_url: String,
    version_env: String,
    fetcher: Arc<dyn Fetch>,
}

impl TtydInstaller {
    pub fn new(config: &TtydConfig, fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            default_version: config.default_version.clone(),
            release_base_url: config.release_base_url.clone(),
            version_env: config.version_env.clone(),
            fetcher,
        }
    }

    fn version(&self) -> String {
        let requested = std::env::var(&self.version_env).ok();
        resolve_version(requested.as_deref(), &self.default_version)
    }
}

/// The override wins when it is non-blank after trimming
pub fn resolve_version(requested: Option<&str>, default: &str) -> String {
    match requested.map(str::trim) {
        Some(version) if !version.is_empty() => version.to_string(),
        _ => default.to_string(),
    }
}

/// `<base>/<version>/<asset>`
pub fn release_url(base_url: &str, version: &str, asset: &str) -> String {
    format!("{}/{}/{}", base_url.trim_end_matches('/'), version, asset)
}

impl Installer for TtydInstaller {
    fn name(&self) -> &'static str {
        LAYER_NAME
    }

    fn build(&self, ctx: &BuildContext) -> ForgeResult<BuildResult> {
        // Resolved before the layer is touched so an unsupported host keeps it intact.
        let asset = ctx.platform.ttyd_asset()?;
        let version = self.version();
        let url = release_url(&self.release_base_url, &version, asset);
        debug!("ttyd {} for {} from {}", version, ctx.platform, url);

        let mut layer = LayerHandle::open(&ctx.layers_dir, LAYER_NAME)?;
        layer.reset()?;
        let bin_dir = layer.ensure_dir("bin")?;

        let download = self.fetcher.fetch(&url)?;
        let binary = bin_dir.join("ttyd");
        fs::write(&binary, &download.bytes)
            .map_err(|e| ForgeError::io(format!("writing {}", binary.display()), e))?;
        set_mode(&binary, 0o755).map_err(|e| {
            ForgeError::io(format!("making {} executable", binary.display()), e)
        })?;

        layer.types = LayerTypes::all();
        layer.write_metadata(&DownloadMetadata {
            checksum: download.digest,
            uri: url,
            version: Some(version.clone()),
            asset: Some(asset.to_string()),
            os: ctx.platform.os.clone(),
            arch: ctx.platform.arch.clone(),
            buildpack_version: ctx.buildpack_version.clone(),
        })?;

        info!("Installed ttyd {}", version);
        Ok(BuildResult::layer(layer))
    }
}
