//! caddy installer
//!
//! caddy is compiled from source with a plugin set, which takes minutes.
//! The result is cached in the layer and reused while the xcaddy version,
//! the plugin set and the buildpack version stay the same.

use crate::cache::{decide, sorted_plugins, CacheDecision, CacheInputs};
use crate::config::schema::CaddyConfig;
use crate::error::{ForgeError, ForgeResult};
use crate::fetch::Fetch;
use crate::installers::{fetch_and_extract, BuildContext, BuildResult, Installer};
use crate::layer::{BuildMetadata, LayerHandle, LayerTypes};
use crate::platform::Platform;
use crate::toolchain::Toolchain;
use crate::util::{copy_file, set_mode};
use serde_json::json;
use std::fs;
use std::io;
use std::sync::Arc;
use tracing::info;

const LAYER_NAME: &str = "caddy";

pub struct CaddyInstaller {
    xcaddy_version: String,
    plugins: Vec<String>,
    release_base_url: String,
    fetcher: Arc<dyn Fetch>,
    toolchain: Arc<dyn Toolchain>,
}

impl CaddyInstaller {
    pub fn new(
        config: &CaddyConfig,
        fetcher: Arc<dyn Fetch>,
        toolchain: Arc<dyn Toolchain>,
    ) -> Self {
        Self {
            xcaddy_version: config.xcaddy_version.clone(),
            plugins: config.plugins.clone(),
            release_base_url: config.release_base_url.clone(),
            fetcher,
            toolchain,
        }
    }

    /// Refresh everything that may change without the binary changing
    fn reuse(
        &self,
        ctx: &BuildContext,
        layer: &mut LayerHandle,
        stored: &BuildMetadata,
    ) -> ForgeResult<()> {
        info!("Reusing cached caddy {}", stored.caddy_version);

        layer.types = LayerTypes::all();
        copy_default_config(ctx, layer)?;
        write_sbom(layer, stored)?;
        layer.write_metadata(stored)
    }

    fn rebuild(
        &self,
        ctx: &BuildContext,
        layer: &mut LayerHandle,
        inputs: &CacheInputs,
        plugins: &[String],
    ) -> ForgeResult<()> {
        layer.reset()?;
        let bin_dir = layer.ensure_dir("bin")?;

        let url = xcaddy_url(&self.release_base_url, &self.xcaddy_version, &ctx.platform);
        fetch_and_extract(self.fetcher.as_ref(), &url, &bin_dir)?;

        let xcaddy = bin_dir.join("xcaddy");
        set_mode(&xcaddy, 0o755)
            .map_err(|e| ForgeError::io(format!("making {} executable", xcaddy.display()), e))?;

        let caddy = bin_dir.join("caddy");
        self.toolchain.build(&xcaddy, &caddy, plugins)?;

        match fs::remove_file(&xcaddy) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(ForgeError::io(format!("removing {}", xcaddy.display()), e)),
        }

        let caddy_version = self.toolchain.self_reported_version(&caddy)?;
        copy_default_config(ctx, layer)?;

        let metadata = BuildMetadata {
            build_hash: inputs.key.to_string(),
            xcaddy_version: self.xcaddy_version.clone(),
            plugins: plugins.join(","),
            caddy_version,
            buildpack_version: ctx.buildpack_version.clone(),
            uri: url,
        };

        layer.types = LayerTypes::all();
        layer.write_metadata(&metadata)?;
        write_sbom(layer, &metadata)?;

        info!("Built caddy {}", metadata.caddy_version);
        Ok(())
    }
}

/// `<base>/<v>/xcaddy_<v without leading 'v'>_<os>_<arch>.tar.gz`
pub fn xcaddy_url(base_url: &str, version: &str, platform: &Platform) -> String {
    format!(
        "{}/{}/xcaddy_{}_{}_{}.tar.gz",
        base_url.trim_end_matches('/'),
        version,
        version.strip_prefix('v').unwrap_or(version),
        platform.os,
        platform.arch
    )
}

/// Copy `<cnb>/config/Caddyfile` into the layer's `config/`
fn copy_default_config(ctx: &BuildContext, layer: &LayerHandle) -> ForgeResult<()> {
    let source = ctx.cnb_path.join("config").join("Caddyfile");
    let dest = layer.ensure_dir("config")?.join("Caddyfile");
    copy_file(&source, &dest, 0o644).map_err(|e| {
        ForgeError::io(
            format!("copying {} to {}", source.display(), dest.display()),
            e,
        )
    })
}

/// Write `sbom.json` describing how the binary was produced
fn write_sbom(layer: &LayerHandle, metadata: &BuildMetadata) -> ForgeResult<()> {
    let sbom = json!({
        "name": "caddy",
        "metadata": {
            "build_hash": metadata.build_hash,
            "xcaddy_version": metadata.xcaddy_version,
            "plugins": metadata.plugins,
            "version": metadata.caddy_version,
        },
    });

    let path = layer.path().join("sbom.json");
    let content = serde_json::to_string_pretty(&sbom)?;
    fs::write(&path, content).map_err(|e| ForgeError::io(format!("writing {}", path.display()), e))
}

impl Installer for CaddyInstaller {
    fn name(&self) -> &'static str {
        LAYER_NAME
    }

    fn build(&self, ctx: &BuildContext) -> ForgeResult<BuildResult> {
        let plugins = sorted_plugins(&self.plugins);
        let inputs = CacheInputs::new(&self.xcaddy_version, &plugins, &ctx.buildpack_version);

        let mut layer = LayerHandle::open(&ctx.layers_dir, LAYER_NAME)?;
        let caddy = layer.bin_dir().join("caddy");
        let stored: Option<BuildMetadata> = layer.read_metadata();

        match (decide(&inputs, stored.as_ref(), &caddy), stored) {
            (CacheDecision::Hit, Some(stored)) => self.reuse(ctx, &mut layer, &stored)?,
            (decision, _) => {
                if let CacheDecision::Miss(reason) = decision {
                    info!("Rebuilding caddy: {}", reason);
                }
                self.rebuild(ctx, &mut layer, &inputs, &plugins)?
            }
        }

        Ok(BuildResult::layer(layer))
    }
}
