//! pkgx installer
//!
//! Always rebuilds: the archive is small and pkgx updates itself in place.

use crate::config::schema::PkgxConfig;
use crate::error::{ForgeError, ForgeResult};
use crate::fetch::Fetch;
use crate::installers::{fetch_and_extract, BuildContext, BuildResult, Installer};
use crate::layer::{DownloadMetadata, LayerHandle, LayerTypes};
use crate::platform::Platform;
use crate::util::set_mode;
use std::io;
use std::sync::Arc;
use tracing::info;

const LAYER_NAME: &str = "pkgx";

pub struct PkgxInstaller {
    base_url: String,
    fetcher: Arc<dyn Fetch>,
}

impl PkgxInstaller {
    pub fn new(config: &PkgxConfig, fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            base_url: config.base_url.clone(),
            fetcher,
        }
    }
}

/// `<base>/<uname -s>/<uname -m>.tgz`
pub fn archive_url(base_url: &str, platform: &Platform) -> String {
    format!(
        "{}/{}/{}.tgz",
        base_url.trim_end_matches('/'),
        platform.uname_os(),
        platform.uname_arch()
    )
}

impl Installer for PkgxInstaller {
    fn name(&self) -> &'static str {
        LAYER_NAME
    }

    fn build(&self, ctx: &BuildContext) -> ForgeResult<BuildResult> {
        let os = ctx.platform.uname_os();
        let arch = ctx.platform.uname_arch();
        let url = archive_url(&self.base_url, &ctx.platform);

        let mut layer = LayerHandle::open(&ctx.layers_dir, LAYER_NAME)?;
        layer.reset()?;
        let bin_dir = layer.ensure_dir("bin")?;

        let archive = fetch_and_extract(self.fetcher.as_ref(), &url, &bin_dir)?;

        let binary = bin_dir.join("pkgx");
        match set_mode(&binary, 0o755) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ForgeError::io(
                    format!("making {} executable", binary.display()),
                    e,
                ))
            }
        }

        layer.types = LayerTypes::all();
        layer.write_metadata(&DownloadMetadata {
            checksum: archive.digest,
            uri: url,
            version: None,
            asset: None,
            os,
            arch,
            buildpack_version: ctx.buildpack_version.clone(),
        })?;

        info!("Installed pkgx into {}", layer.path().display());
        Ok(BuildResult::layer(layer))
    }
}
