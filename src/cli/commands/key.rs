//! Key command - print the caddy build cache key

use crate::cache::{derive_key, sorted_plugins};
use crate::config::Config;
use crate::error::ForgeResult;
use tracing::info;

/// Execute the key command
pub fn execute(config: &Config) -> ForgeResult<()> {
    let plugins = sorted_plugins(&config.caddy.plugins);
    info!(
        "xcaddy {} with plugins [{}]",
        config.caddy.xcaddy_version,
        plugins.join(",")
    );
    println!("{}", derive_key(&config.caddy.xcaddy_version, &plugins));
    Ok(())
}
