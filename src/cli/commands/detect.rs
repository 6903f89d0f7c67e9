//! Detect command - run an installer's detect step

use crate::cli::args::DetectArgs;
use crate::cli::commands::dir_or_cwd;
use crate::config::Config;
use crate::error::ForgeResult;
use crate::installers::{create_installer, DetectContext};
use crate::ui::{self, UiContext};
use tracing::debug;

/// Execute the detect command
pub fn execute(args: DetectArgs, config: &Config) -> ForgeResult<()> {
    let ctx = DetectContext {
        working_dir: dir_or_cwd(args.working_dir)?,
    };
    debug!("Detecting {} in {}", args.installer, ctx.working_dir.display());

    create_installer(args.installer, config).detect(&ctx)?;

    ui::step_ok(&UiContext::detect(), &format!("{} detected", args.installer));
    Ok(())
}
