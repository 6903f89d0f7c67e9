//! Build command - populate one installer's layer

use crate::cli::args::BuildArgs;
use crate::cli::commands::{absolute_dir, dir_or_cwd};
use crate::config::Config;
use crate::error::{ForgeError, ForgeResult};
use crate::installers::{create_installer, BuildContext};
use crate::platform::Platform;
use crate::ui::{self, TaskSpinner, UiContext};
use std::fs;
use tracing::debug;

/// Execute the build command
pub fn execute(args: BuildArgs, config: &Config) -> ForgeResult<()> {
    fs::create_dir_all(&args.layers).map_err(|e| {
        ForgeError::io(format!("creating layers directory {}", args.layers.display()), e)
    })?;

    // Paths end up in child process working dirs and launch-time config.
    let ctx = BuildContext {
        layers_dir: absolute_dir(&args.layers)?,
        cnb_path: absolute_dir(&dir_or_cwd(args.cnb_path)?)?,
        working_dir: absolute_dir(&dir_or_cwd(args.working_dir)?)?,
        buildpack_version: args.buildpack_version,
        platform: Platform::current(),
    };
    debug!("Build context: {:?}", ctx);

    let installer = create_installer(args.installer, config);
    let ui_ctx = UiContext::detect();
    let mut spinner = TaskSpinner::new(&ui_ctx);
    spinner.start(&format!("Building {} layer...", installer.name()));

    let result = match installer.build(&ctx) {
        Ok(result) => result,
        Err(e) => {
            spinner.stop_error(&format!("{} layer failed", installer.name()));
            return Err(e);
        }
    };
    result.persist_launch(&ctx.layers_dir)?;
    spinner.stop(&format!("Built {} layer", installer.name()));

    for layer in &result.layers {
        ui::key_value(&ui_ctx, "layer", &layer.path().display().to_string());
        ui::key_value(&ui_ctx, "metadata", &layer.metadata_path().display().to_string());
    }
    for process in &result.launch.processes {
        ui::step_info(
            &ui_ctx,
            &format!(
                "process {}: {} {}",
                process.process_type,
                process.command.join(" "),
                process.args.join(" ")
            ),
        );
    }

    Ok(())
}
