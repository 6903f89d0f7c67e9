//! CLI argument definitions using clap derive

use crate::installers::InstallerKind;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// layerforge - build-time installers for cacheable tool layers
///
/// Populates container build layers with pkgx, a plugin-compiled caddy,
/// ttyd and a process-compose supervision runtime.
#[derive(Parser, Debug)]
#[command(name = "layerforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "LAYERFORGE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an installer's detect step (always passes)
    Detect(DetectArgs),

    /// Populate an installer's layer
    Build(BuildArgs),

    /// Show the persisted metadata of a layer
    Inspect(InspectArgs),

    /// Print the caddy build cache key for the configured inputs
    Key,
}

/// Arguments for the detect command
#[derive(Parser, Debug)]
pub struct DetectArgs {
    /// Installer to run
    #[arg(value_enum)]
    pub installer: InstallerKind,

    /// Application source directory (defaults to current directory)
    #[arg(short, long)]
    pub working_dir: Option<PathBuf>,
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Installer to run
    #[arg(value_enum)]
    pub installer: InstallerKind,

    /// Directory holding layers and their metadata files
    #[arg(short, long, env = "CNB_LAYERS_DIR")]
    pub layers: PathBuf,

    /// Installer resources directory with config/ and scripts/ (defaults to current directory)
    #[arg(long, env = "CNB_BUILDPACK_DIR")]
    pub cnb_path: Option<PathBuf>,

    /// Application source directory (defaults to current directory)
    #[arg(short, long)]
    pub working_dir: Option<PathBuf>,

    /// Installer release version recorded in metadata and checked by the cache
    #[arg(long, env = "LAYERFORGE_BUILDPACK_VERSION", default_value = env!("CARGO_PKG_VERSION"))]
    pub buildpack_version: String,
}

/// Arguments for the inspect command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Layer name
    pub layer: String,

    /// Directory holding layers and their metadata files
    #[arg(short, long, env = "CNB_LAYERS_DIR")]
    pub layers: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Output format for inspect
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable key/value listing
    Table,
    /// JSON output
    Json,
}
