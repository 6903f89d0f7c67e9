//! layerforge - build-time installers for cacheable tool layers
//!
//! Each installer resolves a platform-specific download, fetches and
//! unpacks it into an isolated layer directory, and records provenance
//! metadata that later builds use to decide whether work can be skipped.

pub mod archive;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod installers;
pub mod layer;
pub mod platform;
pub mod toolchain;
pub mod ui;
pub mod util;

pub use error::{ForgeError, ForgeResult};
