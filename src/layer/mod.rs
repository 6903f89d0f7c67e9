//! Layers and their persisted state
//!
//! A layer is a directory under the layers root populated by one installer,
//! plus a `<name>.toml` file next to it recording how it is exposed and
//! where its content came from.

pub mod handle;
pub mod launch;
pub mod metadata;

pub use handle::LayerHandle;
pub use launch::{DirectProcess, LaunchMetadata};
pub use metadata::{BuildMetadata, DownloadMetadata, LayerRecord, LayerTypes, RuntimeMetadata};
