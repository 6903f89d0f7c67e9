//! Terminal output for the CLI
//!
//! Interactive terminals get an `indicatif` spinner and colors; CI and
//! build pipelines get plain `[OK]`/`[FAIL]` lines that read well in logs.
//!
//! # Example
//!
//! ```rust,ignore
//! use layerforge::ui::{self, TaskSpinner, UiContext};
//!
//! let ctx = UiContext::detect();
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Building caddy layer...");
//! // ... do work ...
//! spinner.stop("Built caddy layer");
//! ui::key_value(&ctx, "path", "/layers/caddy");
//! ```

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{key_value, remark, section, step_info, step_ok};
pub use progress::TaskSpinner;
