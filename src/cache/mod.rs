//! Build cache for expensive layer steps
//!
//! Decides whether a previously compiled binary can be reused, keyed by a
//! digest of the inputs that determine its content.
//!
//! # Decision
//!
//! | Check | On mismatch |
//! |-------|-------------|
//! | metadata present and parseable | Miss (no metadata) |
//! | buildpack version unchanged | Miss (buildpack changed) |
//! | cache key unchanged | Miss (inputs changed) |
//! | binary still on disk, not a directory | Miss (binary missing) |
//!
//! A miss is never an error: the caller resets the layer and rebuilds.

pub mod decision;
pub mod key;

pub use decision::{decide, CacheDecision, CacheInputs, MissReason};
pub use key::{derive_key, sorted_plugins, CacheKey};
