//! Workspace umbrella crate.
//!
//! Host applications can depend on `starwars-workspace` and enable the
//! documented features instead of wiring `core-service` and the bridge crates
//! individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
