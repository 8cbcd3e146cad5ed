//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the Star Wars core crates:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus for fetch activity
//!
//! Every other core crate depends on this one for its logging conventions,
//! config validation and the way fetch lifecycle events are broadcast to
//! host applications.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
