//! # Host Bridge Traits
//!
//! Capabilities the shared Star Wars core needs from its host but that each
//! platform provides differently.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP execution with retry policy support
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!   (Logcat on Android, OSLog on iOS, console on desktop)
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ Available |
//! | iOS      | host-provided       | 📋 Planned |
//! | Android  | host-provided       | 📋 Planned |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform-specific failures into it and mark transient
//! conditions (timeouts, refused connections) with the matching variants so
//! callers can decide about retries.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single implementation can be
//! shared across the async tasks of every presentation layer.

pub mod error;
pub mod http;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use time::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
