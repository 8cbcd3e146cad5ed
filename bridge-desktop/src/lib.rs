//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! - `HttpClient` using `reqwest`
//!
//! Mobile hosts inject their native networking stacks instead; the shared
//! core never depends on this crate directly, only on `bridge-traits`.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::ReqwestHttpClient;
//! use std::sync::Arc;
//!
//! let http_client = Arc::new(ReqwestHttpClient::new()?);
//! // Hand it to CoreConfig::builder().http_client(http_client)
//! ```

mod http;

pub use http::ReqwestHttpClient;
