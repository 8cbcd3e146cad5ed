//! # Core Configuration Module
//!
//! Configuration management for the Star Wars core.
//!
//! ## Overview
//!
//! A builder constructs a [`CoreConfig`] holding the host-provided bridges
//! and the tunables of the data layer. `build()` validates everything up
//! front so misconfiguration fails at startup with an actionable message
//! instead of surfacing later as a failed fetch.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - transport for GraphQL requests. When the `desktop-shims`
//!   feature is enabled, a `reqwest`-backed client is created automatically
//!   if none is injected.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, FetchPolicy};
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .api_endpoint("https://swapi-graphql.netlify.app/.netlify/functions/index")
//!     .request_timeout(Duration::from_secs(15))
//!     .fetch_policy(FetchPolicy::RefreshOnSubscribe)
//!     .build()?;
//! ```
//!
//! Without the `desktop-shims` feature and without an injected client, the
//! build fails:
//!
//! ```
//! use core_runtime::config::CoreConfig;
//!
//! # #[cfg(not(feature = "desktop-shims"))]
//! # {
//! let err = CoreConfig::builder().build().unwrap_err();
//! assert!(err.to_string().contains("HttpClient"));
//! # }
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::http::{HttpClient, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;

/// Public Star Wars GraphQL endpoint.
pub const DEFAULT_API_ENDPOINT: &str =
    "https://swapi-graphql.netlify.app/.netlify/functions/index";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);
const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Decides whether subscribing to a collection triggers a network fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPolicy {
    /// Fetch only while the collection has never loaded successfully.
    /// Later subscribers are served from the cached state.
    #[default]
    CacheFirst,
    /// Every new subscription triggers a fetch. Concurrent triggers still
    /// share one in-flight request, and subscribers see the cached state
    /// first.
    RefreshOnSubscribe,
}

/// Core configuration for the Star Wars core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// GraphQL endpoint URL
    pub api_endpoint: String,

    /// HTTP client used by the GraphQL transport
    pub http_client: Arc<dyn HttpClient>,

    /// Timeout applied to each GraphQL request
    pub request_timeout: Duration,

    /// Retry policy handed to the HTTP client for each request
    pub retry_policy: RetryPolicy,

    /// Subscription-triggered fetch behaviour
    pub fetch_policy: FetchPolicy,

    /// Capacity of the fetch lifecycle event bus
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("api_endpoint", &self.api_endpoint)
            .field("http_client", &"HttpClient { ... }")
            .field("request_timeout", &self.request_timeout)
            .field("retry_policy", &self.retry_policy)
            .field("fetch_policy", &self.fetch_policy)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The endpoint is an absolute `http://` or `https://` URL
    /// - The request timeout is between 1 and 300 seconds
    /// - The retry policy performs at least one attempt
    /// - The event buffer can hold at least one event
    pub fn validate(&self) -> Result<()> {
        if self.api_endpoint.trim().is_empty() {
            return Err(Error::Config("API endpoint cannot be empty".to_string()));
        }

        let has_scheme =
            self.api_endpoint.starts_with("https://") || self.api_endpoint.starts_with("http://");
        if !has_scheme {
            return Err(Error::Config(format!(
                "API endpoint must start with http:// or https://, got '{}'",
                self.api_endpoint
            )));
        }

        if self.request_timeout < MIN_REQUEST_TIMEOUT || self.request_timeout > MAX_REQUEST_TIMEOUT
        {
            return Err(Error::Config(format!(
                "Request timeout must be between {}s and {}s, got {:?}",
                MIN_REQUEST_TIMEOUT.as_secs(),
                MAX_REQUEST_TIMEOUT.as_secs(),
                self.request_timeout
            )));
        }

        if self.retry_policy.max_attempts == 0 {
            return Err(Error::Config(
                "Retry policy must allow at least one attempt".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "An HttpClient implementation is required to reach the GraphQL API. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default ReqwestHttpClient. \
                 Mobile: inject the platform-native networking adapter."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(
    timeout: Duration,
    retry_policy: &RetryPolicy,
) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::with_timeout(timeout)
        .map_err(|e| Error::Internal(format!("Failed to create default HttpClient: {}", e)))?
        .with_retry_policy(retry_policy.clone());

    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(
    _timeout: Duration,
    _retry_policy: &RetryPolicy,
) -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    api_endpoint: Option<String>,
    http_client: Option<Arc<dyn HttpClient>>,
    request_timeout: Option<Duration>,
    retry_policy: Option<RetryPolicy>,
    fetch_policy: FetchPolicy,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the GraphQL endpoint.
    ///
    /// Default: [`DEFAULT_API_ENDPOINT`]
    pub fn api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = Some(endpoint.into());
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the per-request timeout.
    ///
    /// Default: 30 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the retry policy used by the transport.
    ///
    /// Retries belong to the transport layer; the repository never retries a
    /// failed fetch on its own.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Sets the subscription fetch policy.
    ///
    /// Default: [`FetchPolicy::CacheFirst`]
    pub fn fetch_policy(mut self, policy: FetchPolicy) -> Self {
        self.fetch_policy = policy;
        self
    }

    /// Sets the event bus capacity.
    ///
    /// Default: 100 events
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - `CapabilityMissing` when no `HttpClient` is available
    /// - `Config` when a value fails validation
    pub fn build(self) -> Result<CoreConfig> {
        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let retry_policy = self.retry_policy.unwrap_or_default();

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(request_timeout, &retry_policy)?,
        };

        let config = CoreConfig {
            api_endpoint: self
                .api_endpoint
                .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string()),
            http_client,
            request_timeout,
            retry_policy,
            fetch_policy: self.fetch_policy,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::http::{HttpRequest, HttpResponse};
    use bridge_traits::BridgeError;

    struct MockHttpClient;

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn execute(
            &self,
            _request: HttpRequest,
        ) -> std::result::Result<HttpResponse, BridgeError> {
            Err(BridgeError::NotAvailable("mock".to_string()))
        }
    }

    fn builder() -> CoreConfigBuilder {
        CoreConfig::builder().http_client(Arc::new(MockHttpClient))
    }

    #[test]
    fn test_builder_defaults() {
        let config = builder().build().unwrap();

        assert_eq!(config.api_endpoint, DEFAULT_API_ENDPOINT);
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(config.retry_policy, RetryPolicy::default());
        assert_eq!(config.fetch_policy, FetchPolicy::CacheFirst);
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_http_client() {
        let err = CoreConfig::builder().build().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("HttpClient"));
        assert!(msg.contains("desktop-shims"));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_builder_with_desktop_default_client() {
        let config = CoreConfig::builder().build();
        assert!(config.is_ok());
    }

    #[test]
    fn test_builder_with_custom_values() {
        let config = builder()
            .api_endpoint("http://localhost:4000/graphql")
            .request_timeout(Duration::from_secs(5))
            .retry_policy(RetryPolicy::no_retry())
            .fetch_policy(FetchPolicy::RefreshOnSubscribe)
            .event_buffer_size(8)
            .build()
            .unwrap();

        assert_eq!(config.api_endpoint, "http://localhost:4000/graphql");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.retry_policy.max_attempts, 1);
        assert_eq!(config.fetch_policy, FetchPolicy::RefreshOnSubscribe);
        assert_eq!(config.event_buffer_size, 8);
    }

    #[test]
    fn test_validate_rejects_empty_endpoint() {
        let err = builder().api_endpoint("  ").build().unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_validate_rejects_endpoint_without_scheme() {
        let err = builder()
            .api_endpoint("swapi-graphql.netlify.app")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("http:// or https://"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_timeout() {
        let too_short = builder()
            .request_timeout(Duration::from_millis(10))
            .build();
        assert!(too_short.is_err());

        let too_long = builder().request_timeout(Duration::from_secs(600)).build();
        assert!(too_long.unwrap_err().to_string().contains("between"));
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        let err = builder().retry_policy(policy).build().unwrap_err();
        assert!(err.to_string().contains("at least one attempt"));
    }

    #[test]
    fn test_validate_rejects_zero_event_buffer() {
        let err = builder().event_buffer_size(0).build().unwrap_err();
        assert!(err.to_string().contains("greater than 0"));
    }

    #[test]
    fn test_config_debug_hides_client() {
        let config = builder().build().unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("HttpClient { ... }"));
        assert!(debug.contains("CacheFirst"));
    }
}
