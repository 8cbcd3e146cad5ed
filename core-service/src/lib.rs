//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations into the shared
//! Rust core: configuration selects the `HttpClient`, the GraphQL transport
//! is built on top of it, and a single [`StarWarsRepository`] is handed to
//! every presentation layer. Desktop apps typically enable the
//! `desktop-shims` feature, which supplies a `reqwest` backed client when
//! none is injected.

pub mod error;

pub use error::{CoreError, Result};

pub use core_graphql::{GraphQlTransport, Query, TransportClient, TransportError};
pub use core_runtime::config::{CoreConfig, CoreConfigBuilder, FetchPolicy};
pub use core_runtime::events::{CoreEvent, EventBus, EventStream, RepositoryEvent};
pub use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
pub use core_starwars::{
    CollectionEvent, CollectionStream, Film, MappingError, Person, RepositoryConfig,
    RepositoryError, Snapshot, StarWarsRepository,
};

use std::sync::Arc;

use tracing::info;

/// Primary façade exposed to host applications.
///
/// Cloning shares the same repository and event bus, so every UI surface
/// observing through any clone sees the same collections.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<CoreConfig>,
    event_bus: EventBus,
    repository: StarWarsRepository,
}

impl CoreService {
    /// Build the service over the GraphQL transport described by `config`.
    ///
    /// Must be called from within a Tokio runtime; fetches are spawned on it.
    pub fn bootstrap(config: CoreConfig) -> Result<Self> {
        let transport = Arc::new(GraphQlTransport::from_config(&config));
        Self::with_transport(config, transport)
    }

    /// Build the service over an arbitrary transport, e.g. a fixture in tests.
    pub fn with_transport(config: CoreConfig, transport: Arc<dyn TransportClient>) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::new(config.event_buffer_size);
        let repository_config = RepositoryConfig::default()
            .with_fetch_policy(config.fetch_policy)
            .with_event_bus(event_bus.clone());
        let repository = StarWarsRepository::new(transport, repository_config)?;

        info!(
            endpoint = %config.api_endpoint,
            fetch_policy = ?config.fetch_policy,
            "Core service initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            event_bus,
            repository,
        })
    }

    /// The repository shared by all observers of this service.
    pub fn repository(&self) -> &StarWarsRepository {
        &self.repository
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Subscribe to fetch lifecycle events from now on.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }
}

impl std::fmt::Debug for CoreService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreService")
            .field("config", &self.config)
            .field("repository", &self.repository)
            .finish()
    }
}

/// Convenience bootstrapper for desktop hosts using default configuration.
///
/// ```no_run
/// # #[cfg(feature = "desktop-shims")]
/// # async fn example() -> core_service::Result<()> {
/// let core = core_service::bootstrap_desktop()?;
/// let mut films = core.repository().films();
/// let first = films.next().await;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop() -> Result<CoreService> {
    let config = CoreConfig::builder().build()?;
    CoreService::bootstrap(config)
}
