//! Reactive repository over the Star Wars GraphQL API.
//!
//! Each collection keeps one [`Publisher`] and at most one in-flight fetch
//! behind a single lock. Subscribing, starting a fetch and publishing its
//! result are all serialized on that lock. Fetches run as tasks on the
//! runtime captured at construction, so dropping a subscriber or a refresh
//! future never cancels a fetch other observers are waiting on. A fetch task
//! that is itself cancelled still releases its slot and reports
//! [`RepositoryError::TaskAborted`].

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use core_graphql::TransportClient;
use core_runtime::config::FetchPolicy;
use core_runtime::error::{Error as RuntimeError, Result as RuntimeResult};
use core_runtime::events::{CoreEvent, EventBus, RepositoryEvent};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::{Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::error::{RepositoryError, Result};
use crate::mapper::{map_all, FragmentMapper};
use crate::models::{Film, Person};
use crate::publication::{CollectionStream, Publisher, Snapshot};

/// Default per-observer buffer of a collection channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

type SharedFetch<T> = Shared<BoxFuture<'static, Result<Snapshot<T>>>>;

/// Construction options for [`StarWarsRepository`].
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    pub fetch_policy: FetchPolicy,
    /// Receives fetch lifecycle events when set.
    pub event_bus: Option<EventBus>,
    /// Runtime fetch tasks are spawned on. Defaults to the caller's runtime.
    pub runtime: Option<Handle>,
    /// Emissions buffered per observer before it is resynced.
    pub channel_capacity: usize,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            fetch_policy: FetchPolicy::default(),
            event_bus: None,
            runtime: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl RepositoryConfig {
    pub fn with_fetch_policy(mut self, policy: FetchPolicy) -> Self {
        self.fetch_policy = policy;
        self
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }
}

const FETCH_CANCELLED: &str = "fetch task was cancelled before completing";

struct InFlight<T> {
    generation: u64,
    fetch: SharedFetch<T>,
}

struct Slot<T> {
    publisher: Publisher<T>,
    in_flight: Option<InFlight<T>>,
    generation: u64,
}

impl<T> Slot<T> {
    /// Clear the in-flight marker if it still belongs to `generation`.
    fn release(&mut self, generation: u64) -> bool {
        match &self.in_flight {
            Some(in_flight) if in_flight.generation == generation => {
                self.in_flight = None;
                true
            }
            _ => false,
        }
    }
}

struct Collection<T: FragmentMapper> {
    transport: Arc<dyn TransportClient>,
    runtime: Handle,
    event_bus: Option<EventBus>,
    fetch_policy: FetchPolicy,
    slot: Mutex<Slot<T>>,
}

impl<T: FragmentMapper> Collection<T> {
    fn new(
        transport: Arc<dyn TransportClient>,
        runtime: Handle,
        config: &RepositoryConfig,
    ) -> Self {
        Self {
            transport,
            runtime,
            event_bus: config.event_bus.clone(),
            fetch_policy: config.fetch_policy,
            slot: Mutex::new(Slot {
                publisher: Publisher::new(config.channel_capacity),
                in_flight: None,
                generation: 0,
            }),
        }
    }

    fn subscribe(self: &Arc<Self>) -> CollectionStream<T> {
        let (stream, pending) = {
            let mut slot = self.slot.lock();
            let stream = slot.publisher.subscribe();

            let should_fetch = match self.fetch_policy {
                FetchPolicy::CacheFirst => {
                    slot.publisher.current().is_none() && slot.in_flight.is_none()
                }
                FetchPolicy::RefreshOnSubscribe => true,
            };
            let pending = if should_fetch {
                self.join_or_reserve(&mut slot).1
            } else {
                None
            };

            debug!(
                collection = T::COLLECTION,
                observers = slot.publisher.observer_count(),
                fetch_triggered = should_fetch,
                "Observer subscribed"
            );

            (stream, pending)
        };

        if let Some(pending) = pending {
            pending.spawn();
        }

        stream
    }

    async fn refresh(self: &Arc<Self>) -> Result<Snapshot<T>> {
        let (fetch, pending) = {
            let mut slot = self.slot.lock();
            self.join_or_reserve(&mut slot)
        };
        if let Some(pending) = pending {
            pending.spawn();
        }
        fetch.await
    }

    fn snapshot(&self) -> Option<Snapshot<T>> {
        self.slot.lock().publisher.current()
    }

    fn is_fetching(&self) -> bool {
        self.slot.lock().in_flight.is_some()
    }

    /// Must be called with the slot locked. A returned [`PendingFetch`] is
    /// already registered as in flight and must be spawned once the lock is
    /// released.
    fn join_or_reserve(
        self: &Arc<Self>,
        slot: &mut Slot<T>,
    ) -> (SharedFetch<T>, Option<PendingFetch<T>>) {
        if let Some(in_flight) = &slot.in_flight {
            debug!(collection = T::COLLECTION, "Joining in-flight fetch");
            return (in_flight.fetch.clone(), None);
        }

        slot.generation += 1;
        let (sender, receiver) = oneshot::channel();
        let fetch = receiver
            .map(|received| {
                received.unwrap_or_else(|_| {
                    Err(RepositoryError::TaskAborted(FETCH_CANCELLED.to_string()))
                })
            })
            .boxed()
            .shared();

        slot.in_flight = Some(InFlight {
            generation: slot.generation,
            fetch: fetch.clone(),
        });

        let pending = PendingFetch {
            guard: FetchGuard {
                collection: Arc::clone(self),
                generation: slot.generation,
                started: Instant::now(),
                armed: true,
            },
            sender,
        };
        (fetch, Some(pending))
    }

    async fn run_fetch(&self, generation: u64, started: Instant) -> Result<Snapshot<T>> {
        debug!(
            collection = T::COLLECTION,
            query = T::QUERY.operation_name(),
            generation,
            "Fetch started"
        );
        self.emit(RepositoryEvent::FetchStarted {
            collection: T::COLLECTION.to_string(),
        });

        let result = match AssertUnwindSafe(async { self.transport.fetch(T::QUERY).await })
            .catch_unwind()
            .await
        {
            Ok(Ok(list)) => map_all::<T>(list).map_err(RepositoryError::from),
            Ok(Err(e)) => Err(RepositoryError::from(e)),
            Err(_) => Err(RepositoryError::TaskAborted(
                "transport panicked during fetch".to_string(),
            )),
        };

        let mut slot = self.slot.lock();
        slot.release(generation);
        self.settle(slot, result, started)
    }

    /// Fail a fetch whose task ended without settling it.
    fn abandon(&self, generation: u64, started: Instant) {
        let mut slot = self.slot.lock();
        if !slot.release(generation) {
            return;
        }
        let error = RepositoryError::TaskAborted(FETCH_CANCELLED.to_string());
        let _ = self.settle(slot, Err(error), started);
    }

    /// Publish or signal the outcome of a fetch already released from the
    /// slot, then unlock.
    fn settle(
        &self,
        mut slot: MutexGuard<'_, Slot<T>>,
        result: Result<Vec<T>>,
        started: Instant,
    ) -> Result<Snapshot<T>> {
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(items) => {
                let snapshot = slot.publisher.publish(items);
                let observers = slot.publisher.observer_count();
                drop(slot);

                info!(
                    collection = T::COLLECTION,
                    count = snapshot.len(),
                    version = snapshot.version(),
                    observers,
                    duration_ms,
                    "Collection published"
                );
                self.emit(RepositoryEvent::FetchCompleted {
                    collection: T::COLLECTION.to_string(),
                    item_count: snapshot.len(),
                    version: snapshot.version(),
                    duration_ms,
                });

                Ok(snapshot)
            }
            Err(error) => {
                slot.publisher.fail(error.clone());
                drop(slot);

                warn!(
                    collection = T::COLLECTION,
                    error = %error,
                    recoverable = error.is_recoverable(),
                    duration_ms,
                    "Fetch failed, keeping previous state"
                );
                self.emit(RepositoryEvent::FetchFailed {
                    collection: T::COLLECTION.to_string(),
                    message: error.to_string(),
                    recoverable: error.is_recoverable(),
                });

                Err(error)
            }
        }
    }

    fn emit(&self, event: RepositoryEvent) {
        if let Some(bus) = &self.event_bus {
            // No listeners is fine.
            let _ = bus.emit(CoreEvent::Repository(event));
        }
    }
}

/// A fetch registered in its slot but not yet handed to the runtime.
struct PendingFetch<T: FragmentMapper> {
    guard: FetchGuard<T>,
    sender: oneshot::Sender<Result<Snapshot<T>>>,
}

impl<T: FragmentMapper> PendingFetch<T> {
    /// Must be called with the slot unlocked: a runtime that has shut down
    /// drops the task, and with it the guard, inside `spawn`.
    fn spawn(self) {
        let PendingFetch { mut guard, sender } = self;
        let runtime = guard.collection.runtime.clone();

        runtime.spawn(async move {
            let result = guard
                .collection
                .run_fetch(guard.generation, guard.started)
                .await;
            guard.armed = false;
            // Every waiter may have gone away.
            let _ = sender.send(result);
        });
    }
}

/// Owned by the fetch task. If the task is dropped before it settles its
/// fetch (runtime shutdown, panic), the slot is released and observers get
/// a failure instead of waiting on a fetch that will never finish.
struct FetchGuard<T: FragmentMapper> {
    collection: Arc<Collection<T>>,
    generation: u64,
    started: Instant,
    armed: bool,
}

impl<T: FragmentMapper> Drop for FetchGuard<T> {
    fn drop(&mut self) {
        if self.armed {
            self.collection.abandon(self.generation, self.started);
        }
    }
}

/// Shared, observable access to people and films.
///
/// Cloning yields another handle to the same collections.
///
/// # Example
///
/// ```ignore
/// let repository = StarWarsRepository::new(transport, RepositoryConfig::default())?;
/// let mut people = repository.people();
/// while let Some(event) = people.next().await {
///     match event {
///         CollectionEvent::Loaded(snapshot) => render(&snapshot),
///         CollectionEvent::Failed(error) => show_error(&error),
///     }
/// }
/// ```
#[derive(Clone)]
pub struct StarWarsRepository {
    people: Arc<Collection<Person>>,
    films: Arc<Collection<Film>>,
    fetch_policy: FetchPolicy,
}

impl StarWarsRepository {
    /// Create a repository that fetches through `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::CapabilityMissing`] when no runtime was
    /// configured and the caller is not inside a Tokio runtime.
    pub fn new(
        transport: Arc<dyn TransportClient>,
        config: RepositoryConfig,
    ) -> RuntimeResult<Self> {
        let runtime = match config.runtime.clone() {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|e| RuntimeError::CapabilityMissing {
                capability: "TokioRuntime".to_string(),
                message: format!(
                    "StarWarsRepository must be created inside a Tokio runtime or given one \
                     through RepositoryConfig::with_runtime ({})",
                    e
                ),
            })?,
        };

        Ok(Self {
            people: Arc::new(Collection::new(
                Arc::clone(&transport),
                runtime.clone(),
                &config,
            )),
            films: Arc::new(Collection::new(transport, runtime, &config)),
            fetch_policy: config.fetch_policy,
        })
    }

    /// Observe the people collection.
    pub fn people(&self) -> CollectionStream<Person> {
        self.people.subscribe()
    }

    /// Observe the films collection.
    pub fn films(&self) -> CollectionStream<Film> {
        self.films.subscribe()
    }

    /// Fetch people now, or join the fetch already running.
    ///
    /// The outcome is published to observers as well as returned.
    pub async fn refresh_people(&self) -> Result<Snapshot<Person>> {
        self.people.refresh().await
    }

    /// Fetch films now, or join the fetch already running.
    pub async fn refresh_films(&self) -> Result<Snapshot<Film>> {
        self.films.refresh().await
    }

    pub fn people_snapshot(&self) -> Option<Snapshot<Person>> {
        self.people.snapshot()
    }

    pub fn films_snapshot(&self) -> Option<Snapshot<Film>> {
        self.films.snapshot()
    }

    pub fn is_fetching_people(&self) -> bool {
        self.people.is_fetching()
    }

    pub fn is_fetching_films(&self) -> bool {
        self.films.is_fetching()
    }

    pub fn fetch_policy(&self) -> FetchPolicy {
        self.fetch_policy
    }
}

impl std::fmt::Debug for StarWarsRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StarWarsRepository")
            .field("fetch_policy", &self.fetch_policy)
            .field("people_loaded", &self.people.snapshot().is_some())
            .field("films_loaded", &self.films.snapshot().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_runtime_allows_construction_outside_it() {
        struct Empty;

        #[async_trait::async_trait]
        impl TransportClient for Empty {
            async fn fetch(
                &self,
                _query: core_graphql::Query,
            ) -> core_graphql::Result<core_graphql::FragmentList> {
                Ok(core_graphql::FragmentList::Films(vec![]))
            }
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let config = RepositoryConfig::default().with_runtime(runtime.handle().clone());
        let repository = StarWarsRepository::new(Arc::new(Empty), config).unwrap();

        let snapshot = runtime.block_on(repository.refresh_films()).unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.version(), 1);
    }

    #[test]
    fn test_default_config() {
        let config = RepositoryConfig::default();
        assert_eq!(config.fetch_policy, FetchPolicy::CacheFirst);
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert!(config.event_bus.is_none());
    }
}
