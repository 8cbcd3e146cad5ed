//! # Event Bus System
//!
//! Broadcasts fetch lifecycle events from the repository layer to any number
//! of host-side listeners using `tokio::sync::broadcast`.
//!
//! Collection data itself never travels over this bus: presentation layers
//! receive collections through the repository's own streams. The bus exists
//! for cross-cutting concerns such as a global activity indicator, analytics,
//! or diagnostics screens.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐    emit     ┌───────────┐   subscribe   ┌─────────────┐
//! │ people channel ├────────────>│           ├──────────────>│ Android UI  │
//! └────────────────┘             │ EventBus  │               └─────────────┘
//! ┌────────────────┐    emit     │ (broadcast│   subscribe   ┌─────────────┐
//! │ films channel  ├────────────>│  channel) ├──────────────>│ iOS UI      │
//! └────────────────┘             └───────────┘               └─────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, RepositoryEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut stream = bus.subscribe();
//!
//! bus.emit(CoreEvent::Repository(RepositoryEvent::FetchStarted {
//!     collection: "people".to_string(),
//! }))
//! .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Fetch started");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events. Non-fatal.
//! - **`RecvError::Closed`**: every sender was dropped; treat as shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Repository fetch lifecycle events
    Repository(RepositoryEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Repository(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Repository(RepositoryEvent::FetchFailed { recoverable, .. }) => {
                if *recoverable {
                    EventSeverity::Warning
                } else {
                    EventSeverity::Error
                }
            }
            CoreEvent::Repository(RepositoryEvent::FetchCompleted { .. }) => EventSeverity::Info,
            CoreEvent::Repository(RepositoryEvent::FetchStarted { .. }) => EventSeverity::Debug,
        }
    }

    /// Name of the collection the event refers to.
    pub fn collection(&self) -> &str {
        match self {
            CoreEvent::Repository(e) => e.collection(),
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Repository Events
// ============================================================================

/// Events emitted around each network fetch of an entity collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum RepositoryEvent {
    /// A transport call was issued for the collection.
    FetchStarted {
        /// Collection name (e.g., "people", "films").
        collection: String,
    },
    /// A fetch succeeded and a new collection state was published.
    FetchCompleted {
        collection: String,
        /// Number of entities in the published collection.
        item_count: usize,
        /// Version number of the published state.
        version: u64,
        /// Wall time spent in transport and mapping.
        duration_ms: u64,
    },
    /// A fetch failed; the previous collection state is retained.
    FetchFailed {
        collection: String,
        /// Human-readable error message.
        message: String,
        /// Whether a later refresh may succeed.
        recoverable: bool,
    },
}

impl RepositoryEvent {
    fn description(&self) -> &str {
        match self {
            RepositoryEvent::FetchStarted { .. } => "Fetch started",
            RepositoryEvent::FetchCompleted { .. } => "Fetch completed successfully",
            RepositoryEvent::FetchFailed { .. } => "Fetch failed",
        }
    }

    fn collection(&self) -> &str {
        match self {
            RepositoryEvent::FetchStarted { collection }
            | RepositoryEvent::FetchCompleted { collection, .. }
            | RepositoryEvent::FetchFailed { collection, .. } => collection,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus yields another handle to the same channel. Each
/// [`subscribe`](EventBus::subscribe) creates an independent receiver that
/// sees every event emitted after it was created; past events are not
/// replayed.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering at most `capacity` events per
    /// subscriber before it starts reporting `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, EventSeverity};
///
/// let bus = EventBus::new(16);
/// let failures = EventStream::new(bus.subscribe())
///     .filter(|event| event.severity() >= EventSeverity::Warning);
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Only events about `collection` will be returned by `recv()`.
    pub fn for_collection(self, collection: impl Into<String>) -> Self {
        let collection = collection.into();
        self.filter(move |event| event.collection() == collection)
    }

    fn matches(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without waiting.
    ///
    /// Returns `None` if no matching event is currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(collection: &str) -> CoreEvent {
        CoreEvent::Repository(RepositoryEvent::FetchStarted {
            collection: collection.to_string(),
        })
    }

    fn failed(collection: &str) -> CoreEvent {
        CoreEvent::Repository(RepositoryEvent::FetchFailed {
            collection: collection.to_string(),
            message: "connection refused".to_string(),
            recoverable: true,
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(started("people")).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Repository(RepositoryEvent::FetchCompleted {
            collection: "films".to_string(),
            item_count: 6,
            version: 1,
            duration_ms: 120,
        });
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream =
            EventStream::new(bus.subscribe()).filter(|e| e.severity() >= EventSeverity::Warning);

        bus.emit(started("people")).ok();
        bus.emit(failed("people")).ok();

        assert_eq!(stream.recv().await.unwrap(), failed("people"));
    }

    #[tokio::test]
    async fn test_event_stream_for_collection() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe()).for_collection("films");

        bus.emit(started("people")).ok();
        bus.emit(started("films")).ok();

        assert_eq!(stream.recv().await.unwrap(), started("films"));
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for _ in 0..5 {
            bus.emit(started("people")).ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity_and_description() {
        assert_eq!(failed("films").severity(), EventSeverity::Warning);
        let unrecoverable = CoreEvent::Repository(RepositoryEvent::FetchFailed {
            collection: "films".to_string(),
            message: "missing field".to_string(),
            recoverable: false,
        });
        assert_eq!(unrecoverable.severity(), EventSeverity::Error);
        assert_eq!(started("films").severity(), EventSeverity::Debug);
        assert_eq!(failed("films").description(), "Fetch failed");
        assert_eq!(failed("films").collection(), "films");
    }

    #[test]
    fn test_event_serialization() {
        let event = failed("people");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Repository\""));
        assert!(json.contains("FetchFailed"));

        let decoded: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());
        assert!(stream.try_recv().is_none());
    }
}
