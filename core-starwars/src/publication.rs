//! Versioned publication of one collection to any number of observers.
//!
//! A [`Publisher`] owns the current [`Snapshot`] and a broadcast channel. It
//! is always accessed under the owning collection's lock, so taking the
//! replay snapshot and registering a receiver happen atomically with respect
//! to publication: a new observer neither misses nor duplicates an emission.

use std::ops::Deref;
use std::sync::Arc;

use futures::Stream;
use parking_lot::RwLock;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::debug;

use crate::error::RepositoryError;

/// One immutable, versioned collection state.
///
/// Clones share the same allocation: every observer of an emission holds
/// the identical slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<T> {
    version: u64,
    items: Arc<[T]>,
}

impl<T> Snapshot<T> {
    fn new(version: u64, items: Vec<T>) -> Self {
        Self {
            version,
            items: Arc::from(items),
        }
    }

    /// Starts at 1 and increases by one per successful fetch.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Handle to the shared slice, for hosts that keep it beyond the snapshot.
    pub fn shared(&self) -> Arc<[T]> {
        Arc::clone(&self.items)
    }

    /// Whether both snapshots point at the same emitted allocation.
    pub fn ptr_eq(&self, other: &Snapshot<T>) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }
}

impl<T> Deref for Snapshot<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

/// Item delivered to collection observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionEvent<T> {
    /// The collection state was (re)loaded.
    Loaded(Snapshot<T>),
    /// A fetch failed. The last loaded state, if any, is still current.
    Failed(RepositoryError),
}

impl<T> CollectionEvent<T> {
    pub fn snapshot(&self) -> Option<&Snapshot<T>> {
        match self {
            CollectionEvent::Loaded(snapshot) => Some(snapshot),
            CollectionEvent::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&RepositoryError> {
        match self {
            CollectionEvent::Loaded(_) => None,
            CollectionEvent::Failed(error) => Some(error),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, CollectionEvent::Loaded(_))
    }
}

/// Broadcast message: the event plus the state version current when it was
/// sent, so stale failures can be dropped after a resync.
#[derive(Debug, Clone)]
struct Envelope<T> {
    version: u64,
    event: CollectionEvent<T>,
}

pub(crate) struct Publisher<T> {
    sender: broadcast::Sender<Envelope<T>>,
    latest: Arc<RwLock<Option<Snapshot<T>>>>,
    version: u64,
}

impl<T: Clone + Send + Sync + 'static> Publisher<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            latest: Arc::new(RwLock::new(None)),
            version: 0,
        }
    }

    pub(crate) fn current(&self) -> Option<Snapshot<T>> {
        self.latest.read().clone()
    }

    pub(crate) fn subscribe(&self) -> CollectionStream<T> {
        let replay = self.current();
        CollectionStream {
            seen_version: replay.as_ref().map_or(0, Snapshot::version),
            replay,
            receiver: self.sender.subscribe(),
            latest: Arc::clone(&self.latest),
        }
    }

    /// Replace the state wholesale and notify every live observer.
    pub(crate) fn publish(&mut self, items: Vec<T>) -> Snapshot<T> {
        self.version += 1;
        let snapshot = Snapshot::new(self.version, items);
        *self.latest.write() = Some(snapshot.clone());

        // No receivers is not an error: the state is still stored for replay.
        let _ = self.sender.send(Envelope {
            version: self.version,
            event: CollectionEvent::Loaded(snapshot.clone()),
        });

        snapshot
    }

    /// Notify observers of a failure without touching the state.
    pub(crate) fn fail(&self, error: RepositoryError) {
        let _ = self.sender.send(Envelope {
            version: self.version,
            event: CollectionEvent::Failed(error),
        });
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Observation of one collection.
///
/// Yields the current state first when one exists, then every later
/// emission in order. An observer that falls behind the channel capacity
/// jumps straight to the latest state and never sees an older version after
/// a newer one. Dropping the stream unsubscribes.
pub struct CollectionStream<T> {
    replay: Option<Snapshot<T>>,
    receiver: broadcast::Receiver<Envelope<T>>,
    latest: Arc<RwLock<Option<Snapshot<T>>>>,
    seen_version: u64,
}

impl<T: Clone + Send + Sync + 'static> CollectionStream<T> {
    /// Wait for the next event.
    ///
    /// Returns `None` once the repository has been dropped and every pending
    /// event has been delivered.
    pub async fn next(&mut self) -> Option<CollectionEvent<T>> {
        if let Some(snapshot) = self.replay.take() {
            return Some(CollectionEvent::Loaded(snapshot));
        }

        loop {
            match self.receiver.recv().await {
                Ok(envelope) => {
                    if let Some(event) = self.accept(envelope) {
                        return Some(event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Collection observer lagged, resyncing");
                    if let Some(event) = self.resync() {
                        return Some(event);
                    }
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next event if one is ready, without waiting.
    pub fn try_next(&mut self) -> Option<CollectionEvent<T>> {
        if let Some(snapshot) = self.replay.take() {
            return Some(CollectionEvent::Loaded(snapshot));
        }

        loop {
            match self.receiver.try_recv() {
                Ok(envelope) => {
                    if let Some(event) = self.accept(envelope) {
                        return Some(event);
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "Collection observer lagged, resyncing");
                    if let Some(event) = self.resync() {
                        return Some(event);
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Adapt into a [`futures::Stream`].
    pub fn into_stream(self) -> impl Stream<Item = CollectionEvent<T>> + Send {
        futures::stream::unfold(self, |mut stream| async move {
            stream.next().await.map(|event| (event, stream))
        })
    }

    /// Version of the newest state delivered so far, 0 if none.
    pub fn seen_version(&self) -> u64 {
        self.seen_version
    }

    fn accept(&mut self, envelope: Envelope<T>) -> Option<CollectionEvent<T>> {
        match envelope.event {
            CollectionEvent::Loaded(snapshot) if snapshot.version > self.seen_version => {
                self.seen_version = snapshot.version;
                Some(CollectionEvent::Loaded(snapshot))
            }
            CollectionEvent::Failed(error) if envelope.version >= self.seen_version => {
                Some(CollectionEvent::Failed(error))
            }
            _ => None,
        }
    }

    fn resync(&mut self) -> Option<CollectionEvent<T>> {
        let latest = self.latest.read().clone()?;
        if latest.version <= self.seen_version {
            return None;
        }
        self.seen_version = latest.version;
        Some(CollectionEvent::Loaded(latest))
    }
}

impl<T> std::fmt::Debug for CollectionStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionStream")
            .field("seen_version", &self.seen_version)
            .field("replay_pending", &self.replay.is_some())
            .finish()
    }
}
