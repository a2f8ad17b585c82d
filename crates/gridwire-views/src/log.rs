//! Indexed topic logs.
//!
//! An indexed log stores every accepted publish and assigns it the next index
//! in a strictly increasing sequence. Append and subscriber snapshot happen
//! under the log's write lock; delivery to live subscribers, including a
//! replay's backlog, happens after the lock is released. Concurrent publishers therefore never share an index,
//! although live subscribers may observe two concurrent publishes in either
//! order.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::channel::TopicChannel;
use crate::error::ViewError;
use crate::registry::SubscriberRegistry;
use crate::subscriber::{SubscriptionId, TopicSubscriber};

const LOG_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::log");

/// A stored record together with the index it was assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Excerpt<T, M> {
    /// Index assigned when the record was appended.
    pub index: u64,
    /// Topic the record was published under.
    pub topic: T,
    /// Message payload.
    pub message: M,
}

/// Topic channel with indexed storage.
pub trait IndexedLog<T, M>: TopicChannel<T, M> {
    /// Appends a record and notifies live subscribers, returning its index.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Closed`] once the log is closed, or
    /// [`ViewError::IndexExhausted`] when no further index can be assigned.
    fn publish_and_index(&self, topic: T, message: M) -> Result<u64, ViewError>;

    /// Returns the record stored at `index`, if one has been assigned.
    fn excerpt_at_index(&self, index: u64) -> Option<Excerpt<T, M>>;

    /// Returns the most recent record published under `topic`.
    fn excerpt_at_topic(&self, topic: &T) -> Option<Excerpt<T, M>>;

    /// Returns the most recent record in the log.
    fn last_excerpt(&self) -> Option<Excerpt<T, M>>;

    /// Registers a subscriber that first receives every stored record in index
    /// order and then every later publish.
    ///
    /// # Errors
    ///
    /// Fails like [`TopicChannel::register_topic_subscriber`].
    fn replay(
        &self,
        subscriber: Arc<dyn TopicSubscriber<T, M>>,
    ) -> Result<SubscriptionId, ViewError>;
}

struct LogState<T, M> {
    start_index: u64,
    entries: Vec<Excerpt<T, M>>,
    latest_by_topic: HashMap<T, usize>,
    closed: bool,
}

impl<T, M> LogState<T, M> {
    fn next_index(&self) -> Result<u64, ViewError> {
        u64::try_from(self.entries.len())
            .ok()
            .and_then(|stored| self.start_index.checked_add(stored))
            .ok_or(ViewError::IndexExhausted { last: u64::MAX })
    }

    fn position_of(&self, index: u64) -> Option<usize> {
        let offset = index.checked_sub(self.start_index)?;
        usize::try_from(offset).ok()
    }
}

/// In-memory indexed log.
pub struct IndexedTopicLog<T, M> {
    state: RwLock<LogState<T, M>>,
    registry: SubscriberRegistry<T, M>,
}

impl<T, M> IndexedTopicLog<T, M> {
    /// Creates an empty log whose first record receives index 0.
    #[must_use]
    pub fn new() -> Self {
        Self::with_start_index(0)
    }

    /// Creates an empty log whose first record receives `start_index`.
    #[must_use]
    pub fn with_start_index(start_index: u64) -> Self {
        Self {
            state: RwLock::new(LogState {
                start_index,
                entries: Vec::new(),
                latest_by_topic: HashMap::new(),
                closed: false,
            }),
            registry: SubscriberRegistry::new(),
        }
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    /// Returns `true` when nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, LogState<T, M>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LogState<T, M>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T, M> Default for IndexedTopicLog<T, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, M> fmt::Debug for IndexedTopicLog<T, M> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        formatter
            .debug_struct("IndexedTopicLog")
            .field("start_index", &state.start_index)
            .field("stored", &state.entries.len())
            .field("closed", &state.closed)
            .field("registry", &self.registry)
            .finish()
    }
}

impl<T, M> TopicChannel<T, M> for IndexedTopicLog<T, M>
where
    T: Clone + Eq + Hash + Send + Sync,
    M: Clone + Send + Sync,
{
    fn publish(&self, topic: T, message: M) {
        match self.publish_and_index(topic, message) {
            Ok(_) => {}
            Err(ViewError::Closed) => {
                debug!(target: LOG_TARGET, "publish on closed log ignored");
            }
            Err(error) => {
                warn!(target: LOG_TARGET, %error, "publish dropped");
            }
        }
    }

    fn register_topic_subscriber(
        &self,
        subscriber: Arc<dyn TopicSubscriber<T, M>>,
    ) -> Result<SubscriptionId, ViewError> {
        self.registry.register(subscriber)
    }

    fn unregister_topic_subscriber(&self, id: SubscriptionId) -> bool {
        self.registry.unregister(id)
    }

    fn close(&self) {
        self.write().closed = true;
        self.registry.close();
    }
}

impl<T, M> IndexedLog<T, M> for IndexedTopicLog<T, M>
where
    T: Clone + Eq + Hash + Send + Sync,
    M: Clone + Send + Sync,
{
    fn publish_and_index(&self, topic: T, message: M) -> Result<u64, ViewError> {
        let (index, slots) = {
            let mut state = self.write();
            if state.closed {
                return Err(ViewError::Closed);
            }
            let index = state.next_index()?;
            let position = state.entries.len();
            state.entries.push(Excerpt {
                index,
                topic: topic.clone(),
                message: message.clone(),
            });
            state.latest_by_topic.insert(topic.clone(), position);
            (index, self.registry.snapshot())
        };
        for slot in slots {
            slot.deliver(&topic, &message);
        }
        Ok(index)
    }

    fn excerpt_at_index(&self, index: u64) -> Option<Excerpt<T, M>> {
        let state = self.read();
        let position = state.position_of(index)?;
        state.entries.get(position).cloned()
    }

    fn excerpt_at_topic(&self, topic: &T) -> Option<Excerpt<T, M>> {
        let state = self.read();
        let position = *state.latest_by_topic.get(topic)?;
        state.entries.get(position).cloned()
    }

    fn last_excerpt(&self) -> Option<Excerpt<T, M>> {
        self.read().entries.last().cloned()
    }

    fn replay(
        &self,
        subscriber: Arc<dyn TopicSubscriber<T, M>>,
    ) -> Result<SubscriptionId, ViewError> {
        // Registration, backlog copy and the slot hold happen under the write
        // lock. Publishes appended afterwards queue on the held slot until the
        // backlog is out, while the log itself is released for everyone else.
        let state = self.write();
        if state.closed {
            return Err(ViewError::Closed);
        }
        let slot = self.registry.register_slot(subscriber)?;
        let backlog = state.entries.clone();
        let held = slot.hold();
        drop(state);
        for excerpt in &backlog {
            held.deliver(&excerpt.topic, &excerpt.message);
        }
        drop(held);
        debug!(
            target: LOG_TARGET,
            subscription = %slot.id(),
            backlog = backlog.len(),
            "replay delivered backlog"
        );
        Ok(slot.id())
    }
}
