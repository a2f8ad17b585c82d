//! Subscriber registry shared by every channel implementation.
//!
//! Registrations live in slots. Fan-out takes a snapshot of the slots under a
//! read lock and delivers after releasing it, so publishers never block each
//! other on the registry. Each slot serialises delivery against its own
//! termination: once a slot has ended, no further message reaches its
//! subscriber, and an end notice waits for an in-flight delivery to finish.
//!
//! Lock poisoning is recovered rather than propagated. The guarded state is a
//! flat list and a flag, and a panicking subscriber must not wedge the channel
//! for every other subscriber.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use tracing::debug;

use crate::error::ViewError;
use crate::subscriber::{SubscriptionId, TopicSubscriber};

const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

pub(crate) struct Slot<T, M> {
    id: SubscriptionId,
    subscriber: Arc<dyn TopicSubscriber<T, M>>,
    ended: Mutex<bool>,
}

impl<T, M> Slot<T, M> {
    fn new(id: SubscriptionId, subscriber: Arc<dyn TopicSubscriber<T, M>>) -> Self {
        Self {
            id,
            subscriber,
            ended: Mutex::new(false),
        }
    }

    pub(crate) const fn id(&self) -> SubscriptionId {
        self.id
    }

    pub(crate) fn deliver(&self, topic: &T, message: &M) {
        self.hold().deliver(topic, message);
    }

    /// Takes the slot's delivery lock. Other deliveries and the end notice
    /// wait until the guard is dropped.
    pub(crate) fn hold(&self) -> HeldSlot<'_, T, M> {
        HeldSlot {
            slot: self,
            ended: self.ended.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Ends the slot, returning `false` if it had already ended.
    fn end(&self) -> bool {
        let mut ended = self.ended.lock().unwrap_or_else(PoisonError::into_inner);
        if *ended {
            return false;
        }
        *ended = true;
        self.subscriber.on_end_of_subscription();
        true
    }

    fn holds(&self, subscriber: &Arc<dyn TopicSubscriber<T, M>>) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.subscriber), Arc::as_ptr(subscriber))
    }
}

/// Exclusive delivery access to one slot.
pub(crate) struct HeldSlot<'a, T, M> {
    slot: &'a Slot<T, M>,
    ended: MutexGuard<'a, bool>,
}

impl<T, M> HeldSlot<'_, T, M> {
    pub(crate) fn deliver(&self, topic: &T, message: &M) {
        if !*self.ended {
            self.slot.subscriber.on_message(topic, message);
        }
    }
}

struct RegistryState<T, M> {
    slots: Vec<Arc<Slot<T, M>>>,
    closed: bool,
}

/// Identity-keyed set of live subscriptions.
pub struct SubscriberRegistry<T, M> {
    state: RwLock<RegistryState<T, M>>,
    next_id: AtomicU64,
}

impl<T, M> SubscriberRegistry<T, M> {
    /// Creates an empty, open registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState {
                slots: Vec::new(),
                closed: false,
            }),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::AlreadyRegistered`] if this exact subscriber
    /// instance is live on the registry, or [`ViewError::Closed`] after
    /// [`close`](Self::close).
    pub fn register(
        &self,
        subscriber: Arc<dyn TopicSubscriber<T, M>>,
    ) -> Result<SubscriptionId, ViewError> {
        self.register_slot(subscriber).map(|slot| slot.id)
    }

    pub(crate) fn register_slot(
        &self,
        subscriber: Arc<dyn TopicSubscriber<T, M>>,
    ) -> Result<Arc<Slot<T, M>>, ViewError> {
        let mut state = self.write();
        if state.closed {
            return Err(ViewError::Closed);
        }
        if state.slots.iter().any(|slot| slot.holds(&subscriber)) {
            return Err(ViewError::AlreadyRegistered);
        }
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let slot = Arc::new(Slot::new(id, subscriber));
        state.slots.push(Arc::clone(&slot));
        debug!(target: REGISTRY_TARGET, subscription = %id, "subscriber registered");
        Ok(slot)
    }

    /// Ends and removes a subscription.
    ///
    /// Returns `false` when the id is unknown or the subscription already
    /// ended. Safe to call while a publish is delivering to the same
    /// subscriber; the end notice follows the in-flight message.
    pub fn unregister(&self, id: SubscriptionId) -> bool {
        let removed = {
            let mut state = self.write();
            state
                .slots
                .iter()
                .position(|slot| slot.id == id)
                .map(|position| state.slots.swap_remove(position))
        };
        let ended = removed.is_some_and(|slot| slot.end());
        if ended {
            debug!(target: REGISTRY_TARGET, subscription = %id, "subscription ended");
        }
        ended
    }

    /// Delivers one message to every live subscriber.
    pub fn notify(&self, topic: &T, message: &M) {
        for slot in self.snapshot() {
            slot.deliver(topic, message);
        }
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<Slot<T, M>>> {
        self.read().slots.clone()
    }

    /// Ends every subscription and refuses later registrations.
    ///
    /// Idempotent; each subscriber receives its end notice once.
    pub fn close(&self) {
        let drained = {
            let mut state = self.write();
            state.closed = true;
            std::mem::take(&mut state.slots)
        };
        for slot in drained {
            slot.end();
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().slots.len()
    }

    /// Returns `true` when no subscription is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` once [`close`](Self::close) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.read().closed
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState<T, M>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState<T, M>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T, M> Default for SubscriberRegistry<T, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, M> fmt::Debug for SubscriberRegistry<T, M> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        formatter
            .debug_struct("SubscriberRegistry")
            .field("live", &state.slots.len())
            .field("closed", &state.closed)
            .finish()
    }
}
