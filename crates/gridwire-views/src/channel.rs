//! Publish/subscribe topic channels.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::ViewError;
use crate::registry::SubscriberRegistry;
use crate::subscriber::{SubscriptionId, TopicSubscriber};

const CHANNEL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::channel");

/// Minimal contract every view satisfies.
pub trait TopicChannel<T, M>: Send + Sync {
    /// Publishes a message, notifying every registered subscriber on the
    /// calling thread before returning. Publishing on a closed channel is a
    /// no-op.
    fn publish(&self, topic: T, message: M);

    /// Registers a live subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::AlreadyRegistered`] for a subscriber instance that
    /// is already live, or [`ViewError::Closed`] once the channel is closed.
    fn register_topic_subscriber(
        &self,
        subscriber: Arc<dyn TopicSubscriber<T, M>>,
    ) -> Result<SubscriptionId, ViewError>;

    /// Ends a subscription; returns `false` if it was unknown or had ended.
    fn unregister_topic_subscriber(&self, id: SubscriptionId) -> bool;

    /// Closes the channel, ending every subscription.
    fn close(&self);
}

/// In-memory topic channel.
pub struct TopicHub<T, M> {
    registry: SubscriberRegistry<T, M>,
}

impl<T, M> TopicHub<T, M> {
    /// Creates an open channel with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: SubscriberRegistry::new(),
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }
}

impl<T, M> Default for TopicHub<T, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, M> fmt::Debug for TopicHub<T, M> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TopicHub")
            .field("registry", &self.registry)
            .finish()
    }
}

impl<T, M> TopicChannel<T, M> for TopicHub<T, M>
where
    T: Send + Sync,
    M: Send + Sync,
{
    fn publish(&self, topic: T, message: M) {
        if self.registry.is_closed() {
            debug!(target: CHANNEL_TARGET, "publish on closed channel ignored");
            return;
        }
        self.registry.notify(&topic, &message);
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
        self.registry.close();
    }
}
