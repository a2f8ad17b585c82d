//! Subscriber capability and subscription identifiers.

use std::fmt;

/// Receiver of messages published on a channel.
///
/// Callbacks run synchronously on the publishing thread. Implementations must
/// not unregister themselves from inside [`on_message`](Self::on_message).
pub trait TopicSubscriber<T, M>: Send + Sync {
    /// Invoked once per published message while the subscription is live.
    fn on_message(&self, topic: &T, message: &M);

    /// Invoked exactly once when the subscription ends.
    fn on_end_of_subscription(&self);
}

/// Identifier assigned to a registration by its channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "sub-{}", self.0)
    }
}
