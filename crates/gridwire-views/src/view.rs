//! Tagged handle over the view kinds an asset can expose.

use std::fmt;
use std::sync::Arc;

use strum::{Display, EnumString, IntoStaticStr};

use crate::channel::TopicChannel;
use crate::error::ViewError;
use crate::log::IndexedLog;
use crate::subscriber::{SubscriptionId, TopicSubscriber};

/// The kind of view attached to an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ViewKind {
    /// Plain publish/subscribe channel.
    Topic,
    /// Channel with indexed storage.
    Indexed,
}

/// A view together with its capability tag.
///
/// Callers inspect [`as_indexed`](Self::as_indexed) before issuing an
/// indexed-only operation, so a plain channel is never asked to do something
/// it cannot.
pub enum ViewHandle<T, M> {
    /// Plain topic channel.
    Topic(Arc<dyn TopicChannel<T, M>>),
    /// Indexed log.
    Indexed(Arc<dyn IndexedLog<T, M>>),
}

impl<T, M> ViewHandle<T, M> {
    /// Returns the capability tag.
    #[must_use]
    pub const fn kind(&self) -> ViewKind {
        match self {
            Self::Topic(_) => ViewKind::Topic,
            Self::Indexed(_) => ViewKind::Indexed,
        }
    }

    /// Returns the indexed log when this handle carries one.
    #[must_use]
    pub const fn as_indexed(&self) -> Option<&Arc<dyn IndexedLog<T, M>>> {
        match self {
            Self::Topic(_) => None,
            Self::Indexed(log) => Some(log),
        }
    }

    /// Publishes through whichever view the handle carries.
    ///
    /// An indexed view stores the record and the assigned index is discarded.
    ///
    /// # Errors
    ///
    /// Returns the indexed log's append error, such as
    /// [`ViewError::IndexExhausted`]. Topic channels never fail.
    pub fn publish(&self, topic: T, message: M) -> Result<(), ViewError> {
        match self {
            Self::Topic(channel) => channel.publish(topic, message),
            Self::Indexed(log) => {
                log.publish_and_index(topic, message)?;
            }
        }
        Ok(())
    }

    /// Registers a live subscriber.
    ///
    /// # Errors
    ///
    /// Propagates the underlying view's registration error.
    pub fn register_topic_subscriber(
        &self,
        subscriber: Arc<dyn TopicSubscriber<T, M>>,
    ) -> Result<SubscriptionId, ViewError> {
        match self {
            Self::Topic(channel) => channel.register_topic_subscriber(subscriber),
            Self::Indexed(log) => log.register_topic_subscriber(subscriber),
        }
    }

    /// Ends a subscription previously registered through this handle.
    pub fn unregister_topic_subscriber(&self, id: SubscriptionId) -> bool {
        match self {
            Self::Topic(channel) => channel.unregister_topic_subscriber(id),
            Self::Indexed(log) => log.unregister_topic_subscriber(id),
        }
    }

    /// Closes the underlying view.
    pub fn close(&self) {
        match self {
            Self::Topic(channel) => channel.close(),
            Self::Indexed(log) => log.close(),
        }
    }
}

impl<T, M> Clone for ViewHandle<T, M> {
    fn clone(&self) -> Self {
        match self {
            Self::Topic(channel) => Self::Topic(Arc::clone(channel)),
            Self::Indexed(log) => Self::Indexed(Arc::clone(log)),
        }
    }
}

impl<T, M> fmt::Debug for ViewHandle<T, M> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_tuple("ViewHandle")
            .field(&self.kind())
            .finish()
    }
}
