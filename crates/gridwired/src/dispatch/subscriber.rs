//! Subscriber that forwards notifications to a connection.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LockResult, Mutex, MutexGuard, PoisonError, Weak};

use serde::Serialize;
use tracing::debug;

use gridwire_views::{SubscriptionId, TopicSubscriber};
use gridwire_wire::{Tid, TopicNotification};

use crate::outbound::{OutboundPublisher, PutContext};

use super::DISPATCH_TARGET;

/// Pushes every message it receives to the client, tagged with the tid of
/// the request that registered it.
///
/// Runs on the producer's thread. Write failures are logged and dropped; the
/// subscription stays live until it is ended explicitly, the view closes or
/// the connection goes away.
pub struct ReplySubscriber {
    tid: Tid,
    publisher: Arc<OutboundPublisher>,
    table: Option<Arc<SubscriptionTable>>,
}

impl ReplySubscriber {
    /// Builds a subscriber for the request `tid`.
    pub fn new(tid: Tid, publisher: Arc<OutboundPublisher>) -> Self {
        Self {
            tid,
            publisher,
            table: None,
        }
    }

    /// Builds a subscriber that drops its entry from `table` once it ends,
    /// whoever ends it.
    pub(crate) fn tracked(
        tid: Tid,
        publisher: Arc<OutboundPublisher>,
        table: Arc<SubscriptionTable>,
    ) -> Self {
        Self {
            tid,
            publisher,
            table: Some(table),
        }
    }

    /// Correlation token the subscriber tags its pushes with.
    pub fn tid(&self) -> Tid {
        self.tid
    }
}

impl<T, M> TopicSubscriber<T, M> for ReplySubscriber
where
    T: Serialize,
    M: Serialize,
{
    fn on_message(&self, topic: &T, message: &M) {
        let notification = TopicNotification { topic, message };
        if let Err(error) = self.publisher.put(PutContext::Push, |frames| {
            frames.write_reply(self.tid, &notification)
        }) {
            debug!(target: DISPATCH_TARGET, tid = %self.tid, %error, "push dropped");
        }
    }

    fn on_end_of_subscription(&self) {
        if let Some(table) = &self.table {
            table.release(self.tid, self);
        }
        if let Err(error) = self.publisher.put(PutContext::EndOfSubscription, |frames| {
            frames.write_end_of_subscription(self.tid)
        }) {
            debug!(target: DISPATCH_TARGET, tid = %self.tid, %error, "end notice dropped");
        }
    }
}

impl fmt::Debug for ReplySubscriber {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ReplySubscriber")
            .field("tid", &self.tid)
            .finish_non_exhaustive()
    }
}

/// Subscription recorded under the tid that opened it.
#[derive(Debug)]
pub(crate) struct TableEntry {
    id: SubscriptionId,
    subscriber: Weak<ReplySubscriber>,
}

impl TableEntry {
    pub(crate) fn new(id: SubscriptionId, subscriber: &Arc<ReplySubscriber>) -> Self {
        Self {
            id,
            subscriber: Arc::downgrade(subscriber),
        }
    }

    pub(crate) const fn id(&self) -> SubscriptionId {
        self.id
    }
}

/// Live subscriptions opened through one dispatcher, keyed by tid.
#[derive(Debug, Default)]
pub(crate) struct SubscriptionTable {
    entries: Mutex<HashMap<Tid, TableEntry>>,
}

impl SubscriptionTable {
    pub(crate) fn lock(&self) -> LockResult<MutexGuard<'_, HashMap<Tid, TableEntry>>> {
        self.entries.lock()
    }

    /// Removes the entry for `tid` if it still belongs to `subscriber`.
    fn release(&self, tid: Tid, subscriber: &ReplySubscriber) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let owned = entries
            .get(&tid)
            .is_some_and(|entry| std::ptr::eq(entry.subscriber.as_ptr(), subscriber));
        if owned {
            entries.remove(&tid);
            debug!(target: DISPATCH_TARGET, %tid, "ended subscription released");
        }
    }
}
