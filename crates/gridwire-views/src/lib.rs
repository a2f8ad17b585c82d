//! Typed views attached to grid assets.
//!
//! A view is the capability an asset exposes to remote clients. Two kinds are
//! provided:
//!
//! - [`TopicChannel`]: publish/subscribe. Every publish is delivered
//!   synchronously, on the publisher's thread, to each registered
//!   [`TopicSubscriber`].
//! - [`IndexedLog`]: a topic channel that also assigns each accepted publish a
//!   strictly increasing 64-bit index and supports lookup by index, by topic
//!   and replay from the start of the log.
//!
//! [`ViewHandle`] tags which of the two a binding holds so that callers can
//! check the indexed capability before invoking an indexed-only operation.
//!
//! # Subscription lifecycle
//!
//! A subscription moves from registered to ended exactly once, either through
//! explicit unregistration or when the channel closes. The end notice is
//! delivered once and no message follows it.
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use gridwire_views::{TopicChannel, TopicHub, TopicSubscriber};
//!
//! #[derive(Default)]
//! struct Recorder(Mutex<Vec<(String, f64)>>);
//!
//! impl TopicSubscriber<String, f64> for Recorder {
//!     fn on_message(&self, topic: &String, message: &f64) {
//!         if let Ok(mut seen) = self.0.lock() {
//!             seen.push((topic.clone(), *message));
//!         }
//!     }
//!
//!     fn on_end_of_subscription(&self) {}
//! }
//!
//! let hub: TopicHub<String, f64> = TopicHub::new();
//! let recorder = Arc::new(Recorder::default());
//! hub.register_topic_subscriber(recorder.clone()).expect("register");
//! hub.publish("AAPL".to_owned(), 101.5);
//! assert_eq!(recorder.0.lock().expect("lock").len(), 1);
//! ```

mod channel;
mod error;
mod log;
mod registry;
mod subscriber;
mod view;

pub use self::channel::{TopicChannel, TopicHub};
pub use self::error::ViewError;
pub use self::log::{Excerpt, IndexedLog, IndexedTopicLog};
pub use self::registry::SubscriberRegistry;
pub use self::subscriber::{SubscriptionId, TopicSubscriber};
pub use self::view::{ViewHandle, ViewKind};

#[cfg(test)]
mod test_support;
