//! Protocol dispatch for client connections.
//!
//! Each connection is served by a [`DispatchConnectionHandler`] that reads one
//! [`InboundDocument`](gridwire_wire::InboundDocument) per line, resolves the
//! addressed asset and hands the document to that asset's per-connection
//! [`TopicDispatcher`].
//!
//! ## Protocol
//!
//! ```json
//! {"csp":"/prices","tid":7,"event":"registerTopicSubscriber"}
//! {"csp":"/prices","tid":8,"event":"publish","params":{"topic":"AAPL","message":101.5}}
//! ```
//!
//! Every unit written back is a correlation frame followed by a payload frame.
//! The publish above produces no reply of its own, but the subscription opened
//! under tid 7 receives a push:
//!
//! ```json
//! {"tid":7}
//! {"reply":{"topic":"AAPL","message":101.5}}
//! ```
//!
//! Request-level failures are answered with an error unit carrying the
//! request's tid and never affect other requests on the connection.

mod dispatcher;
mod errors;
mod handler;
mod response;
mod subscriber;

pub use self::dispatcher::{DispatchOutcome, DocumentHandler, TopicDispatcher};
pub use self::errors::DispatchError;
pub(crate) use self::handler::DispatchConnectionHandler;
pub use self::subscriber::ReplySubscriber;

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
