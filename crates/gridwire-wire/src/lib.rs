//! Framed document protocol shared by the grid daemon and its clients.
//!
//! Every unit on the wire is a single JSON document terminated by a newline.
//! Clients send one [`InboundDocument`] per request: the asset path (`csp`),
//! a correlation token ([`Tid`]), the event name and a parameter object keyed
//! by the event's formal parameter names.
//!
//! ```json
//! {"csp":"/prices","tid":7,"event":"publish","params":{"topic":"AAPL","message":101.5}}
//! ```
//!
//! The daemon answers with two-frame units written through a [`FrameBuffer`]:
//! a correlation frame carrying the tid, followed by a payload frame.
//!
//! ```json
//! {"tid":7}
//! {"reply":{"topic":"AAPL","message":101.5}}
//! ```
//!
//! The closed set of recognised events and their formal parameters lives in
//! [`EventId`]. Decoding protocol values into the typed topic and message of
//! an asset is delegated to a per-binding [`WireAdapter`].

pub mod adapter;
pub mod document;
pub mod error;
pub mod event;
pub mod frame;

pub use self::adapter::{DecodeError, DecodeFn, WireAdapter};
pub use self::document::InboundDocument;
pub use self::error::WireError;
pub use self::event::{EventId, Param};
pub use self::frame::{
    ERROR_FIELD, ErrorBody, FrameBuffer, OutboundPayload, REPLY_FIELD, TID_FIELD, Tid, TidHeader,
    TopicNotification,
};
