//! Outbound frame encoding.
//!
//! Every outbound unit is exactly two JSONL frames: a correlation frame
//! naming [`TID_FIELD`] and a payload frame. [`FrameBuffer`] encodes a whole
//! unit or nothing, so a reader never sees a correlation frame without its
//! payload.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WireError;

/// Field carrying the correlation token.
pub const TID_FIELD: &str = "tid";
/// Field carrying a reply or push payload.
pub const REPLY_FIELD: &str = "reply";
/// Field carrying a request-level error.
pub const ERROR_FIELD: &str = "error";

/// Request correlation token supplied by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tid(u64);

impl Tid {
    /// Token used for errors raised before a request's tid is known.
    pub const UNKNOWN: Self = Self(0);

    /// Wraps a raw token.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw token.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Tid {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Body of an error payload frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable machine-readable error kind.
    pub kind: String,
    /// Human-readable description.
    pub message: String,
}

impl ErrorBody {
    /// Creates an error body.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Push payload describing one published message.
#[derive(Debug, Serialize)]
pub struct TopicNotification<'a, T, M> {
    /// Topic the message was published on.
    pub topic: &'a T,
    /// Published message.
    pub message: &'a M,
}

/// Correlation frame as read back by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TidHeader {
    /// Correlation token of the unit.
    pub tid: Tid,
}

/// Payload frame as read back by clients.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum OutboundPayload {
    /// Reply or push payload; `null` marks a lookup that found nothing.
    #[serde(rename = "reply")]
    Reply(Value),
    /// Terminal notice for a subscription.
    #[serde(rename = "onEndOfSubscription")]
    EndOfSubscription(String),
    /// Request-level failure.
    #[serde(rename = "error")]
    Error(ErrorBody),
}

impl OutboundPayload {
    /// Parses one payload frame line.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Malformed`] if the line is not a payload frame.
    pub fn parse(line: &[u8]) -> Result<Self, WireError> {
        serde_json::from_slice(line).map_err(WireError::from_json_error)
    }
}

#[derive(Serialize)]
struct ReplyFrame<'a, P> {
    reply: &'a P,
}

#[derive(Serialize)]
struct EndOfSubscriptionFrame {
    #[serde(rename = "onEndOfSubscription")]
    on_end_of_subscription: &'static str,
}

#[derive(Serialize)]
struct ErrorFrame<'a> {
    error: &'a ErrorBody,
}

/// Scratch buffer accumulating encoded frames before they hit the sink.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    bytes: Vec<u8>,
}

impl FrameBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoded bytes accumulated so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns `true` when no frame has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Discards all encoded frames while keeping the allocation.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Writes a reply unit: correlation frame then `{"reply": payload}`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Encode`] if the payload cannot be serialised; the
    /// buffer is left as it was before the call.
    pub fn write_reply<P: Serialize>(&mut self, tid: Tid, payload: &P) -> Result<(), WireError> {
        self.write_unit(tid, &ReplyFrame { reply: payload })
    }

    /// Writes the terminal end-of-subscription unit.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Encode`] if encoding fails.
    pub fn write_end_of_subscription(&mut self, tid: Tid) -> Result<(), WireError> {
        self.write_unit(
            tid,
            &EndOfSubscriptionFrame {
                on_end_of_subscription: "",
            },
        )
    }

    /// Writes an error unit correlated to `tid`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Encode`] if encoding fails.
    pub fn write_error(&mut self, tid: Tid, body: &ErrorBody) -> Result<(), WireError> {
        self.write_unit(tid, &ErrorFrame { error: body })
    }

    fn write_unit<F: Serialize>(&mut self, tid: Tid, payload: &F) -> Result<(), WireError> {
        let start = self.bytes.len();
        let result = self
            .write_frame(&TidHeader { tid })
            .and_then(|()| self.write_frame(payload));
        if result.is_err() {
            self.bytes.truncate(start);
        }
        result
    }

    fn write_frame<F: Serialize>(&mut self, frame: &F) -> Result<(), WireError> {
        serde_json::to_writer(&mut self.bytes, frame).map_err(WireError::Encode)?;
        self.bytes.push(b'\n');
        Ok(())
    }
}
