//! Error types for document dispatch failures.
//!
//! Request-level errors are reported back to the client as an error unit
//! correlated to the failing request's tid. Infrastructure errors raised while
//! writing to the connection cannot be reported there and are only logged.

use thiserror::Error;

use gridwire_views::{ViewError, ViewKind};
use gridwire_wire::{DecodeError, ErrorBody, EventId, Param, Tid, WireError};

use crate::outbound::PublishError;

/// Errors surfaced while dispatching one inbound document.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The line was not a valid inbound document.
    #[error("malformed document: {0}")]
    MalformedDocument(#[source] WireError),

    /// The line exceeded the size limit.
    #[error("document too large: more than {max_size} bytes")]
    DocumentTooLarge {
        /// Limit that was exceeded.
        max_size: usize,
    },

    /// No asset with an attached view exists at the requested path.
    #[error("unknown asset: {csp}")]
    UnknownAsset {
        /// Requested asset path.
        csp: String,
    },

    /// The event name is not part of the protocol.
    #[error("unrecognised event: {event}")]
    UnrecognisedEvent {
        /// Event name as received.
        event: String,
    },

    /// A formal parameter of the event was not supplied.
    #[error("{event} requires parameter '{param}'")]
    MissingParameter {
        /// Event being dispatched.
        event: EventId,
        /// Missing parameter.
        param: Param,
    },

    /// A parameter could not be decoded into the asset's type.
    #[error("failed to decode {param}: {source}")]
    Decode {
        /// Parameter being decoded.
        param: Param,
        /// Decoder failure.
        #[source]
        source: DecodeError,
    },

    /// A parameter decoded to an absent value.
    #[error("{param} decoded to an absent value")]
    AbsentValue {
        /// Parameter that was absent.
        param: Param,
    },

    /// An indexed-only event was sent to a plain topic channel.
    #[error("{event} is not supported by a {kind} view")]
    UnsupportedOperation {
        /// Rejected event.
        event: EventId,
        /// Kind of the bound view.
        kind: ViewKind,
    },

    /// A subscription with this tid is already live on the binding.
    #[error("a subscription with tid {tid} is already live")]
    DuplicateSubscription {
        /// Conflicting tid.
        tid: Tid,
    },

    /// No live subscription with this tid exists on the binding.
    #[error("no live subscription with tid {tid}")]
    NoSubscription {
        /// Requested tid.
        tid: Tid,
    },

    /// The view rejected the operation.
    #[error("view rejected the operation: {0}")]
    View(#[from] ViewError),

    /// Writing to the connection failed.
    #[error(transparent)]
    Publish(#[from] PublishError),

    /// Internal error (e.g., lock poisoned).
    #[error("internal error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl DispatchError {
    /// Stable machine-readable name carried in error units.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedDocument(_) | Self::DocumentTooLarge { .. } => "malformed_document",
            Self::UnknownAsset { .. } => "unknown_asset",
            Self::UnrecognisedEvent { .. } => "unrecognised_event",
            Self::MissingParameter { .. } | Self::Decode { .. } | Self::AbsentValue { .. } => {
                "decode"
            }
            Self::UnsupportedOperation { .. } => "unsupported_operation",
            Self::DuplicateSubscription { .. } | Self::NoSubscription { .. } => "subscription",
            Self::View(_) => "view",
            Self::Publish(_) => "publish",
            Self::Internal { .. } => "internal",
        }
    }

    /// Returns `false` for failures of the connection itself, which cannot be
    /// reported over it.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, Self::Publish(_))
    }

    /// Body of the error unit sent to the client.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody::new(self.kind(), self.to_string())
    }

    /// Creates a malformed document error.
    pub fn malformed(source: WireError) -> Self {
        Self::MalformedDocument(source)
    }

    /// Creates a document too large error.
    pub fn document_too_large(max_size: usize) -> Self {
        Self::DocumentTooLarge { max_size }
    }

    /// Creates an unknown asset error.
    pub fn unknown_asset(csp: impl Into<String>) -> Self {
        Self::UnknownAsset { csp: csp.into() }
    }

    /// Creates an unrecognised event error.
    pub fn unrecognised_event(event: impl Into<String>) -> Self {
        Self::UnrecognisedEvent {
            event: event.into(),
        }
    }

    /// Creates a missing parameter error.
    pub fn missing_parameter(event: EventId, param: Param) -> Self {
        Self::MissingParameter { event, param }
    }

    /// Creates a decode error.
    pub fn decode(param: Param, source: DecodeError) -> Self {
        Self::Decode { param, source }
    }

    /// Creates an absent value error.
    pub fn absent_value(param: Param) -> Self {
        Self::AbsentValue { param }
    }

    /// Creates an unsupported operation error.
    pub fn unsupported_operation(event: EventId, kind: ViewKind) -> Self {
        Self::UnsupportedOperation { event, kind }
    }

    /// Creates a duplicate subscription error.
    pub fn duplicate_subscription(tid: Tid) -> Self {
        Self::DuplicateSubscription { tid }
    }

    /// Creates a missing subscription error.
    pub fn no_subscription(tid: Tid) -> Self {
        Self::NoSubscription { tid }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
