//! Errors raised by view operations.

use thiserror::Error;

/// Errors surfaced by channels and logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    /// The same subscriber instance is already registered on this channel.
    #[error("subscriber is already registered on this channel")]
    AlreadyRegistered,

    /// The channel has been closed and accepts no further work.
    #[error("channel is closed")]
    Closed,

    /// The log has assigned every representable index.
    #[error("index space exhausted after {last}")]
    IndexExhausted {
        /// Last index that was assigned.
        last: u64,
    },
}
