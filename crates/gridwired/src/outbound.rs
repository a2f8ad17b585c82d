//! Per-connection outbound sink.
//!
//! Every byte written to a connection goes through [`OutboundPublisher::put`].
//! The writer closure encodes into a scratch [`FrameBuffer`] while the sink
//! mutex is held, and the finished unit is written with a single `write_all`
//! before the mutex is released. Replies from the connection thread and pushes
//! from producer threads therefore never interleave.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

use strum::{Display, IntoStaticStr};
use thiserror::Error;
use tracing::debug;

use gridwire_wire::{FrameBuffer, WireError};

const OUTBOUND_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::outbound");

/// Why a unit is being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum PutContext {
    /// Synchronous reply to a request.
    Reply,
    /// Asynchronous push for a live subscription.
    Push,
    /// Terminal notice for a subscription; carries no payload.
    EndOfSubscription,
    /// Error reply to a request.
    Error,
}

/// Errors raised while writing an outbound unit.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The connection was closed before the unit could be written.
    #[error("outbound channel is closed")]
    Closed,
    /// The writer failed to encode the unit; nothing was written.
    #[error("failed to encode {context} unit: {source}")]
    Encode {
        /// Kind of unit being written.
        context: PutContext,
        /// Underlying encoding error.
        #[source]
        source: WireError,
    },
    /// The sink rejected the unit. The publisher is closed afterwards.
    #[error("failed to write {context} unit: {source}")]
    Io {
        /// Kind of unit being written.
        context: PutContext,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

struct SinkState {
    sink: Box<dyn Write + Send>,
    scratch: FrameBuffer,
    closed: bool,
}

/// Exclusive writer for one connection.
pub struct OutboundPublisher {
    state: Mutex<SinkState>,
}

impl OutboundPublisher {
    /// Wraps a sink.
    pub fn new(sink: impl Write + Send + 'static) -> Self {
        Self {
            state: Mutex::new(SinkState {
                sink: Box::new(sink),
                scratch: FrameBuffer::new(),
                closed: false,
            }),
        }
    }

    /// Runs `writer` with exclusive access to the sink and emits what it
    /// encoded as one contiguous unit.
    ///
    /// A writer that fails leaves nothing on the wire. An empty unit is not
    /// written at all.
    pub fn put<F>(&self, context: PutContext, writer: F) -> Result<(), PublishError>
    where
        F: FnOnce(&mut FrameBuffer) -> Result<(), WireError>,
    {
        let mut state = self.lock();
        if state.closed {
            return Err(PublishError::Closed);
        }
        state.scratch.clear();
        writer(&mut state.scratch).map_err(|source| PublishError::Encode { context, source })?;
        if state.scratch.is_empty() {
            return Ok(());
        }

        let written = {
            let SinkState { sink, scratch, .. } = &mut *state;
            sink.write_all(scratch.as_bytes()).and_then(|()| sink.flush())
        };
        state.scratch.clear();
        if let Err(source) = written {
            state.closed = true;
            return Err(PublishError::Io { context, source });
        }
        Ok(())
    }

    /// Refuses every later [`put`](Self::put).
    pub fn close(&self) {
        self.lock().closed = true;
    }

    /// Returns `true` once the publisher has been closed.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        // A writer that panicked may have left a partial unit on the wire, so
        // the connection cannot be trusted afterwards.
        self.state.lock().unwrap_or_else(|poisoned| {
            let mut state = poisoned.into_inner();
            if !state.closed {
                debug!(target: OUTBOUND_TARGET, "closing outbound channel after writer panic");
                state.closed = true;
            }
            state
        })
    }
}

impl fmt::Debug for OutboundPublisher {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("OutboundPublisher")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
