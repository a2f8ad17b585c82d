//! TCP listener for client connections.
//!
//! The listener accepts connections in a background thread and hands each one
//! to a [`ConnectionHandler`] on its own thread.

mod errors;
mod listener;

use std::net::TcpStream;

pub(crate) use self::errors::ListenerError;
pub(crate) use self::listener::{ListenerHandle, SocketListener};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// Handles accepted client connections.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Serves a single connection until the client goes away. Implementations
    /// should avoid panicking.
    fn handle(&self, stream: TcpStream);
}
