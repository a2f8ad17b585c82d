//! Connection handler that serves the document protocol.
//!
//! A connection carries any number of documents, one per line, addressed to
//! any mounted asset. The first document a connection sends to an asset binds
//! a [`DocumentHandler`] for the pair; later documents reuse it. When the
//! client goes away every subscription the connection opened is ended.

use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Read};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;

use tracing::{debug, warn};

use gridwire_wire::{InboundDocument, Tid};

use crate::asset::AssetTree;
use crate::outbound::OutboundPublisher;
use crate::transport::ConnectionHandler;

use super::DISPATCH_TARGET;
use super::dispatcher::DocumentHandler;
use super::errors::DispatchError;
use super::response::write_error;

/// Maximum size of one inbound document, delimiter included.
pub(crate) const MAX_DOCUMENT_BYTES: usize = 1024 * 1024;

/// Serves the protocol for every accepted connection.
#[derive(Debug)]
pub(crate) struct DispatchConnectionHandler {
    assets: Arc<AssetTree>,
    max_document_bytes: usize,
}

impl DispatchConnectionHandler {
    /// Creates a handler resolving documents against `assets`.
    pub(crate) fn new(assets: Arc<AssetTree>) -> Self {
        Self {
            assets,
            max_document_bytes: MAX_DOCUMENT_BYTES,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_max_document_bytes(mut self, max_document_bytes: usize) -> Self {
        self.max_document_bytes = max_document_bytes;
        self
    }

    fn serve(&self, stream: TcpStream) {
        let writer = match stream.try_clone() {
            Ok(writer) => writer,
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "failed to clone connection stream");
                return;
            }
        };
        let publisher = Arc::new(OutboundPublisher::new(writer));
        let mut session = Session::new(&self.assets, Arc::clone(&publisher));
        let mut reader = BufReader::new(stream);
        let mut line = Vec::new();

        loop {
            match self.read_document(&mut reader, &mut line) {
                Ok(LineRead::Document) => session.dispatch(&line),
                Ok(LineRead::Blank) => {}
                Ok(LineRead::Eof) => {
                    debug!(target: DISPATCH_TARGET, "client closed the connection");
                    break;
                }
                Ok(LineRead::TooLarge) => {
                    write_error(
                        &publisher,
                        Tid::UNKNOWN,
                        &DispatchError::document_too_large(self.max_document_bytes),
                    );
                    break;
                }
                Err(error) => {
                    debug!(target: DISPATCH_TARGET, %error, "connection read failed");
                    break;
                }
            }
            if publisher.is_closed() {
                debug!(target: DISPATCH_TARGET, "outbound channel closed");
                break;
            }
        }

        session.end();
        publisher.close();
        if let Err(error) = reader.get_ref().shutdown(Shutdown::Both) {
            debug!(target: DISPATCH_TARGET, %error, "connection shutdown failed");
        }
    }

    fn read_document(
        &self,
        reader: &mut BufReader<TcpStream>,
        line: &mut Vec<u8>,
    ) -> io::Result<LineRead> {
        line.clear();
        let limit = u64::try_from(self.max_document_bytes)
            .unwrap_or(u64::MAX)
            .saturating_add(1);
        let read = reader.by_ref().take(limit).read_until(b'\n', line)?;
        if read == 0 {
            return Ok(LineRead::Eof);
        }
        if line.len() > self.max_document_bytes {
            return Ok(LineRead::TooLarge);
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            return Ok(LineRead::Blank);
        }
        Ok(LineRead::Document)
    }
}

impl ConnectionHandler for DispatchConnectionHandler {
    fn handle(&self, stream: TcpStream) {
        self.serve(stream);
    }
}

enum LineRead {
    Document,
    Blank,
    Eof,
    TooLarge,
}

/// Bindings opened by one connection, keyed by asset path.
struct Session<'a> {
    assets: &'a AssetTree,
    publisher: Arc<OutboundPublisher>,
    handlers: HashMap<String, Box<dyn DocumentHandler>>,
}

impl<'a> Session<'a> {
    fn new(assets: &'a AssetTree, publisher: Arc<OutboundPublisher>) -> Self {
        Self {
            assets,
            publisher,
            handlers: HashMap::new(),
        }
    }

    fn dispatch(&mut self, line: &[u8]) {
        let document = match InboundDocument::parse(line) {
            Ok(document) => document,
            Err(error) => {
                write_error(&self.publisher, Tid::UNKNOWN, &DispatchError::malformed(error));
                return;
            }
        };

        let Some((path, binding)) = self
            .assets
            .get_asset(document.csp())
            .and_then(|asset| asset.binding().map(|binding| (asset.full_name(), binding)))
        else {
            write_error(
                &self.publisher,
                document.tid(),
                &DispatchError::unknown_asset(document.csp()),
            );
            return;
        };

        let publisher = &self.publisher;
        self.handlers
            .entry(path)
            .or_insert_with(|| binding.bind(Arc::clone(publisher)))
            .handle(&document);
    }

    fn end(&mut self) {
        for (path, handler) in self.handlers.drain() {
            debug!(target: DISPATCH_TARGET, asset = %path, "ending connection bindings");
            handler.end_subscriptions();
        }
    }
}
