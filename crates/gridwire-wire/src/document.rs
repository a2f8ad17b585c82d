//! Inbound request documents.
//!
//! A document is parsed from one newline-terminated line. Trailing whitespace,
//! including the delimiter, is trimmed before parsing. The parameter object is
//! optional; a missing object behaves like an empty one. Tid 0 is reserved
//! for errors raised before a request's tid is known, so clients must not use
//! it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::WireError;
use crate::event::Param;
use crate::frame::Tid;

/// One decoded inbound request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundDocument {
    csp: String,
    tid: Tid,
    event: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    params: Map<String, Value>,
}

impl InboundDocument {
    /// Creates a document without parameters.
    pub fn new(csp: impl Into<String>, tid: Tid, event: impl Into<String>) -> Self {
        Self {
            csp: csp.into(),
            tid,
            event: event.into(),
            params: Map::new(),
        }
    }

    /// Adds a named parameter, replacing any previous value.
    #[must_use]
    pub fn with_param(mut self, param: Param, value: impl Into<Value>) -> Self {
        self.params.insert(param.as_str().to_owned(), value.into());
        self
    }

    /// Parses one JSONL line into a document.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Malformed`] if the line is blank, does not match
    /// the document schema or carries the reserved [`Tid::UNKNOWN`].
    pub fn parse(line: &[u8]) -> Result<Self, WireError> {
        let trimmed = trim_trailing_whitespace(line);
        if trimmed.is_empty() {
            return Err(WireError::malformed("empty document"));
        }
        let document: Self =
            serde_json::from_slice(trimmed).map_err(WireError::from_json_error)?;
        if document.tid == Tid::UNKNOWN {
            return Err(WireError::malformed(format!(
                "tid {} is reserved for protocol errors",
                Tid::UNKNOWN
            )));
        }
        Ok(document)
    }

    /// Serialises the document as a newline-terminated line.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Encode`] if serialisation fails.
    pub fn to_line(&self) -> Result<String, WireError> {
        let mut line = serde_json::to_string(self).map_err(WireError::Encode)?;
        line.push('\n');
        Ok(line)
    }

    /// Asset path the request is addressed to.
    #[must_use]
    pub fn csp(&self) -> &str {
        self.csp.as_str()
    }

    /// Correlation token supplied by the client.
    #[must_use]
    pub const fn tid(&self) -> Tid {
        self.tid
    }

    /// Raw event name, not yet matched against the event table.
    #[must_use]
    pub fn event(&self) -> &str {
        self.event.as_str()
    }

    /// Returns the raw value of a formal parameter, if present.
    #[must_use]
    pub fn param(&self, param: Param) -> Option<&Value> {
        self.params.get(param.as_str())
    }
}

fn trim_trailing_whitespace(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|byte| !byte.is_ascii_whitespace())
        .map_or(0, |pos| pos + 1);
    bytes.get(..end).unwrap_or_default()
}
