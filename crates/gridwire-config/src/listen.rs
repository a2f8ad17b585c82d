use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// TCP address the daemon listens on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct ListenEndpoint {
    host: String,
    port: u16,
}

impl ListenEndpoint {
    /// Builds an endpoint from its parts.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host name or address literal, without IPv6 brackets.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port; `0` asks the OS for an ephemeral port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ListenEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(formatter, "[{}]:{}", self.host, self.port)
        } else {
            write!(formatter, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for ListenEndpoint {
    type Err = ListenParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (raw_host, raw_port) = input
            .rsplit_once(':')
            .ok_or_else(|| ListenParseError::MissingPort(input.to_owned()))?;
        let host = raw_host
            .strip_prefix('[')
            .and_then(|inner| inner.strip_suffix(']'))
            .unwrap_or(raw_host);
        if host.is_empty() {
            return Err(ListenParseError::MissingHost(input.to_owned()));
        }
        let port = raw_port
            .parse::<u16>()
            .map_err(|_| ListenParseError::InvalidPort(input.to_owned()))?;
        Ok(Self::new(host, port))
    }
}

impl TryFrom<String> for ListenEndpoint {
    type Error = ListenParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ListenEndpoint> for String {
    fn from(endpoint: ListenEndpoint) -> Self {
        endpoint.to_string()
    }
}

/// Errors raised while parsing a [`ListenEndpoint`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListenParseError {
    /// No `:port` suffix was present.
    #[error("missing port in listen address '{0}'")]
    MissingPort(String),
    /// Nothing preceded the port.
    #[error("missing host in listen address '{0}'")]
    MissingHost(String),
    /// The port was not a number in `0..=65535`.
    #[error("invalid port in listen address '{0}'")]
    InvalidPort(String),
}
