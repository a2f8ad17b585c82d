//! Built-in default values for gridwire configuration.

use crate::listen::ListenEndpoint;
use crate::logging::LogFormat;

/// Default host the daemon binds to.
pub const DEFAULT_LISTEN_HOST: &str = "127.0.0.1";

/// Default TCP port for the daemon.
pub const DEFAULT_LISTEN_PORT: u16 = 9780;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Index assigned to the first record of a fresh indexed log.
pub const DEFAULT_START_INDEX: u64 = 0;

/// Default log filter expression.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default log output format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default listen endpoint.
#[must_use]
pub fn default_listen_endpoint() -> ListenEndpoint {
    ListenEndpoint::new(DEFAULT_LISTEN_HOST, DEFAULT_LISTEN_PORT)
}

/// Default first index for indexed logs.
#[must_use]
pub const fn default_start_index() -> u64 {
    DEFAULT_START_INDEX
}
