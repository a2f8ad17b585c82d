//! Shared configuration for the gridwire daemon.
//!
//! [`Config`] derives [`OrthoConfig`], which layers its sources in order of
//! increasing precedence:
//!
//! 1. built-in defaults from [`defaults`];
//! 2. a TOML file named by `--config-path` or `GRIDWIRE_CONFIG_PATH`;
//! 3. `GRIDWIRE_*` environment variables, e.g. `GRIDWIRE_LISTEN`;
//! 4. command-line flags, e.g. `--listen 0.0.0.0:9780`.
//!
//! A configuration file only needs to name the fields it changes:
//!
//! ```toml
//! listen = "0.0.0.0:9780"
//! log_format = "compact"
//!
//! [[assets]]
//! path = "/market/prices"
//!
//! [[assets]]
//! path = "/market/trades"
//! kind = "indexed"
//! start_index = 1000
//! ```
//!
//! Assets given with `--asset /path[=kind]` are appended to those read from
//! lower layers. The merged list is checked by [`Config::validate`].

mod asset;
pub mod defaults;
mod listen;
mod logging;

use std::collections::HashSet;
use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::asset::{AssetKind, AssetSpec, AssetSpecError};
pub use self::defaults::{
    DEFAULT_LISTEN_HOST, DEFAULT_LISTEN_PORT, DEFAULT_LOG_FILTER, default_listen_endpoint,
    default_log_filter, default_log_format,
};
pub use self::listen::{ListenEndpoint, ListenParseError};
pub use self::logging::{LogFormat, LogFormatParseError};

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "GRIDWIRE")]
pub struct Config {
    /// Address the daemon listens on, as `host:port`.
    #[serde(default = "crate::defaults::default_listen_endpoint")]
    pub listen: ListenEndpoint,
    /// Tracing filter directive, e.g. `info,gridwired=debug`.
    #[serde(default = "crate::defaults::default_log_filter_string")]
    pub log_filter: String,
    /// Log output format (`json` or `compact`).
    #[serde(default = "crate::defaults::default_log_format")]
    pub log_format: LogFormat,
    /// Assets mounted at startup, as `/path` or `/path=indexed`.
    #[serde(default)]
    #[ortho_config(cli_long = "asset")]
    pub assets: Vec<AssetSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen_endpoint(),
            log_filter: defaults::default_log_filter_string(),
            log_format: default_log_format(),
            assets: Vec::new(),
        }
    }
}

impl Config {
    /// Loads and validates configuration from the process arguments and
    /// environment.
    ///
    /// # Errors
    ///
    /// See [`Config::load_validated_from_iter`].
    pub fn load_validated() -> Result<Self, ConfigError> {
        Self::load_validated_from_iter(std::env::args_os())
    }

    /// Loads configuration from an explicit argument list and validates the
    /// merged result. The first item is the program name, as with
    /// [`std::env::args_os`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] when any layer cannot be read or parsed,
    /// and the errors described on [`Config::validate`] otherwise.
    pub fn load_validated_from_iter<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = OsString>,
    {
        let config = Self::load_from_iter(args)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks asset paths and rejects duplicate mounts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Asset`] for a malformed path or
    /// [`ConfigError::DuplicateAsset`] when a path is listed twice.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for asset in &self.assets {
            asset.validate()?;
            if !seen.insert(asset.path.as_str()) {
                return Err(ConfigError::DuplicateAsset {
                    path: asset.path.clone(),
                });
            }
        }
        Ok(())
    }

    /// Address the daemon listens on.
    #[must_use]
    pub const fn listen(&self) -> &ListenEndpoint {
        &self.listen
    }

    /// Tracing filter directive.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Assets mounted at startup.
    #[must_use]
    pub fn assets(&self) -> &[AssetSpec] {
        &self.assets
    }
}

/// Errors raised while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A layer could not be read, parsed or merged.
    #[error(transparent)]
    Load(#[from] Arc<OrthoError>),
    /// An asset spec failed validation.
    #[error(transparent)]
    Asset(#[from] AssetSpecError),
    /// The same asset path was configured twice.
    #[error("asset '{path}' is configured more than once")]
    DuplicateAsset {
        /// Repeated path.
        path: String,
    },
}
