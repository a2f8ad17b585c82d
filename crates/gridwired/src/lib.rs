//! The gridwire daemon.
//!
//! `gridwired` mounts the assets named in its configuration into an asset
//! tree, each with a topic channel or an indexed log attached, and serves the
//! document protocol from [`gridwire_wire`] to TCP clients. A client may
//! address any number of assets over one connection and interleave requests
//! freely; every unit written back is correlated to the request that caused
//! it by its tid.
//!
//! Startup follows a fixed sequence, each stage reported through a
//! [`HealthReporter`]:
//!
//! 1. resolve configuration (defaults, TOML file, environment and CLI);
//! 2. install the global tracing subscriber;
//! 3. mount configured assets;
//! 4. bind the listener and serve until SIGTERM or SIGINT.
//!
//! On shutdown every mounted view is closed, so each live subscription
//! receives its end notice before the process exits.

mod asset;
mod bootstrap;
pub mod dispatch;
mod health;
pub mod outbound;
mod process;
pub mod telemetry;
mod transport;

pub use asset::{Asset, AssetError, AssetTree, TopicBinding, ViewBinding, json_binding};
pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon, run_daemon_with,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
