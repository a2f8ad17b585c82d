//! Test suites for the gridwire daemon.

pub(crate) mod support;
