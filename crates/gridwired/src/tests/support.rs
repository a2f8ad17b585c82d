//! Shared test doubles for the daemon suites.

use std::ffi::OsString;
use std::io::{self, BufRead, Write};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use gridwire_config::{AssetKind, AssetSpec, Config, ConfigError, ListenEndpoint};
use gridwire_wire::{OutboundPayload, Tid, TidHeader};

use crate::bootstrap::{BootstrapError, ConfigLoader};
use crate::health::HealthReporter;
use crate::process::{ShutdownError, ShutdownSignal};

/// In-memory sink shared between a publisher and the test.
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedSink {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedSink {
    /// Everything written so far.
    pub(crate) fn contents(&self) -> Vec<u8> {
        self.bytes.lock().expect("sink mutex poisoned").clone()
    }

    /// Written frames, one per line, without delimiters.
    pub(crate) fn lines(&self) -> Vec<String> {
        self.contents()
            .as_slice()
            .lines()
            .map(|line| line.expect("utf-8 frame"))
            .collect()
    }

    /// Written units as client-side types.
    pub(crate) fn units(&self) -> Vec<(Tid, OutboundPayload)> {
        let contents = self.contents();
        let mut reader = contents.as_slice();
        let mut units = Vec::new();
        while !reader.is_empty() {
            units.push(read_unit(&mut reader));
        }
        units
    }
}

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .expect("sink mutex poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink whose writes park until [`release`](Self::release), like a socket
/// whose peer stopped reading.
#[derive(Debug, Clone, Default)]
pub(crate) struct StalledSink {
    gate: Arc<(Mutex<bool>, Condvar)>,
    parked: Arc<AtomicBool>,
    inner: SharedSink,
}

impl StalledSink {
    pub(crate) fn release(&self) {
        let (open, opened) = &*self.gate;
        *open.lock().expect("gate mutex poisoned") = true;
        opened.notify_all();
    }

    /// Waits until a write is parked on the gate.
    pub(crate) fn wait_until_parked(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.parked.load(Ordering::SeqCst) {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    pub(crate) fn units(&self) -> Vec<(Tid, OutboundPayload)> {
        self.inner.units()
    }
}

impl Write for StalledSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.parked.store(true, Ordering::SeqCst);
        let (open, opened) = &*self.gate;
        let released = opened
            .wait_while(open.lock().expect("gate mutex poisoned"), |open| !*open)
            .expect("gate mutex poisoned");
        drop(released);
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Reads one two-frame unit.
pub(crate) fn read_unit(reader: &mut impl BufRead) -> (Tid, OutboundPayload) {
    let mut header = String::new();
    let mut payload = String::new();
    reader.read_line(&mut header).expect("read header frame");
    reader.read_line(&mut payload).expect("read payload frame");
    let TidHeader { tid } = serde_json::from_str(&header)
        .unwrap_or_else(|error| panic!("invalid header frame {header:?}: {error}"));
    let payload = OutboundPayload::parse(payload.trim_end().as_bytes())
        .unwrap_or_else(|error| panic!("invalid payload frame {payload:?}: {error}"));
    (tid, payload)
}

/// Structured health events tracked during tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    ListenerStarted(SocketAddr),
    ListenerStopped,
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub(crate) struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    pub(crate) fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    /// Address reported by the listener, once it has started.
    pub(crate) fn listener_address(&self) -> Option<SocketAddr> {
        self.events().into_iter().find_map(|event| match event {
            HealthEvent::ListenerStarted(address) => Some(address),
            _ => None,
        })
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn listener_started(&self, address: SocketAddr) {
        self.record(HealthEvent::ListenerStarted(address));
    }

    fn listener_stopped(&self) {
        self.record(HealthEvent::ListenerStopped);
    }
}

/// Configuration used by daemon tests: an ephemeral port and one asset of
/// each kind.
pub(crate) fn test_config() -> Config {
    Config {
        listen: ListenEndpoint::new("127.0.0.1", 0),
        log_filter: "warn".to_owned(),
        assets: vec![
            AssetSpec::new("/market/prices", AssetKind::Topic),
            AssetSpec::new("/market/trades", AssetKind::Indexed),
        ],
        ..Config::default()
    }
}

/// Loader returning [`test_config`].
#[derive(Debug, Default)]
pub(crate) struct TestConfigLoader;

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Ok(test_config())
    }
}

/// Loader that fails by passing an invalid listen address.
#[derive(Debug, Default)]
pub(crate) struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Config::load_validated_from_iter([
            OsString::from("gridwired"),
            OsString::from("--listen"),
            OsString::from("no-port-here"),
        ])
    }
}

/// Shutdown signal triggered by the test.
pub(crate) struct ManualShutdown {
    receiver: Mutex<Receiver<()>>,
}

impl ManualShutdown {
    pub(crate) fn new() -> (Sender<()>, Self) {
        let (sender, receiver) = mpsc::channel();
        (
            sender,
            Self {
                receiver: Mutex::new(receiver),
            },
        )
    }
}

impl ShutdownSignal for ManualShutdown {
    fn wait(&self) -> Result<(), ShutdownError> {
        // A dropped sender also counts as a request to stop.
        let _ = self.receiver.lock().expect("shutdown mutex poisoned").recv();
        Ok(())
    }
}
