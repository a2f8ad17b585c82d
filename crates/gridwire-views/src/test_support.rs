//! Test doubles shared by the view unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::subscriber::TopicSubscriber;

/// Subscriber that records everything it is handed.
#[derive(Default)]
pub(crate) struct RecordingSubscriber {
    messages: Mutex<Vec<(String, i64)>>,
    ends: AtomicUsize,
    late_message: AtomicBool,
}

impl RecordingSubscriber {
    pub(crate) fn messages(&self) -> Vec<(String, i64)> {
        self.messages.lock().expect("messages lock").clone()
    }

    pub(crate) fn end_count(&self) -> usize {
        self.ends.load(Ordering::SeqCst)
    }

    pub(crate) fn saw_message_after_end(&self) -> bool {
        self.late_message.load(Ordering::SeqCst)
    }
}

impl TopicSubscriber<String, i64> for RecordingSubscriber {
    fn on_message(&self, topic: &String, message: &i64) {
        if self.ends.load(Ordering::SeqCst) > 0 {
            self.late_message.store(true, Ordering::SeqCst);
        }
        self.messages
            .lock()
            .expect("messages lock")
            .push((topic.clone(), *message));
    }

    fn on_end_of_subscription(&self) {
        self.ends.fetch_add(1, Ordering::SeqCst);
    }
}

/// Subscriber whose deliveries block until [`release`](Self::release) is
/// called, standing in for a client that stopped reading.
#[derive(Default)]
pub(crate) struct GatedSubscriber {
    open: Mutex<bool>,
    opened: Condvar,
    entered: AtomicUsize,
    recorder: RecordingSubscriber,
}

impl GatedSubscriber {
    pub(crate) fn release(&self) {
        *self.open.lock().expect("gate lock") = true;
        self.opened.notify_all();
    }

    /// Waits until a delivery is parked on the gate.
    pub(crate) fn wait_until_blocked(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.entered.load(Ordering::SeqCst) > 0 {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    pub(crate) fn messages(&self) -> Vec<(String, i64)> {
        self.recorder.messages()
    }
}

impl TopicSubscriber<String, i64> for GatedSubscriber {
    fn on_message(&self, topic: &String, message: &i64) {
        self.entered.fetch_add(1, Ordering::SeqCst);
        let open = self.open.lock().expect("gate lock");
        let released = self
            .opened
            .wait_while(open, |open| !*open)
            .expect("gate lock");
        drop(released);
        self.recorder.on_message(topic, message);
    }

    fn on_end_of_subscription(&self) {
        self.recorder.on_end_of_subscription();
    }
}
