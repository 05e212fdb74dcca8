//! Hooks into the lifecycle of calls.

use std::fmt::Debug;

use crate::{Call, ErrorKind};

/// Observes the lifecycle of every call made through a [`Client`](crate::Client).
///
/// Hooks run inline on the task driving the call and must not block.
/// All methods default to doing nothing.
pub trait EventListener: Send + Sync + Debug {
    /// [`Call::execute`] or [`Call::enqueue`] was invoked
    fn call_start(&self, _call: &Call) {}

    /// The call produced a response
    fn call_end(&self, _call: &Call) {}

    /// The call failed or was canceled
    fn call_failed(&self, _call: &Call, _error: &ErrorKind) {}
}

/// The default listener: reports call lifecycle events to the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventListener;

impl EventListener for LogEventListener {
    fn call_start(&self, call: &Call) {
        log::debug!("Starting {call}");
    }

    fn call_end(&self, call: &Call) {
        log::debug!("Finished {call}");
    }

    fn call_failed(&self, call: &Call, error: &ErrorKind) {
        if error.is_canceled() {
            log::debug!("Canceled {call}");
        } else {
            log::warn!("Failed {call}: {error}");
        }
    }
}
