//! Admission control and scheduling for calls.
//!
//! The [`Dispatcher`] decides when an enqueued call may start. It enforces a
//! global limit on running asynchronous calls and a limit per host, parks
//! everything else in a ready queue, and promotes queued calls whenever a
//! running call finishes or a limit is raised.
//!
//! # Architecture
//!
//! - [`DispatcherConfig`]: the two admission limits
//! - `State`: ready queue, running sets and limits behind one mutex; every
//!   admit, finish and promote happens inside that single critical section
//! - `FinishGuard` / `SyncGuard`: RAII handles that report completion to the
//!   dispatcher when dropped, whatever way the call ended
//!
//! Admitted calls run as tasks on the tokio runtime whose [`Handle`] the
//! dispatcher owns. Synchronous calls ([`Call::execute`]) run in the
//! caller's task and are only tracked, never queued.

mod config;
mod state;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;

pub use config::DispatcherConfig;
use config::check_limit;
use state::State;

use crate::call::{AsyncCall, CallId};
use crate::types::Result;
use crate::{Call, ErrorKind};

/// Invoked every time the dispatcher becomes idle
pub type IdleCallback = Arc<dyn Fn() + Send + Sync>;

/// Policy on when asynchronous calls are executed.
///
/// One dispatcher is shared by every call issued through a [`Client`](crate::Client)
/// and all clones of it.
pub struct Dispatcher {
    state: Mutex<State>,
    idle_callback: Mutex<Option<IdleCallback>>,
    executor: Handle,
}

impl Dispatcher {
    /// Create a dispatcher that runs calls on the current tokio runtime
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::NoRuntime`] if called outside of a tokio runtime.
    /// - [`ErrorKind::InvalidLimit`] if a limit in `config` is zero.
    pub fn new(config: DispatcherConfig) -> Result<Self> {
        let executor = Handle::try_current().map_err(|_| ErrorKind::NoRuntime)?;
        Self::with_executor(config, executor)
    }

    /// Create a dispatcher that runs calls on the runtime behind `executor`
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidLimit`] if a limit in `config` is zero.
    pub fn with_executor(config: DispatcherConfig, executor: Handle) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: Mutex::new(State::new(config)),
            idle_callback: Mutex::new(None),
            executor,
        })
    }

    // Poisoning is ignored: every critical section leaves `State` consistent.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Maximum number of asynchronous calls running concurrently
    #[must_use]
    pub fn max_requests(&self) -> usize {
        self.lock().max_requests
    }

    /// Set the maximum number of asynchronous calls to run concurrently.
    ///
    /// Calls above this limit wait in memory for running calls to complete.
    /// Raising the limit starts queued calls immediately. If more calls are
    /// in flight than the new limit allows, they keep running.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidLimit`] if `max_requests` is zero.
    pub fn set_max_requests(self: &Arc<Self>, max_requests: usize) -> Result<()> {
        check_limit("max_requests", max_requests)?;
        let promoted = {
            let mut state = self.lock();
            state.max_requests = max_requests;
            state.promote()
        };
        self.submit(promoted);
        Ok(())
    }

    /// Maximum number of asynchronous calls running concurrently per host
    #[must_use]
    pub fn max_requests_per_host(&self) -> usize {
        self.lock().max_requests_per_host
    }

    /// Set the maximum number of asynchronous calls to run concurrently
    /// against one host.
    ///
    /// The limit is keyed by host name, so several host names served by the
    /// same address can together exceed it. Running upgrade calls do not count.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidLimit`] if `max_requests_per_host` is zero.
    pub fn set_max_requests_per_host(
        self: &Arc<Self>,
        max_requests_per_host: usize,
    ) -> Result<()> {
        check_limit("max_requests_per_host", max_requests_per_host)?;
        let promoted = {
            let mut state = self.lock();
            state.max_requests_per_host = max_requests_per_host;
            state.promote()
        };
        self.submit(promoted);
        Ok(())
    }

    /// Set a callback to invoke each time the number of running calls drops to zero.
    ///
    /// Asynchronous calls count as running until their [`Callback`](crate::Callback)
    /// has returned; synchronous calls until [`Call::execute`] returns.
    /// The callback runs outside of the dispatcher's lock and may start new calls.
    pub fn set_idle_callback(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self.idle_callback_slot() = Some(Arc::new(callback));
    }

    /// Remove the idle callback
    pub fn clear_idle_callback(&self) {
        *self.idle_callback_slot() = None;
    }

    fn idle_callback_slot(&self) -> MutexGuard<'_, Option<IdleCallback>> {
        self.idle_callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit `call` or queue it behind the limits
    pub(crate) fn enqueue(self: &Arc<Self>, call: AsyncCall) {
        let admitted = {
            let mut state = self.lock();
            let admitted = state.admit(call.clone());
            if admitted.is_none() {
                log::debug!(
                    "Queued {} ({} waiting, {} running)",
                    call.call(),
                    state.queued_calls_count(),
                    state.running_calls_count()
                );
            }
            admitted
        };
        if let Some(call) = admitted {
            log::debug!("Admitted {}", call.call());
            self.submit(vec![call]);
        }
    }

    /// Start admitted calls on the executor.
    ///
    /// Each call gets its `FinishGuard` before being spawned, so a task that
    /// never runs still gives its slot back.
    fn submit(self: &Arc<Self>, calls: Vec<AsyncCall>) {
        for call in calls {
            let finished = FinishGuard {
                dispatcher: Arc::clone(self),
                id: call.call().id(),
            };
            self.executor.spawn(call.run(finished));
        }
    }

    /// Track a synchronous call until the returned guard is dropped
    pub(crate) fn executed(self: &Arc<Self>, call: &Call) -> SyncGuard {
        self.lock().add_sync(call.clone());
        SyncGuard {
            dispatcher: Arc::clone(self),
            id: call.id(),
        }
    }

    fn finished_async(self: &Arc<Self>, id: CallId) {
        let (promoted, idle) = {
            let mut state = self.lock();
            if !state.remove_async(id) {
                log::warn!("Call {id} finished but was not running");
            }
            let promoted = state.promote();
            for call in &promoted {
                log::debug!("Promoted {}", call.call());
            }
            (promoted, state.running_calls_count() == 0)
        };
        self.submit(promoted);
        if idle {
            self.notify_idle();
        }
    }

    fn finished_sync(&self, id: CallId) {
        let idle = {
            let mut state = self.lock();
            if !state.remove_sync(id) {
                log::warn!("Call {id} finished but was not running");
            }
            state.running_calls_count() == 0
        };
        if idle {
            self.notify_idle();
        }
    }

    fn notify_idle(&self) {
        let callback = self.idle_callback_slot().clone();
        if let Some(callback) = callback {
            log::trace!("Dispatcher is idle");
            callback();
        }
    }

    /// Cancel all queued and running calls, synchronous and asynchronous.
    ///
    /// Queued calls stay queued; they fail with [`ErrorKind::Canceled`] once
    /// admitted. Calls that already finished are unaffected.
    pub fn cancel_all(&self) {
        let state = self.lock();
        for call in state.all_calls() {
            call.cancel();
        }
    }

    /// A snapshot of the calls currently waiting for admission
    #[must_use]
    pub fn queued_calls(&self) -> Vec<Call> {
        self.lock().queued_calls().cloned().collect()
    }

    /// A snapshot of the calls currently running, synchronous ones first
    #[must_use]
    pub fn running_calls(&self) -> Vec<Call> {
        self.lock().running_calls().cloned().collect()
    }

    /// Number of calls waiting for admission
    #[must_use]
    pub fn queued_calls_count(&self) -> usize {
        self.lock().queued_calls_count()
    }

    /// Number of running calls, synchronous and asynchronous
    #[must_use]
    pub fn running_calls_count(&self) -> usize {
        self.lock().running_calls_count()
    }

    #[cfg(test)]
    fn running_async_calls(&self) -> Vec<Call> {
        self.lock().running_async_calls().cloned().collect()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Dispatcher")
            .field("max_requests", &state.max_requests)
            .field("max_requests_per_host", &state.max_requests_per_host)
            .field("queued", &state.queued_calls_count())
            .field("running", &state.running_calls_count())
            .finish_non_exhaustive()
    }
}

/// Reports the end of an asynchronous call when dropped
pub(crate) struct FinishGuard {
    dispatcher: Arc<Dispatcher>,
    id: CallId,
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.dispatcher.finished_async(self.id);
    }
}

/// Reports the end of a synchronous call when dropped
pub(crate) struct SyncGuard {
    dispatcher: Arc<Dispatcher>,
    id: CallId,
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        self.dispatcher.finished_sync(self.id);
    }
}
