use std::collections::VecDeque;

use crate::Call;
use crate::call::{AsyncCall, CallId};

use super::DispatcherConfig;

/// Everything the dispatcher guards with its single lock.
///
/// Methods never spawn anything themselves: they move calls between the
/// collections and hand back the calls that were admitted, so the caller
/// can submit them after releasing the lock.
#[derive(Debug)]
pub(super) struct State {
    pub(super) max_requests: usize,
    pub(super) max_requests_per_host: usize,
    /// Async calls waiting for admission, in the order they will be considered
    ready: VecDeque<AsyncCall>,
    /// Running async calls, including canceled ones that have not finished yet
    running_async: Vec<AsyncCall>,
    /// Running synchronous calls, including canceled ones that have not finished yet
    running_sync: Vec<Call>,
}

impl State {
    pub(super) fn new(config: DispatcherConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            max_requests_per_host: config.max_requests_per_host,
            ready: VecDeque::new(),
            running_async: Vec::new(),
            running_sync: Vec::new(),
        }
    }

    /// Run `call` right away if both limits allow it, otherwise queue it.
    /// Returns the call if it was admitted.
    pub(super) fn admit(&mut self, call: AsyncCall) -> Option<AsyncCall> {
        if self.running_async.len() < self.max_requests && self.has_host_capacity(&call) {
            self.running_async.push(call.clone());
            Some(call)
        } else {
            self.ready.push_back(call);
            None
        }
    }

    /// Move queued calls into the running set while capacity allows.
    ///
    /// Scans the whole ready queue: a call blocked by its host limit does not
    /// block later calls for other hosts. Stops once the global limit is hit.
    pub(super) fn promote(&mut self) -> Vec<AsyncCall> {
        let mut promoted = Vec::new();
        let mut index = 0;
        while index < self.ready.len() && self.running_async.len() < self.max_requests {
            if self.has_host_capacity(&self.ready[index]) {
                if let Some(call) = self.ready.remove(index) {
                    self.running_async.push(call.clone());
                    promoted.push(call);
                }
            } else {
                index += 1;
            }
        }
        promoted
    }

    /// Whether another call for the same host fits under the per-host limit.
    /// Upgrade calls are checked against that limit but never counted in it.
    fn has_host_capacity(&self, call: &AsyncCall) -> bool {
        self.running_calls_for_host(call) < self.max_requests_per_host
    }

    fn running_calls_for_host(&self, call: &AsyncCall) -> usize {
        self.running_async
            .iter()
            .filter(|running| !running.call().is_upgrade() && running.host() == call.host())
            .count()
    }

    pub(super) fn add_sync(&mut self, call: Call) {
        self.running_sync.push(call);
    }

    /// Returns `false` if the call was not registered as running
    pub(super) fn remove_sync(&mut self, id: CallId) -> bool {
        remove_by_id(&mut self.running_sync, id, |call| call.id())
    }

    /// Returns `false` if the call was not registered as running
    pub(super) fn remove_async(&mut self, id: CallId) -> bool {
        remove_by_id(&mut self.running_async, id, |call| call.call().id())
    }

    pub(super) fn running_calls_count(&self) -> usize {
        self.running_async.len() + self.running_sync.len()
    }

    pub(super) fn queued_calls_count(&self) -> usize {
        self.ready.len()
    }

    pub(super) fn queued_calls(&self) -> impl Iterator<Item = &Call> {
        self.ready.iter().map(AsyncCall::call)
    }

    pub(super) fn running_calls(&self) -> impl Iterator<Item = &Call> {
        self.running_sync
            .iter()
            .chain(self.running_async.iter().map(AsyncCall::call))
    }

    #[cfg(test)]
    pub(super) fn running_async_calls(&self) -> impl Iterator<Item = &Call> {
        self.running_async.iter().map(AsyncCall::call)
    }

    pub(super) fn all_calls(&self) -> impl Iterator<Item = &Call> {
        self.queued_calls().chain(self.running_calls())
    }
}

fn remove_by_id<T>(items: &mut Vec<T>, id: CallId, id_of: impl Fn(&T) -> CallId) -> bool {
    match items.iter().position(|item| id_of(item) == id) {
        Some(index) => {
            items.remove(index);
            true
        }
        None => false,
    }
}
