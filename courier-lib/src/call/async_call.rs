use std::fmt;
use std::sync::Arc;

use super::{Call, Callback};
use crate::dispatcher::FinishGuard;
use crate::{ErrorKind, HostKey};

/// A [`Call`] bound to its completion callback.
///
/// Owned by the dispatcher while queued or running. Cloning only copies the
/// handles, so the dispatcher's running set and the spawned task can both
/// hold one.
#[derive(Clone)]
pub(crate) struct AsyncCall {
    call: Call,
    callback: Arc<dyn Callback>,
}

impl AsyncCall {
    pub(crate) fn new(call: Call, callback: Arc<dyn Callback>) -> Self {
        Self { call, callback }
    }

    pub(crate) fn call(&self) -> &Call {
        &self.call
    }

    pub(crate) fn host(&self) -> &HostKey {
        self.call.request().host()
    }

    /// Drive the chain and report the outcome.
    ///
    /// `finished` is released after the callback has returned, so the call
    /// occupies its dispatcher slot until its callback is done.
    pub(crate) async fn run(self, finished: FinishGuard) {
        let call = &self.call;
        let listener = Arc::clone(call.client().event_listener());
        log::trace!("Running {call}");

        match call.response_with_interceptor_chain().await {
            Ok(_) if call.is_canceled() => {
                let error = ErrorKind::Canceled;
                listener.call_failed(call, &error);
                self.callback.on_failure(call, error);
            }
            Ok(response) => {
                listener.call_end(call);
                self.callback.on_response(call, response);
            }
            Err(error) => {
                listener.call_failed(call, &error);
                self.callback.on_failure(call, error);
            }
        }

        drop(finished);
    }
}

impl fmt::Debug for AsyncCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncCall")
            .field("call", &self.call)
            .finish_non_exhaustive()
    }
}
