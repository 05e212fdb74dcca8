use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use super::Call;
use crate::types::Result;
use crate::{ErrorKind, Response};

/// Receives the outcome of an enqueued [`Call`].
///
/// Exactly one of the two methods is invoked per call, on a runtime worker,
/// after the interceptor chain has finished. A call that was canceled before
/// completing is reported through [`Callback::on_failure`] with
/// [`ErrorKind::Canceled`], even if a response had already been produced.
pub trait Callback: Send + Sync {
    /// The chain produced a response.
    ///
    /// A response with an error status code is still a response; only
    /// transport failures and cancellation count as failures.
    fn on_response(&self, call: &Call, response: Response);

    /// The chain failed or the call was canceled
    fn on_failure(&self, call: &Call, error: ErrorKind);
}

/// Bridges the callback protocol to a future, see [`Call::enqueue_future`]
#[derive(Debug)]
pub(crate) struct OneshotCallback {
    sender: Mutex<Option<oneshot::Sender<Result<Response>>>>,
}

impl OneshotCallback {
    pub(crate) fn new() -> (Self, PendingResponse) {
        let (sender, receiver) = oneshot::channel();
        let callback = Self {
            sender: Mutex::new(Some(sender)),
        };
        (callback, PendingResponse { receiver })
    }

    fn complete(&self, result: Result<Response>) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(sender) = sender {
            // The receiver may have been dropped; nobody is waiting then.
            let _ = sender.send(result);
        }
    }
}

impl Callback for OneshotCallback {
    fn on_response(&self, _call: &Call, response: Response) {
        self.complete(Ok(response));
    }

    fn on_failure(&self, _call: &Call, error: ErrorKind) {
        self.complete(Err(error));
    }
}

/// The eventual result of a call started with [`Call::enqueue_future`].
///
/// Dropping it does not cancel the call; use [`Call::cancel`] for that.
#[derive(Debug)]
#[must_use = "the result of the call is only observable by awaiting this future"]
pub struct PendingResponse {
    receiver: oneshot::Receiver<Result<Response>>,
}

impl Future for PendingResponse {
    type Output = Result<Response>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(ErrorKind::Abandoned)))
    }
}
