//! Single-use calls and their lifecycle.
//!
//! A [`Call`] is created by [`Client::new_call`](crate::Client::new_call)
//! and can be started exactly once, either in the caller's task with
//! [`Call::execute`] or through the [`Dispatcher`](crate::Dispatcher) with
//! [`Call::enqueue`] / [`Call::enqueue_future`].
//!
//! ```text
//! NOT_STARTED ──execute/enqueue──▶ RUNNING ──▶ COMPLETED | FAILED
//!      │                              │
//!      └──────────cancel()────────────┴──▶ CANCELED (still reaches the
//!                                          dispatcher's finish step)
//! ```

mod async_call;
mod callback;
mod cancel;

use std::fmt::{self, Display};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

pub(crate) use async_call::AsyncCall;
pub(crate) use cancel::Cancellation;
pub use callback::{Callback, PendingResponse};

use crate::chain::{
    BridgeInterceptor, CacheInterceptor, CallServerInterceptor, Chain, ConnectInterceptor,
    Interceptor, RetryInterceptor,
};
use crate::types::Result;
use crate::{Client, ErrorKind, Request, Response};
use callback::OneshotCallback;

static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies a [`Call`] in logs and dispatcher bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(u64);

impl CallId {
    fn next() -> Self {
        CallId(NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One request/response exchange.
///
/// `Call` is a cheap handle: cloning it with [`Clone`] yields another handle
/// to the *same* call, which is what the dispatcher's snapshots hand out.
/// To run the same request again, create a fresh call with
/// [`Call::duplicate`].
#[derive(Clone)]
pub struct Call {
    inner: Arc<CallInner>,
}

struct CallInner {
    id: CallId,
    client: Client,
    /// The caller's request, before any interceptor touched it
    request: Request,
    upgrade: bool,
    executed: AtomicBool,
    cancellation: Cancellation,
}

impl Call {
    pub(crate) fn new(client: Client, request: Request, upgrade: bool) -> Self {
        Self {
            inner: Arc::new(CallInner {
                id: CallId::next(),
                client,
                request,
                upgrade,
                executed: AtomicBool::new(false),
                cancellation: Cancellation::default(),
            }),
        }
    }

    /// Identifier of this call
    #[must_use]
    pub fn id(&self) -> CallId {
        self.inner.id
    }

    /// The request that created this call
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.inner.request
    }

    /// Whether this call is a protocol upgrade (e.g. web socket).
    ///
    /// Upgrade calls skip network interceptors. Once running, they do not
    /// count against the dispatcher's per-host limit.
    #[must_use]
    pub fn is_upgrade(&self) -> bool {
        self.inner.upgrade
    }

    /// Run the call on the current task and return its response.
    ///
    /// The call is registered with the dispatcher as running for the whole
    /// duration of the chain, but it is never subject to admission control.
    /// The dispatcher is notified of completion on every exit path,
    /// including when the returned future is dropped early.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::AlreadyExecuted`] if the call was started before.
    /// - [`ErrorKind::Canceled`] if the call was canceled before it produced a response.
    /// - Any error raised by an interceptor or the transport.
    pub async fn execute(&self) -> Result<Response> {
        self.mark_executed()?;
        let client = self.client();
        client.event_listener().call_start(self);

        let _running = client.dispatcher().executed(self);
        let result = self.response_with_interceptor_chain().await;
        match &result {
            Ok(_) => client.event_listener().call_end(self),
            Err(e) => client.event_listener().call_failed(self, e),
        }
        result
    }

    /// Schedule the call on the dispatcher and return immediately.
    ///
    /// `callback` receives exactly one notification once the call has run.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::AlreadyExecuted`] if the call was started before.
    pub fn enqueue(&self, callback: impl Callback + 'static) -> Result<()> {
        self.enqueue_arc(Arc::new(callback))
    }

    /// Schedule the call on the dispatcher and return a future of its result.
    ///
    /// The call is admitted exactly like with [`Call::enqueue`]; awaiting
    /// the returned future is not required for the call to make progress.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::AlreadyExecuted`] if the call was started before.
    pub fn enqueue_future(&self) -> Result<PendingResponse> {
        let (callback, pending) = OneshotCallback::new();
        self.enqueue_arc(Arc::new(callback))?;
        Ok(pending)
    }

    fn enqueue_arc(&self, callback: Arc<dyn Callback>) -> Result<()> {
        self.mark_executed()?;
        let client = self.client();
        client.event_listener().call_start(self);
        client
            .dispatcher()
            .enqueue(AsyncCall::new(self.clone(), callback));
        Ok(())
    }

    /// Cancel the call, if possible.
    ///
    /// The in-flight chain notices at its next checkpoint; work that has
    /// already completed is not undone. Calling this more than once has no
    /// further effect.
    pub fn cancel(&self) {
        if self.inner.cancellation.cancel() {
            log::debug!("Canceled {self}");
        }
    }

    /// Whether [`Call::execute`] or [`Call::enqueue`] was invoked
    #[must_use]
    pub fn is_executed(&self) -> bool {
        self.inner.executed.load(Ordering::Acquire)
    }

    /// Whether [`Call::cancel`] was invoked
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.inner.cancellation.is_canceled()
    }

    /// Create a new, unstarted call for the same request.
    ///
    /// The new call can be started even if this one already has been.
    #[must_use]
    pub fn duplicate(&self) -> Call {
        Call::new(
            self.inner.client.clone(),
            self.inner.request.clone(),
            self.inner.upgrade,
        )
    }

    pub(crate) fn cancellation(&self) -> &Cancellation {
        &self.inner.cancellation
    }

    pub(crate) fn client(&self) -> &Client {
        &self.inner.client
    }

    fn mark_executed(&self) -> Result<()> {
        if self.inner.executed.swap(true, Ordering::AcqRel) {
            return Err(ErrorKind::AlreadyExecuted(self.id()));
        }
        Ok(())
    }

    /// Build the full interceptor stack for one exchange and run it
    pub(crate) async fn response_with_interceptor_chain(&self) -> Result<Response> {
        let client = self.client();

        let mut interceptors: Vec<Arc<dyn Interceptor>> = client.interceptors().to_vec();
        interceptors.push(Arc::new(RetryInterceptor::new(
            client.max_retries(),
            client.retry_wait_time(),
        )));
        interceptors.push(Arc::new(BridgeInterceptor::new(client.user_agent())));
        interceptors.push(Arc::new(CacheInterceptor::new(client.cache().cloned())));
        interceptors.push(Arc::new(ConnectInterceptor::new(Arc::clone(
            client.transport(),
        ))));
        if !self.is_upgrade() {
            interceptors.extend(client.network_interceptors().iter().cloned());
        }
        interceptors.push(Arc::new(CallServerInterceptor));

        let chain = Chain::new(interceptors, self.clone(), client.timeouts());
        chain.proceed(self.request().clone()).await
    }
}

impl PartialEq for Call {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Call {}

impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Call")
            .field("id", &self.id())
            .field("request", self.request())
            .field("upgrade", &self.is_upgrade())
            .field("executed", &self.is_executed())
            .field("canceled", &self.is_canceled())
            .finish_non_exhaustive()
    }
}

/// Describes the call without the query string, which may carry secrets
impl Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} {} to {}",
            if self.is_canceled() { "canceled " } else { "" },
            if self.is_upgrade() { "upgrade" } else { "call" },
            self.id(),
            self.request().redacted_url()
        )
    }
}
