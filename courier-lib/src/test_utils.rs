use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use tokio::sync::{Semaphore, mpsc};

use crate::transport::{Connection, Transport};
use crate::types::Result;
use crate::{
    Call, CallId, Callback, Client, ClientBuilder, ErrorKind, HostKey, Request, Response,
    ResponseSource, Timeouts,
};

/// Parse a `GET` request
///
/// # Panic
///
/// This panics on error, so it should only be used for testing
pub(crate) fn get(url: &str) -> Request {
    Request::get(url).expect("Expected valid request URL")
}

/// A client on the current runtime that never retries and talks to `transport`
pub(crate) fn client_with_transport(transport: impl Transport + 'static) -> Client {
    ClientBuilder::builder()
        .transport(Arc::new(transport))
        .max_retries(0u64)
        .build()
        .client()
        .expect("Expected valid client")
}

fn network_response(request: Request) -> Response {
    Response::new(request, StatusCode::OK).with_source(ResponseSource::Network)
}

fn connection_refused() -> ErrorKind {
    ErrorKind::Io(io::Error::from(io::ErrorKind::ConnectionRefused))
}

/// Forwards every outcome to a channel
#[derive(Debug, Clone)]
pub(crate) struct ChannelCallback {
    sender: mpsc::UnboundedSender<(CallId, Result<Response>)>,
}

impl ChannelCallback {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<(CallId, Result<Response>)>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Callback for ChannelCallback {
    fn on_response(&self, call: &Call, response: Response) {
        let _ = self.sender.send((call.id(), Ok(response)));
    }

    fn on_failure(&self, call: &Call, error: ErrorKind) {
        let _ = self.sender.send((call.id(), Err(error)));
    }
}

#[derive(Debug, Clone, Copy)]
enum Behavior {
    Ok,
    Failing,
    Hanging,
    SlowConnect,
}

/// Answers every exchange the same way without touching the network
#[derive(Debug, Clone)]
pub(crate) struct StaticTransport {
    behavior: Behavior,
    connects: Arc<AtomicUsize>,
}

impl StaticTransport {
    fn with(behavior: Behavior) -> Self {
        Self {
            behavior,
            connects: Arc::default(),
        }
    }

    /// Every exchange returns `200 OK`
    pub(crate) fn ok() -> Self {
        Self::with(Behavior::Ok)
    }

    /// Every exchange fails with a refused connection
    pub(crate) fn failing() -> Self {
        Self::with(Behavior::Failing)
    }

    /// Exchanges never complete
    pub(crate) fn hanging() -> Self {
        Self::with(Behavior::Hanging)
    }

    /// Connecting takes a minute
    pub(crate) fn slow_connect() -> Self {
        Self::with(Behavior::SlowConnect)
    }

    /// Number of connections handed out so far
    pub(crate) fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for StaticTransport {
    async fn connect(&self, request: &Request, _timeout: Duration) -> Result<Arc<dyn Connection>> {
        if let Behavior::SlowConnect = self.behavior {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(StaticConnection {
            behavior: self.behavior,
            host: request.host().clone(),
        }))
    }
}

#[derive(Debug)]
struct StaticConnection {
    behavior: Behavior,
    host: HostKey,
}

#[async_trait]
impl Connection for StaticConnection {
    fn host(&self) -> &HostKey {
        &self.host
    }

    async fn exchange(&self, request: Request, _timeouts: &Timeouts) -> Result<Response> {
        match self.behavior {
            Behavior::Ok | Behavior::SlowConnect => Ok(network_response(request)),
            Behavior::Failing => Err(connection_refused()),
            Behavior::Hanging => std::future::pending().await,
        }
    }
}

/// A transport whose exchanges wait for permits handed out by the test.
///
/// It records the order in which exchanges started and the highest
/// concurrency it observed, overall and per host.
#[derive(Debug, Clone)]
pub(crate) struct GatedTransport {
    inner: Arc<Gate>,
}

#[derive(Debug)]
struct Gate {
    permits: Semaphore,
    auto_release: bool,
    failing: bool,
    started: Mutex<Vec<String>>,
    active: Mutex<Concurrency>,
}

#[derive(Debug, Default)]
struct Concurrency {
    total: usize,
    max_total: usize,
    per_host: HashMap<HostKey, usize>,
    max_per_host: HashMap<HostKey, usize>,
}

impl GatedTransport {
    fn with(auto_release: bool, failing: bool) -> Self {
        Self {
            inner: Arc::new(Gate {
                permits: Semaphore::new(0),
                auto_release,
                failing,
                started: Mutex::default(),
                active: Mutex::default(),
            }),
        }
    }

    /// Exchanges succeed once released
    pub(crate) fn new() -> Self {
        Self::with(false, false)
    }

    /// Exchanges succeed without waiting for a release
    pub(crate) fn auto_release() -> Self {
        Self::with(true, false)
    }

    /// Exchanges fail once released
    pub(crate) fn failing() -> Self {
        Self::with(false, true)
    }

    /// Let `n` more exchanges finish
    pub(crate) fn release(&self, n: usize) {
        self.inner.permits.add_permits(n);
    }

    /// Wait until at least `n` exchanges have started
    ///
    /// # Panic
    ///
    /// Panics if that does not happen within five seconds
    pub(crate) async fn wait_for_started(&self, n: usize) {
        let started = async {
            while self.started_paths().len() < n {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), started)
            .await
            .expect("Expected exchanges to start");
    }

    /// URL paths of the started exchanges, in start order
    pub(crate) fn started_paths(&self) -> Vec<String> {
        self.inner.started.lock().unwrap().clone()
    }

    /// Highest number of exchanges observed in flight at once
    pub(crate) fn max_concurrency(&self) -> usize {
        self.inner.active.lock().unwrap().max_total
    }

    /// Highest number of exchanges observed in flight at once for `host`
    pub(crate) fn max_concurrency_for(&self, host: &str) -> usize {
        let active = self.inner.active.lock().unwrap();
        active
            .max_per_host
            .get(&HostKey::from(host))
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Transport for GatedTransport {
    async fn connect(&self, request: &Request, _timeout: Duration) -> Result<Arc<dyn Connection>> {
        Ok(Arc::new(GatedConnection {
            gate: Arc::clone(&self.inner),
            host: request.host().clone(),
        }))
    }
}

#[derive(Debug)]
struct GatedConnection {
    gate: Arc<Gate>,
    host: HostKey,
}

/// Counts an exchange as in flight until dropped
struct InFlight<'a> {
    gate: &'a Gate,
    host: &'a HostKey,
}

impl<'a> InFlight<'a> {
    fn enter(gate: &'a Gate, host: &'a HostKey) -> Self {
        let mut active = gate.active.lock().unwrap();
        active.total += 1;
        active.max_total = active.max_total.max(active.total);
        let count = {
            let count = active.per_host.entry(host.clone()).or_default();
            *count += 1;
            *count
        };
        let max = active.max_per_host.entry(host.clone()).or_default();
        *max = (*max).max(count);
        Self { gate, host }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut active = self.gate.active.lock().unwrap();
        active.total -= 1;
        if let Some(count) = active.per_host.get_mut(self.host) {
            *count -= 1;
        }
    }
}

#[async_trait]
impl Connection for GatedConnection {
    fn host(&self) -> &HostKey {
        &self.host
    }

    async fn exchange(&self, request: Request, _timeouts: &Timeouts) -> Result<Response> {
        let _in_flight = InFlight::enter(&self.gate, &self.host);
        self.gate
            .started
            .lock()
            .unwrap()
            .push(request.url().path().to_string());

        if self.gate.auto_release {
            tokio::task::yield_now().await;
        } else {
            self.gate
                .permits
                .acquire()
                .await
                .expect("Semaphore is never closed")
                .forget();
        }

        if self.gate.failing {
            Err(connection_refused())
        } else {
            Ok(network_response(request))
        }
    }
}
