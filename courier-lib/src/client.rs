//! Entry point for issuing calls.
//!
//! This module defines two structs, [`Client`] and [`ClientBuilder`].
//! `Client` creates [`Call`]s and holds everything they share: the
//! dispatcher, the interceptors, the transport and the retry policy.
//! `ClientBuilder` exposes a finer level of granularity for building
//! a `Client`.
#![allow(clippy::module_name_repetitions)]

use std::sync::Arc;
use std::time::Duration;

use http::HeaderValue;
use typed_builder::TypedBuilder;

use crate::cache::ResponseCache;
use crate::chain::Interceptor;
use crate::event::{EventListener, LogEventListener};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::Result;
use crate::{Call, Dispatcher, DispatcherConfig, ErrorKind, Request, Timeouts};

/// Default number of retries before a call is deemed as failed, 3.
pub const DEFAULT_MAX_RETRIES: u64 = 3;
/// Default wait time before the first retry, 1 second.
pub const DEFAULT_RETRY_WAIT_TIME: Duration = Duration::from_secs(1);
/// Default user agent, `courier/<PKG_VERSION>`.
pub const DEFAULT_USER_AGENT: &str = concat!("courier/", env!("CARGO_PKG_VERSION"));

/// Builder for [`Client`].
///
/// ```
/// # use courier_lib::{ClientBuilder, DispatcherConfig, Result};
/// # #[tokio::main]
/// # async fn main() -> Result<()> {
/// let client = ClientBuilder::builder()
///     .dispatcher_config(DispatcherConfig {
///         max_requests: 16,
///         max_requests_per_host: 2,
///     })
///     .max_retries(0u64)
///     .build()
///     .client()?;
/// assert_eq!(client.dispatcher().max_requests_per_host(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(TypedBuilder, Debug, Clone)]
#[builder(field_defaults(default))]
#[builder(builder_method(doc = "
Create a builder for building `ClientBuilder`.

On the builder call, call methods with same name as its fields to set their values.

Finally, call `.build()` to create the instance of `ClientBuilder`.
"))]
pub struct ClientBuilder {
    /// Interceptors running first, once per call, before retries and caching.
    ///
    /// They see the request exactly as the caller built it and may
    /// short-circuit the whole call.
    interceptors: Vec<Arc<dyn Interceptor>>,
    /// Interceptors running after a connection was acquired, once per attempt.
    ///
    /// Skipped for upgrade calls.
    network_interceptors: Vec<Arc<dyn Interceptor>>,
    /// Dispatcher to schedule calls on.
    ///
    /// Pass the dispatcher of another client to share its limits. When
    /// unset, a new one is created from [`ClientBuilder::dispatcher_config`]
    /// on the current tokio runtime.
    #[builder(setter(strip_option))]
    dispatcher: Option<Arc<Dispatcher>>,
    /// Limits for the dispatcher created when none is given.
    dispatcher_config: DispatcherConfig,
    /// Transport performing the exchanges. Defaults to [`ReqwestTransport`].
    #[builder(setter(strip_option))]
    transport: Option<Arc<dyn Transport>>,
    /// Cache consulted for `GET` requests. No caching when unset.
    #[builder(setter(strip_option))]
    cache: Option<Arc<dyn ResponseCache>>,
    /// Listener for call lifecycle events. Defaults to [`LogEventListener`].
    #[builder(setter(strip_option))]
    event_listener: Option<Arc<dyn EventListener>>,
    /// Connect, read and write timeouts handed to the interceptor chain.
    timeouts: Timeouts,
    /// Maximum number of retries per call before returning an error.
    #[builder(default = DEFAULT_MAX_RETRIES, setter(into))]
    max_retries: u64,
    /// Wait time before the first retry. Doubles with every further retry.
    #[builder(default = DEFAULT_RETRY_WAIT_TIME)]
    retry_wait_time: Duration,
    /// User-agent sent with requests that do not set one.
    #[builder(default_code = "String::from(DEFAULT_USER_AGENT)", setter(into))]
    user_agent: String,
}

impl Default for ClientBuilder {
    #[inline]
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ClientBuilder {
    /// Instantiates a [`Client`].
    ///
    /// # Errors
    ///
    /// Returns an `Err` if:
    /// - The user-agent is not a valid header value.
    /// - No dispatcher was given and there is no tokio runtime to create one on.
    /// - A dispatcher limit is zero.
    /// - No transport was given and the `reqwest` client cannot be created.
    pub fn client(self) -> Result<Client> {
        HeaderValue::from_str(&self.user_agent)?;

        let dispatcher = match self.dispatcher {
            Some(dispatcher) => dispatcher,
            None => Arc::new(Dispatcher::new(self.dispatcher_config)?),
        };
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&self.timeouts)?),
        };
        let event_listener = self
            .event_listener
            .unwrap_or_else(|| Arc::new(LogEventListener));

        Ok(Client {
            inner: Arc::new(ClientInner {
                dispatcher,
                interceptors: self.interceptors,
                network_interceptors: self.network_interceptors,
                transport,
                cache: self.cache,
                event_listener,
                timeouts: self.timeouts,
                max_retries: self.max_retries,
                retry_wait_time: self.retry_wait_time,
                user_agent: self.user_agent,
            }),
        })
    }
}

/// Creates calls and holds the configuration they share.
///
/// Cloning is cheap and yields a handle to the same client, dispatcher included.
/// See [`ClientBuilder`] which contains sane defaults for all configuration options.
#[derive(Debug, Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    dispatcher: Arc<Dispatcher>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    network_interceptors: Vec<Arc<dyn Interceptor>>,
    transport: Arc<dyn Transport>,
    cache: Option<Arc<dyn ResponseCache>>,
    event_listener: Arc<dyn EventListener>,
    timeouts: Timeouts,
    max_retries: u64,
    retry_wait_time: Duration,
    user_agent: String,
}

impl Client {
    /// Prepare a call for `request`. Nothing is sent until the call is started.
    #[must_use]
    pub fn new_call(&self, request: Request) -> Call {
        Call::new(self.clone(), request, false)
    }

    /// Prepare a protocol upgrade call (e.g. a web socket handshake) for `request`.
    ///
    /// Upgrade calls skip network interceptors. They wait for room under the
    /// dispatcher's per-host limit, but do not take up room once running.
    #[must_use]
    pub fn new_upgrade_call(&self, request: Request) -> Call {
        Call::new(self.clone(), request, true)
    }

    /// The dispatcher scheduling this client's calls
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.inner.dispatcher
    }

    /// Interceptors running first for every call
    #[must_use]
    pub fn interceptors(&self) -> &[Arc<dyn Interceptor>] {
        &self.inner.interceptors
    }

    /// Interceptors running once a connection was acquired
    #[must_use]
    pub fn network_interceptors(&self) -> &[Arc<dyn Interceptor>] {
        &self.inner.network_interceptors
    }

    /// The transport performing exchanges
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    /// The response cache, if any
    #[must_use]
    pub fn cache(&self) -> Option<&Arc<dyn ResponseCache>> {
        self.inner.cache.as_ref()
    }

    /// The listener notified of call lifecycle events
    #[must_use]
    pub fn event_listener(&self) -> &Arc<dyn EventListener> {
        &self.inner.event_listener
    }

    /// Timeouts every chain starts out with
    #[must_use]
    pub fn timeouts(&self) -> Timeouts {
        self.inner.timeouts
    }

    /// Maximum number of retries per call
    #[must_use]
    pub fn max_retries(&self) -> u64 {
        self.inner.max_retries
    }

    /// Wait time before the first retry
    #[must_use]
    pub fn retry_wait_time(&self) -> Duration {
        self.inner.retry_wait_time
    }

    /// User-agent sent with requests that do not set one
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.inner.user_agent
    }
}

impl TryFrom<ClientBuilder> for Client {
    type Error = ErrorKind;

    fn try_from(builder: ClientBuilder) -> Result<Self> {
        builder.client()
    }
}
