//! The interceptor chain every call is run through.
//!
//! A [`Chain`] is an immutable list of [`Interceptor`]s plus the index of the
//! next stage to run. [`Chain::proceed`] hands the request to that stage
//! together with a fresh view of the chain scoped to the remaining stages;
//! the stage may inspect or rewrite the request, delegate by calling
//! `proceed` once, inspect or rewrite the response, or return a response of
//! its own without delegating at all.
//!
//! The stack assembled for each call is:
//!
//! 1. interceptors registered on the client
//! 2. [`RetryInterceptor`]
//! 3. [`BridgeInterceptor`]
//! 4. [`CacheInterceptor`]
//! 5. [`ConnectInterceptor`]
//! 6. network interceptors registered on the client, unless the call is an upgrade
//! 7. [`CallServerInterceptor`]

mod bridge;
mod cache;
mod call_server;
mod connect;
mod retry;

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub use bridge::BridgeInterceptor;
pub use cache::CacheInterceptor;
pub use call_server::CallServerInterceptor;
pub use connect::ConnectInterceptor;
pub use retry::RetryInterceptor;

use crate::transport::Connection;
use crate::types::Result;
use crate::{Call, ErrorKind, Request, Response, Timeouts};

/// One stage of the interceptor chain.
///
/// Errors returned from [`Chain::proceed`] reach the stage that called it
/// and keep propagating outward unless that stage handles them.
#[async_trait]
pub trait Interceptor: Send + Sync + Debug {
    /// Process [`Chain::request`], usually by calling [`Chain::proceed`] exactly once.
    ///
    /// Returning without calling `proceed` short-circuits the chain:
    /// none of the later stages run.
    async fn intercept(&self, chain: Chain) -> Result<Response>;
}

/// A view of the interceptor stack from one stage onward.
///
/// Cloning is cheap; the stage list is shared and never modified once
/// the call has started.
#[derive(Debug, Clone)]
pub struct Chain {
    interceptors: Arc<[Arc<dyn Interceptor>]>,
    index: usize,
    request: Request,
    call: Call,
    connection: Option<Arc<dyn Connection>>,
    timeouts: Timeouts,
}

impl Chain {
    /// Create a chain positioned before the first interceptor.
    ///
    /// The chain starts out with the call's original request; the request
    /// passed to the first [`Chain::proceed`] replaces it.
    #[must_use]
    pub fn new(interceptors: Vec<Arc<dyn Interceptor>>, call: Call, timeouts: Timeouts) -> Self {
        Self {
            interceptors: interceptors.into(),
            index: 0,
            request: call.request().clone(),
            call,
            connection: None,
            timeouts,
        }
    }

    /// Hand `request` to the next interceptor and return its response.
    ///
    /// # Errors
    ///
    /// Returns whatever the remaining stages fail with, or
    /// [`ErrorKind::ChainExhausted`] if there is no stage left to run.
    pub async fn proceed(&self, request: Request) -> Result<Response> {
        let Some(interceptor) = self.interceptors.get(self.index) else {
            return Err(ErrorKind::ChainExhausted(self.index));
        };
        let next = Self {
            index: self.index + 1,
            request,
            ..self.clone()
        };
        interceptor.intercept(next).await
    }

    /// The request as handed to the current stage
    #[must_use]
    pub const fn request(&self) -> &Request {
        &self.request
    }

    /// The call this chain runs for
    #[must_use]
    pub const fn call(&self) -> &Call {
        &self.call
    }

    /// The connection the exchange will use.
    ///
    /// Only set for stages after the [`ConnectInterceptor`], i.e. network
    /// interceptors and the terminal stage.
    #[must_use]
    pub fn connection(&self) -> Option<&Arc<dyn Connection>> {
        self.connection.as_ref()
    }

    /// Effective timeouts for the remaining stages
    #[must_use]
    pub const fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Time allowed to acquire a connection
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.timeouts.connect
    }

    /// Time allowed to wait for response data
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        self.timeouts.read
    }

    /// Time allowed to send the request
    #[must_use]
    pub const fn write_timeout(&self) -> Duration {
        self.timeouts.write
    }

    /// A copy of this chain whose later stages see another connect timeout.
    /// Stages that already ran are unaffected.
    #[must_use]
    pub fn with_connect_timeout(&self, timeout: Duration) -> Self {
        let mut chain = self.clone();
        chain.timeouts.connect = timeout;
        chain
    }

    /// A copy of this chain whose later stages see another read timeout
    #[must_use]
    pub fn with_read_timeout(&self, timeout: Duration) -> Self {
        let mut chain = self.clone();
        chain.timeouts.read = timeout;
        chain
    }

    /// A copy of this chain whose later stages see another write timeout
    #[must_use]
    pub fn with_write_timeout(&self, timeout: Duration) -> Self {
        let mut chain = self.clone();
        chain.timeouts.write = timeout;
        chain
    }

    pub(crate) fn with_connection(&self, connection: Arc<dyn Connection>) -> Self {
        let mut chain = self.clone();
        chain.connection = Some(connection);
        chain
    }
}
