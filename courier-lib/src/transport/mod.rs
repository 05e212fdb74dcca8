//! The seam between the interceptor chain and the network.
//!
//! The [`ConnectInterceptor`](crate::chain::ConnectInterceptor) asks a
//! [`Transport`] for a [`Connection`]; the
//! [`CallServerInterceptor`](crate::chain::CallServerInterceptor) performs
//! the exchange on it. [`ReqwestTransport`] is the default implementation.

mod network;

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub use network::ReqwestTransport;

use crate::types::Result;
use crate::{HostKey, Request, Response, Timeouts};

/// Hands out connections to the destination of a request
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Establish (or reuse) a connection suitable for `request`.
    ///
    /// `timeout` is the connect timeout in effect for the chain. Callers
    /// additionally bound the whole operation by it.
    async fn connect(&self, request: &Request, timeout: Duration) -> Result<Arc<dyn Connection>>;
}

/// A connection able to carry exchanges with one host
#[async_trait]
pub trait Connection: Send + Sync + Debug {
    /// The host this connection talks to
    fn host(&self) -> &HostKey;

    /// Send `request` and read the complete response.
    ///
    /// Implementations should honor `timeouts` where the underlying client
    /// supports it; the terminal stage bounds the whole exchange in any case.
    async fn exchange(&self, request: Request, timeouts: &Timeouts) -> Result<Response>;
}
