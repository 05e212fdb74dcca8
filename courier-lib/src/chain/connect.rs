use std::sync::Arc;

use async_trait::async_trait;

use super::{Chain, Interceptor};
use crate::transport::Transport;
use crate::types::Result;
use crate::{ErrorKind, Response};

/// Acquires the connection for the exchange.
///
/// The connection is attached to the chain, so network interceptors and the
/// terminal stage can reach it through [`Chain::connection`]. Connecting is
/// bounded by the chain's connect timeout and gives up once the call is canceled.
#[derive(Debug, Clone)]
pub struct ConnectInterceptor {
    transport: Arc<dyn Transport>,
}

impl ConnectInterceptor {
    /// Connect through `transport`
    #[must_use]
    pub const fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl Interceptor for ConnectInterceptor {
    async fn intercept(&self, chain: Chain) -> Result<Response> {
        let call = chain.call();
        if call.is_canceled() {
            return Err(ErrorKind::Canceled);
        }

        let timeout = chain.connect_timeout();
        let connect = self.transport.connect(chain.request(), timeout);
        let connection = tokio::select! {
            connected = tokio::time::timeout(timeout, connect) => {
                connected.map_err(|_| ErrorKind::Timeout(timeout))??
            }
            () = call.cancellation().cancelled() => return Err(ErrorKind::Canceled),
        };
        log::trace!("Connected to {} for {call}", connection.host());

        chain
            .with_connection(connection)
            .proceed(chain.request().clone())
            .await
    }
}
