use async_trait::async_trait;

use super::{Chain, Interceptor};
use crate::types::Result;
use crate::{ErrorKind, Response};

/// The terminal stage: performs the exchange on the chain's connection.
///
/// The exchange is bounded by the read and write timeouts combined and
/// abandoned as soon as the call is canceled. This stage never calls
/// [`Chain::proceed`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CallServerInterceptor;

#[async_trait]
impl Interceptor for CallServerInterceptor {
    async fn intercept(&self, chain: Chain) -> Result<Response> {
        let connection = chain.connection().ok_or(ErrorKind::MissingConnection)?;
        let call = chain.call();
        if call.is_canceled() {
            return Err(ErrorKind::Canceled);
        }

        let timeouts = chain.timeouts();
        let deadline = timeouts.exchange_deadline();
        let exchange = connection.exchange(chain.request().clone(), &timeouts);
        tokio::select! {
            response = tokio::time::timeout(deadline, exchange) => {
                response.map_err(|_| ErrorKind::Timeout(deadline))?
            }
            () = call.cancellation().cancelled() => Err(ErrorKind::Canceled),
        }
    }
}
