use std::time::Duration;

use async_trait::async_trait;

use super::{Chain, Interceptor};
use crate::retry::RetryExt;
use crate::types::Result;
use crate::{ErrorKind, Response};

/// Retries transient failures and owns the cancellation checkpoint before
/// every attempt.
///
/// Only idempotent requests are retried. A failure is transient if it is a
/// timeout or an interrupted connection, or if the response status is
/// `408`, `429` or a server error. The wait between attempts starts at
/// `retry_wait_time` and doubles after every retry.
#[derive(Debug, Clone)]
pub struct RetryInterceptor {
    max_retries: u64,
    retry_wait_time: Duration,
}

impl RetryInterceptor {
    /// Retry up to `max_retries` times, waiting `retry_wait_time` before the first retry
    #[must_use]
    pub const fn new(max_retries: u64, retry_wait_time: Duration) -> Self {
        Self {
            max_retries,
            retry_wait_time,
        }
    }
}

#[async_trait]
impl Interceptor for RetryInterceptor {
    async fn intercept(&self, chain: Chain) -> Result<Response> {
        let call = chain.call();
        let request = chain.request().clone();
        let mut retries: u64 = 0;
        let mut wait_time = self.retry_wait_time;

        loop {
            if call.is_canceled() {
                return Err(ErrorKind::Canceled);
            }

            let result = chain.proceed(request.clone()).await;
            let transient = match &result {
                Ok(response) => response.should_retry(),
                Err(e) => e.should_retry(),
            };
            if !transient || retries >= self.max_retries || !request.is_idempotent() {
                return result;
            }

            retries += 1;
            log::debug!(
                "Retrying {call} in {wait_time:?} ({retries}/{})",
                self.max_retries
            );
            tokio::select! {
                () = tokio::time::sleep(wait_time) => {}
                () = call.cancellation().cancelled() => return Err(ErrorKind::Canceled),
            }
            wait_time = wait_time.saturating_mul(2);
        }
    }
}
