use std::error::Error;
use std::io;

use http::StatusCode;

use crate::{ErrorKind, Response};

/// An extension trait to help determine if a failed exchange is worth
/// another attempt.
///
/// Modified from `Retryable` in [reqwest-middleware].
///
/// [reqwest-middleware]: https://github.com/TrueLayer/reqwest-middleware/blob/f854725791ccf4a02c401a26cab3d9db753f468c/reqwest-retry/src/retryable.rs
pub(crate) trait RetryExt {
    fn should_retry(&self) -> bool;
}

impl RetryExt for StatusCode {
    fn should_retry(&self) -> bool {
        self.is_server_error()
            || *self == StatusCode::REQUEST_TIMEOUT
            || *self == StatusCode::TOO_MANY_REQUESTS
    }
}

impl RetryExt for reqwest::Error {
    fn should_retry(&self) -> bool {
        if self.is_timeout() {
            return true;
        }
        if self.is_connect() || self.is_body() || self.is_decode() || self.is_builder() {
            return false;
        }
        if self.is_request() {
            // A connection cut halfway through surfaces as an I/O error
            // somewhere down the source chain.
            return io_source(self).is_some_and(should_retry_io);
        }
        self.status().is_some_and(|status| status.should_retry())
    }
}

impl RetryExt for ErrorKind {
    fn should_retry(&self) -> bool {
        if let Some(r) = self.reqwest_error() {
            r.should_retry()
        } else {
            match self {
                Self::Io(e) => should_retry_io(e),
                Self::Timeout(_) => true,
                _ => false,
            }
        }
    }
}

impl RetryExt for Response {
    fn should_retry(&self) -> bool {
        self.status().should_retry()
    }
}

/// Classifies an `io::Error` into retryable or not.
fn should_retry_io(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted | io::ErrorKind::TimedOut
    )
}

/// The first `io::Error` in the source chain of `err`
fn io_source<'a>(err: &'a (dyn Error + 'static)) -> Option<&'a io::Error> {
    let mut source = err.source();
    while let Some(e) = source {
        if let Some(io_error) = e.downcast_ref() {
            return Some(io_error);
        }
        source = e.source();
    }
    None
}
