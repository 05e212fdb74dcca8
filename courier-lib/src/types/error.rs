use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::call::CallId;

/// Possible errors when dispatching calls with `courier_lib`
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A call was started a second time.
    /// Every [`Call`](crate::Call) may be executed or enqueued at most once;
    /// use [`Call::duplicate`](crate::Call::duplicate) to run the same request again.
    #[error("Already executed: {0}")]
    AlreadyExecuted(CallId),

    /// The call was canceled before it produced a result
    #[error("Canceled")]
    Canceled,

    /// The awaitable completion of an enqueued call was dropped by the
    /// dispatcher without a result, e.g. because the runtime shut down
    #[error("Call was abandoned before completion")]
    Abandoned,

    /// A dispatcher limit was set to a value smaller than one
    #[error("{name} < 1: {value}")]
    InvalidLimit {
        /// Name of the rejected limit
        name: &'static str,
        /// The rejected value
        value: usize,
    },

    /// An URL without a host cannot be scheduled
    #[error("URL is missing a host")]
    InvalidUrlHost,

    /// The given URL can not be parsed
    #[error("Cannot parse URL: {0}")]
    ParseUrl(#[from] url::ParseError),

    /// The transport does not know how to talk to this scheme
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// A header value could not be built
    #[error("Header could not be parsed.")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    /// No tokio runtime was available to run asynchronous calls on
    #[error("No tokio runtime available to dispatch calls")]
    NoRuntime,

    /// The `reqwest` client could not be built
    #[error("Error creating request client: {0}")]
    BuildRequestClient(#[source] reqwest::Error),

    /// Network error while performing the exchange
    #[error("Network error: {0}")]
    NetworkRequest(#[source] reqwest::Error),

    /// The response body could not be read
    #[error("Error reading response body: {0}")]
    ReadResponseBody(#[source] reqwest::Error),

    /// A transport reported an I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The exchange did not finish within the given time
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// `proceed` was called on a chain with no stages left
    #[error("Interceptor chain exhausted at index {0}")]
    ChainExhausted(usize),

    /// The terminal stage ran without a connection being acquired first
    #[error("No connection acquired before the exchange")]
    MissingConnection,

    /// An interceptor rejected or failed the request
    #[error("Interceptor failure: {0}")]
    Interceptor(String),

    /// The configuration file could not be read
    #[error("Cannot read config file `{}`: {}", .0.display(), .1)]
    ReadConfig(PathBuf, #[source] std::io::Error),

    /// The configuration could not be parsed
    #[error("Cannot parse config: {0}")]
    ParseConfig(#[from] toml::de::Error),
}

impl ErrorKind {
    /// Whether this error stands for a canceled call
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Return the underlying `reqwest` error, if any
    #[must_use]
    pub const fn reqwest_error(&self) -> Option<&reqwest::Error> {
        match self {
            Self::NetworkRequest(e) | Self::ReadResponseBody(e) | Self::BuildRequestClient(e) => {
                Some(e)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_limit_message() {
        let err = ErrorKind::InvalidLimit {
            name: "max_requests",
            value: 0,
        };
        assert_eq!(err.to_string(), "max_requests < 1: 0");
    }

    #[test]
    fn test_canceled_is_distinguished() {
        assert!(ErrorKind::Canceled.is_canceled());
        assert!(!ErrorKind::Abandoned.is_canceled());
        assert!(!ErrorKind::Interceptor("nope".into()).is_canceled());
    }

    #[test]
    fn test_read_config_message() {
        let err = ErrorKind::ReadConfig(
            PathBuf::from("courier.toml"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        assert_eq!(
            err.to_string(),
            "Cannot read config file `courier.toml`: no such file"
        );
    }
}
