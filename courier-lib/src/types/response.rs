use std::fmt::Display;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

use crate::Request;

/// Where a [`Response`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseSource {
    /// Produced by an exchange over a connection
    Network,
    /// Served by the [`CacheInterceptor`](crate::chain::CacheInterceptor)
    Cache,
    /// Produced by an interceptor that short-circuited the chain
    Interceptor,
}

/// The result of running a [`Request`] through the interceptor chain
#[derive(Debug, Clone)]
pub struct Response {
    request: Request,
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    source: ResponseSource,
}

impl Response {
    /// Create an empty response for `request`.
    ///
    /// The source defaults to [`ResponseSource::Interceptor`]; transports
    /// mark their responses with [`Response::with_source`].
    #[must_use]
    pub fn new(request: Request, status: StatusCode) -> Self {
        Self {
            request,
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            source: ResponseSource::Interceptor,
        }
    }

    /// The request this response answers, as it was sent
    #[must_use]
    pub const fn request(&self) -> &Request {
        &self.request
    }

    /// Status code
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Response body
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Origin of this response
    #[must_use]
    pub const fn source(&self) -> ResponseSource {
        self.source
    }

    /// Whether the status code is in the `2xx` range
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Replace or add a header
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replace all headers
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Replace the body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Mark the origin of this response
    #[must_use]
    pub fn with_source(mut self, source: ResponseSource) -> Self {
        self.source = source;
        self
    }
}

impl Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status, self.request.redacted_url())
    }
}
