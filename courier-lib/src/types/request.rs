use std::fmt::Display;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use url::Url;

use crate::types::Result;
use crate::{ErrorKind, HostKey};

/// An immutable description of one outbound exchange.
///
/// The host of the URL is resolved once on construction and serves as the
/// scheduling destination, see [`Request::host`]. Interceptors that want to
/// change a request build a new one with the `with_*` methods.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: Method,
    url: Url,
    host: HostKey,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl Request {
    /// Create a request without headers or body.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidUrlHost`] if the URL has no host,
    /// since such a request cannot be assigned to a destination.
    pub fn new(method: Method, url: Url) -> Result<Self> {
        let host = HostKey::try_from(&url)?;
        Ok(Self {
            method,
            url,
            host,
            headers: HeaderMap::new(),
            body: None,
        })
    }

    /// Create a `GET` request for the given URL string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid URL or has no host.
    pub fn get(url: &str) -> Result<Self> {
        Self::new(Method::GET, Url::parse(url)?)
    }

    /// HTTP method
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Target URL
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Destination used for per-host admission control
    #[must_use]
    pub const fn host(&self) -> &HostKey {
        &self.host
    }

    /// Request headers
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Request body, if any
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Returns whether repeating this request has no additional effect on the server
    #[must_use]
    pub fn is_idempotent(&self) -> bool {
        matches!(
            self.method,
            Method::GET
                | Method::HEAD
                | Method::PUT
                | Method::DELETE
                | Method::OPTIONS
                | Method::TRACE
        )
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

    /// Attach a body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Point the request at another URL, keeping method, headers and body.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidUrlHost`] if the new URL has no host.
    pub fn with_url(mut self, url: Url) -> Result<Self> {
        self.host = HostKey::try_from(&url)?;
        self.url = url;
        Ok(self)
    }

    /// The URL without userinfo, query or fragment, safe for logs
    #[must_use]
    pub fn redacted_url(&self) -> String {
        let mut url = self.url.clone();
        // Only fails for cannot-be-a-base URLs, which never have a host.
        let _ = url.set_username("");
        let _ = url.set_password(None);
        url.set_query(None);
        url.set_fragment(None);
        url.to_string()
    }
}

impl TryFrom<&str> for Request {
    type Error = ErrorKind;

    fn try_from(url: &str) -> Result<Self> {
        Self::get(url)
    }
}

impl TryFrom<Url> for Request {
    type Error = ErrorKind;

    fn try_from(url: Url) -> Result<Self> {
        Self::new(Method::GET, url)
    }
}

impl Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.redacted_url())
    }
}
