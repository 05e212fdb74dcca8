use async_trait::async_trait;
use http::header::{CONTENT_LENGTH, HOST, USER_AGENT};
use http::{HeaderMap, HeaderValue};

use super::{Chain, Interceptor};
use crate::types::Result;
use crate::{Request, Response};

/// Normalizes requests before they reach the cache and the network.
///
/// Fills in `Host`, `User-Agent` and `Content-Length` unless an earlier
/// stage set them already.
#[derive(Debug, Clone)]
pub struct BridgeInterceptor {
    user_agent: String,
}

impl BridgeInterceptor {
    /// Send `user_agent` with requests that carry no `User-Agent` header
    #[must_use]
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }

    fn normalize(&self, request: &Request) -> Result<HeaderMap> {
        let mut headers = request.headers().clone();

        if !headers.contains_key(HOST) {
            let url = request.url();
            let host = match url.port() {
                Some(port) => format!("{}:{port}", request.host()),
                None => request.host().to_string(),
            };
            headers.insert(HOST, HeaderValue::from_str(&host)?);
        }
        if !headers.contains_key(USER_AGENT) {
            headers.insert(USER_AGENT, HeaderValue::from_str(&self.user_agent)?);
        }
        if let Some(body) = request.body() {
            if !headers.contains_key(CONTENT_LENGTH) {
                headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
            }
        }
        Ok(headers)
    }
}

#[async_trait]
impl Interceptor for BridgeInterceptor {
    async fn intercept(&self, chain: Chain) -> Result<Response> {
        let headers = self.normalize(chain.request())?;
        let request = chain.request().clone().with_headers(headers);
        chain.proceed(request).await
    }
}

#[cfg(test)]
mod tests {
    use http::Method;
    use pretty_assertions::assert_eq;
    use url::Url;

    use super::*;

    #[test]
    fn test_fills_missing_headers() {
        let request = Request::new(Method::POST, Url::parse("http://Example.com:8080/a").unwrap())
            .unwrap()
            .with_body("hello");

        let headers = BridgeInterceptor::new("courier/test").normalize(&request).unwrap();

        assert_eq!(headers[HOST], "example.com:8080");
        assert_eq!(headers[USER_AGENT], "courier/test");
        assert_eq!(headers[CONTENT_LENGTH], "5");
    }

    #[test]
    fn test_keeps_existing_headers() {
        let request = Request::get("https://example.com/")
            .unwrap()
            .with_header(USER_AGENT, HeaderValue::from_static("custom"));

        let headers = BridgeInterceptor::new("courier/test").normalize(&request).unwrap();

        assert_eq!(headers[HOST], "example.com");
        assert_eq!(headers[USER_AGENT], "custom");
        assert!(!headers.contains_key(CONTENT_LENGTH));
    }
}
