use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::redirect;

use super::{Connection, Transport};
use crate::types::Result;
use crate::{ErrorKind, HostKey, Request, Response, ResponseSource, Timeouts};

/// A [`Transport`] backed by [`reqwest`].
///
/// `reqwest` establishes and pools connections lazily, so [`Transport::connect`]
/// only checks that the request can be served and picks the client for the
/// chain's connect timeout. There is one client per distinct connect timeout,
/// built on first use and shared afterwards. Redirects are not followed:
/// following up on a response is the business of interceptors.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    clients: Arc<DashMap<Duration, reqwest::Client>>,
}

impl ReqwestTransport {
    /// Build a transport and its client for the connect timeout of `timeouts`
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::BuildRequestClient`] if the TLS backend cannot be initialized.
    pub fn new(timeouts: &Timeouts) -> Result<Self> {
        let transport = Self {
            clients: Arc::default(),
        };
        transport.client_for(timeouts.connect)?;
        Ok(transport)
    }

    /// The shared client connecting within `connect_timeout`
    fn client_for(&self, connect_timeout: Duration) -> Result<reqwest::Client> {
        if let Some(client) = self.clients.get(&connect_timeout) {
            return Ok(client.value().clone());
        }
        let client = reqwest::ClientBuilder::new()
            .connect_timeout(connect_timeout)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(ErrorKind::BuildRequestClient)?;
        log::trace!("Built client with connect timeout {connect_timeout:?}");
        Ok(self
            .clients
            .entry(connect_timeout)
            .or_insert(client)
            .value()
            .clone())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn connect(&self, request: &Request, timeout: Duration) -> Result<Arc<dyn Connection>> {
        match request.url().scheme() {
            "http" | "https" => Ok(Arc::new(ReqwestConnection {
                client: self.client_for(timeout)?,
                host: request.host().clone(),
            })),
            scheme => Err(ErrorKind::UnsupportedScheme(scheme.to_string())),
        }
    }
}

#[derive(Debug)]
struct ReqwestConnection {
    client: reqwest::Client,
    host: HostKey,
}

#[async_trait]
impl Connection for ReqwestConnection {
    fn host(&self) -> &HostKey {
        &self.host
    }

    async fn exchange(&self, request: Request, timeouts: &Timeouts) -> Result<Response> {
        let mut builder = self
            .client
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone())
            .timeout(timeouts.exchange_deadline());
        if let Some(body) = request.body() {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(ErrorKind::NetworkRequest)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(ErrorKind::ReadResponseBody)?;

        Ok(Response::new(request, status)
            .with_headers(headers)
            .with_body(body)
            .with_source(ResponseSource::Network))
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use http::{Method, StatusCode};
    use pretty_assertions::assert_eq;
    use test_utils::mock_server;
    use url::Url;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::ClientBuilder;
    use crate::chain::{Chain, Interceptor};

    /// Lowers the connect timeout for the rest of the chain
    #[derive(Debug)]
    struct ConnectWithin(Duration);

    #[async_trait]
    impl Interceptor for ConnectWithin {
        async fn intercept(&self, chain: Chain) -> Result<Response> {
            chain
                .with_connect_timeout(self.0)
                .proceed(chain.request().clone())
                .await
        }
    }

    async fn exchange(request: Request, timeouts: Timeouts) -> Result<Response> {
        let transport = ReqwestTransport::new(&timeouts).unwrap();
        let connection = transport.connect(&request, timeouts.connect).await?;
        connection.exchange(request, &timeouts).await
    }

    #[tokio::test]
    async fn test_exchange() {
        let mock_server = mock_server!(StatusCode::OK, set_body_string("hello"));
        let request = Request::get(&mock_server.uri()).unwrap();

        let response = exchange(request, Timeouts::default()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), b"hello");
        assert_eq!(response.source(), ResponseSource::Network);
    }

    #[tokio::test]
    async fn test_error_status_is_a_response() {
        let mock_server = mock_server!(StatusCode::NOT_FOUND);
        let request = Request::get(&mock_server.uri()).unwrap();

        let response = exchange(request, Timeouts::default()).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_sends_method_headers_and_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/items/1"))
            .and(header("x-token", "abc"))
            .and(body_string("payload"))
            .respond_with(ResponseTemplate::new(StatusCode::NO_CONTENT))
            .expect(1)
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/items/1", mock_server.uri())).unwrap();
        let request = Request::new(Method::PUT, url)
            .unwrap()
            .with_header(
                http::HeaderName::from_static("x-token"),
                http::HeaderValue::from_static("abc"),
            )
            .with_body("payload");

        let response = exchange(request, Timeouts::default()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_redirects_are_not_followed() {
        let mock_server = mock_server!(
            StatusCode::PERMANENT_REDIRECT,
            insert_header("Location", "https://example.com/")
        );
        let request = Request::get(&mock_server.uri()).unwrap();

        let response = exchange(request, Timeouts::default()).await.unwrap();
        assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let mock_server = mock_server!(StatusCode::OK, set_delay(Duration::from_secs(2)));
        let request = Request::get(&mock_server.uri()).unwrap();
        let timeouts = Timeouts {
            connect: Duration::from_secs(1),
            read: Duration::from_millis(100),
            write: Duration::from_millis(100),
        };

        let err = exchange(request, timeouts).await.unwrap_err();
        assert!(matches!(&err, ErrorKind::NetworkRequest(e) if e.is_timeout()));
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let request = Request::get("ftp://example.com/file").unwrap();

        let err = exchange(request, Timeouts::default()).await.unwrap_err();
        assert!(matches!(err, ErrorKind::UnsupportedScheme(scheme) if scheme == "ftp"));
    }

    #[tokio::test]
    async fn test_one_client_per_connect_timeout() {
        let transport = ReqwestTransport::new(&Timeouts::default()).unwrap();
        let request = Request::get("https://example.com/").unwrap();
        assert_eq!(transport.clients.len(), 1);

        for timeout in [Duration::from_millis(100), Duration::from_millis(100)] {
            transport.connect(&request, timeout).await.unwrap();
        }
        transport
            .connect(&request, Timeouts::default().connect)
            .await
            .unwrap();

        assert_eq!(transport.clients.len(), 2);
        assert!(transport.clients.contains_key(&Duration::from_millis(100)));
    }

    #[tokio::test]
    async fn test_connect_timeout_override_reaches_network() {
        let client = ClientBuilder::builder()
            .interceptors(vec![
                Arc::new(ConnectWithin(Duration::from_millis(100))) as Arc<dyn Interceptor>
            ])
            .timeouts(Timeouts {
                connect: Duration::from_secs(30),
                read: Duration::from_secs(30),
                write: Duration::from_secs(30),
            })
            .max_retries(0u64)
            .build()
            .client()
            .unwrap();
        // Non-routable, so connecting hangs until the connect timeout
        let request = Request::get("http://10.255.255.1:81/").unwrap();

        let started = Instant::now();
        let result = client.new_call(request).execute().await;

        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
