use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;

use crate::error::{Error, Result};
use crate::request::ComposedRequest;
use crate::response::Response;

/// Transport trait for HTTP operations
///
/// This is the network primitive a request is dispatched through. The
/// executor owns the race against timeouts and cancellation; a transport
/// only has to perform one exchange. Dropping the returned future must abort
/// the exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a composed request and return the buffered response
    async fn send(&self, request: ComposedRequest) -> Result<Response>;

    /// Get the transport name/type
    fn name(&self) -> &str;
}

/// Default HTTP transport implementation using reqwest
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Arc<ReqwestClient>,
}

impl HttpTransport {
    /// Create a transport over a default reqwest client
    pub fn new() -> Self {
        Self::from_client(ReqwestClient::new())
    }

    /// Create a transport over a configured reqwest client
    pub fn from_client(client: ReqwestClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Create a reqwest client builder with transport-level settings
    pub fn client_builder(config: &TransportConfig) -> reqwest::ClientBuilder {
        let mut builder = ReqwestClient::builder().pool_max_idle_per_host(config.pool_size);
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(keep_alive) = config.tcp_keep_alive {
            builder = builder.tcp_keepalive(keep_alive);
        }
        builder = match config.max_redirects {
            Some(max) => builder.redirect(reqwest::redirect::Policy::limited(max)),
            None => builder.redirect(reqwest::redirect::Policy::none()),
        };
        builder
    }

    /// Get the underlying reqwest client
    pub fn client(&self) -> &ReqwestClient {
        &self.client
    }

    fn build_request(&self, request: ComposedRequest) -> Result<reqwest::Request> {
        let url = url::Url::parse(&request.url).map_err(|e| {
            Error::invalid_request(format!("cannot send to `{}`: {}", request.url, e))
        })?;

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .headers(request.headers.to_header_map()?);

        if !request.other.is_empty() {
            tracing::trace!(
                keys = ?request.other.keys().collect::<Vec<_>>(),
                "reqwest transport ignores passthrough options"
            );
        }

        if let Some(body) = &request.body {
            builder = builder.body(body.to_bytes()?);
        }

        builder.build().map_err(Error::Network)
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ComposedRequest) -> Result<Response> {
        let request = self.build_request(request)?;
        tracing::trace!(method = %request.method(), url = %request.url(), "sending over reqwest");

        let response = self.client.execute(request).await.map_err(Error::Network)?;
        Response::from_reqwest_response(response).await
    }

    fn name(&self) -> &str {
        "reqwest"
    }
}

/// Connection settings for the default transport
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Connection establishment timeout
    pub connect_timeout: Option<Duration>,
    /// Maximum redirects to follow; `None` disables redirects
    pub max_redirects: Option<usize>,
    /// Idle connections kept per host
    pub pool_size: usize,
    /// TCP keep-alive
    pub tcp_keep_alive: Option<Duration>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(10)),
            max_redirects: Some(10),
            pool_size: 100,
            tcp_keep_alive: Some(Duration::from_secs(60)),
        }
    }
}
