use std::sync::Arc;
use std::time::Duration;

use http::Method;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::headers::Headers;
use crate::request::RequestBuilder;
use crate::response::{ResolveWith, Reply};
use crate::state::{FieldValue, RequestState};
use crate::transform::{Transformer, Transformers};
use crate::transport::{HttpTransport, Transport, TransportConfig};

/// Timeout applied to requests unless configured otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Entry point for building requests
///
/// A client owns the transport and the defaults every request starts from:
/// a base URL, default headers, the timeout, and any transformers that should
/// apply to every request.
///
/// # Examples
///
/// ```rust,no_run
/// use fetchkit::Client;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = Client::new();
///     let body = client.get("https://httpbin.org/json").fetch_text().await?;
///     println!("Body: {}", body);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    executor: Executor,
    defaults: RequestState,
    transformers: Transformers,
}

impl Client {
    /// Create a new client with default settings
    pub fn new() -> Self {
        Self::with_transport(Arc::new(HttpTransport::new()))
    }

    /// Create a client with default settings over a custom transport
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        let mut defaults = RequestState::new();
        defaults.set(FieldValue::Timeout(Some(DEFAULT_TIMEOUT)));
        Self {
            executor: Executor::new(transport),
            defaults,
            transformers: Transformers::new(),
        }
    }

    /// Create a new client builder
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Start a request from the client's defaults
    pub fn request(&self) -> RequestBuilder {
        RequestBuilder::from_parts(
            self.defaults.clone(),
            self.transformers.clone(),
            self.executor.clone(),
        )
    }

    /// Create a GET request
    pub fn get(&self, url: impl Into<String>) -> RequestBuilder {
        self.request().get(url)
    }

    /// Create a POST request
    pub fn post(&self, url: impl Into<String>) -> RequestBuilder {
        self.request().post(url)
    }

    /// Create a PUT request
    pub fn put(&self, url: impl Into<String>) -> RequestBuilder {
        self.request().put(url)
    }

    /// Create a PATCH request
    pub fn patch(&self, url: impl Into<String>) -> RequestBuilder {
        self.request().patch(url)
    }

    /// Create a DELETE request
    pub fn delete(&self, url: impl Into<String>) -> RequestBuilder {
        self.request().delete(url)
    }

    /// Create a HEAD request
    pub fn head(&self, url: impl Into<String>) -> RequestBuilder {
        self.request().head(url)
    }

    /// Send a one-off GET request and decode the body by content type
    pub async fn exec(&self, url: impl Into<String>) -> Result<Value> {
        self.get(url).exec().await
    }

    /// Send a one-off GET request and return the raw reply
    pub async fn fetch(&self, url: impl Into<String>) -> Result<Reply> {
        self.get(url).fetch().await
    }

    /// Get the transport
    pub fn transport(&self) -> &dyn Transport {
        self.executor.transport()
    }

    /// Get the defaults every request starts from
    pub fn defaults(&self) -> &RequestState {
        &self.defaults
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("executor", &self.executor)
            .field("defaults", &self.defaults)
            .finish()
    }
}

/// Builder for creating clients with custom configuration
///
/// # Examples
///
/// ```rust
/// use fetchkit::ClientBuilder;
/// use std::time::Duration;
///
/// let client = ClientBuilder::new()
///     .timeout(Duration::from_secs(10))
///     .user_agent("MyApp/1.0")
///     .base_url("https://api.example.com/v1/")
///     .build()
///     .unwrap();
/// ```
pub struct ClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    transport_config: TransportConfig,
    timeout: Option<Duration>,
    default_headers: Headers,
    base_url: Option<String>,
    method: Option<Method>,
    resolve_with: Option<ResolveWith>,
    simple: Option<bool>,
    transformers: Transformers,
}

impl ClientBuilder {
    /// Create a new client builder
    pub fn new() -> Self {
        Self {
            transport: None,
            transport_config: TransportConfig::default(),
            timeout: Some(DEFAULT_TIMEOUT),
            default_headers: Headers::new(),
            base_url: None,
            method: None,
            resolve_with: None,
            simple: None,
            transformers: Transformers::new(),
        }
    }

    /// Dispatch through a custom transport instead of reqwest
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the default timeout for all requests
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Do not race requests against a timer unless they set a timeout
    pub fn no_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Set the connection timeout of the default transport
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.transport_config.connect_timeout = Some(timeout);
        self
    }

    /// Set the maximum number of idle connections per host
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.transport_config.pool_size = max;
        self
    }

    /// Set the maximum redirects to follow
    pub fn redirect(mut self, max_redirects: usize) -> Self {
        self.transport_config.max_redirects = Some(max_redirects);
        self
    }

    /// Disable redirects
    pub fn no_redirect(mut self) -> Self {
        self.transport_config.max_redirects = None;
        self
    }

    /// Set a default header for all requests
    pub fn default_header(mut self, name: &str, value: &str) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    /// Set the user agent
    pub fn user_agent(self, user_agent: &str) -> Self {
        self.default_header("User-Agent", user_agent)
    }

    /// Set the base URL every request's fragments are resolved against
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the default method
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Decode every response by default
    pub fn resolve_with(mut self, resolve_with: ResolveWith) -> Self {
        self.resolve_with = Some(resolve_with);
        self
    }

    /// Whether non-2xx statuses fail requests (default `true`)
    pub fn simple(mut self, simple: bool) -> Self {
        self.simple = Some(simple);
        self
    }

    /// Register a transformer on every request
    pub fn transformer(mut self, transformer: Transformer) -> Self {
        self.transformers.add(transformer);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<Client> {
        // Validate default headers up front rather than on the first request
        self.default_headers.to_header_map()?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => {
                let client = HttpTransport::client_builder(&self.transport_config)
                    .build()
                    .map_err(Error::Network)?;
                Arc::new(HttpTransport::from_client(client))
            }
        };

        let mut defaults = RequestState::new();
        if let Some(base_url) = self.base_url {
            defaults.set(FieldValue::Url(vec![base_url]));
        }
        if let Some(method) = self.method {
            defaults.set(FieldValue::Method(method));
        }
        if let Some(simple) = self.simple {
            defaults.set(FieldValue::Simple(simple));
        }
        defaults.set(FieldValue::Headers(self.default_headers));
        defaults.set(FieldValue::Timeout(self.timeout));
        defaults.set(FieldValue::ResolveWith(self.resolve_with));

        tracing::debug!(transport = transport.name(), "client built");

        Ok(Client {
            executor: Executor::new(transport),
            defaults,
            transformers: self.transformers,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = Client::new();
        assert_eq!(client.transport().name(), "reqwest");
        assert_eq!(client.defaults().timeout(), Some(DEFAULT_TIMEOUT));
    }

    #[test]
    fn test_client_builder() {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(5))
            .user_agent("Test/1.0")
            .base_url("https://api.example.com/v1/")
            .resolve_with(ResolveWith::Json)
            .build()
            .unwrap();

        let defaults = client.defaults();
        assert_eq!(defaults.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(defaults.headers().get("user-agent"), Some("Test/1.0"));
        assert_eq!(defaults.resolve_with(), Some(ResolveWith::Json));
    }

    #[test]
    fn test_invalid_default_header_rejected() {
        let result = ClientBuilder::new().default_header("bad header", "x").build();
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_request_builder_starts_from_defaults() {
        let client = ClientBuilder::new()
            .base_url("https://api.example.com/v1/")
            .transformer(Transformer::url(|url| Ok(url + "?sig=1")))
            .build()
            .unwrap();

        let composed = client.get("users").compose().unwrap();
        assert_eq!(composed.method, Method::GET);
        assert_eq!(composed.url, "https://api.example.com/v1/users?sig=1");
    }

    #[test]
    fn test_no_timeout() {
        let client = ClientBuilder::new().no_timeout().build().unwrap();
        assert_eq!(client.defaults().timeout(), None);
    }
}
