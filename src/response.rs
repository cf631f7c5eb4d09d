use http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::Value;

use crate::error::{Error, Result};

/// HTTP response representation
///
/// Transports hand back a fully buffered response, so reading the body is
/// synchronous and may be done more than once.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    status_text: String,
    headers: HeaderMap,
    url: String,
    body: Vec<u8>,
}

impl Response {
    /// Buffer a reqwest response
    pub async fn from_reqwest_response(reqwest_response: reqwest::Response) -> Result<Self> {
        let status = reqwest_response.status();
        let headers = reqwest_response.headers().clone();
        let url = reqwest_response.url().to_string();
        let body = reqwest_response
            .bytes()
            .await
            .map_err(Error::Network)?
            .to_vec();

        Ok(Self {
            status,
            status_text: canonical_reason(status),
            headers,
            url,
            body,
        })
    }

    /// Create a response builder
    pub fn builder(status: StatusCode) -> ResponseBuilder {
        ResponseBuilder::new(status)
    }

    /// Check if the response is successful (2xx status code)
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    /// Get the HTTP status code
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the status text
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Get the response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a specific header value
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get the content type
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Get the URL that was requested
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get the raw body
    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    /// Get the response body as text
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.clone())
            .map_err(|e| Error::response_parse(format!("body is not valid UTF-8: {}", e)))
    }

    /// Get the response body as JSON
    pub fn json<T>(&self) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Check whether the content type announces JSON
    pub fn is_json(&self) -> bool {
        self.content_type()
            .map(|ct| ct.contains(crate::codec::JSON))
            .unwrap_or(false)
    }
}

fn canonical_reason(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or_default().to_string()
}

/// What a request resolves with
#[derive(Debug, Clone)]
pub enum Reply {
    /// The raw response, when no decoding was requested
    Response(Response),
    /// The decoded body; text bodies decode to `Value::String`
    Data(Value),
}

impl Reply {
    /// The raw response, if not decoded
    pub fn response(&self) -> Option<&Response> {
        match self {
            Reply::Response(response) => Some(response),
            Reply::Data(_) => None,
        }
    }

    /// The decoded data, if decoded
    pub fn data(&self) -> Option<&Value> {
        match self {
            Reply::Data(data) => Some(data),
            Reply::Response(_) => None,
        }
    }

    /// Consume into the decoded data
    ///
    /// A raw response is decoded by its content type.
    pub fn into_data(self) -> Result<Value> {
        match self {
            Reply::Data(data) => Ok(data),
            Reply::Response(response) => ResolveWith::Auto.decode(&response),
        }
    }

    /// Consume into the raw response
    pub fn into_response(self) -> Result<Response> {
        match self {
            Reply::Response(response) => Ok(response),
            Reply::Data(_) => Err(Error::custom("reply was already decoded")),
        }
    }
}

/// How the executor decodes a response before handing it back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveWith {
    /// Parse the body as JSON
    Json,
    /// Read the body as text
    Text,
    /// JSON when the content type says so, text otherwise
    Auto,
}

impl ResolveWith {
    /// Decode a response body
    pub fn decode(self, response: &Response) -> Result<Value> {
        match self {
            ResolveWith::Json => response.json(),
            ResolveWith::Text => response.text().map(Value::String),
            ResolveWith::Auto if response.is_json() => response.json(),
            ResolveWith::Auto => response.text().map(Value::String),
        }
    }
}

impl std::str::FromStr for ResolveWith {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ResolveWith::Json),
            "text" => Ok(ResolveWith::Text),
            "auto" => Ok(ResolveWith::Auto),
            other => Err(Error::invalid_request(format!(
                "unknown response decoder: {}",
                other
            ))),
        }
    }
}

/// Response builder for custom transports and tests
#[derive(Debug)]
pub struct ResponseBuilder {
    status: StatusCode,
    status_text: Option<String>,
    headers: HeaderMap,
    url: String,
    body: Vec<u8>,
}

impl ResponseBuilder {
    /// Create a new response builder
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            status_text: None,
            headers: HeaderMap::new(),
            url: String::new(),
            body: Vec::new(),
        }
    }

    /// Set the status code
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Override the status text
    pub fn status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = Some(status_text.into());
        self
    }

    /// Set a header
    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = name.parse::<http::header::HeaderName>()?;
        let value = value.parse::<HeaderValue>()?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Set the content type
    pub fn content_type(self, content_type: &str) -> Result<Self> {
        self.header("Content-Type", content_type)
    }

    /// Set the URL
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the body
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Set text body
    pub fn text(mut self, text: &str) -> Self {
        self.body = text.as_bytes().to_vec();
        self
    }

    /// Set JSON body and content type
    pub fn json(mut self, json: &Value) -> Result<Self> {
        self.body = serde_json::to_vec(json)?;
        self.content_type(crate::codec::JSON)
    }

    /// Build the response
    pub fn build(self) -> Response {
        Response {
            status: self.status,
            status_text: self
                .status_text
                .unwrap_or_else(|| canonical_reason(self.status)),
            headers: self.headers,
            url: self.url,
            body: self.body,
        }
    }
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}
