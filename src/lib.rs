//! FetchKit - A composable HTTP request builder for Rust
//!
//! FetchKit accumulates request settings through a fluent builder, resolves URL
//! fragments and query strings, encodes bodies by content type, and runs every
//! request through a pipeline of user transformers. Each request races the
//! transport against a timeout and an optional cancellation signal.
//!
//! ## Features
//!
//! - **Accumulating settings** where URL fragments and query parts append and
//!   headers and object bodies merge
//! - **Transformer hooks** for URL, body, headers, response, decoded data, and errors
//! - **Deferred errors** that surface only when a request is fetched
//! - **Strict timeouts** and latched cancellation
//! - **Pluggable transport** with a reqwest-backed default
//! - **Type-safe JSON** handling with Serde
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fetchkit::{Client, ResolveWith};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new();
//!     let api = client.request().url("https://httpbin.org").resolve_with(ResolveWith::Json);
//!
//!     let data = api
//!         .clone()
//!         .post("anything")
//!         .query([("page", "1")])
//!         .json(&json!({"name": "fetchkit"}))?
//!         .fetch()
//!         .await?
//!         .into_data()?;
//!
//!     println!("Echo: {}", data["json"]);
//!     Ok(())
//! }
//! ```

pub mod cancellation;
pub mod client;
pub mod codec;
pub mod error;
pub mod executor;
pub mod headers;
pub mod query;
pub mod request;
pub mod resolver;
pub mod response;
pub mod state;
pub mod transform;
pub mod transport;

// Re-export main types for convenience
pub use cancellation::Cancellation;
pub use client::{Client, ClientBuilder};
pub use codec::ComposedBody;
pub use error::{Error, Result};
pub use executor::Executor;
pub use headers::Headers;
pub use query::QueryFragment;
pub use request::{ComposedRequest, RequestBuilder, Setting};
pub use response::{Reply, ResolveWith, Response, ResponseBuilder};
pub use state::{Field, FieldKind, FieldValue, RequestState};
pub use transform::{HookKind, Transformer, Transformers};
pub use transport::{HttpTransport, Transport, TransportConfig};

// Re-export common HTTP types
pub use http::{HeaderMap, HeaderValue, Method, StatusCode};

// Re-export JSON types
pub use serde_json::{Map as JsonMap, Value as JsonValue};

// Re-export common traits
pub use async_trait::async_trait;
