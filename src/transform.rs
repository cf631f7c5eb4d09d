//! Transformer pipeline
//!
//! Each request carries one ordered transformer list per [`HookKind`]. A hook
//! runs its transformers in registration order, feeding each the previous
//! output. Url, body and headers hooks run synchronously during compose;
//! response hooks are asynchronous; error hooks are infallible rewrites.
//!
//! Transformers are reference counted. Cloning a [`Transformers`] copies the
//! lists, so later `add`/`remove` calls on the clone and the original do not
//! see each other, while the functions themselves stay shared.
//!
//! ```rust
//! use fetchkit::transform::{HookKind, Transformer, Transformers};
//!
//! let mut transformers = Transformers::new();
//! let lower = Transformer::url(|url| Ok(url.to_lowercase()));
//! transformers.add(lower.clone());
//! assert_eq!(transformers.apply_url("HTTP://H/A".into()).unwrap(), "http://h/a");
//!
//! assert!(transformers.remove(&lower));
//! assert_eq!(transformers.len(HookKind::Url), 0);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

use crate::codec::ComposedBody;
use crate::error::{Error, Result};
use crate::headers::Headers;
use crate::response::{Reply, Response};

pub type UrlFn = dyn Fn(String) -> Result<String> + Send + Sync;
pub type BodyFn = dyn Fn(Option<ComposedBody>) -> Result<Option<ComposedBody>> + Send + Sync;
pub type HeadersFn = dyn Fn(Headers) -> Result<Headers> + Send + Sync;
pub type ResponseFn = dyn Fn(Reply) -> BoxFuture<'static, Result<Reply>> + Send + Sync;
pub type ResponseDataFn =
    dyn Fn(Value, Arc<Response>) -> BoxFuture<'static, Result<Value>> + Send + Sync;
pub type ErrorFn = dyn Fn(Error) -> Error + Send + Sync;

/// Pipeline stage a transformer is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HookKind {
    Url,
    Body,
    Headers,
    Response,
    ResponseData,
    Error,
}

/// A function attached to one hook
#[derive(Clone)]
pub enum Transformer {
    Url(Arc<UrlFn>),
    Body(Arc<BodyFn>),
    Headers(Arc<HeadersFn>),
    Response(Arc<ResponseFn>),
    ResponseData(Arc<ResponseDataFn>),
    Error(Arc<ErrorFn>),
}

impl Transformer {
    /// Rewrite the resolved URL (query included)
    pub fn url<F>(f: F) -> Self
    where
        F: Fn(String) -> Result<String> + Send + Sync + 'static,
    {
        Transformer::Url(Arc::new(f))
    }

    /// Rewrite the composed body
    pub fn body<F>(f: F) -> Self
    where
        F: Fn(Option<ComposedBody>) -> Result<Option<ComposedBody>> + Send + Sync + 'static,
    {
        Transformer::Body(Arc::new(f))
    }

    /// Rewrite the composed headers
    pub fn headers<F>(f: F) -> Self
    where
        F: Fn(Headers) -> Result<Headers> + Send + Sync + 'static,
    {
        Transformer::Headers(Arc::new(f))
    }

    /// Rewrite the reply, raw or decoded
    pub fn response<F, Fut>(f: F) -> Self
    where
        F: Fn(Reply) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply>> + Send + 'static,
    {
        Transformer::Response(Arc::new(move |reply| f(reply).boxed()))
    }

    /// Rewrite decoded response data
    ///
    /// The response the data was decoded from is passed alongside, so status
    /// and headers stay reachable.
    pub fn response_data<F, Fut>(f: F) -> Self
    where
        F: Fn(Value, Arc<Response>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Transformer::ResponseData(Arc::new(move |data, response| f(data, response).boxed()))
    }

    /// Enrich or replace an error before it is returned
    pub fn error<F>(f: F) -> Self
    where
        F: Fn(Error) -> Error + Send + Sync + 'static,
    {
        Transformer::Error(Arc::new(f))
    }

    /// Hook this transformer belongs to
    pub fn kind(&self) -> HookKind {
        match self {
            Transformer::Url(_) => HookKind::Url,
            Transformer::Body(_) => HookKind::Body,
            Transformer::Headers(_) => HookKind::Headers,
            Transformer::Response(_) => HookKind::Response,
            Transformer::ResponseData(_) => HookKind::ResponseData,
            Transformer::Error(_) => HookKind::Error,
        }
    }

    /// Identity comparison: true only for clones of the same transformer
    pub fn same_as(&self, other: &Transformer) -> bool {
        match (self, other) {
            (Transformer::Url(a), Transformer::Url(b)) => Arc::ptr_eq(a, b),
            (Transformer::Body(a), Transformer::Body(b)) => Arc::ptr_eq(a, b),
            (Transformer::Headers(a), Transformer::Headers(b)) => Arc::ptr_eq(a, b),
            (Transformer::Response(a), Transformer::Response(b)) => Arc::ptr_eq(a, b),
            (Transformer::ResponseData(a), Transformer::ResponseData(b)) => Arc::ptr_eq(a, b),
            (Transformer::Error(a), Transformer::Error(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transformer").field(&self.kind()).finish()
    }
}

/// Registry of transformer lists, one per hook
#[derive(Clone, Default)]
pub struct Transformers {
    hooks: BTreeMap<HookKind, Vec<Transformer>>,
}

impl Transformers {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transformer to its hook
    pub fn add(&mut self, transformer: Transformer) {
        self.hooks
            .entry(transformer.kind())
            .or_default()
            .push(transformer);
    }

    /// Remove a previously added transformer; returns false if absent
    pub fn remove(&mut self, transformer: &Transformer) -> bool {
        let Some(list) = self.hooks.get_mut(&transformer.kind()) else {
            return false;
        };
        match list.iter().position(|t| t.same_as(transformer)) {
            Some(index) => {
                list.remove(index);
                true
            }
            None => false,
        }
    }

    /// Append every list of `other` after this registry's lists
    pub fn extend(&mut self, other: &Transformers) {
        for transformer in other.hooks.values().flatten() {
            self.add(transformer.clone());
        }
    }

    /// Number of transformers on a hook
    pub fn len(&self, kind: HookKind) -> usize {
        self.hooks.get(&kind).map_or(0, Vec::len)
    }

    /// Check whether no hook has a transformer
    pub fn is_empty(&self) -> bool {
        self.hooks.values().all(Vec::is_empty)
    }

    fn list(&self, kind: HookKind) -> &[Transformer] {
        self.hooks.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn apply_url(&self, mut url: String) -> Result<String> {
        for transformer in self.list(HookKind::Url) {
            if let Transformer::Url(f) = transformer {
                url = f(url)?;
            }
        }
        Ok(url)
    }

    pub fn apply_body(&self, mut body: Option<ComposedBody>) -> Result<Option<ComposedBody>> {
        for transformer in self.list(HookKind::Body) {
            if let Transformer::Body(f) = transformer {
                body = f(body)?;
            }
        }
        Ok(body)
    }

    pub fn apply_headers(&self, mut headers: Headers) -> Result<Headers> {
        for transformer in self.list(HookKind::Headers) {
            if let Transformer::Headers(f) = transformer {
                headers = f(headers)?;
            }
        }
        Ok(headers)
    }

    pub async fn apply_response(&self, mut reply: Reply) -> Result<Reply> {
        for transformer in self.list(HookKind::Response) {
            if let Transformer::Response(f) = transformer {
                reply = f(reply).await?;
            }
        }
        Ok(reply)
    }

    pub async fn apply_response_data(
        &self,
        mut data: Value,
        response: &Arc<Response>,
    ) -> Result<Value> {
        for transformer in self.list(HookKind::ResponseData) {
            if let Transformer::ResponseData(f) = transformer {
                data = f(data, Arc::clone(response)).await?;
            }
        }
        Ok(data)
    }

    pub fn apply_error(&self, mut error: Error) -> Error {
        for transformer in self.list(HookKind::Error) {
            if let Transformer::Error(f) = transformer {
                error = f(error);
            }
        }
        error
    }
}

impl fmt::Debug for Transformers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.hooks.iter().map(|(kind, list)| (kind, list.len())))
            .finish()
    }
}
