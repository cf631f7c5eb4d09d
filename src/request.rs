use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::Method;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::cancellation::Cancellation;
use crate::codec::{self, ComposedBody};
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::headers::Headers;
use crate::query::{self, QueryFragment};
use crate::resolver;
use crate::response::{ResolveWith, Reply};
use crate::state::{Field, FieldValue, RequestState};
use crate::transform::{Transformer, Transformers};
use crate::transport::Transport;

/// The resolved, ready-to-send form of a request
///
/// Produced fresh by every compose and handed to the transport as-is.
#[derive(Debug, Clone)]
pub struct ComposedRequest {
    pub url: String,
    pub method: Method,
    pub headers: Headers,
    pub body: Option<ComposedBody>,
    pub timeout: Option<Duration>,
    pub cancellation: Option<Cancellation>,
    pub resolve_with: Option<ResolveWith>,
    pub simple: bool,
    /// Passthrough options for the transport
    pub other: Map<String, Value>,
}

pub type ModifyFn =
    Box<dyn FnOnce(FieldValue, &RequestState, Field) -> Result<FieldValue> + Send>;

/// One unit of configuration for a [`RequestBuilder`]
///
/// A setting is either a field value (combined with the current value
/// according to the field's kind), a function computing a field's new value,
/// or a transformer to register.
pub enum Setting {
    Value(FieldValue),
    Modify(Field, ModifyFn),
    Transformer(Transformer),
}

impl Setting {
    pub fn method(method: Method) -> Self {
        Setting::Value(FieldValue::Method(method))
    }

    pub fn url(fragment: impl Into<String>) -> Self {
        Setting::Value(FieldValue::Url(vec![fragment.into()]))
    }

    pub fn query(fragment: impl Into<QueryFragment>) -> Self {
        Setting::Value(FieldValue::Query(vec![fragment.into()]))
    }

    pub fn headers(headers: impl Into<Headers>) -> Self {
        Setting::Value(FieldValue::Headers(headers.into()))
    }

    pub fn header(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::headers(Headers::from([(name.into(), value.into())]))
    }

    pub fn body(body: Value) -> Self {
        Setting::Value(FieldValue::Body(Some(body)))
    }

    /// Content-type shorthand: `json`, `form` or a literal media type
    pub fn content_type(tag: impl Into<String>) -> Self {
        Setting::Value(FieldValue::ContentType(Some(tag.into())))
    }

    pub fn timeout(timeout: Duration) -> Self {
        Setting::Value(FieldValue::Timeout(Some(timeout)))
    }

    pub fn cancellation(cancellation: Cancellation) -> Self {
        Setting::Value(FieldValue::Cancellation(Some(cancellation)))
    }

    pub fn resolve_with(resolve_with: ResolveWith) -> Self {
        Setting::Value(FieldValue::ResolveWith(Some(resolve_with)))
    }

    pub fn simple(simple: bool) -> Self {
        Setting::Value(FieldValue::Simple(simple))
    }

    /// A passthrough option for the transport, read only by custom transports
    pub fn option(key: impl Into<String>, value: Value) -> Self {
        let mut map = Map::new();
        map.insert(key.into(), value);
        Setting::Value(FieldValue::Other(map))
    }

    pub fn transformer(transformer: Transformer) -> Self {
        Setting::Transformer(transformer)
    }

    /// Replace a field with a value computed from its current value
    pub fn modify<F>(field: Field, f: F) -> Self
    where
        F: FnOnce(FieldValue, &RequestState, Field) -> Result<FieldValue> + Send + 'static,
    {
        Setting::Modify(field, Box::new(f))
    }
}

impl From<FieldValue> for Setting {
    fn from(value: FieldValue) -> Self {
        Setting::Value(value)
    }
}

impl From<Transformer> for Setting {
    fn from(transformer: Transformer) -> Self {
        Setting::Transformer(transformer)
    }
}

/// A bare string is a URL fragment
impl From<&str> for Setting {
    fn from(url: &str) -> Self {
        Setting::url(url)
    }
}

impl From<String> for Setting {
    fn from(url: String) -> Self {
        Setting::url(url)
    }
}

impl fmt::Debug for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Setting::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Setting::Modify(field, _) => f.debug_tuple("Modify").field(field).finish(),
            Setting::Transformer(t) => f.debug_tuple("Transformer").field(t).finish(),
        }
    }
}

/// Composable request builder
///
/// A builder accumulates URL fragments, query fragments, headers, a body and
/// options across chained calls. Nothing is resolved until [`compose`] or
/// [`fetch`], so a builder can serve as a base that is cloned and extended
/// per call.
///
/// # Examples
///
/// ```rust,no_run
/// use fetchkit::{Client, ResolveWith};
///
/// #[tokio::main]
/// async fn main() -> fetchkit::Result<()> {
///     let api = Client::new().request().url("https://httpbin.org");
///
///     let reply = api
///         .clone()
///         .get("anything")
///         .query([("page", "2")])
///         .resolve_with(ResolveWith::Json)
///         .fetch()
///         .await?;
///     println!("{:?}", reply.data());
///     Ok(())
/// }
/// ```
///
/// [`compose`]: RequestBuilder::compose
/// [`fetch`]: RequestBuilder::fetch
#[derive(Clone)]
pub struct RequestBuilder {
    state: RequestState,
    transformers: Transformers,
    executor: Executor,
}

impl RequestBuilder {
    /// Create an empty builder dispatching through `transport`
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_executor(Executor::new(transport))
    }

    /// Create an empty builder over an existing executor
    pub fn with_executor(executor: Executor) -> Self {
        Self::from_parts(RequestState::new(), Transformers::new(), executor)
    }

    pub(crate) fn from_parts(
        state: RequestState,
        transformers: Transformers,
        executor: Executor,
    ) -> Self {
        Self {
            state,
            transformers,
            executor,
        }
    }

    /// Apply one setting
    pub fn set(mut self, setting: impl Into<Setting>) -> Result<Self> {
        self.apply(setting.into())?;
        Ok(self)
    }

    /// Apply settings in order
    pub fn set_all<I, S>(mut self, settings: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<Setting>,
    {
        self.apply_all(settings)?;
        Ok(self)
    }

    fn apply(&mut self, setting: Setting) -> Result<()> {
        match setting {
            Setting::Value(value) => self.state.set(value),
            Setting::Modify(field, f) => self.state.modify(field, f)?,
            Setting::Transformer(transformer) => self.transformers.add(transformer),
        }
        Ok(())
    }

    fn apply_all<I, S>(&mut self, settings: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<Setting>,
    {
        for setting in settings {
            self.apply(setting.into())?;
        }
        Ok(())
    }

    /// Merge another builder's state and transformers into this one
    pub fn merge(mut self, other: &RequestBuilder) -> Self {
        self.state.merge(&other.state);
        self.transformers.extend(&other.transformers);
        self
    }

    /// Set the HTTP method
    pub fn method(mut self, method: Method) -> Self {
        self.state.set(FieldValue::Method(method));
        self
    }

    /// `GET` and append a URL fragment
    pub fn get(self, url: impl Into<String>) -> Self {
        self.method(Method::GET).url(url)
    }

    /// `POST` and append a URL fragment
    pub fn post(self, url: impl Into<String>) -> Self {
        self.method(Method::POST).url(url)
    }

    /// `PUT` and append a URL fragment
    pub fn put(self, url: impl Into<String>) -> Self {
        self.method(Method::PUT).url(url)
    }

    /// `PATCH` and append a URL fragment
    pub fn patch(self, url: impl Into<String>) -> Self {
        self.method(Method::PATCH).url(url)
    }

    /// `DELETE` and append a URL fragment
    pub fn delete(self, url: impl Into<String>) -> Self {
        self.method(Method::DELETE).url(url)
    }

    /// `HEAD` and append a URL fragment
    pub fn head(self, url: impl Into<String>) -> Self {
        self.method(Method::HEAD).url(url)
    }

    /// Append a URL fragment
    pub fn url(mut self, fragment: impl Into<String>) -> Self {
        self.state.set(FieldValue::Url(vec![fragment.into()]));
        self
    }

    /// Append a query fragment
    pub fn query(mut self, fragment: impl Into<QueryFragment>) -> Self {
        self.state.set(FieldValue::Query(vec![fragment.into()]));
        self
    }

    /// Append query pairs from a serializable object
    pub fn query_params<T: Serialize + ?Sized>(self, params: &T) -> Result<Self> {
        Ok(self.query(QueryFragment::from_serialize(params)?))
    }

    /// Set a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.state
            .set(FieldValue::Headers(Headers::from([(name.into(), value.into())])));
        self
    }

    /// Merge headers
    pub fn headers(mut self, headers: impl Into<Headers>) -> Self {
        self.state.set(FieldValue::Headers(headers.into()));
        self
    }

    /// Set the body; objects merge into an existing object body
    pub fn body(mut self, body: Value) -> Self {
        self.state.set(FieldValue::Body(Some(body)));
        self
    }

    /// Set a JSON body
    pub fn json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self> {
        Ok(self.body(serde_json::to_value(body)?).content_type("json"))
    }

    /// Set a form body
    pub fn form<T: Serialize + ?Sized>(self, body: &T) -> Result<Self> {
        Ok(self.body(serde_json::to_value(body)?).content_type("form"))
    }

    /// Set a text body, sent as-is
    pub fn text(self, body: impl Into<String>) -> Self {
        self.body(Value::String(body.into()))
    }

    /// Set the content-type shorthand: `json`, `form` or a media type
    pub fn content_type(mut self, tag: impl Into<String>) -> Self {
        self.state.set(FieldValue::ContentType(Some(tag.into())));
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.state.set(FieldValue::Timeout(Some(timeout)));
        self
    }

    /// Attach a cancellation handle
    pub fn cancellation(mut self, cancellation: Cancellation) -> Self {
        self.state.set(FieldValue::Cancellation(Some(cancellation)));
        self
    }

    /// Decode responses before handing them back
    pub fn resolve_with(mut self, resolve_with: ResolveWith) -> Self {
        self.state.set(FieldValue::ResolveWith(Some(resolve_with)));
        self
    }

    /// Whether non-2xx statuses fail the request (default `true`)
    pub fn simple(mut self, simple: bool) -> Self {
        self.state.set(FieldValue::Simple(simple));
        self
    }

    /// Set a passthrough option for the transport
    ///
    /// Options reach [`Transport::send`](crate::Transport::send) untouched in
    /// [`ComposedRequest::other`]. Only custom transports read them; the
    /// default reqwest transport ignores them.
    pub fn option(mut self, key: impl Into<String>, value: Value) -> Self {
        let mut map = Map::new();
        map.insert(key.into(), value);
        self.state.set(FieldValue::Other(map));
        self
    }

    /// Register a transformer
    pub fn add_transformer(mut self, transformer: Transformer) -> Self {
        self.transformers.add(transformer);
        self
    }

    /// Unregister a transformer; nothing happens if it is not registered
    pub fn remove_transformer(mut self, transformer: &Transformer) -> Self {
        self.transformers.remove(transformer);
        self
    }

    /// Get the accumulated state
    pub fn state(&self) -> &RequestState {
        &self.state
    }

    /// Get the registered transformers
    pub fn transformers(&self) -> &Transformers {
        &self.transformers
    }

    /// Get mutable access to the registered transformers
    pub fn transformers_mut(&mut self) -> &mut Transformers {
        &mut self.transformers
    }

    /// Get the executor
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Compose the accumulated state into a ready-to-send request
    pub fn compose(&self) -> Result<ComposedRequest> {
        self.compose_with(Vec::<Setting>::new())
    }

    /// Compose with per-call overrides applied to a clone of this builder
    pub fn compose_with<I, S>(&self, overrides: I) -> Result<ComposedRequest>
    where
        I: IntoIterator<Item = S>,
        S: Into<Setting>,
    {
        let mut request = self.clone();
        request.apply_all(overrides)?;
        request.build()
    }

    fn build(&self) -> Result<ComposedRequest> {
        let state = &self.state;

        let url = resolver::resolve(state.url())?;
        let url = query::append(&url, &query::compose(state.query()));
        let headers = codec::compose_headers(state.headers(), state.content_type());
        let body = codec::compose_body(state.body(), &headers)?;

        let url = self.transformers.apply_url(url)?;
        let headers = self.transformers.apply_headers(headers)?;
        let body = self.transformers.apply_body(body)?;

        tracing::trace!(method = %state.method(), %url, "composed request");

        Ok(ComposedRequest {
            url,
            method: state.method(),
            headers,
            body,
            timeout: state.timeout(),
            cancellation: state.cancellation().cloned(),
            resolve_with: state.resolve_with(),
            simple: state.simple(),
            other: state.other().clone(),
        })
    }

    /// Compose and dispatch the request
    ///
    /// Every failure, compose errors included, is returned from the awaited
    /// future after passing through the error transformers.
    pub async fn fetch(&self) -> Result<Reply> {
        self.fetch_with(Vec::<Setting>::new()).await
    }

    /// Compose with per-call overrides and dispatch
    pub async fn fetch_with<I, S>(&self, overrides: I) -> Result<Reply>
    where
        I: IntoIterator<Item = S>,
        S: Into<Setting>,
    {
        let mut request = self.clone();
        let outcome = match request.apply_all(overrides) {
            Ok(()) => request.dispatch().await,
            Err(error) => Err(error),
        };

        outcome.map_err(|error| {
            tracing::debug!(%error, "request failed");
            request.transformers.apply_error(error)
        })
    }

    async fn dispatch(&self) -> Result<Reply> {
        let composed = self.build()?;
        self.executor.execute(composed, &self.transformers).await
    }

    /// Dispatch and decode the body, by content type unless a decoder is set
    pub async fn exec(&self) -> Result<Value> {
        let mut overrides = Vec::new();
        if self.state.resolve_with().is_none() {
            overrides.push(Setting::resolve_with(ResolveWith::Auto));
        }
        self.fetch_with(overrides).await?.into_data()
    }

    /// Dispatch and deserialize a JSON body
    pub async fn fetch_json<T>(&self) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let data = self
            .fetch_with([Setting::resolve_with(ResolveWith::Json)])
            .await?
            .into_data()?;
        Ok(serde_json::from_value(data)?)
    }

    /// Dispatch and read the body as text
    pub async fn fetch_text(&self) -> Result<String> {
        let data = self
            .fetch_with([Setting::resolve_with(ResolveWith::Text)])
            .await?
            .into_data()?;
        match data {
            Value::String(text) => Ok(text),
            other => Err(Error::response_parse(format!(
                "expected text, a response transformer produced {}",
                other
            ))),
        }
    }
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("state", &self.state)
            .field("transformers", &self.transformers)
            .field("executor", &self.executor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Response;
    use async_trait::async_trait;
    use serde_json::json;

    struct Unreachable;

    #[async_trait]
    impl Transport for Unreachable {
        async fn send(&self, _request: ComposedRequest) -> Result<Response> {
            Err(Error::transport("unreachable"))
        }

        fn name(&self) -> &str {
            "unreachable"
        }
    }

    fn builder() -> RequestBuilder {
        RequestBuilder::new(Arc::new(Unreachable))
    }

    #[test]
    fn test_query_accumulates() {
        let base = builder().url("http://h").query([("a", "1")]);
        assert_eq!(base.compose().unwrap().url, "http://h?a=1");

        let more = base.query([("b", "2")]);
        assert_eq!(more.compose().unwrap().url, "http://h?a=1&b=2");
    }

    #[test]
    fn test_query_after_embedded_query() {
        let request = builder().url("http://h/x?a=1").query("b=2");
        assert_eq!(request.compose().unwrap().url, "http://h/x?a=1&b=2");
    }

    #[test]
    fn test_url_set_twice_appends() {
        let request = builder()
            .set("http://h/api")
            .unwrap()
            .set(Setting::url("users"))
            .unwrap();
        assert_eq!(request.compose().unwrap().url, "http://h/api/users");
    }

    #[test]
    fn test_compose_with_overrides_leaves_builder_untouched() {
        let base = builder().url("http://h");
        let composed = base
            .compose_with([Setting::url("extra"), Setting::method(Method::POST)])
            .unwrap();
        assert_eq!(composed.url, "http://h/extra");
        assert_eq!(composed.method, Method::POST);

        let again = base.compose().unwrap();
        assert_eq!(again.url, "http://h");
        assert_eq!(again.method, Method::GET);
    }

    #[test]
    fn test_json_body_and_header() {
        let composed = builder()
            .post("http://h")
            .json(&json!({"foo": "bar"}))
            .unwrap()
            .compose()
            .unwrap();
        assert_eq!(composed.headers.get("Content-Type"), Some("application/json"));
        assert_eq!(
            composed.body.as_ref().and_then(ComposedBody::as_text),
            Some(r#"{"foo":"bar"}"#)
        );
    }

    #[test]
    fn test_form_body() {
        let composed = builder()
            .post("http://h")
            .body(json!({"foo": "bar"}))
            .header("Content-Type", codec::FORM)
            .compose()
            .unwrap();
        assert_eq!(composed.body, Some(ComposedBody::Text("foo=bar".to_string())));
    }

    #[test]
    fn test_transformers_run_after_codec() {
        let composed = builder()
            .url("http://h")
            .query([("a", "1")])
            .content_type("json")
            .body(json!({"n": 1}))
            .add_transformer(Transformer::url(|url| Ok(url.replace("a=1", "a=2"))))
            .add_transformer(Transformer::headers(|mut headers| {
                let content_type = headers.get("Content-Type").unwrap_or_default().to_string();
                headers.insert("X-Seen-Type", content_type);
                Ok(headers)
            }))
            .add_transformer(Transformer::body(|body| {
                assert_eq!(body, Some(ComposedBody::Text(r#"{"n":1}"#.to_string())));
                Ok(Some(ComposedBody::Text("replaced".to_string())))
            }))
            .compose()
            .unwrap();

        assert_eq!(composed.url, "http://h?a=2");
        assert_eq!(composed.headers.get("x-seen-type"), Some("application/json"));
        assert_eq!(composed.body, Some(ComposedBody::Text("replaced".to_string())));
    }

    #[test]
    fn test_one_shot_transformer_setting() {
        let base = builder().url("http://h");
        let composed = base
            .compose_with([Setting::transformer(Transformer::url(|u| Ok(u + "/once")))])
            .unwrap();
        assert_eq!(composed.url, "http://h/once");
        assert_eq!(base.compose().unwrap().url, "http://h");
    }

    #[test]
    fn test_merge_builder() {
        let parent = builder()
            .url("http://h")
            .header("a", "1")
            .add_transformer(Transformer::url(|u| Ok(u + "?from=parent")));
        let child = builder().url("child").merge(&parent);

        let composed = child.compose().unwrap();
        assert_eq!(composed.url, "http://h?from=parent");
        assert_eq!(composed.headers.get("a"), Some("1"));
    }

    #[test]
    fn test_modify_setting() {
        let request = builder()
            .url("http://a")
            .url("x")
            .set(Setting::modify(Field::Url, |_, _, _| {
                Ok(FieldValue::Url(vec!["http://b".to_string()]))
            }))
            .unwrap();
        assert_eq!(request.compose().unwrap().url, "http://b");
    }

    #[test]
    fn test_missing_url_on_compose() {
        assert!(builder().compose().unwrap_err().is_missing_url());
    }

    #[tokio::test]
    async fn test_missing_url_surfaces_from_fetch() {
        let err = builder()
            .add_transformer(Transformer::error(|e| {
                Error::custom(format!("normalized: {}", e))
            }))
            .fetch()
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("normalized: Missing URL"));
    }

    #[tokio::test]
    async fn test_transport_error_passes_error_chain() {
        let err = builder().url("http://h").fetch().await.unwrap_err();
        assert!(err.is_network());
        assert_eq!(err.to_string(), "Transport error: unreachable");
    }
}
