//! Accumulated request state
//!
//! Every settable key is a [`Field`], and every field has a fixed
//! [`FieldKind`] that decides what `set` does with an incoming value:
//!
//! | kind       | fields                                    | `set` does      |
//! |------------|-------------------------------------------|-----------------|
//! | `Sequence` | `Url`, `Query`                            | append          |
//! | `Mapping`  | `Headers`, `Body`, `Other`                | shallow merge   |
//! | `Scalar`   | everything else                           | replace         |
//!
//! `modify` is the fourth mutation: a function computes the field's new value
//! from the current one, which then replaces it outright.

use std::fmt;
use std::time::Duration;

use http::Method;
use serde_json::{Map, Value};

use crate::cancellation::Cancellation;
use crate::error::{Error, Result};
use crate::headers::Headers;
use crate::query::QueryFragment;
use crate::response::ResolveWith;

/// A settable key of the request state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Method,
    Url,
    Query,
    Headers,
    Body,
    ContentType,
    Timeout,
    Cancellation,
    ResolveWith,
    Simple,
    Other,
}

/// How `set` combines an incoming value with the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Append to the accumulated sequence
    Sequence,
    /// Shallow-merge, incoming keys win
    Mapping,
    /// Replace outright
    Scalar,
}

impl Field {
    pub const fn kind(self) -> FieldKind {
        match self {
            Field::Url | Field::Query => FieldKind::Sequence,
            Field::Headers | Field::Body | Field::Other => FieldKind::Mapping,
            Field::Method
            | Field::ContentType
            | Field::Timeout
            | Field::Cancellation
            | Field::ResolveWith
            | Field::Simple => FieldKind::Scalar,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Field::Method => "method",
            Field::Url => "url",
            Field::Query => "query",
            Field::Headers => "headers",
            Field::Body => "body",
            Field::ContentType => "type",
            Field::Timeout => "timeout",
            Field::Cancellation => "cancellation",
            Field::ResolveWith => "resolve_with",
            Field::Simple => "simple",
            Field::Other => "other",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed value for one field
#[derive(Debug, Clone)]
pub enum FieldValue {
    Method(Method),
    Url(Vec<String>),
    Query(Vec<QueryFragment>),
    Headers(Headers),
    Body(Option<Value>),
    ContentType(Option<String>),
    Timeout(Option<Duration>),
    Cancellation(Option<Cancellation>),
    ResolveWith(Option<ResolveWith>),
    Simple(bool),
    Other(Map<String, Value>),
}

impl FieldValue {
    /// The field this value belongs to
    pub fn field(&self) -> Field {
        match self {
            FieldValue::Method(_) => Field::Method,
            FieldValue::Url(_) => Field::Url,
            FieldValue::Query(_) => Field::Query,
            FieldValue::Headers(_) => Field::Headers,
            FieldValue::Body(_) => Field::Body,
            FieldValue::ContentType(_) => Field::ContentType,
            FieldValue::Timeout(_) => Field::Timeout,
            FieldValue::Cancellation(_) => Field::Cancellation,
            FieldValue::ResolveWith(_) => Field::ResolveWith,
            FieldValue::Simple(_) => Field::Simple,
            FieldValue::Other(_) => Field::Other,
        }
    }
}

/// Everything a request has accumulated so far
#[derive(Debug, Clone, Default)]
pub struct RequestState {
    method: Option<Method>,
    url: Vec<String>,
    query: Vec<QueryFragment>,
    headers: Headers,
    body: Option<Value>,
    content_type: Option<String>,
    timeout: Option<Duration>,
    cancellation: Option<Cancellation>,
    resolve_with: Option<ResolveWith>,
    simple: Option<bool>,
    other: Map<String, Value>,
}

impl RequestState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a value according to its field's kind
    pub fn set(&mut self, value: FieldValue) {
        match value.field().kind() {
            FieldKind::Sequence => self.append_sequence(value),
            FieldKind::Mapping => self.merge_mapping(value),
            FieldKind::Scalar => self.replace(value),
        }
    }

    /// Replace a field with the value computed from its current value
    ///
    /// The function receives the current value, the whole state and the
    /// field being modified. Returning a value for another field is an error.
    pub fn modify<F>(&mut self, field: Field, f: F) -> Result<()>
    where
        F: FnOnce(FieldValue, &RequestState, Field) -> Result<FieldValue>,
    {
        let current = self.get(field);
        let next = f(current, self, field)?;
        if next.field() != field {
            return Err(Error::invalid_request(format!(
                "modifier for `{}` returned a value for `{}`",
                field,
                next.field()
            )));
        }
        self.replace(next);
        Ok(())
    }

    /// Snapshot of a field's current value
    pub fn get(&self, field: Field) -> FieldValue {
        match field {
            Field::Method => FieldValue::Method(self.method()),
            Field::Url => FieldValue::Url(self.url.clone()),
            Field::Query => FieldValue::Query(self.query.clone()),
            Field::Headers => FieldValue::Headers(self.headers.clone()),
            Field::Body => FieldValue::Body(self.body.clone()),
            Field::ContentType => FieldValue::ContentType(self.content_type.clone()),
            Field::Timeout => FieldValue::Timeout(self.timeout),
            Field::Cancellation => FieldValue::Cancellation(self.cancellation.clone()),
            Field::ResolveWith => FieldValue::ResolveWith(self.resolve_with),
            Field::Simple => FieldValue::Simple(self.simple()),
            Field::Other => FieldValue::Other(self.other.clone()),
        }
    }

    /// Merge another state into this one, field by field
    ///
    /// Sequences are appended, mappings merged, and scalars the other state
    /// has set replace ours.
    pub fn merge(&mut self, other: &RequestState) {
        self.url.extend(other.url.iter().cloned());
        self.query.extend(other.query.iter().cloned());
        self.headers.merge(&other.headers);
        self.other
            .extend(other.other.iter().map(|(k, v)| (k.clone(), v.clone())));
        if other.body.is_some() {
            self.body = merge_body(self.body.take(), other.body.clone());
        }
        if other.method.is_some() {
            self.method = other.method.clone();
        }
        if other.content_type.is_some() {
            self.content_type = other.content_type.clone();
        }
        if other.timeout.is_some() {
            self.timeout = other.timeout;
        }
        if other.cancellation.is_some() {
            self.cancellation = other.cancellation.clone();
        }
        if other.resolve_with.is_some() {
            self.resolve_with = other.resolve_with;
        }
        if other.simple.is_some() {
            self.simple = other.simple;
        }
    }

    fn append_sequence(&mut self, value: FieldValue) {
        match value {
            FieldValue::Url(fragments) => self.url.extend(fragments),
            FieldValue::Query(fragments) => self.query.extend(fragments),
            other => self.replace(other),
        }
    }

    fn merge_mapping(&mut self, value: FieldValue) {
        match value {
            FieldValue::Headers(headers) => self.headers.merge(&headers),
            FieldValue::Other(map) => self.other.extend(map),
            FieldValue::Body(body) => self.body = merge_body(self.body.take(), body),
            other => self.replace(other),
        }
    }

    fn replace(&mut self, value: FieldValue) {
        match value {
            FieldValue::Method(method) => self.method = Some(method),
            FieldValue::Url(fragments) => self.url = fragments,
            FieldValue::Query(fragments) => self.query = fragments,
            FieldValue::Headers(headers) => self.headers = headers,
            FieldValue::Body(body) => self.body = body,
            FieldValue::ContentType(tag) => self.content_type = tag,
            FieldValue::Timeout(timeout) => self.timeout = timeout,
            FieldValue::Cancellation(cancellation) => self.cancellation = cancellation,
            FieldValue::ResolveWith(resolve_with) => self.resolve_with = resolve_with,
            FieldValue::Simple(simple) => self.simple = Some(simple),
            FieldValue::Other(map) => self.other = map,
        }
    }

    /// HTTP method, `GET` unless set
    pub fn method(&self) -> Method {
        self.method.clone().unwrap_or(Method::GET)
    }

    pub fn url(&self) -> &[String] {
        &self.url
    }

    pub fn query(&self) -> &[QueryFragment] {
        &self.query
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Content-type shorthand (`json`, `form` or a literal media type)
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn cancellation(&self) -> Option<&Cancellation> {
        self.cancellation.as_ref()
    }

    pub fn resolve_with(&self) -> Option<ResolveWith> {
        self.resolve_with
    }

    /// Whether non-2xx statuses fail the request; on unless set
    pub fn simple(&self) -> bool {
        self.simple.unwrap_or(true)
    }

    /// Passthrough options for the transport
    pub fn other(&self) -> &Map<String, Value> {
        &self.other
    }
}

/// Objects merge shallowly, anything else is replaced by the incoming body
fn merge_body(current: Option<Value>, incoming: Option<Value>) -> Option<Value> {
    match (current, incoming) {
        (Some(Value::Object(mut current)), Some(Value::Object(incoming))) => {
            current.extend(incoming);
            Some(Value::Object(current))
        }
        (_, incoming) => incoming,
    }
}
