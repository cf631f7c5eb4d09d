//! Content-type inference and body serialization

use serde_json::Value;

use crate::error::Result;
use crate::headers::Headers;
use crate::query;

pub const CONTENT_TYPE: &str = "Content-Type";

/// `application/json`
pub const JSON: &str = "application/json";

/// `application/x-www-form-urlencoded`
pub const FORM: &str = "application/x-www-form-urlencoded";

/// A request body after composition
#[derive(Debug, Clone, PartialEq)]
pub enum ComposedBody {
    /// Serialized text, ready to send as-is
    Text(String),
    /// A structured body the codec did not serialize
    Value(Value),
}

impl ComposedBody {
    /// Text of a serialized body
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ComposedBody::Text(text) => Some(text),
            ComposedBody::Value(_) => None,
        }
    }

    /// Bytes to put on the wire; structured values fall back to JSON text
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            ComposedBody::Text(text) => Ok(text.as_bytes().to_vec()),
            ComposedBody::Value(value) => Ok(serde_json::to_vec(value)?),
        }
    }
}

/// Expand a content-type shorthand (`json`, `form`) to a media type
///
/// Unknown tags are returned verbatim.
pub fn media_type(tag: &str) -> &str {
    match tag {
        "json" => JSON,
        "form" => FORM,
        other => other,
    }
}

/// Set `Content-Type` from the type tag unless a header is already present
pub fn compose_headers(headers: &Headers, type_tag: Option<&str>) -> Headers {
    let mut headers = headers.clone();
    if let Some(tag) = type_tag {
        if !headers.contains(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, media_type(tag));
        }
    }
    headers
}

/// Serialize a structured body according to the request's content type
///
/// Strings pass through unchanged. JSON and form content types serialize;
/// any other content type leaves the value structured for the transport.
pub fn compose_body(body: Option<&Value>, headers: &Headers) -> Result<Option<ComposedBody>> {
    let body = match body {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(text)) => return Ok(Some(ComposedBody::Text(text.clone()))),
        Some(body) => body,
    };

    let composed = match headers.get(CONTENT_TYPE).map(essence) {
        Some(JSON) => ComposedBody::Text(serde_json::to_string(body)?),
        Some(FORM) => ComposedBody::Text(form_encode(body)),
        _ => ComposedBody::Value(body.clone()),
    };
    Ok(Some(composed))
}

fn form_encode(body: &Value) -> String {
    match body {
        Value::Object(map) => query::encode_pairs(&query::object_pairs(map)),
        other => other.to_string(),
    }
}

/// Media type without parameters, e.g. `application/json; charset=utf-8`
fn essence(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or_default().trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_tag_registry() {
        let headers = compose_headers(&Headers::new(), Some("json"));
        assert_eq!(headers.get("content-type"), Some(JSON));

        let headers = compose_headers(&Headers::new(), Some("form"));
        assert_eq!(headers.get(CONTENT_TYPE), Some(FORM));

        let headers = compose_headers(&Headers::new(), Some("text/csv"));
        assert_eq!(headers.get(CONTENT_TYPE), Some("text/csv"));

        assert!(compose_headers(&Headers::new(), None).is_empty());
    }

    #[test]
    fn test_explicit_header_wins_over_tag() {
        let headers = Headers::from([("content-type", "text/plain")]);
        let composed = compose_headers(&headers, Some("json"));
        assert_eq!(composed.get(CONTENT_TYPE), Some("text/plain"));
        assert_eq!(composed.len(), 1);
    }

    #[test]
    fn test_json_body() {
        let body = json!({"foo": "bar", "n": 1});
        let headers = compose_headers(&Headers::new(), Some("json"));
        let composed = compose_body(Some(&body), &headers).unwrap().unwrap();
        assert_eq!(composed.as_text(), Some(serde_json::to_string(&body).unwrap().as_str()));
    }

    #[test]
    fn test_form_body() {
        let body = json!({"foo": "bar baz", "n": 1});
        let headers = compose_headers(&Headers::new(), Some("form"));
        let composed = compose_body(Some(&body), &headers).unwrap().unwrap();
        assert_eq!(composed.as_text(), Some("foo=bar%20baz&n=1"));
    }

    #[test]
    fn test_content_type_parameters_ignored() {
        let body = json!({"a": 1});
        let headers = Headers::from([(CONTENT_TYPE, "application/json; charset=utf-8")]);
        let composed = compose_body(Some(&body), &headers).unwrap().unwrap();
        assert_eq!(composed.as_text(), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_string_body_untouched() {
        let body = json!("already=encoded");
        let headers = compose_headers(&Headers::new(), Some("json"));
        let composed = compose_body(Some(&body), &headers).unwrap().unwrap();
        assert_eq!(composed, ComposedBody::Text("already=encoded".to_string()));
    }

    #[test]
    fn test_unknown_content_type_leaves_value() {
        let body = json!({"part": "data"});
        let headers = Headers::from([(CONTENT_TYPE, "multipart/form-data")]);
        let composed = compose_body(Some(&body), &headers).unwrap().unwrap();
        assert_eq!(composed, ComposedBody::Value(body.clone()));

        assert_eq!(compose_body(None, &headers).unwrap(), None);
    }
}
