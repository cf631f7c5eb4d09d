//! Query string composition
//!
//! Query parameters accumulate as an ordered list of [`QueryFragment`]s.
//! Pair fragments are encoded here; raw fragments are taken to be encoded
//! already and are copied through, so the two can be mixed freely.

use std::collections::{BTreeMap, HashMap};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Characters left alone by `encodeURIComponent`
const COMPONENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// One unit of query accumulation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryFragment {
    /// Key/value pairs, encoded as `key=value` joined by `&`
    Pairs(Vec<(String, String)>),
    /// An already-encoded query string
    Raw(String),
}

impl QueryFragment {
    /// Build a pairs fragment from any serializable object
    ///
    /// Strings are taken verbatim, other scalars use their JSON text and
    /// `null` entries are skipped.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(QueryFragment::Pairs(object_pairs(&map))),
            Value::String(raw) => Ok(QueryFragment::Raw(raw)),
            Value::Null => Ok(QueryFragment::Pairs(Vec::new())),
            other => Err(Error::invalid_request(format!(
                "query must serialize to an object or a string, got {}",
                other
            ))),
        }
    }

    /// Check whether the fragment contributes nothing
    pub fn is_empty(&self) -> bool {
        match self {
            QueryFragment::Pairs(pairs) => pairs.is_empty(),
            QueryFragment::Raw(raw) => raw.is_empty(),
        }
    }

    /// Render the fragment as query text
    pub fn encode(&self) -> String {
        match self {
            QueryFragment::Pairs(pairs) => encode_pairs(pairs),
            QueryFragment::Raw(raw) => raw.clone(),
        }
    }
}

/// Compose fragments into one query string, in accumulation order
pub fn compose(fragments: &[QueryFragment]) -> String {
    fragments
        .iter()
        .filter(|fragment| !fragment.is_empty())
        .map(QueryFragment::encode)
        .filter(|encoded| !encoded.is_empty())
        .collect::<Vec<_>>()
        .join("&")
}

/// Append a composed query string to a resolved URL
///
/// ```rust
/// use fetchkit::query::append;
///
/// assert_eq!(append("http://h", "a=1"), "http://h?a=1");
/// assert_eq!(append("http://h?a=1", "b=2"), "http://h?a=1&b=2");
/// ```
pub fn append(url: &str, query: &str) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    if !url.contains('?') {
        format!("{}?{}", url, query)
    } else if url.ends_with('?') || url.ends_with('&') {
        format!("{}{}", url, query)
    } else {
        format!("{}&{}", url, query)
    }
}

/// Encode pairs as `key=value&...`; values are percent-encoded, keys are not
pub fn encode_pairs<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                key.as_ref(),
                utf8_percent_encode(value.as_ref(), COMPONENT_ENCODE_SET)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Flatten a JSON object into string pairs, skipping nulls
pub(crate) fn object_pairs(map: &serde_json::Map<String, Value>) -> Vec<(String, String)> {
    map.iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}

impl From<&str> for QueryFragment {
    fn from(raw: &str) -> Self {
        QueryFragment::Raw(raw.to_string())
    }
}

impl From<String> for QueryFragment {
    fn from(raw: String) -> Self {
        QueryFragment::Raw(raw)
    }
}

impl<K: Into<String>, V: Into<String>> From<Vec<(K, V)>> for QueryFragment {
    fn from(pairs: Vec<(K, V)>) -> Self {
        QueryFragment::Pairs(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for QueryFragment {
    fn from(pairs: [(K, V); N]) -> Self {
        QueryFragment::Pairs(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> From<BTreeMap<K, V>> for QueryFragment {
    fn from(map: BTreeMap<K, V>) -> Self {
        QueryFragment::Pairs(map.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<String>> From<HashMap<K, V>> for QueryFragment {
    fn from(map: HashMap<K, V>) -> Self {
        QueryFragment::Pairs(map.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pairs_encode_values_only() {
        let fragment = QueryFragment::from([("q key", "a b&c"), ("n", "1")]);
        assert_eq!(fragment.encode(), "q key=a%20b%26c&n=1");
    }

    #[test]
    fn test_component_set_keeps_unreserved() {
        let fragment = QueryFragment::from([("v", "-_.!~*'()")]);
        assert_eq!(fragment.encode(), "v=-_.!~*'()");
    }

    #[test]
    fn test_mixed_fragments_keep_order() {
        let fragments = vec![
            QueryFragment::from([("a", "1")]),
            QueryFragment::from("raw=%20x"),
            QueryFragment::from(vec![("b", "2")]),
        ];
        assert_eq!(compose(&fragments), "a=1&raw=%20x&b=2");
    }

    #[test]
    fn test_empty_fragments_skipped() {
        let fragments = vec![
            QueryFragment::from(""),
            QueryFragment::Pairs(Vec::new()),
            QueryFragment::from([("a", "1")]),
        ];
        assert_eq!(compose(&fragments), "a=1");
        assert_eq!(compose(&[]), "");
    }

    #[test]
    fn test_append_separators() {
        assert_eq!(append("http://h", ""), "http://h");
        assert_eq!(append("http://h", "a=1"), "http://h?a=1");
        assert_eq!(append("http://h?x=0", "a=1"), "http://h?x=0&a=1");
        assert_eq!(append("http://h?", "a=1"), "http://h?a=1");
    }

    #[test]
    fn test_from_serialize() {
        let fragment =
            QueryFragment::from_serialize(&json!({"page": 2, "skip": null, "name": "x y"}))
                .unwrap();
        assert_eq!(fragment.encode(), "page=2&name=x%20y");

        let raw = QueryFragment::from_serialize("a=1").unwrap();
        assert_eq!(raw, QueryFragment::Raw("a=1".to_string()));

        assert!(QueryFragment::from_serialize(&42).is_err());
    }
}
