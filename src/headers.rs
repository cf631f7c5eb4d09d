use std::collections::{BTreeMap, HashMap};

use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;

use crate::error::Result;

/// Ordered header mapping with case-insensitive lookup
///
/// Names keep the spelling they were first inserted with; inserting a name
/// that differs only in case replaces the value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Create an empty header mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a header value by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Check whether a header is present
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert or replace a header, returning the previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(&name))
        {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Remove a header, returning its value
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self
            .entries
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))?;
        Some(self.entries.remove(index).1)
    }

    /// Shallow merge: every incoming header wins over an existing one
    pub fn merge(&mut self, other: &Headers) {
        for (name, value) in other.iter() {
            self.insert(name, value);
        }
    }

    /// Iterate over the headers in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Number of headers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no headers
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Convert into an `http::HeaderMap`, validating names and values
    pub fn to_header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            let name = name.parse::<HeaderName>()?;
            let value = value.parse::<HeaderValue>()?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Headers {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<String>> From<Vec<(K, V)>> for Headers {
    fn from(pairs: Vec<(K, V)>) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<String>> From<BTreeMap<K, V>> for Headers {
    fn from(map: BTreeMap<K, V>) -> Self {
        map.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<String>> From<HashMap<K, V>> for Headers {
    fn from(map: HashMap<K, V>) -> Self {
        map.into_iter().collect()
    }
}
