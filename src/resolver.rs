//! URL fragment resolution
//!
//! A request accumulates its URL as an ordered list of fragments: a base such
//! as `https://api.example.com/v1/`, followed by relative paths such as
//! `users` or `../v2/items`. [`resolve`] folds them left to right into one
//! URL. A fragment carrying a protocol marker (`://`) starts over, so an
//! absolute URL given late overrides whatever base came before it.

use crate::error::{Error, Result};

const PROTOCOL_MARKER: &str = "://";

/// Join URL fragments into a single URL
///
/// Empty fragments are ignored; when nothing is left the result is
/// [`Error::MissingUrl`].
///
/// ```rust
/// use fetchkit::resolver::resolve;
///
/// let url = resolve(&["http://h", "/foo/bar/", "../baz"]).unwrap();
/// assert_eq!(url, "http://h/foo/baz");
/// ```
pub fn resolve<S: AsRef<str>>(fragments: &[S]) -> Result<String> {
    let fragments: Vec<&str> = fragments
        .iter()
        .map(AsRef::as_ref)
        .filter(|fragment| !fragment.is_empty())
        .collect();

    let last = fragments.last().ok_or(Error::MissingUrl)?;
    let trailing_slash = last.ends_with('/');

    let mut root: Option<String> = None;
    let mut rooted = false;
    let mut segments: Vec<&str> = Vec::new();

    for (index, fragment) in fragments.iter().enumerate() {
        let path = match fragment.find(PROTOCOL_MARKER) {
            Some(at) => {
                let scheme = fragment[..at].rsplit('/').next().unwrap_or_default();
                root = Some(format!("{}:/", scheme));
                segments.clear();
                &fragment[at + PROTOCOL_MARKER.len()..]
            }
            None => {
                if index == 0 && fragment.starts_with('/') {
                    rooted = true;
                }
                fragment
            }
        };

        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                segment => segments.push(segment),
            }
        }
    }

    let mut url = match root {
        Some(root) => format!("{}/{}", root, segments.join("/")),
        None if rooted => format!("/{}", segments.join("/")),
        None => segments.join("/"),
    };

    if trailing_slash && !url.ends_with('/') {
        url.push('/');
    }

    Ok(url)
}
