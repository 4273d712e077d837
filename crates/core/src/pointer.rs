//! JSON Pointer (RFC 6901) helpers
//!
//! Changeset paths are JSON Pointers such as `/owner` or `/links/0/url`.

use crate::error::{Error, Result};
use std::borrow::Cow;

/// Escape a single path component (`~` → `~0`, `/` → `~1`)
pub fn escape_component(component: &str) -> Cow<'_, str> {
    if !component.contains(['~', '/']) {
        return Cow::Borrowed(component);
    }
    Cow::Owned(component.replace('~', "~0").replace('/', "~1"))
}

/// Unescape a single path component
pub fn unescape_component(component: &str) -> Cow<'_, str> {
    if !component.contains('~') {
        return Cow::Borrowed(component);
    }
    Cow::Owned(component.replace("~1", "/").replace("~0", "~"))
}

/// Format path components as a pointer; the root is the empty string
pub fn format_pointer<S: AsRef<str>>(path: &[S]) -> String {
    let mut out = String::new();
    for component in path {
        out.push('/');
        out.push_str(&escape_component(component.as_ref()));
    }
    out
}

/// Parse a pointer into unescaped components
pub fn parse_pointer(pointer: &str) -> Result<Vec<String>> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    match pointer.strip_prefix('/') {
        Some(rest) => Ok(rest
            .split('/')
            .map(|c| unescape_component(c).into_owned())
            .collect()),
        None => Err(Error::Patch(format!(
            "pointer '{}' must be empty or start with '/'",
            pointer
        ))),
    }
}
