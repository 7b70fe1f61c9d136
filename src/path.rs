//! Request path decomposition and canonical URLs.
//!
//! A front-door path has three parts:
//!
//! ```text
//! /about-us=5f1c9a/edit?tab=2
//!  ^^^^^^^^ ^^^^^^ ^^^^^^^^^^^
//!  token    id     suffix
//! ```
//!
//! `=` separates the human-readable token from the stable identifier. The
//! canonical URL of a block reached by slug is `/<slug>=<id><suffix>`.

use std::sync::LazyLock;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use regex::Regex;

use crate::slug;

/// Everything except the characters `encodeURIComponent` leaves alone.
pub(crate) const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

static SEGMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/([^=/]*)=?([^=/]*)(.*)$").expect("segment pattern is valid")
});

/// The three logical parts of a request path.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Segments {
    /// Before the optional `=`: slug or identifier. Percent-decoded.
    pub token: String,
    /// After the `=`: identifier. Percent-decoded, empty when absent.
    pub id: String,
    /// Everything after, as sent, with the query string re-attached.
    pub suffix: String,
}

impl Segments {
    /// Splits `path` (which must start with `/`) and appends `query` to the
    /// suffix so it survives a canonical redirect.
    pub fn parse(path: &str, query: Option<&str>) -> Self {
        let Some(caps) = SEGMENTS.captures(path) else {
            return Self::default();
        };
        let mut suffix = caps[3].to_owned();
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            suffix.push('?');
            suffix.push_str(query);
        }
        Self {
            token: decode(&caps[1]),
            id: decode(&caps[2]),
            suffix,
        }
    }

    /// `/<normalised token>=<id><suffix>`.
    ///
    /// Falls back to the raw token when normalising leaves nothing.
    pub fn canonical_location(&self, id: &str) -> String {
        let normalized = slug::normalize_str(&self.token);
        let slug = if normalized.is_empty() { self.token.as_str() } else { normalized.as_str() };
        format!(
            "/{}={}{}",
            utf8_percent_encode(slug, URI_COMPONENT),
            utf8_percent_encode(id, URI_COMPONENT),
            self.suffix,
        )
    }
}

/// Percent-decodes a segment; invalid UTF-8 is kept as sent.
fn decode(segment: &str) -> String {
    percent_decode_str(segment)
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_owned())
}
