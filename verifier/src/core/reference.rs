//! Classification of artifact references.
//!
//! A reference is either a location to read from or the content itself.
//! Classification happens up front so resolution is a plain dispatch.

use std::fmt;

use url::Url;

/// Where the bytes of an artifact come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// The reference text is the content.
    Literal(String),
    /// `file://` URL on this host.
    LocalFile(Url),
    /// `http://` or `https://` URL.
    Remote(Url),
}

impl Reference {
    /// Classify a raw reference string.
    ///
    /// Only absolute `file`, `http` and `https` URLs are locations. Anything
    /// that does not parse as an absolute URL, or uses another scheme, is
    /// literal content.
    pub fn classify(raw: &str) -> Self {
        match Url::parse(raw) {
            Ok(url) => match url.scheme() {
                "file" => Reference::LocalFile(url),
                "http" | "https" => Reference::Remote(url),
                _ => Reference::Literal(raw.to_string()),
            },
            Err(_) => Reference::Literal(raw.to_string()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Reference::Literal(_) => "literal",
            Reference::LocalFile(_) => "file",
            Reference::Remote(_) => "remote",
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Literal(text) => write!(f, "literal({} bytes)", text.len()),
            Reference::LocalFile(url) | Reference::Remote(url) => f.write_str(url.as_str()),
        }
    }
}
