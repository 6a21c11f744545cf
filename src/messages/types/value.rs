use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A WAMP argument list, keyword-argument dict, or message detail dict.
///
/// The wire format never lets a URI or an ID be told apart from a plain
/// string or integer, so deeper payloads stay opaque JSON rather than a
/// hand-rolled value enum: the codec only fails on structural or URI
/// mistakes, never on what an application chooses to put inside `args`
/// or `kwargs`.
pub type Dict = serde_json::Map<String, serde_json::Value>;
pub type List = Vec<serde_json::Value>;

const LOOSE_URI_PATTERN: &str = r"^([^\s\.#]+\.)*([^\s\.#]+)$";
const STRICT_URI_PATTERN: &str = r"^([0-9a-z_]+\.)*([0-9a-z_]+)$";

fn loose_uri_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(LOOSE_URI_PATTERN).unwrap())
}

fn strict_uri_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(STRICT_URI_PATTERN).unwrap())
}

/// A WAMP URI: validated either loosely or strictly depending on router
/// configuration (`validate-strict-uris`).
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct URI {
    pub uri: String,
}

impl URI {
    pub fn new(uri: &str) -> URI {
        URI {
            uri: uri.to_string(),
        }
    }

    /// The default: any run of non-dot, non-whitespace segments.
    pub fn is_loose_valid(&self) -> bool {
        loose_uri_regex().is_match(&self.uri)
    }

    /// Lowercase alphanumerics and underscores only, dot-separated.
    pub fn is_strict_valid(&self) -> bool {
        strict_uri_regex().is_match(&self.uri)
    }

    pub fn is_valid(&self, strict: bool) -> bool {
        if strict {
            self.is_strict_valid()
        } else {
            self.is_loose_valid()
        }
    }
}

impl fmt::Display for URI {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri)
    }
}

impl Serialize for URI {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.uri)
    }
}

impl<'de> Deserialize<'de> for URI {
    fn deserialize<D>(deserializer: D) -> Result<URI, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let uri = String::deserialize(deserializer)?;
        Ok(URI { uri })
    }
}
