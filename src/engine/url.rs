//! URL parsing and comparison helpers.
//!
//! Stored urls are never rewritten; [`normalize`] exists only to compare a
//! requested url against urls reported by the host (e.g. open tabs).

use serde::Serialize;
use ::url::Url;

/// Components of a parsed URL. All fields are empty when `is_valid` is false.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedUrl {
    /// Scheme without the trailing colon, e.g. `https`.
    pub protocol: String,
    /// Hostname without port.
    pub domain: String,
    pub path: String,
    /// Query string including the leading `?`, or empty.
    pub query: String,
    /// Fragment including the leading `#`, or empty.
    pub fragment: String,
    pub is_valid: bool,
}

pub fn parse(url: &str) -> ParsedUrl {
    let Ok(parsed) = Url::parse(url) else {
        return ParsedUrl::default();
    };

    ParsedUrl {
        protocol: parsed.scheme().to_string(),
        domain: parsed.host_str().unwrap_or_default().to_string(),
        path: parsed.path().to_string(),
        query: prefixed('?', parsed.query()),
        fragment: prefixed('#', parsed.fragment()),
        is_valid: true,
    }
}

fn prefixed(prefix: char, part: Option<&str>) -> String {
    match part {
        Some(p) if !p.is_empty() => format!("{prefix}{p}"),
        _ => String::new(),
    }
}

/// `<scheme>://<hostname>` of a url, or an empty string if it does not parse.
/// The port is dropped.
pub fn base_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => format!(
            "{}://{}",
            parsed.scheme(),
            parsed.host_str().unwrap_or_default()
        ),
        Err(_) => String::new(),
    }
}

/// Comparison key for a url: trims whitespace, then drops an `http://` or
/// `https://` scheme, a leading `www.` and one trailing slash.
pub fn normalize(url: &str) -> String {
    let trimmed = url.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    let without_www = without_scheme
        .strip_prefix("www.")
        .unwrap_or(without_scheme);
    let without_slash = without_www.strip_suffix('/').unwrap_or(without_www);
    without_slash.trim().to_string()
}

pub fn is_valid_url(url: &str) -> bool {
    Url::parse(url).is_ok()
}

/// True if two urls are identical or share the same [`normalize`] key.
pub fn same_page(a: &str, b: &str) -> bool {
    a == b || normalize(a) == normalize(b)
}
