//! URL normalization and identity checks used by the crawler.
//!
//! All functions are pure; they take and return plain strings so they can be
//! applied to raw `href` values before anything has been parsed.

use url::Url;

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Remove any `#fragment` suffix.
pub fn strip_fragment(url: &str) -> &str {
    match url.find('#') {
        Some(idx) => &url[..idx],
        None => url,
    }
}

/// Whether `url` already names a scheme and a host.
pub fn has_netloc(url: &str) -> bool {
    Url::parse(url).map(|u| u.has_host()).unwrap_or(false)
}

/// Resolve `url` against `base`.
///
/// A URL that already carries a scheme and host is returned unchanged.
pub fn to_absolute(base: &str, url: &str) -> Result<String, UrlError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    if has_netloc(trimmed) {
        return Ok(trimmed.to_string());
    }

    let base = Url::parse(base).map_err(|e| UrlError::InvalidUrl(format!("{base}: {e}")))?;
    base.join(trimmed)
        .map(String::from)
        .map_err(|e| UrlError::InvalidUrl(format!("{trimmed}: {e}")))
}

/// Host plus explicit port, e.g. `shop.example.com` or `127.0.0.1:8080`.
pub fn netloc(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Last two dot-separated labels, lowercased, ignoring any `:port`.
fn registrable_suffix(host: &str) -> String {
    let host = match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    };
    let host = host.to_lowercase();
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return host;
    }
    labels[labels.len() - 2..].join(".")
}

/// Subdomain-insensitive host comparison.
///
/// Only the last two labels are compared, so `www.example.com` and
/// `shop.example.com` match. Hosts under a two-label public suffix such as
/// `co.uk` all compare equal; that approximation is accepted.
pub fn same_domain(a: &str, b: &str) -> bool {
    registrable_suffix(a) == registrable_suffix(b)
}

/// The `http://` and `https://` spellings of a URL.
pub fn scheme_variants(url: &str) -> (String, String) {
    let http = url.replacen("https://", "http://", 1);
    let https = url.replacen("http://", "https://", 1);
    (http, https)
}

/// Whether `url`, under either web scheme, is already in a collection.
///
/// `contains` is the membership test of the collection.
pub fn is_duplicate(url: &str, contains: impl Fn(&str) -> bool) -> bool {
    let (http, https) = scheme_variants(url);
    contains(&http) || contains(&https)
}
