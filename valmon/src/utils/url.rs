//! URL helpers.

use ::url::Url;

/// Join an endpoint base URL and an API path.
///
/// Trailing slashes on `base` and leading slashes on `path` are collapsed so
/// `https://node:1317/` + `/blocks/latest` yields `https://node:1317/blocks/latest`.
pub fn join_endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Whether `candidate` parses as an absolute http(s) URL with a host.
pub fn is_http_url(candidate: &str) -> bool {
    match Url::parse(candidate) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}
