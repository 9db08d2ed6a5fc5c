//! Served audio URL derivation

use reqwest::Url;

/// Last path segment of a result path, for either separator style
///
/// A trailing separator means there is no file name.
pub fn served_filename(path: &str) -> Option<&str> {
    path.rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .filter(|s| !s.is_empty())
}

/// Public URL of `filename` under the static prefix
pub fn public_url(static_prefix: &str, filename: &str) -> String {
    format!("{}/{}", static_prefix.trim_end_matches('/'), filename)
}

/// Whether `url` already points at a generated file
///
/// The URL shape is the single source of truth for readiness, since it
/// survives reloads. Absolute URLs are checked by path.
pub fn is_ready_url(url: &str, static_prefix: &str) -> bool {
    let prefix = format!("{}/", static_prefix.trim_end_matches('/'));
    if url.starts_with(&prefix) {
        return true;
    }
    Url::parse(url)
        .map(|u| u.path().starts_with(&prefix))
        .unwrap_or(false)
}
