// src/crawl/normalize.rs
// =============================================================================
// URL normalization for deduplication.
//
// Two links that differ only in their #fragment point at the same document,
// so the crawler strips the fragment before comparing URLs.
//
// Plain string handling only: url::Url would add trailing slashes, lowercase
// hosts and re-encode paths, and malformed input must pass through unchanged.
// =============================================================================

// Removes the fragment (`#...`) from a URL, leaving everything else intact
//
// Examples:
//   "https://host/page#section1" -> "https://host/page"
//   "https://host/page?q=1"      -> "https://host/page?q=1"
//   "not a url#x"                -> "not a url"
pub fn normalize_url(url: &str) -> String {
    match url.split_once('#') {
        Some((without_fragment, _)) => without_fragment.to_string(),
        None => url.to_string(),
    }
}
