// src/fetch/mod.rs
// =============================================================================
// This module is the "page fetcher" the crawler talks to.
//
// The crawler never makes HTTP requests itself. It hands a URL (or a batch
// of URLs sharing the same headers) to a PageFetcher and gets back one
// PageResult per URL: the final URL, whether it worked, the markdown, and
// the internal links found on the page.
//
// Submodules:
// - http: the real fetcher built on reqwest
// - html: turns HTML pages into markdown text and extracts links
// - markdown: extracts links from raw markdown files
// =============================================================================

mod html;
mod http;
mod markdown;

use async_trait::async_trait;
use std::collections::BTreeMap;
use url::Url;

pub use http::{FetchSettings, HttpFetcher};

// Header name -> value. A BTreeMap keeps keys sorted, so two header sets
// compare equal exactly when they hold the same pairs.
pub type RequestHeaders = BTreeMap<String, String>;

// What the fetcher reports back for a single URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageResult {
    /// Final URL after redirects (the requested URL when the fetch failed)
    pub url: String,
    /// Extracted markdown, None when the page produced no text
    pub markdown: Option<String>,
    pub success: bool,
    /// Absolute same-host links found on the page
    pub internal_links: Vec<String>,
    /// Why the fetch failed, for logging
    pub error: Option<String>,
}

impl PageResult {
    pub fn failed(url: impl Into<String>, error: impl ToString) -> Self {
        Self {
            url: url.into(),
            error: Some(error.to_string()),
            ..Self::default()
        }
    }

    // Markdown with real content in it, if any
    pub fn usable_markdown(&self) -> Option<&str> {
        self.markdown
            .as_deref()
            .filter(|markdown| !markdown.trim().is_empty())
    }
}

// Anything that can fetch pages for the crawler.
//
// Failures are reported inside PageResult, never as an Err: one bad URL in
// a batch must not take its siblings down with it.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_one(&self, url: &str, headers: &RequestHeaders) -> PageResult;

    // Fetches every URL with the same headers, at most `max_concurrency` at a
    // time. Results may come back in any order.
    async fn fetch_many(
        &self,
        urls: &[String],
        headers: &RequestHeaders,
        max_concurrency: usize,
    ) -> Vec<PageResult>;
}

// Resolves an href found on `base` and keeps it only if it stays on the same
// host over http(s). The fragment is dropped.
//
// Examples (base = https://example.com/docs/):
//   "intro"                 -> Some("https://example.com/docs/intro")
//   "/api#auth"             -> Some("https://example.com/api")
//   "https://other.com/x"   -> None (different host)
//   "mailto:me@example.com" -> None
fn resolve_internal_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    if url.host_str() != base.host_str()
        || url.port_or_known_default() != base.port_or_known_default()
    {
        return None;
    }

    url.set_fragment(None);
    Some(url.to_string())
}

// Keeps the first occurrence of every link, preserving order
fn dedup_links(links: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    links
        .into_iter()
        .filter(|link| seen.insert(link.clone()))
        .collect()
}
