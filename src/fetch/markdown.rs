// src/fetch/markdown.rs
// =============================================================================
// This module extracts internal links from raw Markdown files.
//
// Raw files come back from the GitLab files API or from raw.githubusercontent
// style URLs. Their body already IS the markdown we want; we only need the
// links inside it so the crawler can keep going.
//
// We use the `pulldown-cmark` crate which:
// - Parses Markdown into events (heading, paragraph, link, etc.)
// - Follows the CommonMark specification
// - Is a streaming parser, so large files are cheap to scan
// =============================================================================

use pulldown_cmark::{Event, Parser, Tag};
use url::Url;

use super::{dedup_links, resolve_internal_link};

// Extracts same-host links from Markdown text
//
// Parameters:
//   markdown: the markdown text to parse
//   page_url: the URL the markdown was fetched from (for relative links)
//
// Example:
//   markdown = "See [setup](./setup.md) and [Rust](https://www.rust-lang.org)"
//   page_url = "https://docs.example.com/guide/"
//   result   = ["https://docs.example.com/guide/setup.md"]
pub fn extract_markdown_links(markdown: &str, page_url: &str) -> Vec<String> {
    let base = match Url::parse(page_url) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!("Cannot resolve links against '{}': {}", page_url, e);
            return Vec::new();
        }
    };

    let links = Parser::new(markdown)
        .filter_map(|event| match event {
            // In pulldown-cmark 0.9, Link is Tag::Link(link_type, dest_url, title)
            Event::Start(Tag::Link(_link_type, dest_url, _title)) => {
                resolve_internal_link(&base, &dest_url)
            }
            _ => None,
        })
        .collect();

    dedup_links(links)
}
