// src/fetch/html.rs
// =============================================================================
// This module handles HTML pages: it pulls out internal links and turns the
// readable part of the page into markdown text.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever (Mozilla's HTML parser)
//
// The markdown conversion is intentionally small. It keeps headings,
// paragraphs, list items, block quotes and code blocks, which is what
// documentation pages are made of. Navigation chrome outside <main> or
// <article> is skipped when the page has one.
// =============================================================================

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{dedup_links, resolve_internal_link};

// Elements rendered as one markdown block each
const BLOCK_TAGS: [&str; 10] = [
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "p",
    "li",
    "pre",
    "blockquote",
];

// Where the page content most likely lives, best guess first
const CONTENT_ROOTS: [&str; 3] = ["main", "article", "body"];

// Extracts same-host links from HTML content
//
// Parameters:
//   html: the HTML content to parse
//   page_url: the final URL of the page (for resolving relative links)
//
// Example:
//   html = "<a href='/docs'>Docs</a><a href='https://other.com'>x</a>"
//   page_url = "https://example.com"
//   result = ["https://example.com/docs"]
pub fn extract_html_links(html: &str, page_url: &str) -> Vec<String> {
    let base = match Url::parse(page_url) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!("Cannot resolve links against '{}': {}", page_url, e);
            return Vec::new();
        }
    };

    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").expect("'a[href]' is a valid selector");

    let links = document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_internal_link(&base, href))
        .collect();

    dedup_links(links)
}

// Converts the readable part of an HTML page to markdown
//
// Returns None when the page has no text worth keeping.
pub fn html_to_markdown(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let root = content_root(&document);
    let blocks =
        Selector::parse(&BLOCK_TAGS.join(", ")).expect("block tags form a valid selector");

    let rendered: Vec<String> = root
        .select(&blocks)
        .filter(|element| !inside_block(element, &root))
        .filter_map(render_block)
        .collect();

    if rendered.is_empty() {
        None
    } else {
        Some(rendered.join("\n\n"))
    }
}

fn content_root(document: &Html) -> ElementRef<'_> {
    CONTENT_ROOTS
        .iter()
        .filter_map(|tag| Selector::parse(tag).ok())
        .find_map(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element())
}

// True when an enclosing element (below `root`) is already rendered as a block.
// A <p> inside an <li> is part of the list item, not a block of its own.
fn inside_block(element: &ElementRef<'_>, root: &ElementRef<'_>) -> bool {
    element
        .ancestors()
        .take_while(|node| node.id() != root.id())
        .filter_map(ElementRef::wrap)
        .any(|ancestor| BLOCK_TAGS.contains(&ancestor.value().name()))
}

fn render_block(element: ElementRef<'_>) -> Option<String> {
    let name = element.value().name();

    if name == "pre" {
        let code: String = element.text().collect();
        let code = code.trim_matches('\n');
        if code.trim().is_empty() {
            return None;
        }
        return Some(format!("```\n{}\n```", code));
    }

    let text = collapse_whitespace(element);
    if text.is_empty() {
        return None;
    }

    let block = match name {
        "li" => format!("- {}", text),
        "blockquote" => format!("> {}", text),
        "p" => text,
        heading => {
            // h1..h6
            let level = heading[1..].parse::<usize>().unwrap_or(1);
            format!("{} {}", "#".repeat(level), text)
        }
    };
    Some(block)
}

fn collapse_whitespace(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
