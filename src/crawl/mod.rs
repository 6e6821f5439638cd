// src/crawl/mod.rs
// =============================================================================
// This module handles crawling documentation sites and repositories.
//
// Features:
// - Breadth-first crawling, one level at a time, up to a depth limit
// - Fragment-insensitive deduplication (page#a and page#b are one page)
// - Auth-aware batching: URLs needing the same headers are fetched together,
//   URLs needing different headers never share a request batch
// - GitLab blob pages are rewritten to the raw files API
// - Bounded concurrency per batch
//
// Submodules:
// - normalize: URL normalization used as the dedup key
// - auth: decides headers and API rewrites per URL
// - traversal: the level-by-level crawl loop
// =============================================================================

mod auth;
mod normalize;
mod traversal;

#[cfg(test)]
mod captured_logs;

pub use traversal::{CrawledPage, Crawler};
