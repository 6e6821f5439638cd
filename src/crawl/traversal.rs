// src/crawl/traversal.rs
// =============================================================================
// The crawl loop: breadth-first, one whole level at a time.
//
// How it works:
// 1. Normalize the seed URLs into the first frontier
// 2. Drop everything already visited; stop if nothing is left
// 3. Rewrite each URL (GitLab blob -> API) and compute its headers
// 4. Group URLs by identical headers and dispatch each group to the fetcher
// 5. Keep pages with markdown and queue their unvisited internal links
// 6. Repeat until the frontier is empty or max_depth levels have run
//
// Only pages with usable markdown propagate their links: an empty page is a
// dead end. Failed URLs are marked visited and never retried in the same run.
// =============================================================================

use futures::future::join_all;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::auth::AuthResolver;
use super::normalize::normalize_url;
use crate::config::RepoConfig;
use crate::fetch::{PageFetcher, PageResult, RequestHeaders};

// One harvested page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawledPage {
    pub url: String,
    pub markdown: String,
}

// URLs that share one header set and can go out in one batch
#[derive(Debug, Clone, PartialEq, Eq)]
struct FetchGroup {
    headers: RequestHeaders,
    urls: Vec<String>,
}

// What happened at one level, for the per-level log line
#[derive(Debug, Default)]
struct LevelStats {
    attempted: usize,
    succeeded: usize,
    failed: usize,
    empty: usize,
    queued: usize,
}

pub struct Crawler<'a, F: PageFetcher + ?Sized> {
    fetcher: &'a F,
    auth: AuthResolver<'a>,
}

impl<'a, F: PageFetcher + ?Sized> Crawler<'a, F> {
    pub fn new(fetcher: &'a F, config: &'a dyn RepoConfig) -> Self {
        Self {
            fetcher,
            auth: AuthResolver::new(config),
        }
    }

    // Crawls from `start_urls`, following internal links up to `max_depth`
    // levels, and returns every page that produced markdown.
    //
    // Never fails: per-URL problems are logged and skipped, so the result
    // may be partial (or empty).
    pub async fn crawl(
        &self,
        start_urls: &BTreeSet<String>,
        max_depth: usize,
        max_concurrency: usize,
    ) -> Vec<CrawledPage> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut frontier: BTreeSet<String> =
            start_urls.iter().map(|url| normalize_url(url)).collect();
        let mut pages = Vec::new();

        for depth in 0..max_depth {
            let to_fetch: Vec<String> = frontier
                .into_iter()
                .filter(|url| !visited.contains(url))
                .collect();
            if to_fetch.is_empty() {
                tracing::debug!(depth, "Frontier exhausted, stopping early");
                break;
            }

            // Claimed before dispatch, so a URL fetched through its API form is
            // never fetched again under its original form
            visited.extend(to_fetch.iter().cloned());

            let groups = self.group_by_headers(&to_fetch, &mut visited);
            let dispatched: usize = groups.iter().map(|group| group.urls.len()).sum();
            tracing::info!(
                depth,
                urls = dispatched,
                groups = groups.len(),
                "Crawling level"
            );

            let batches = join_all(
                groups
                    .iter()
                    .map(|group| self.dispatch(group, max_concurrency)),
            )
            .await;

            let mut stats = LevelStats {
                attempted: dispatched,
                ..LevelStats::default()
            };
            let mut next_frontier = BTreeSet::new();

            // Results are matched by their own URL, never by position
            for result in batches.into_iter().flatten() {
                visited.insert(normalize_url(&result.url));
                self.record(result, &visited, &mut next_frontier, &mut pages, &mut stats);
            }
            stats.queued = next_frontier.len();

            tracing::info!(
                depth,
                attempted = stats.attempted,
                succeeded = stats.succeeded,
                failed = stats.failed,
                empty = stats.empty,
                queued = stats.queued,
                "Level complete"
            );

            frontier = next_frontier;
        }

        pages
    }

    // Rewrites each URL to its fetch form and partitions by exact header set.
    // Groups come out in header order; URLs keep their frontier order.
    //
    // A rewritten target is claimed in `visited` too. Two frontier URLs with
    // the same target (a blob page with and without ?plain=1, or a blob page
    // next to its own API URL) go out once.
    fn group_by_headers(
        &self,
        urls: &[String],
        visited: &mut HashSet<String>,
    ) -> Vec<FetchGroup> {
        let mut grouped: BTreeMap<RequestHeaders, Vec<String>> = BTreeMap::new();
        for url in urls {
            let target = normalize_url(&self.auth.rewrite_to_api_form(url));
            if target != *url && !visited.insert(target.clone()) {
                tracing::debug!(url = %url, target = %target, "Fetch target already claimed");
                continue;
            }
            let headers = self.auth.headers_for(&target);
            grouped.entry(headers).or_default().push(target);
        }

        grouped
            .into_iter()
            .map(|(headers, urls)| FetchGroup { headers, urls })
            .collect()
    }

    async fn dispatch(&self, group: &FetchGroup, max_concurrency: usize) -> Vec<PageResult> {
        match group.urls.as_slice() {
            [single] => vec![self.fetcher.fetch_one(single, &group.headers).await],
            urls => {
                self.fetcher
                    .fetch_many(urls, &group.headers, max_concurrency)
                    .await
            }
        }
    }

    fn record(
        &self,
        result: PageResult,
        visited: &HashSet<String>,
        next_frontier: &mut BTreeSet<String>,
        pages: &mut Vec<CrawledPage>,
        stats: &mut LevelStats,
    ) {
        if !result.success {
            stats.failed += 1;
            tracing::warn!(
                url = %result.url,
                error = result.error.as_deref().unwrap_or("unknown error"),
                "Failed to fetch page"
            );
            return;
        }
        stats.succeeded += 1;

        let markdown = match result.usable_markdown() {
            Some(markdown) => markdown.to_string(),
            None => {
                stats.empty += 1;
                tracing::debug!(url = %result.url, "Page has no markdown, not following its links");
                return;
            }
        };

        for link in &result.internal_links {
            let link = normalize_url(link);
            if !visited.contains(&link) {
                next_frontier.insert(link);
            }
        }

        pages.push(CrawledPage {
            url: result.url,
            markdown,
        });
    }
}
