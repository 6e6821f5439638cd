// src/fetch/http.rs
// =============================================================================
// The real page fetcher, built on reqwest.
//
// Key functionality:
// - GET requests carrying exactly the headers the crawler asked for
// - Per-request timeout, so a stuck host becomes a normal fetch failure
// - HTML pages are converted to markdown, raw text files are kept as-is
// - Batches run concurrently with a cap (buffer_unordered)
// - Failures are categorized (timeout, connect, redirects, HTTP status)
// =============================================================================

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use super::html::{extract_html_links, html_to_markdown};
use super::markdown::extract_markdown_links;
use super::{PageFetcher, PageResult, RequestHeaders};

// Why a single fetch did not produce a page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("too many redirects")]
    TooManyRedirects,
    #[error("HTTP {0}")]
    Status(u16),
    #[error("invalid header '{0}'")]
    InvalidHeader(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl From<reqwest::Error> for FetchError {
    // reqwest errors can happen for many reasons; keep the ones a user can act on
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            FetchError::Timeout
        } else if error.is_redirect() {
            FetchError::TooManyRedirects
        } else if error.is_connect() {
            FetchError::Connect(error.to_string())
        } else if let Some(status) = error.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Request(error.to_string())
        }
    }
}

// Knobs for the underlying HTTP client
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub max_redirects: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_redirects: 5,
        }
    }
}

// How a response body should be treated, decided from its Content-Type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Html,
    Markdown,
    Binary,
}

impl BodyKind {
    fn from_content_type(content_type: Option<&str>) -> Self {
        let content_type = match content_type {
            Some(value) => value.to_ascii_lowercase(),
            // Raw endpoints sometimes omit the header entirely
            None => return BodyKind::Markdown,
        };

        if content_type.contains("html") {
            BodyKind::Html
        } else if content_type.starts_with("text/")
            || content_type.starts_with("application/octet-stream")
            || content_type.trim().is_empty()
        {
            BodyKind::Markdown
        } else {
            BodyKind::Binary
        }
    }
}

// Fetches pages over HTTP. Build it once and share it; the reqwest Client
// inside pools connections across all requests.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(settings.connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.max_redirects))
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client })
    }

    async fn get(&self, url: &str, headers: &RequestHeaders) -> Result<PageResult, FetchError> {
        let response = self
            .client
            .get(url)
            .headers(to_header_map(headers)?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        // The URL after redirects is the one links are relative to
        let final_url = response.url().to_string();
        let kind = BodyKind::from_content_type(
            response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
        );
        let body = response.text().await?;

        let (markdown, internal_links) = match kind {
            BodyKind::Html => (
                html_to_markdown(&body),
                extract_html_links(&body, &final_url),
            ),
            BodyKind::Markdown => {
                let links = extract_markdown_links(&body, &final_url);
                let markdown = Some(body).filter(|text| !text.trim().is_empty());
                (markdown, links)
            }
            BodyKind::Binary => (None, Vec::new()),
        };

        Ok(PageResult {
            url: final_url,
            markdown,
            success: true,
            internal_links,
            error: None,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_one(&self, url: &str, headers: &RequestHeaders) -> PageResult {
        match self.get(url, headers).await {
            Ok(page) => {
                tracing::debug!(
                    url = %page.url,
                    links = page.internal_links.len(),
                    has_markdown = page.markdown.is_some(),
                    "Fetched page"
                );
                page
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "Fetch failed");
                PageResult::failed(url, e)
            }
        }
    }

    async fn fetch_many(
        &self,
        urls: &[String],
        headers: &RequestHeaders,
        max_concurrency: usize,
    ) -> Vec<PageResult> {
        // Run up to max_concurrency requests at once; results arrive in
        // completion order, not input order. Each future owns its URL.
        stream::iter(urls.to_vec())
            .map(|url| async move { self.fetch_one(&url, headers).await })
            .buffer_unordered(max_concurrency.max(1))
            .collect()
            .await
    }
}

fn to_header_map(headers: &RequestHeaders) -> Result<HeaderMap, FetchError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| FetchError::InvalidHeader(name.clone()))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| FetchError::InvalidHeader(name.clone()))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}
