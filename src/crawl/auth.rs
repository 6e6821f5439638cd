// src/crawl/auth.rs
// =============================================================================
// Per-URL authentication decisions.
//
// For every URL the crawler is about to fetch, this module answers:
// 1. Is it on the credentialed (GitLab) host?
// 2. Is there a raw-content API URL we should fetch instead of the HTML
//    blob page?
// 3. Which headers must go with the request?
//
// Source-control hosts serving rendered HTML often reject bot-like or
// unauthenticated requests, so credentialed HTML pages get browser-like
// headers plus both common token conventions (PRIVATE-TOKEN and Bearer).
// Tokens are only ever attached to the credentialed host.
// =============================================================================

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::config::{RepoBackend, RepoConfig};
use crate::fetch::RequestHeaders;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// Used when no base URL is configured
const CREDENTIALED_HOST_MARKER: &str = "gitlab";

const BLOB_SEPARATOR: &str = "/-/blob/";
const API_PATH_MARKER: &str = "/api/v4/";
const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

// Everything except RFC 3986 unreserved characters gets encoded, so
// "grp/proj" becomes "grp%2Fproj" as the GitLab API expects
const PATH_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub struct AuthResolver<'a> {
    config: &'a dyn RepoConfig,
}

impl<'a> AuthResolver<'a> {
    pub fn new(config: &'a dyn RepoConfig) -> Self {
        Self { config }
    }

    // True if the URL belongs to the credentialed host
    //
    // The base URL must be followed by '/', '?', '#' or the end of the URL,
    // so https://gitlab.example.com.evil.org never receives the token. A URL
    // that carries the base inside its own query string still matches.
    pub fn is_credentialed_host(&self, url: &str) -> bool {
        match self.config.credentialed_host_base_url() {
            Some(base_url) => contains_at_boundary(url, base_url),
            None => url.to_lowercase().contains(CREDENTIALED_HOST_MARKER),
        }
    }

    // Rewrites a GitLab blob page to the raw files API
    //
    // Example (base = https://gitlab.example.com):
    //   https://gitlab.example.com/grp/proj/-/blob/main/docs/intro.md
    //   -> https://gitlab.example.com/api/v4/projects/grp%2Fproj/repository/files/docs%2Fintro.md/raw?ref=main
    //
    // Any URL that does not have this shape is returned unchanged.
    pub fn rewrite_to_api_form(&self, url: &str) -> String {
        self.blob_to_api_url(url).unwrap_or_else(|| url.to_string())
    }

    fn blob_to_api_url(&self, url: &str) -> Option<String> {
        if self.config.repo_backend() != RepoBackend::Gitlab {
            return None;
        }
        let base_url = self.config.credentialed_host_base_url()?;

        let path = url.strip_prefix(base_url)?.strip_prefix('/')?;
        let (project, blob) = path.split_once(BLOB_SEPARATOR)?;
        let (git_ref, file_path) = blob.split_once('/')?;

        // Query strings and fragments (?plain=1, #L10) are not part of the file path
        let file_path = file_path
            .split(['?', '#'])
            .next()
            .unwrap_or_default();

        if project.is_empty() || git_ref.is_empty() || file_path.is_empty() {
            return None;
        }

        Some(format!(
            "{}/api/v4/projects/{}/repository/files/{}/raw?ref={}",
            base_url,
            utf8_percent_encode(project, PATH_COMPONENT),
            utf8_percent_encode(file_path, PATH_COMPONENT),
            git_ref
        ))
    }

    // Builds the exact header set for fetching `url`
    //
    // - Every request gets a browser User-Agent
    // - Credentialed API URLs get PRIVATE-TOKEN only
    // - Credentialed HTML pages get PRIVATE-TOKEN, Bearer auth and the
    //   headers a normal browser sends
    // - Credentialed host without a token: warn, User-Agent only
    pub fn headers_for(&self, url: &str) -> RequestHeaders {
        let mut headers = RequestHeaders::new();
        insert(&mut headers, "User-Agent", BROWSER_USER_AGENT);

        if !self.is_credentialed_host(url) {
            return headers;
        }

        let token = match self.config.credentialed_host_token() {
            Some(token) => token,
            None => {
                tracing::warn!(
                    url,
                    "No access token configured for credentialed host, sending User-Agent only"
                );
                return headers;
            }
        };

        insert(&mut headers, TOKEN_HEADER, token);
        if url.contains(API_PATH_MARKER) {
            return headers;
        }

        insert(&mut headers, "Authorization", &format!("Bearer {}", token));
        insert(
            &mut headers,
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        );
        insert(&mut headers, "Accept-Language", "en-US,en;q=0.5");
        insert(&mut headers, "Accept-Encoding", "gzip, deflate, br");
        insert(&mut headers, "Connection", "keep-alive");
        insert(&mut headers, "Upgrade-Insecure-Requests", "1");
        headers
    }
}

fn contains_at_boundary(url: &str, base_url: &str) -> bool {
    url.match_indices(base_url).any(|(start, _)| {
        matches!(
            url[start + base_url.len()..].chars().next(),
            None | Some('/' | '?' | '#')
        )
    })
}

fn insert(headers: &mut RequestHeaders, name: &str, value: &str) {
    headers.insert(name.to_string(), value.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RepoSettings;
    use crate::crawl::captured_logs::CapturedLogs;
    use rstest::rstest;

    const BASE: &str = "https://gitlab.example.com";

    fn gitlab(token: Option<&str>) -> RepoSettings {
        RepoSettings::new(
            RepoBackend::Gitlab,
            Some(BASE.to_string()),
            token.map(str::to_string),
        )
    }

    #[test]
    fn test_blob_url_rewritten_to_api() {
        let settings = gitlab(Some("secret"));
        let resolver = AuthResolver::new(&settings);
        assert_eq!(
            resolver.rewrite_to_api_form("https://gitlab.example.com/grp/proj/-/blob/main/README.md"),
            "https://gitlab.example.com/api/v4/projects/grp%2Fproj/repository/files/README.md/raw?ref=main"
        );
    }

    #[test]
    fn test_nested_paths_are_encoded() {
        let settings = gitlab(None);
        let resolver = AuthResolver::new(&settings);
        assert_eq!(
            resolver.rewrite_to_api_form(
                "https://gitlab.example.com/org/team/svc/-/blob/v1.2/docs/getting started.md?plain=1#L4"
            ),
            "https://gitlab.example.com/api/v4/projects/org%2Fteam%2Fsvc/repository/files/docs%2Fgetting%20started.md/raw?ref=v1.2"
        );
    }

    #[rstest]
    // Not a blob page
    #[case("https://gitlab.example.com/grp/proj/-/tree/main/docs")]
    // Different host
    #[case("https://gitlab.other.com/grp/proj/-/blob/main/README.md")]
    // Host that only starts with the base
    #[case("https://gitlab.example.com.evil.org/grp/proj/-/blob/main/README.md")]
    // Blob without a file path
    #[case("https://gitlab.example.com/grp/proj/-/blob/main")]
    // Already API form
    #[case("https://gitlab.example.com/api/v4/projects/grp%2Fproj/repository/files/README.md/raw?ref=main")]
    fn test_other_urls_unchanged(#[case] url: &str) {
        let settings = gitlab(Some("secret"));
        let resolver = AuthResolver::new(&settings);
        assert_eq!(resolver.rewrite_to_api_form(url), url);
    }

    #[test]
    fn test_no_rewrite_for_github_backend() {
        let settings = RepoSettings::new(RepoBackend::Github, Some(BASE.to_string()), None);
        let resolver = AuthResolver::new(&settings);
        let url = "https://gitlab.example.com/grp/proj/-/blob/main/README.md";
        assert_eq!(resolver.rewrite_to_api_form(url), url);
    }

    #[test]
    fn test_no_rewrite_without_base_url() {
        let settings = RepoSettings::new(RepoBackend::Gitlab, None, Some("secret".to_string()));
        let resolver = AuthResolver::new(&settings);
        let url = "https://gitlab.example.com/grp/proj/-/blob/main/README.md";
        assert_eq!(resolver.rewrite_to_api_form(url), url);
    }

    #[rstest]
    #[case(Some(BASE), "https://gitlab.example.com/grp/proj", true)]
    #[case(Some(BASE), "https://gitlab.com/grp/proj", false)]
    #[case(Some(BASE), "https://docs.rs/tokio", false)]
    #[case(Some(BASE), "https://gitlab.example.com", true)]
    #[case(Some(BASE), "https://gitlab.example.com?tab=readme", true)]
    #[case(Some(BASE), "https://gitlab.example.com.evil.org/grp/proj", false)]
    #[case(Some(BASE), "https://gitlab.example.community/grp/proj", false)]
    #[case(None, "https://GitLab.com/grp/proj", true)]
    #[case(None, "https://github.com/rust-lang/rust", false)]
    fn test_is_credentialed_host(
        #[case] base_url: Option<&str>,
        #[case] url: &str,
        #[case] expected: bool,
    ) {
        let settings = RepoSettings::new(RepoBackend::Gitlab, base_url.map(str::to_string), None);
        let resolver = AuthResolver::new(&settings);
        assert_eq!(resolver.is_credentialed_host(url), expected);
    }

    #[test]
    fn test_public_url_gets_user_agent_only() {
        let settings = gitlab(Some("secret"));
        let resolver = AuthResolver::new(&settings);
        let headers = resolver.headers_for("https://docs.rs/tokio");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["User-Agent"], BROWSER_USER_AGENT);
    }

    #[test]
    fn test_api_url_gets_token_header_only() {
        let settings = gitlab(Some("secret"));
        let resolver = AuthResolver::new(&settings);
        let headers = resolver.headers_for(
            "https://gitlab.example.com/api/v4/projects/grp%2Fproj/repository/files/README.md/raw?ref=main",
        );
        let names: Vec<_> = headers.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["PRIVATE-TOKEN", "User-Agent"]);
        assert_eq!(headers["PRIVATE-TOKEN"], "secret");
    }

    #[test]
    fn test_html_page_gets_browser_headers() {
        let settings = gitlab(Some("secret"));
        let resolver = AuthResolver::new(&settings);
        let headers = resolver.headers_for("https://gitlab.example.com/grp/proj/-/wikis/home");

        assert_eq!(headers["PRIVATE-TOKEN"], "secret");
        assert_eq!(headers["Authorization"], "Bearer secret");
        for name in [
            "Accept",
            "Accept-Language",
            "Accept-Encoding",
            "Connection",
            "Upgrade-Insecure-Requests",
            "User-Agent",
        ] {
            assert!(headers.contains_key(name), "missing {}", name);
        }
        assert_eq!(headers.len(), 8);
    }

    #[test]
    fn test_missing_token_warns_and_sends_user_agent_only() {
        let settings = gitlab(None);
        let resolver = AuthResolver::new(&settings);

        let logs = CapturedLogs::default();
        let headers = tracing::subscriber::with_default(logs.subscriber(), || {
            resolver.headers_for("https://gitlab.example.com/grp/proj/-/blob/main/README.md")
        });

        let names: Vec<_> = headers.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["User-Agent"]);

        let output = logs.contents();
        assert!(output.contains("WARN"), "no warning logged: {}", output);
        assert!(output.contains("No access token configured"));
    }

    #[test]
    fn test_lookalike_host_gets_no_token() {
        let settings = gitlab(Some("secret"));
        let resolver = AuthResolver::new(&settings);
        let headers = resolver.headers_for("https://gitlab.example.com.evil.org/grp/proj");
        assert!(!headers.contains_key("PRIVATE-TOKEN"));
        assert!(!headers.contains_key("Authorization"));
    }

    #[test]
    fn test_equal_headers_for_same_auth_profile() {
        let settings = gitlab(Some("secret"));
        let resolver = AuthResolver::new(&settings);
        assert_eq!(
            resolver.headers_for("https://docs.rs/a"),
            resolver.headers_for("https://crates.io/b")
        );
        assert_ne!(
            resolver.headers_for("https://docs.rs/a"),
            resolver.headers_for("https://gitlab.example.com/grp/proj")
        );
    }
}
