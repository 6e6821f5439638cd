// src/config.rs
// =============================================================================
// Repository backend configuration.
//
// The crawler needs three facts about the source-control host it talks to:
// - Which kind of backend it is (GitHub or GitLab)
// - The base URL of the credentialed (GitLab) host, if any
// - The access token for that host, if any
//
// These come from CLI flags with environment-variable fallbacks
// (REPO_TYPE, GITLAB_BASE_URL, GITLAB_TOKEN), see cli.rs.
//
// The crawler only ever sees the RepoConfig trait, so tests can hand it a
// hand-built RepoSettings without touching the environment.
// =============================================================================

use clap::ValueEnum;

// The kind of repository backend the documentation lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RepoBackend {
    /// github.com or GitHub Enterprise
    #[default]
    Github,
    /// GitLab (self-hosted or gitlab.com), requires token-based access
    Gitlab,
}

// Read-only view of the repository configuration used by the auth resolver
pub trait RepoConfig: Send + Sync {
    fn repo_backend(&self) -> RepoBackend;

    // Base URL of the credentialed host, without a trailing slash
    fn credentialed_host_base_url(&self) -> Option<&str>;

    fn credentialed_host_token(&self) -> Option<&str>;
}

// Concrete configuration built once at startup
#[derive(Debug, Clone, Default)]
pub struct RepoSettings {
    backend: RepoBackend,
    base_url: Option<String>,
    token: Option<String>,
}

impl RepoSettings {
    // Builds settings, treating blank values as "not configured"
    pub fn new(backend: RepoBackend, base_url: Option<String>, token: Option<String>) -> Self {
        let base_url = non_blank(base_url).map(|url| url.trim_end_matches('/').to_string());
        let token = non_blank(token);

        Self {
            backend,
            base_url,
            token,
        }
    }
}

impl RepoConfig for RepoSettings {
    fn repo_backend(&self) -> RepoBackend {
        self.backend
    }

    fn credentialed_host_base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    fn credentialed_host_token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_values_are_unset() {
        let settings = RepoSettings::new(
            RepoBackend::Gitlab,
            Some("   ".to_string()),
            Some(String::new()),
        );
        assert_eq!(settings.credentialed_host_base_url(), None);
        assert_eq!(settings.credentialed_host_token(), None);
    }

    #[test]
    fn test_trailing_slash_removed() {
        let settings = RepoSettings::new(
            RepoBackend::Gitlab,
            Some("https://gitlab.example.com/".to_string()),
            Some("secret".to_string()),
        );
        assert_eq!(
            settings.credentialed_host_base_url(),
            Some("https://gitlab.example.com")
        );
        assert_eq!(settings.credentialed_host_token(), Some("secret"));
        assert_eq!(settings.repo_backend(), RepoBackend::Gitlab);
    }

    #[test]
    fn test_default_backend_is_github() {
        let settings = RepoSettings::default();
        assert_eq!(settings.repo_backend(), RepoBackend::Github);
    }
}
