// src/output.rs
// =============================================================================
// Presenting harvested pages: a terminal table, JSON, or one .md file per
// page in an output directory.
// =============================================================================

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use crate::crawl::CrawledPage;

const MAX_DOMAIN_LEN: usize = 50;
const MAX_PATH_LEN: usize = 100;

// Prints pages either as pretty JSON or as a human-readable table
pub fn print_pages(pages: &[CrawledPage], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(pages)?);
    } else {
        print_table(pages);
    }
    Ok(())
}

fn print_table(pages: &[CrawledPage]) {
    println!("{:<80} {:>10}", "URL", "CHARS");
    println!("{}", "=".repeat(91));

    for page in pages {
        // Truncate URL if too long for display
        let url_display = if page.url.chars().count() > 77 {
            format!("{}...", page.url.chars().take(77).collect::<String>())
        } else {
            page.url.clone()
        };
        println!("{:<80} {:>10}", url_display, page.markdown.chars().count());
    }

    println!();
    println!("📄 Harvested {} page(s)", pages.len());
}

// Writes every page to `dir` as <domain>_<path>.md and returns the paths.
// The directory is created when missing.
pub fn save_pages(dir: &Path, pages: &[CrawledPage]) -> Result<Vec<PathBuf>> {
    if dir.exists() && !dir.is_dir() {
        bail!(
            "Output path '{}' exists but is not a directory",
            dir.display()
        );
    }
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory '{}'", dir.display()))?;

    let mut used = HashSet::new();
    let mut written = Vec::with_capacity(pages.len());

    for page in pages {
        let stem = unique_stem(file_stem_for(&page.url), &mut used);
        let path = dir.join(format!("{}.md", stem));
        fs::write(&path, &page.markdown)
            .with_context(|| format!("Failed to write '{}'", path.display()))?;
        tracing::debug!(url = %page.url, path = %path.display(), "Saved page");
        written.push(path);
    }

    Ok(written)
}

// "https://docs.example.com/guide/setup" -> "docs-example-com_guide_setup"
fn file_stem_for(url: &str) -> String {
    let (domain, path) = match Url::parse(url) {
        Ok(parsed) => (
            parsed.host_str().unwrap_or("unknown_domain").to_string(),
            parsed.path().to_string(),
        ),
        Err(_) => ("unknown_domain".to_string(), url.to_string()),
    };

    let path = path.trim_matches('/');
    let path = if path.is_empty() {
        "index".to_string()
    } else {
        sanitize_component(path, MAX_PATH_LEN)
    };

    format!("{}_{}", sanitize_component(&domain, MAX_DOMAIN_LEN), path)
}

fn unique_stem(stem: String, used: &mut HashSet<String>) -> String {
    if used.insert(stem.clone()) {
        return stem;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}", stem, n);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

// Keeps alphanumerics, '-' and '_'; '.' becomes '-', everything else '_'
fn sanitize_component(component: &str, max_len: usize) -> String {
    let sanitized: String = component
        .chars()
        .map(|c| match c {
            c if c.is_alphanumeric() || c == '-' || c == '_' => c,
            '.' => '-',
            _ => '_',
        })
        .take(max_len)
        .collect();

    if sanitized.is_empty() {
        "empty".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn page(url: &str, markdown: &str) -> CrawledPage {
        CrawledPage {
            url: url.to_string(),
            markdown: markdown.to_string(),
        }
    }

    #[rstest]
    #[case("https://docs.example.com/", "docs-example-com_index")]
    #[case("https://docs.example.com/guide/setup", "docs-example-com_guide_setup")]
    #[case("https://docs.example.com/guide/setup.md?x=1", "docs-example-com_guide_setup-md")]
    #[case("not a url", "unknown_domain_not_a_url")]
    fn test_file_stem_for(#[case] url: &str, #[case] expected: &str) {
        assert_eq!(file_stem_for(url), expected);
    }

    #[test]
    fn test_sanitize_component_caps_length() {
        assert_eq!(sanitize_component("abcdef", 3), "abc");
        assert_eq!(sanitize_component("", 3), "empty");
    }

    #[test]
    fn test_save_pages_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("docs");
        let pages = vec![
            page("https://docs.example.com/a", "# A"),
            page("https://docs.example.com/a?page=2", "# A2"),
            page("https://docs.example.com/", "# Home"),
        ];

        let paths = save_pages(&out, &pages).unwrap();

        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "docs-example-com_a.md",
                "docs-example-com_a_2.md",
                "docs-example-com_index.md",
            ]
        );
        assert_eq!(fs::read_to_string(&paths[1]).unwrap(), "# A2");
    }

    #[test]
    fn test_save_pages_rejects_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, "x").unwrap();

        let result = save_pages(&file, &[page("https://docs.example.com/a", "# A")]);
        assert!(result.is_err());
    }
}
