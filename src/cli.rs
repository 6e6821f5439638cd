// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes. Repository settings can come from flags or
// from environment variables (REPO_TYPE, GITLAB_BASE_URL, GITLAB_TOKEN).
// =============================================================================

use clap::{Args, Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::{RepoBackend, RepoSettings};

#[derive(Parser, Debug)]
#[command(
    name = "doc-harvest",
    version,
    about = "Harvest markdown documentation from GitHub/GitLab repositories and doc sites",
    long_about = "doc-harvest crawls documentation pages breadth-first, follows internal links \
                  up to a depth limit, and collects the markdown of every page. GitLab blob \
                  pages are fetched through the raw files API with your access token."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl pages and collect their markdown
    ///
    /// Example: doc-harvest crawl https://docs.example.com,https://gitlab.example.com/grp/proj/-/blob/main/README.md --max-depth 2
    Crawl {
        /// Comma-delimited start URLs
        start_urls: String,

        /// How many link levels to crawl (0 = fetch nothing, 1 = only the start URLs)
        #[arg(long, default_value_t = 3)]
        max_depth: usize,

        /// Maximum simultaneous requests per batch
        #[arg(long, default_value_t = 10, value_parser = parse_positive)]
        max_concurrency: usize,

        /// Per-request timeout in seconds
        #[arg(long, default_value_t = 30, value_parser = parse_positive_secs)]
        timeout_secs: u64,

        /// Output results in JSON format instead of a table
        #[arg(long)]
        json: bool,

        /// Also save every page as a .md file in this directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        repo: RepoArgs,
    },

    /// Ingest repositories into the documentation store (not supported yet)
    Ingest {
        /// Comma-delimited repository URLs
        repo_urls: String,
    },
}

// Repository backend settings shared by commands that touch repositories
#[derive(Args, Debug)]
pub struct RepoArgs {
    /// Repository backend type
    #[arg(long, env = "REPO_TYPE", value_enum, default_value_t = RepoBackend::Github)]
    pub repo_type: RepoBackend,

    /// Base URL of the GitLab instance (e.g. https://gitlab.example.com)
    #[arg(long, env = "GITLAB_BASE_URL")]
    pub gitlab_base_url: Option<String>,

    /// GitLab access token
    #[arg(long, env = "GITLAB_TOKEN", hide_env_values = true)]
    pub gitlab_token: Option<String>,
}

impl RepoArgs {
    pub fn into_settings(self) -> RepoSettings {
        RepoSettings::new(self.repo_type, self.gitlab_base_url, self.gitlab_token)
    }
}

// Returned for commands that exist in the CLI but have no backend yet
#[derive(Debug, Error, PartialEq, Eq)]
#[error("'{command}' is not supported yet")]
pub struct UnsupportedOperation {
    pub command: &'static str,
}

impl Commands {
    // Checked before any work starts
    pub fn ensure_supported(&self) -> Result<(), UnsupportedOperation> {
        match self {
            Commands::Crawl { .. } => Ok(()),
            Commands::Ingest { .. } => Err(UnsupportedOperation { command: "ingest" }),
        }
    }
}

// Splits "a, b,,c" into {"a", "b", "c"}
pub fn parse_start_urls(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_positive(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_positive_secs(value: &str) -> Result<u64, String> {
    parse_positive(value).map(|n| n as u64)
}
