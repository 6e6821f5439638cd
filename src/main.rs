// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Set up logging (to stderr, so JSON on stdout stays clean)
// 2. Parse command-line arguments using clap
// 3. Build the long-lived pieces once: settings and the HTTP fetcher
// 4. Run the crawl and print or save the harvested pages
// 5. Exit with proper code (0 = pages harvested, 1 = nothing harvested,
//    2 = error or unsupported command)
//
// Logging is controlled with RUST_LOG, e.g. RUST_LOG=doc_harvest=debug
// =============================================================================

mod cli; // src/cli.rs - command-line parsing
mod config; // src/config.rs - repository backend settings
mod crawl; // src/crawl/ - the crawler itself
mod fetch; // src/fetch/ - fetching pages over HTTP
mod output; // src/output.rs - printing and saving results

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, RepoArgs};
use crawl::Crawler;
use fetch::{FetchSettings, HttpFetcher};

#[tokio::main]
async fn main() {
    init_tracing();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

// Everything a crawl run needs, straight from the CLI
struct CrawlRequest {
    start_urls: String,
    max_depth: usize,
    max_concurrency: usize,
    timeout_secs: u64,
    json: bool,
    output: Option<PathBuf>,
    repo: RepoArgs,
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    if let Err(unsupported) = cli.command.ensure_supported() {
        tracing::error!("{}", unsupported);
        return Ok(2);
    }

    match cli.command {
        Commands::Crawl {
            start_urls,
            max_depth,
            max_concurrency,
            timeout_secs,
            json,
            output,
            repo,
        } => {
            handle_crawl(CrawlRequest {
                start_urls,
                max_depth,
                max_concurrency,
                timeout_secs,
                json,
                output,
                repo,
            })
            .await
        }
        Commands::Ingest { repo_urls } => {
            // ensure_supported() already turned this away
            tracing::error!(repos = %repo_urls, "Ingest is not available");
            Ok(2)
        }
    }
}

// Handles the 'crawl' subcommand
async fn handle_crawl(request: CrawlRequest) -> Result<i32> {
    let seeds = cli::parse_start_urls(&request.start_urls);
    if seeds.is_empty() {
        bail!("No start URLs provided. Please provide a comma-delimited list of URLs.");
    }

    let settings = request.repo.into_settings();
    let fetcher = HttpFetcher::new(&FetchSettings {
        timeout: Duration::from_secs(request.timeout_secs),
        ..FetchSettings::default()
    })
    .context("Failed to set up the HTTP client")?;

    tracing::info!(
        seeds = seeds.len(),
        max_depth = request.max_depth,
        max_concurrency = request.max_concurrency,
        "Starting crawl"
    );

    let pages = Crawler::new(&fetcher, &settings)
        .crawl(&seeds, request.max_depth, request.max_concurrency)
        .await;

    if let Some(dir) = &request.output {
        let written = output::save_pages(dir, &pages)?;
        tracing::info!(files = written.len(), dir = %dir.display(), "Saved pages");
    }

    output::print_pages(&pages, request.json)?;

    // Connection pool is released here, before the process exits
    drop(fetcher);

    if pages.is_empty() {
        tracing::warn!("No pages with markdown were harvested");
        Ok(1)
    } else {
        Ok(0)
    }
}
