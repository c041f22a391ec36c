mod config;
mod crawler;
mod error;
mod feed;
mod fetch;
mod parser;
mod sitemap;
#[cfg(test)]
mod testing;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use url::Url;

use crate::config::CrawlConfig;
use crate::feed::FeedWriter;
use crate::fetch::Fetcher;
use crate::parser::ProductPage;

#[derive(Parser)]
#[command(name = "subzero_scraper", about = "Sub-Zero / Wolf / Cove product document scraper")]
struct Cli {
    /// Config file (default: ./subzero.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl product pages from the sitemap and write a JSON feed
    Crawl {
        /// Max product pages to fetch (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Concurrent requests in flight
        #[arg(long)]
        concurrency: Option<usize>,
        /// Minimum delay between requests, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Directory for the feed file
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// List product page URLs found in the sitemap
    Sitemap {
        /// Max URLs to list
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Extract records from a single product page
    Extract {
        /// Page URL (also used to resolve links when --html is given)
        url: String,
        /// Read the page from a local HTML file instead of fetching it
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Summarize a feed file
    Stats {
        /// Feed file written by `crawl`
        feed: PathBuf,
        /// Filter by brand (Sub-Zero, Wolf, Cove, Unknown)
        #[arg(short, long)]
        brand: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut cfg = CrawlConfig::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Crawl {
            limit,
            concurrency,
            delay_ms,
            output_dir,
        } => {
            if let Some(n) = concurrency {
                cfg.concurrency = n;
            }
            if let Some(ms) = delay_ms {
                cfg.download_delay_ms = ms;
            }
            if let Some(dir) = output_dir {
                cfg.output_dir = dir;
            }
            cfg.validate()?;

            // Create the feed up front so an existing file fails the run before any fetching
            let started = chrono::Utc::now();
            let mut feed = FeedWriter::create(&cfg.output_dir, started)?;

            let crawled = run_crawl(&cfg, limit, &mut feed).await;
            let path = feed.path().to_path_buf();
            let stats = feed.close_with(crawled)?;
            stats.print();
            println!("Feed: {}", path.display());
            Ok(())
        }
        Commands::Sitemap { limit } => {
            let fetcher = Fetcher::new(&cfg)?;
            let pages = sitemap::fetch_product_urls(&fetcher, &cfg, limit).await?;
            for url in &pages {
                println!("{}", url);
            }
            println!("\n{} product pages", pages.len());
            Ok(())
        }
        Commands::Extract { url, html } => {
            let url = Url::parse(&url).with_context(|| format!("Invalid URL {url}"))?;
            let records = match html {
                Some(path) => {
                    let body = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    parser::process_page(&ProductPage::parse(url, &body))
                }
                None => {
                    let fetcher = Fetcher::new(&cfg)?;
                    crawler::extract_single_page(&fetcher, &url).await?
                }
            };
            if records.is_empty() {
                eprintln!("No model number found; page would be skipped.");
            }
            println!("{}", serde_json::to_string_pretty(&records)?);
            Ok(())
        }
        Commands::Stats { feed, brand, limit } => {
            let records = feed::load_feed(&feed)?;
            let rows: Vec<_> = records
                .iter()
                .filter(|r| {
                    brand
                        .as_deref()
                        .map_or(true, |b| r.brand.as_str().eq_ignore_ascii_case(b))
                })
                .collect();
            if rows.is_empty() {
                println!("No records found.");
                return Ok(());
            }

            let mut by_brand: BTreeMap<&str, usize> = BTreeMap::new();
            let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
            let mut files = 0usize;
            for r in &rows {
                *by_brand.entry(r.brand.as_str()).or_default() += 1;
                let t = if r.doc_type.is_empty() { "(none)" } else { r.doc_type.as_str() };
                *by_type.entry(t).or_default() += 1;
                files += r.file_urls.len();
            }
            let models: std::collections::HashSet<_> = rows.iter().map(|r| &r.model).collect();

            println!("Records:   {}", rows.len());
            println!("Models:    {}", models.len());
            println!("PDF links: {}", files);
            println!("\n--- Brands ---");
            for (b, n) in &by_brand {
                println!("  {:<10} {:>6}", b, n);
            }
            println!("\n--- Document types ---");
            for (t, n) in &by_type {
                println!("  {:<20} {:>6}", t, n);
            }

            // Compact, readable table
            println!(
                "\n{:>3} | {:<16} | {:<8} | {:<22} | {:<4} | {:<20} | {:>5}",
                "#", "Model", "Brand", "Product", "Lang", "Type", "Files"
            );
            println!("{}", "-".repeat(95));
            for (i, r) in rows.iter().take(limit).enumerate() {
                println!(
                    "{:>3} | {:<16} | {:<8} | {:<22} | {:<4} | {:<20} | {:>5}",
                    i + 1,
                    truncate(&r.model, 16),
                    r.brand.as_str(),
                    truncate(&r.product, 22),
                    r.product_lang,
                    truncate(&r.doc_type, 20),
                    r.file_urls.len()
                );
            }
            if rows.len() > limit {
                println!("... {} more", rows.len() - limit);
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Sitemap discovery plus the page crawl; the caller closes the feed either way.
async fn run_crawl(
    cfg: &CrawlConfig,
    limit: Option<usize>,
    feed: &mut FeedWriter,
) -> anyhow::Result<crawler::CrawlStats> {
    let fetcher = Arc::new(Fetcher::new(cfg)?);
    let pages = sitemap::fetch_product_urls(&fetcher, cfg, limit).await?;
    if pages.is_empty() {
        println!("No product pages found in sitemap.");
    } else {
        println!(
            "Crawling {} product pages ({} concurrent, {}ms delay)...",
            pages.len(),
            cfg.concurrency,
            cfg.download_delay_ms
        );
    }
    crawler::crawl_pages(fetcher, cfg, pages, feed).await
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn truncate_keeps_width() {
        assert_eq!(truncate("ICBW36", 16), "ICBW36");
        assert_eq!(truncate("User and Care Guide", 10), "User an...");
    }

    #[test]
    fn durations() {
        use std::time::Duration;
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }
}
