use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::CrawlConfig;
use crate::error::FetchError;
use crate::feed::{FeedWriter, OutputRecord};
use crate::fetch::{Fetched, Fetcher};
use crate::parser::{self, ProductPage};

/// Crawl stats returned after completion.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CrawlStats {
    pub total: usize,
    pub fetched: usize,
    pub errors: usize,
    pub skipped: usize,
    pub without_model: usize,
    pub records: usize,
}

impl CrawlStats {
    pub fn print(&self) {
        println!(
            "Done: {} pages ({} fetched, {} errors, {} skipped, {} without model).",
            self.total, self.fetched, self.errors, self.skipped, self.without_model
        );
        println!("Wrote {} records.", self.records);
    }
}

enum PageOutcome {
    Fetched(Fetched),
    Failed(Url, FetchError),
}

/// Fetch pages concurrently and stream their records into `feed` as they arrive.
pub async fn crawl_pages(
    fetcher: Arc<Fetcher>,
    cfg: &CrawlConfig,
    pages: Vec<Url>,
    feed: &mut FeedWriter,
) -> Result<CrawlStats> {
    let semaphore = Arc::new(Semaphore::new(cfg.concurrency));
    let total = pages.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    // Channel: workers send fetched bodies, main loop extracts and writes
    let (tx, mut rx) = tokio::sync::mpsc::channel::<PageOutcome>(cfg.concurrency * 2);

    for url in pages {
        let fetcher = Arc::clone(&fetcher);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            let outcome = match fetcher.fetch(&url).await {
                Ok(fetched) => PageOutcome::Fetched(fetched),
                Err(e) => PageOutcome::Failed(url, e),
            };
            let _ = tx.send(outcome).await;
        });
    }

    // Drop our copy of tx so rx closes when all spawned tasks finish
    drop(tx);

    let mut stats = CrawlStats {
        total,
        ..Default::default()
    };
    let mut chunk = Vec::with_capacity(cfg.chunk_size);

    while let Some(outcome) = rx.recv().await {
        pb.inc(1);
        match outcome {
            PageOutcome::Failed(url, e) => {
                warn!(url = %url, "Fetch failed: {}", e);
                stats.errors += 1;
            }
            PageOutcome::Fetched(page) if !page.is_html() => {
                debug!(
                    url = %page.url,
                    content_type = page.content_type.as_deref().unwrap_or(""),
                    "Skipping non-HTML response"
                );
                stats.skipped += 1;
            }
            PageOutcome::Fetched(page) => {
                stats.fetched += 1;
                chunk.push(page);
                if chunk.len() >= cfg.chunk_size {
                    flush_chunk(&mut chunk, feed, &mut stats)?;
                }
            }
        }
    }
    flush_chunk(&mut chunk, feed, &mut stats)?;

    pb.finish_and_clear();
    info!(
        total = stats.total,
        fetched = stats.fetched,
        errors = stats.errors,
        records = stats.records,
        "Crawl finished"
    );
    Ok(stats)
}

/// Extract a batch of pages in parallel and append their records to the feed.
fn flush_chunk(
    chunk: &mut Vec<Fetched>,
    feed: &mut FeedWriter,
    stats: &mut CrawlStats,
) -> Result<()> {
    if chunk.is_empty() {
        return Ok(());
    }

    let results: Vec<Option<Vec<OutputRecord>>> = chunk.par_iter().map(extract_fetched).collect();

    for (page, records) in chunk.iter().zip(results) {
        match records {
            Some(records) => {
                stats.records += records.len();
                feed.write_all(&records)?;
            }
            None => {
                debug!(url = %page.url, "No model number found, skipping page");
                stats.without_model += 1;
            }
        }
    }
    chunk.clear();
    Ok(())
}

fn extract_fetched(fetched: &Fetched) -> Option<Vec<OutputRecord>> {
    let page = ProductPage::parse(fetched.url.clone(), &fetched.text());
    parser::extract(&page).map(|result| result.into_records(page.url.as_str()))
}

/// Fetch a single URL and return the records it yields.
pub async fn extract_single_page(fetcher: &Fetcher, url: &Url) -> Result<Vec<OutputRecord>> {
    let start = Instant::now();
    let fetched = fetcher
        .fetch(url)
        .await
        .with_context(|| format!("Failed to fetch {url}"))?;
    info!(
        url = %fetched.url,
        latency_ms = start.elapsed().as_millis() as u64,
        "Fetched page"
    );

    if !fetched.is_html() {
        anyhow::bail!(
            "{} is not an HTML page ({})",
            fetched.url,
            fetched.content_type.as_deref().unwrap_or("unknown content type")
        );
    }
    Ok(extract_fetched(&fetched).unwrap_or_default())
}
