use std::collections::{HashSet, VecDeque};
use std::io::Read;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use regex::Regex;
use tracing::{info, warn};
use url::Url;

use crate::config::CrawlConfig;
use crate::fetch::{Fetched, Fetcher};

/// Uncompressed size ceiling for one sitemap document (the sitemaps.org limit).
const MAX_SITEMAP_BYTES: u64 = 50 * 1024 * 1024;

/// `<loc>` entries of one sitemap document, split by root element.
#[derive(Debug, Default, PartialEq)]
pub struct SitemapEntries {
    /// Child sitemaps listed by a `<sitemapindex>`.
    pub sitemaps: Vec<String>,
    /// Page URLs listed by a `<urlset>`.
    pub urls: Vec<String>,
}

/// URL filter built from the configured path rules.
pub struct SitemapRules {
    rules: Vec<Regex>,
}

impl SitemapRules {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let rules = patterns
            .iter()
            .map(|p| Regex::new(p).with_context(|| format!("Invalid sitemap rule {p:?}")))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn matches(&self, url: &str) -> bool {
        self.rules.iter().any(|r| r.is_match(url))
    }
}

/// Walk the configured sitemaps (following indexes) and return product page URLs.
pub async fn fetch_product_urls(
    fetcher: &Fetcher,
    cfg: &CrawlConfig,
    limit: Option<usize>,
) -> Result<Vec<Url>> {
    let rules = SitemapRules::new(&cfg.sitemap_rules)?;
    let mut queue: VecDeque<Url> = cfg
        .sitemap_urls
        .iter()
        .map(|s| Url::parse(s).with_context(|| format!("Invalid sitemap URL {s}")))
        .collect::<Result<_>>()?;

    let mut visited_sitemaps = HashSet::new();
    let mut seen_pages = HashSet::new();
    let mut pages = Vec::new();
    let mut total = 0usize;

    while let Some(sitemap_url) = queue.pop_front() {
        if !visited_sitemaps.insert(sitemap_url.clone()) {
            continue;
        }

        info!("Fetching sitemap: {}", sitemap_url);
        let fetched = match fetcher.fetch(&sitemap_url).await {
            Ok(f) => f,
            Err(e) => {
                warn!("Skipping sitemap {}: {}", sitemap_url, e);
                continue;
            }
        };
        let xml = match sitemap_text(&fetched) {
            Ok(xml) => xml,
            Err(e) => {
                warn!("Skipping sitemap {}: {:#}", sitemap_url, e);
                continue;
            }
        };

        let entries = match parse_sitemap(&xml) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Skipping unparseable sitemap {}: {:#}", sitemap_url, e);
                continue;
            }
        };

        for child in entries.sitemaps {
            match sitemap_url.join(&child) {
                Ok(u) if fetcher.is_allowed(&u) => queue.push_back(u),
                Ok(u) => warn!("Ignoring offsite sitemap {}", u),
                Err(e) => warn!("Ignoring bad sitemap loc {:?}: {}", child, e),
            }
        }

        total += entries.urls.len();
        for loc in entries.urls {
            let Ok(url) = sitemap_url.join(&loc) else {
                continue;
            };
            if !fetcher.is_allowed(&url) || !rules.matches(url.as_str()) {
                continue;
            }
            if seen_pages.insert(url.to_string()) {
                pages.push(url);
                if limit.is_some_and(|n| pages.len() >= n) {
                    info!("Reached page limit of {}", pages.len());
                    return Ok(pages);
                }
            }
        }
    }

    info!("Total URLs in sitemaps: {}", total);
    info!("Product pages after filtering: {}", pages.len());
    Ok(pages)
}

/// Sitemap body as text, gunzipping `.xml.gz` payloads.
fn sitemap_text(fetched: &Fetched) -> Result<String> {
    if !fetched.is_gzip() {
        return Ok(fetched.text());
    }
    let xml = gunzip_capped(&fetched.body, MAX_SITEMAP_BYTES)?;
    Ok(String::from_utf8_lossy(&xml).into_owned())
}

fn gunzip_capped(body: &[u8], cap: u64) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(body)
        .take(cap + 1)
        .read_to_end(&mut out)
        .context("Failed to gunzip sitemap")?;
    if out.len() as u64 > cap {
        anyhow::bail!("gunzipped sitemap exceeds {} bytes", cap);
    }
    Ok(out)
}

/// Parse a `<urlset>` or `<sitemapindex>` document and return its `<loc>` entries.
///
/// Only unprefixed `<loc>` elements directly under `<url>` or `<sitemap>` count,
/// so extension tags like `<image:loc>` are ignored.
pub fn parse_sitemap(xml: &str) -> Result<SitemapEntries> {
    use quick_xml::events::Event;

    #[derive(Clone, Copy, PartialEq)]
    enum Parent {
        None,
        Url,
        Sitemap,
    }

    let mut reader = quick_xml::Reader::from_str(xml);
    let mut entries = SitemapEntries::default();
    let mut parent = Parent::None;
    let mut in_loc = false;
    let mut loc = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"url" => parent = Parent::Url,
                b"sitemap" => parent = Parent::Sitemap,
                b"loc" if parent != Parent::None => {
                    in_loc = true;
                    loc.clear();
                }
                _ => {}
            },
            Ok(Event::Text(e)) if in_loc => {
                loc.push_str(&e.unescape()?);
            }
            Ok(Event::CData(e)) if in_loc => {
                loc.push_str(&String::from_utf8_lossy(&e));
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"loc" if in_loc => {
                    in_loc = false;
                    let value = loc.trim();
                    if !value.is_empty() {
                        match parent {
                            Parent::Url => entries.urls.push(value.to_string()),
                            Parent::Sitemap => entries.sitemaps.push(value.to_string()),
                            Parent::None => {}
                        }
                    }
                }
                b"url" | b"sitemap" => parent = Parent::None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }
    Ok(entries)
}
