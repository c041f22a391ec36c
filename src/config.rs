use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const SITEMAP_URL: &str = "https://www.subzero-wolf.com/sitemap-US.xml";
const ALLOWED_DOMAIN: &str = "subzero-wolf.com";
const SITEMAP_RULES: &[&str] = &["/products/", "/cove/", "/sub-zero/", "/wolf/"];
const CONCURRENCY: usize = 8;
const DOWNLOAD_DELAY_MS: u64 = 500;
const MAX_RETRIES: u32 = 2;
const RETRY_CEILING: u32 = 10;
const BASE_BACKOFF_MS: u64 = 1000;
const TIMEOUT_SECS: u64 = 180;
const CHUNK_SIZE: usize = 64;
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
const DEFAULT_CONFIG_FILE: &str = "subzero.toml";
const ENV_PREFIX: &str = "SZW";

/// Region cookies the site checks before serving the US catalog.
pub const GEO_COOKIES: &[(&str, &str)] = &[
    ("countryCode", "US"),
    ("CountryCode", "US"),
    ("siteRegion", "US"),
    ("detected_country", "US"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    pub sitemap_urls: Vec<String>,
    pub allowed_domain: String,
    pub sitemap_rules: Vec<String>,
    pub concurrency: usize,
    pub download_delay_ms: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub output_dir: PathBuf,
    pub chunk_size: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            sitemap_urls: vec![SITEMAP_URL.to_string()],
            allowed_domain: ALLOWED_DOMAIN.to_string(),
            sitemap_rules: SITEMAP_RULES.iter().map(|r| r.to_string()).collect(),
            concurrency: CONCURRENCY,
            download_delay_ms: DOWNLOAD_DELAY_MS,
            max_retries: MAX_RETRIES,
            backoff_base_ms: BASE_BACKOFF_MS,
            timeout_secs: TIMEOUT_SECS,
            user_agent: USER_AGENT.to_string(),
            accept: ACCEPT.to_string(),
            accept_language: ACCEPT_LANGUAGE.to_string(),
            output_dir: PathBuf::from("."),
            chunk_size: CHUNK_SIZE,
        }
    }
}

impl CrawlConfig {
    /// Layer compiled defaults, an optional TOML file and `SZW_*` env vars.
    ///
    /// An explicit `path` must exist; the default `subzero.toml` is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => config::File::from(p).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = config::Config::builder()
            .add_source(
                config::Config::try_from(&Self::default())
                    .context("Failed to serialize default config")?,
            )
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("sitemap_urls")
                    .with_list_parse_key("sitemap_rules"),
            )
            .build()
            .context("Failed to load crawl configuration")?;

        let cfg: Self = settings
            .try_deserialize()
            .context("Invalid crawl configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sitemap_urls.is_empty() {
            anyhow::bail!("at least one sitemap URL is required");
        }
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be at least 1");
        }
        if self.max_retries > RETRY_CEILING {
            anyhow::bail!("max_retries must be at most {RETRY_CEILING}");
        }
        if self.chunk_size == 0 {
            anyhow::bail!("chunk_size must be at least 1");
        }
        for rule in &self.sitemap_rules {
            regex::Regex::new(rule).with_context(|| format!("Invalid sitemap rule {rule:?}"))?;
        }
        Ok(())
    }
}
