use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, LOCATION};
use reqwest::redirect;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

use crate::config::{CrawlConfig, GEO_COOKIES};
use crate::error::{FetchError, FetchResult};

const MAX_REDIRECTS: usize = 10;

/// A successful response body, keyed by the URL it was finally served from.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub url: Url,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Fetched {
    /// Responses without a content type are treated as HTML.
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("html"))
            .unwrap_or(true)
    }

    pub fn is_gzip(&self) -> bool {
        self.body.starts_with(&[0x1f, 0x8b])
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Spaces out request starts by a fixed delay across all tasks.
struct Pacer {
    delay: Duration,
    next: Mutex<Instant>,
}

impl Pacer {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            next: Mutex::new(Instant::now()),
        }
    }

    async fn wait(&self) {
        if self.delay.is_zero() {
            return;
        }
        // the lock is held while sleeping so waiters queue up in order
        let mut next = self.next.lock().await;
        let start = (*next).max(Instant::now());
        tokio::time::sleep_until(start).await;
        *next = start + self.delay;
    }
}

/// Shared HTTP client with geo cookies, pacing and retry.
pub struct Fetcher {
    client: reqwest::Client,
    pacer: Pacer,
    allowed_domain: String,
    max_retries: u32,
    backoff_base: Duration,
}

impl Fetcher {
    pub fn new(cfg: &CrawlConfig) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        for raw in &cfg.sitemap_urls {
            let url = Url::parse(raw).with_context(|| format!("Invalid sitemap URL {raw}"))?;
            for (name, value) in GEO_COOKIES {
                jar.add_cookie_str(&format!("{name}={value}; Path=/"), &url);
            }
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_str(&cfg.accept)?);
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_str(&cfg.accept_language)?);

        // Offsite hops are not followed; fetch_once turns them into FetchError::Offsite
        let allowed_domain = cfg.allowed_domain.to_ascii_lowercase();
        let domain = allowed_domain.clone();
        let policy = redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                attempt.error("too many redirects")
            } else if host_allowed(attempt.url(), &domain) {
                attempt.follow()
            } else {
                attempt.stop()
            }
        });

        let client = reqwest::Client::builder()
            .cookie_provider(jar)
            .redirect(policy)
            .default_headers(headers)
            .user_agent(cfg.user_agent.as_str())
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            pacer: Pacer::new(Duration::from_millis(cfg.download_delay_ms)),
            allowed_domain,
            max_retries: cfg.max_retries,
            backoff_base: Duration::from_millis(cfg.backoff_base_ms),
        })
    }

    /// True when the URL's host is the allowed domain or one of its subdomains.
    pub fn is_allowed(&self, url: &Url) -> bool {
        host_allowed(url, &self.allowed_domain)
    }

    /// Fetch with exponential backoff on retryable failures.
    pub async fn fetch(&self, url: &Url) -> FetchResult<Fetched> {
        if !self.is_allowed(url) {
            return Err(FetchError::Offsite { url: url.to_string() });
        }

        let mut attempt = 0;
        loop {
            match self.fetch_once(url).await {
                Ok(fetched) => return Ok(fetched),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let backoff = backoff_delay(self.backoff_base, attempt);
                    warn!(
                        url = %url,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        "{e}, retrying in {:.1}s",
                        backoff.as_secs_f64()
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, url: &Url) -> FetchResult<Fetched> {
        self.pacer.wait().await;

        let transport = |source: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let start = std::time::Instant::now();
        let resp = self.client.get(url.clone()).send().await.map_err(transport)?;
        let status = resp.status();
        if status.is_redirection() {
            let target = resp
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|loc| resp.url().join(loc).ok());
            if let Some(target) = target.filter(|t| !self.is_allowed(t)) {
                return Err(FetchError::Offsite { url: target.to_string() });
            }
        }
        if !self.is_allowed(resp.url()) {
            return Err(FetchError::Offsite { url: resp.url().to_string() });
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = resp.url().clone();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().await.map_err(transport)?.to_vec();

        debug!(
            url = %final_url,
            status = status.as_u16(),
            bytes = body.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "fetched"
        );

        Ok(Fetched {
            url: final_url,
            content_type,
            body,
        })
    }
}

/// `base * 2^attempt`, saturating instead of overflowing.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

fn host_allowed(url: &Url, domain: &str) -> bool {
    match url.host_str() {
        Some(host) => {
            let host = host.to_ascii_lowercase();
            host == domain || host.ends_with(&format!(".{domain}"))
        }
        None => false,
    }
}
