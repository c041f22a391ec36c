use std::sync::LazyLock;

use regex::Regex;
use scraper::Selector;
use url::Url;

use crate::parser::{first_own_text, ProductPage};

pub const UNKNOWN_MODEL: &str = "UNKNOWN";

static MODEL_CLASS_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[class*="model"]"#).unwrap());
static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static H1_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());

static PAREN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([A-Z]+-?\d+[A-Z0-9/-]*)\)").unwrap());
static BARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{2,}-?\d{3,}[A-Z0-9/-]*)\b").unwrap());
static SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^([A-Z]{2,}-?\d{3,}[A-Z0-9/-]*)$").unwrap());

/// Model number from (in order) a `*model*` class element, the title/h1, or the URL.
pub fn extract_model(page: &ProductPage) -> String {
    from_model_class(page)
        .or_else(|| from_headings(page))
        .or_else(|| from_url(&page.url))
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| UNKNOWN_MODEL.to_string())
}

fn from_model_class(page: &ProductPage) -> Option<String> {
    let text = first_own_text(&page.html, &MODEL_CLASS_SEL)?;
    // "Model #" and similar are labels, not values
    if text.to_lowercase().contains("model") || text.contains('#') {
        return None;
    }
    Some(text.to_string())
}

fn from_headings(page: &ProductPage) -> Option<String> {
    let title = first_own_text(&page.html, &TITLE_SEL).unwrap_or("");
    let heading = first_own_text(&page.html, &H1_SEL).unwrap_or("");
    model_in_text(&format!("{} {}", title, heading))
}

/// Prefer a parenthesized token, e.g. `36" Range (ICBW36)`.
fn model_in_text(text: &str) -> Option<String> {
    PAREN_RE
        .captures(text)
        .or_else(|| BARE_RE.captures(text))
        .map(|c| c[1].to_string())
}

fn from_url(url: &Url) -> Option<String> {
    let segment = url.path().trim_end_matches('/').rsplit('/').next()?;
    SEGMENT_RE
        .captures(segment)
        .map(|c| c[1].to_uppercase())
}
