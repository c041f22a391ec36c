pub mod extract;

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::feed::OutputRecord;
use extract::{Brand, Documents};

/// Site title stamped on every record.
pub const SOURCE: &str = "Sub-Zero, Wolf, and Cove | Kitchen Appliances that Inspire";
/// Constant `domain` field of every record.
pub const DOMAIN: &str = "subzero-wolf.com";

static BASE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("base[href]").unwrap());

/// One fetched product page: its final URL and parsed document.
pub struct ProductPage {
    pub url: Url,
    pub html: Html,
    base: Url,
}

impl ProductPage {
    pub fn parse(url: Url, body: &str) -> Self {
        let html = Html::parse_document(body);
        let base = html
            .select(&BASE_SEL)
            .find_map(|el| el.value().attr("href"))
            .and_then(|href| url.join(href.trim()).ok())
            .unwrap_or_else(|| url.clone());
        Self { url, html, base }
    }

    /// Resolve a possibly relative reference against the page (or its `<base href>`).
    pub fn resolve(&self, href: &str) -> Option<Url> {
        self.base.join(href.trim()).ok()
    }
}

/// Everything extracted from one product page.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub model: String,
    pub brand: Brand,
    pub product_type: String,
    pub language: String,
    pub thumbnail: String,
    pub documents: Documents,
    pub source: String,
}

impl ExtractionResult {
    /// One record per document category, or a single record with no files.
    pub fn into_records(self, url: &str) -> Vec<OutputRecord> {
        let base = OutputRecord {
            model: self.model,
            brand: self.brand,
            product: self.product_type,
            product_lang: self.language,
            file_urls: Vec::new(),
            doc_type: String::new(),
            url: url.to_string(),
            thumb: self.thumbnail,
            source: self.source,
            domain: DOMAIN.to_string(),
        };

        if self.documents.is_empty() {
            return vec![base];
        }

        self.documents
            .into_iter()
            .map(|(category, urls)| OutputRecord {
                file_urls: urls,
                doc_type: category.as_str().to_string(),
                ..base.clone()
            })
            .collect()
    }
}

/// Run every heuristic over the page. `None` when no model number was found.
pub fn extract(page: &ProductPage) -> Option<ExtractionResult> {
    let brand = extract::classify_brand(page.url.as_str());
    let model = extract::extract_model(page);
    if model == extract::UNKNOWN_MODEL {
        return None;
    }

    let product_type = extract::classify_product_type(page);
    let language = extract::detect_language(page);
    let thumbnail = extract::resolve_thumbnail(page);
    let candidates = extract::find_pdf_candidates(page);
    let documents = extract::categorize_documents(&candidates, page);
    debug!(
        url = %page.url,
        model = %model,
        candidates = candidates.len(),
        categories = documents.len(),
        "Extracted product page"
    );

    Some(ExtractionResult {
        model,
        brand,
        product_type,
        language,
        thumbnail,
        documents,
        source: SOURCE.to_string(),
    })
}

pub fn process_page(page: &ProductPage) -> Vec<OutputRecord> {
    extract(page)
        .map(|result| result.into_records(page.url.as_str()))
        .unwrap_or_default()
}

/// Direct (non-descendant) text children of an element, trimmed, blanks dropped.
pub(crate) fn own_texts<'a>(el: ElementRef<'a>) -> impl Iterator<Item = &'a str> {
    el.children()
        .filter_map(|n| n.value().as_text())
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
}

/// First non-blank direct text among all elements matching `sel`.
pub(crate) fn first_own_text<'a>(html: &'a Html, sel: &Selector) -> Option<&'a str> {
    html.select(sel).flat_map(own_texts).next()
}

// ── Tests ──
