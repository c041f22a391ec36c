use std::sync::LazyLock;

use scraper::Selector;
use serde::Serialize;
use tracing::debug;

use crate::parser::ProductPage;

static ANCHOR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DocumentCategory {
    #[serde(rename = "Installation Guide")]
    InstallationGuide,
    #[serde(rename = "Specs & Manuals")]
    SpecsAndManuals,
    #[serde(rename = "Energy Guide")]
    EnergyGuide,
    Warranty,
    #[serde(rename = "User and Care Guide")]
    UserAndCareGuide,
    Documentation,
}

/// Keyword rules, first match wins. Anything unmatched is `Documentation`.
const RULES: &[(DocumentCategory, &[&str])] = &[
    (DocumentCategory::InstallationGuide, &["install"]),
    (
        DocumentCategory::SpecsAndManuals,
        &["spec", "specification", "dimension", "sheet", "design"],
    ),
    (DocumentCategory::EnergyGuide, &["energy", "star"]),
    (DocumentCategory::Warranty, &["warranty"]),
    (
        DocumentCategory::UserAndCareGuide,
        &["user", "care", "guide", "manual", "instruction", "use"],
    ),
];

impl DocumentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentCategory::InstallationGuide => "Installation Guide",
            DocumentCategory::SpecsAndManuals => "Specs & Manuals",
            DocumentCategory::EnergyGuide => "Energy Guide",
            DocumentCategory::Warranty => "Warranty",
            DocumentCategory::UserAndCareGuide => "User and Care Guide",
            DocumentCategory::Documentation => "Documentation",
        }
    }

    /// `search_text` is expected lowercase.
    pub fn classify(search_text: &str) -> Self {
        RULES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| search_text.contains(k)))
            .map(|(category, _)| *category)
            .unwrap_or(DocumentCategory::Documentation)
    }
}

/// Category → URLs, both in first-seen order. Never holds an empty list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Documents {
    entries: Vec<(DocumentCategory, Vec<String>)>,
}

impl Documents {
    /// Returns false when the URL was already listed under `category`.
    pub fn insert(&mut self, category: DocumentCategory, url: String) -> bool {
        match self.entries.iter_mut().find(|(c, _)| *c == category) {
            Some((_, urls)) => {
                if urls.contains(&url) {
                    return false;
                }
                urls.push(url);
            }
            None => self.entries.push((category, vec![url])),
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DocumentCategory, &[String])> {
        self.entries.iter().map(|(c, urls)| (*c, urls.as_slice()))
    }
}

impl IntoIterator for Documents {
    type Item = (DocumentCategory, Vec<String>);
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// An anchor that looks like it points at a PDF.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfLink {
    pub href: Option<String>,
    pub text: String,
}

/// Anchors whose href contains `.pdf` or whose text contains `(pdf)`, in document order.
pub fn find_pdf_candidates(page: &ProductPage) -> Vec<PdfLink> {
    page.html
        .select(&ANCHOR_SEL)
        .filter_map(|a| {
            let href = a.value().attr("href").map(str::to_string);
            let text = a.text().collect::<Vec<_>>().join(" ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

            let href_hit = href
                .as_deref()
                .is_some_and(|h| h.to_lowercase().contains(".pdf"));
            let text_hit = text.to_lowercase().contains("(pdf)");
            (href_hit || text_hit).then_some(PdfLink { href, text })
        })
        .collect()
}

/// Group candidate links by category, resolving and de-duplicating their URLs.
pub fn categorize_documents(candidates: &[PdfLink], page: &ProductPage) -> Documents {
    let mut documents = Documents::default();

    for link in candidates {
        let Some(href) = link.href.as_deref().map(str::trim).filter(|h| !h.is_empty()) else {
            debug!(text = %link.text, "Skipping PDF link without href");
            continue;
        };
        let Some(full_url) = page.resolve(href) else {
            debug!(href, "Skipping unresolvable PDF link");
            continue;
        };

        let search_text = format!("{} {}", link.text.to_lowercase(), href.to_lowercase());
        documents.insert(DocumentCategory::classify(&search_text), full_url.into());
    }

    documents
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn page(html: &str) -> ProductPage {
        let url = Url::parse("https://www.subzero-wolf.com/sub-zero/refrigeration/BI-36UFD/").unwrap();
        ProductPage::parse(url, html)
    }

    fn urls(docs: &Documents, category: DocumentCategory) -> Option<&[String]> {
        docs.iter().find(|(c, _)| *c == category).map(|(_, u)| u)
    }

    fn categorize(html: &str) -> Documents {
        let p = page(html);
        categorize_documents(&find_pdf_candidates(&p), &p)
    }

    #[test]
    fn installation_before_user_guide() {
        assert_eq!(
            DocumentCategory::classify("installation and user guide.pdf"),
            DocumentCategory::InstallationGuide
        );
    }

    #[test]
    fn rule_priority() {
        use DocumentCategory::*;
        let cases = [
            ("spec sheet /a.pdf", SpecsAndManuals),
            ("design guide /a.pdf", SpecsAndManuals),
            ("energy star label /a.pdf", EnergyGuide),
            ("limited warranty /a.pdf", Warranty),
            ("use & care guide /a.pdf", UserAndCareGuide),
            ("owner's manual /a.pdf", UserAndCareGuide),
            ("brochure /b.pdf", Documentation),
        ];
        for (text, expected) in cases {
            assert_eq!(DocumentCategory::classify(text), expected, "{text}");
        }
    }

    #[test]
    fn candidates_by_href_or_pdf_marker() {
        let p = page(
            r#"<a href="/docs/A.PDF">Spec</a>
               <a href="/download?id=7">Use &amp; Care Guide (PDF)</a>
               <a href="/docs/page.html">Not a document</a>
               <a>Orphan (pdf)</a>"#,
        );
        let candidates = find_pdf_candidates(&p);
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].href.as_deref(), Some("/docs/A.PDF"));
        assert_eq!(candidates[1].text, "Use & Care Guide (PDF)");
        assert_eq!(candidates[2].href, None);
    }

    #[test]
    fn nested_link_text_is_collected() {
        let p = page(r#"<a href="/d/x.pdf"><span>Installation</span>
                        <span>Guide</span></a>"#);
        assert_eq!(find_pdf_candidates(&p)[0].text, "Installation Guide");
    }

    #[test]
    fn duplicate_urls_listed_once() {
        let docs = categorize(
            r#"<a href="/docs/bi36-install.pdf">Install</a>
               <a href="https://www.subzero-wolf.com/docs/bi36-install.pdf">Installation Guide</a>"#,
        );
        assert_eq!(docs.len(), 1);
        assert_eq!(
            urls(&docs, DocumentCategory::InstallationGuide).unwrap(),
            &["https://www.subzero-wolf.com/docs/bi36-install.pdf".to_string()]
        );
    }

    #[test]
    fn urls_keep_first_seen_order_and_case() {
        let docs = categorize(
            r#"<a href="/docs/B.pdf">Brochure</a>
               <a href="/docs/a.pdf">Flyer</a>
               <a href="/docs/b.pdf">Brochure</a>"#,
        );
        assert_eq!(
            urls(&docs, DocumentCategory::Documentation).unwrap(),
            &[
                "https://www.subzero-wolf.com/docs/B.pdf".to_string(),
                "https://www.subzero-wolf.com/docs/a.pdf".to_string(),
                "https://www.subzero-wolf.com/docs/b.pdf".to_string(),
            ]
        );
    }

    #[test]
    fn malformed_candidates_are_skipped() {
        let docs = categorize(
            r#"<a>Warranty (pdf)</a>
               <a href="  ">Care (pdf)</a>
               <a href="http://[bad/x.pdf">Broken</a>
               <a href="/docs/warranty.pdf">Warranty</a>"#,
        );
        assert_eq!(docs.len(), 1);
        assert_eq!(
            urls(&docs, DocumentCategory::Warranty).unwrap(),
            &["https://www.subzero-wolf.com/docs/warranty.pdf".to_string()]
        );
    }

    #[test]
    fn no_candidates_no_categories() {
        let docs = categorize("<a href='/about'>About</a>");
        assert!(docs.is_empty());
        assert_eq!(docs.iter().count(), 0);
    }

    #[test]
    fn insert_never_creates_empty_lists() {
        let mut docs = Documents::default();
        assert!(docs.insert(DocumentCategory::Warranty, "u".into()));
        assert!(!docs.insert(DocumentCategory::Warranty, "u".into()));
        assert!(docs.iter().all(|(_, urls)| !urls.is_empty()));
    }
}
