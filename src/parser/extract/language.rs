use crate::parser::ProductPage;

const DEFAULT_LANGUAGE: &str = "en";

/// Primary subtag of `<html lang>`, else a language path segment, else `en`.
pub fn detect_language(page: &ProductPage) -> String {
    let lang = page
        .html
        .root_element()
        .value()
        .attr("lang")
        .map(str::trim)
        .unwrap_or("");
    if !lang.is_empty() {
        return lang.split('-').next().unwrap_or(lang).to_string();
    }

    let url = page.url.as_str();
    if url.contains("/es/") || url.contains("/spanish/") {
        return "es".to_string();
    }
    if url.contains("/fr/") || url.contains("/french/") {
        return "fr".to_string();
    }
    DEFAULT_LANGUAGE.to_string()
}
