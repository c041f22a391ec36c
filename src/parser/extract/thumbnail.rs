use std::sync::LazyLock;

use scraper::Selector;

use crate::parser::ProductPage;

static MAIN_IMAGE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".product-image img[src], .main-image img[src]").unwrap());
static PRODUCT_IMG_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"img[class*="product"][src]"#).unwrap());
static ANY_IMG_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img[src]").unwrap());

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".png", ".jpeg"];
const SKIP_MARKERS: &[&str] = &["logo", "icon"];

/// Absolute URL of the product image, or an empty string.
pub fn resolve_thumbnail(page: &ProductPage) -> String {
    first_src(page, &MAIN_IMAGE_SEL, |_| true)
        .or_else(|| first_src(page, &PRODUCT_IMG_SEL, |_| true))
        .or_else(|| first_src(page, &ANY_IMG_SEL, looks_like_photo))
        .and_then(|src| page.resolve(src))
        .map(String::from)
        .unwrap_or_default()
}

fn first_src<'a>(
    page: &'a ProductPage,
    sel: &Selector,
    accept: impl Fn(&str) -> bool,
) -> Option<&'a str> {
    page.html
        .select(sel)
        .filter_map(|img| img.value().attr("src"))
        .map(str::trim)
        .find(|src| !src.is_empty() && accept(src))
}

fn looks_like_photo(src: &str) -> bool {
    let lower = src.to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.contains(ext))
        && !SKIP_MARKERS.iter().any(|m| lower.contains(m))
}
