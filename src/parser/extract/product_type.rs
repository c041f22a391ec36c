use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::Selector;

use crate::parser::{first_own_text, ProductPage};

pub const UNKNOWN_TYPE: &str = "Unknown";

static BREADCRUMB_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".breadcrumb").unwrap());
static HEADING_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1, h2").unwrap());

/// Appliance categories, matched as substrings in this order.
const PRODUCT_TYPES: &[&str] = &[
    "dishwasher",
    "refrigerator",
    "freezer",
    "wine",
    "range",
    "cooktop",
    "oven",
    "microwave",
    "ventilation",
    "hood",
    "warming drawer",
    "ice",
    "beverage",
    "grill",
    "module",
    "coffee",
];

pub fn classify_product_type(page: &ProductPage) -> String {
    if let Some(crumb) = from_breadcrumbs(page) {
        return crumb;
    }
    first_own_text(&page.html, &HEADING_SEL)
        .and_then(type_in_heading)
        .unwrap_or_else(|| UNKNOWN_TYPE.to_string())
}

/// The last breadcrumb is the page itself, so the category is the one before it.
fn from_breadcrumbs(page: &ProductPage) -> Option<String> {
    let mut seen = HashSet::new();
    let crumbs: Vec<&str> = page
        .html
        .select(&BREADCRUMB_SEL)
        .flat_map(|el| el.descendants())
        .filter(|node| seen.insert(node.id()))
        .filter_map(|node| node.value().as_text())
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();

    if crumbs.len() < 2 {
        return None;
    }
    Some(crumbs[crumbs.len() - 2].to_string())
}

fn type_in_heading(heading: &str) -> Option<String> {
    let lower = heading.to_lowercase();
    PRODUCT_TYPES
        .iter()
        .find(|t| lower.contains(*t))
        .map(|t| title_case(t))
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn product_type(html: &str) -> String {
        let url = Url::parse("https://www.subzero-wolf.com/wolf/ranges/DF48450/").unwrap();
        classify_product_type(&ProductPage::parse(url, html))
    }

    #[test]
    fn second_to_last_breadcrumb() {
        let html = r#"<nav class="breadcrumb">
            <ol>
              <li><a href="/">Home</a></li>
              <li><a href="/wolf/">Wolf</a></li>
              <li><a href="/wolf/ranges/"> Dual Fuel Ranges </a></li>
              <li>48" Dual Fuel Range</li>
            </ol>
          </nav>
          <h1>48" Dual Fuel Range</h1>"#;
        assert_eq!(product_type(html), "Dual Fuel Ranges");
    }

    #[test]
    fn nested_breadcrumb_containers_are_not_double_counted() {
        let html = r#"<div class="breadcrumb"><ul class="breadcrumb">
            <li>Home</li><li>Cooktops</li><li>CT36G</li></ul></div>"#;
        assert_eq!(product_type(html), "Cooktops");
    }

    #[test]
    fn single_breadcrumb_falls_back_to_heading() {
        let html = r#"<ol class="breadcrumb"><li>Home</li></ol><h1>Wolf Convection Steam Oven</h1>"#;
        assert_eq!(product_type(html), "Oven");
    }

    #[test]
    fn keyword_order_decides() {
        // refrigerator sits before wine in the vocabulary
        assert_eq!(product_type("<h1>Wine Refrigerator</h1>"), "Refrigerator");
        assert_eq!(product_type("<h2>Integrated Warming Drawer</h2>"), "Warming Drawer");
    }

    #[test]
    fn h2_used_when_first_in_document() {
        assert_eq!(product_type("<h2>Outdoor Grill</h2><h1>Something else</h1>"), "Grill");
    }

    #[test]
    fn unknown_without_signals() {
        assert_eq!(product_type("<p>nothing here</p>"), UNKNOWN_TYPE);
        assert_eq!(product_type("<h1>Accessories</h1>"), UNKNOWN_TYPE);
    }

    #[test]
    fn title_cases_each_word() {
        assert_eq!(title_case("warming drawer"), "Warming Drawer");
        assert_eq!(title_case("ice"), "Ice");
    }
}
