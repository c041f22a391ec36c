use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Brand {
    #[serde(rename = "Sub-Zero")]
    SubZero,
    Wolf,
    Cove,
    Unknown,
}

impl Brand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Brand::SubZero => "Sub-Zero",
            Brand::Wolf => "Wolf",
            Brand::Cove => "Cove",
            Brand::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Brand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// checked in order, first hit wins
const BRAND_PATHS: &[(&str, Brand)] = &[
    ("/sub-zero/", Brand::SubZero),
    ("/wolf/", Brand::Wolf),
    ("/cove/", Brand::Cove),
];

/// Brand from the URL path alone; page content is never consulted.
pub fn classify_brand(url: &str) -> Brand {
    BRAND_PATHS
        .iter()
        .find(|(path, _)| url.contains(path))
        .map(|(_, brand)| *brand)
        .unwrap_or(Brand::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brand_from_path() {
        assert_eq!(classify_brand("https://x/sub-zero/FOO-123"), Brand::SubZero);
        assert_eq!(classify_brand("https://x/wolf/BAR-456"), Brand::Wolf);
        assert_eq!(classify_brand("https://x/cove/BAZ-789"), Brand::Cove);
        assert_eq!(classify_brand("https://x/products/QUX-000"), Brand::Unknown);
    }

    #[test]
    fn sub_zero_wins_over_later_paths() {
        assert_eq!(
            classify_brand("https://x/sub-zero/wolf/cove/ABC-123"),
            Brand::SubZero
        );
        assert_eq!(classify_brand("https://x/cove/wolf/ABC-123"), Brand::Wolf);
    }

    #[test]
    fn needs_full_segment() {
        // "wolf" without both slashes is not a brand segment
        assert_eq!(classify_brand("https://x/wolfgang/ABC-123"), Brand::Unknown);
    }

    #[test]
    fn serializes_display_name() {
        assert_eq!(serde_json::to_string(&Brand::SubZero).unwrap(), "\"Sub-Zero\"");
        assert_eq!(Brand::Cove.to_string(), "Cove");
    }
}
