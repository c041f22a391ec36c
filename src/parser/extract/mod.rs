//! Per-field heuristics over a parsed product page.
//!
//! Every function here is infallible; a missing signal falls back to a default.

pub mod brand;
pub mod documents;
pub mod language;
pub mod model;
pub mod product_type;
pub mod thumbnail;

pub use brand::{classify_brand, Brand};
pub use documents::{categorize_documents, find_pdf_candidates, Documents};
pub use language::detect_language;
pub use model::{extract_model, UNKNOWN_MODEL};
pub use product_type::classify_product_type;
pub use thumbnail::resolve_thumbnail;
