//! Style sheet handling for slide decks: top-level rule extraction and
//! rescoping of rules under the slide container.
//!
//! This is not a CSS parser. Only top-level constructs are recognised; the
//! bodies of `@media`, `@supports` and friends are kept verbatim and are not
//! rescoped.

mod rules;
mod scope;

pub use rules::{extract_rules, split_selectors, strip_comments};
pub use scope::{ScopedSheet, StyleRule, absolutize_urls, scope};

/// Selector of the element that receives the merged slides.
pub const SLIDES_SCOPE: &str = "#slides";
