//! Parameter extraction for matched intent rules.
//!
//! Values come from literal sets first, then regex patterns, then defaults.
//! Exclusions either shadow a literal the query spells out in its excluded
//! form, or travel with the bound value as row filters.

mod extractor;
mod pattern;
pub mod validate;

pub use extractor::{Extraction, ParameterExtractor};
pub use pattern::compiled_pattern;
pub use validate::ParameterError;
