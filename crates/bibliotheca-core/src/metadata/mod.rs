//! Metadata pipeline: raw container fields → normalized [`BookMetadata`] → keywords.
//!
//! [`BookMetadata`]: crate::models::BookMetadata

pub mod clean;
pub mod extract;
pub mod fields;
pub mod keywords;

pub use clean::clean;
pub use extract::{Extractor, assemble_metadata};
pub use fields::MetadataKey;
pub use keywords::{derive_keywords, keyword_tokens};
