//! E-book container access. The extractor only sees the [`Container`] trait;
//! [`EpubContainer`] is the production implementation.

mod epub;

use std::collections::BTreeMap;

pub use epub::EpubContainer;

use crate::error::Result;

/// Attributes attached to one raw metadata value, keyed by local name
/// (`opf:scheme` is stored as `scheme`).
pub type Attributes = BTreeMap<String, String>;

/// A metadata field as found in the container. `attrs` is index-aligned with
/// `values`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMetadataField {
    pub name: String,
    pub values: Vec<String>,
    pub attrs: Vec<Attributes>,
}

impl RawMetadataField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn push(&mut self, value: impl Into<String>, attrs: Attributes) {
        self.values.push(value.into());
        self.attrs.push(attrs);
    }
}

pub trait Container {
    /// Names of the metadata fields present, in document order of first appearance.
    fn metadata_fields(&self) -> Vec<String>;

    /// Raw values of one field.
    fn metadata(&self, name: &str) -> Result<Vec<String>>;

    /// Attributes of one field, aligned by index with [`Container::metadata`].
    fn metadata_attrs(&self, name: &str) -> Result<Vec<Attributes>>;

    /// Encoded cover image, if the container declares one.
    fn cover_image(&mut self) -> Option<Vec<u8>>;
}
