use std::io::{Read, Seek};

use tracing::{debug, info};

use super::fields::{self, MetadataKey};
use crate::container::{Container, EpubContainer};
use crate::covers::CoverDeriver;
use crate::error::Result;
use crate::models::{BookMetadata, BookRecord, StoredFile};
use crate::storage::CatalogStore;

/// Turn every readable field of an open container into normalized metadata.
///
/// Fields that fail to read are skipped; the result is whatever could be
/// gathered. Identifier attributes that cannot be read count as "no scheme".
pub fn assemble_metadata<C: Container + ?Sized>(container: &C) -> BookMetadata {
    let mut metadata = BookMetadata::default();

    for name in container.metadata_fields() {
        let values = match container.metadata(&name) {
            Ok(values) => values,
            Err(e) => {
                debug!(field = %name, error = %e, "skipping unreadable metadata field");
                continue;
            }
        };

        match MetadataKey::from_name(&name) {
            MetadataKey::Creator => metadata.authors = fields::parse_authors(&values),
            MetadataKey::Description => {
                metadata.description = non_empty(fields::parse_description(&values));
            }
            MetadataKey::Subject => metadata.subjects = fields::parse_subjects(&values),
            MetadataKey::Date => metadata.date = non_empty(fields::parse_date(&values)),
            MetadataKey::Language => metadata.languages = values,
            MetadataKey::Title => metadata.title = fields::parse_joined(&values),
            MetadataKey::Contributor => {
                metadata.contributor = non_empty(fields::parse_joined(&values));
            }
            MetadataKey::Publisher => {
                metadata.publisher = non_empty(fields::parse_joined(&values));
            }
            MetadataKey::Identifier => {
                let attrs = container.metadata_attrs(&name).unwrap_or_else(|e| {
                    debug!(field = %name, error = %e, "identifier attributes unavailable");
                    Vec::new()
                });
                metadata.isbn = fields::parse_isbn(&values, &attrs);
            }
            MetadataKey::Other(key) => {
                metadata.extra.insert(key, fields::parse_joined(&values));
            }
        }
    }

    metadata
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

/// Builds catalog records from uploaded e-books and hands them to a store.
pub struct Extractor<'a, S: CatalogStore + ?Sized, D: CoverDeriver> {
    store: &'a S,
    covers: &'a D,
}

impl<'a, S: CatalogStore + ?Sized, D: CoverDeriver> Extractor<'a, S, D> {
    pub fn new(store: &'a S, covers: &'a D) -> Self {
        Self { store, covers }
    }

    /// Open `reader` as an EPUB and store a new record for `file`.
    ///
    /// Fails only when the container cannot be opened or the store rejects
    /// the record; a rejected record leaves no cover files behind. The reader
    /// is dropped before this returns.
    pub fn extract<R: Read + Seek>(&self, file: &StoredFile, reader: R) -> Result<String> {
        let mut container = EpubContainer::open(reader)?;
        self.extract_from(&mut container, file)
    }

    /// Same as [`Extractor::extract`] over an already open container.
    pub fn extract_from<C: Container + ?Sized>(
        &self,
        container: &mut C,
        file: &StoredFile,
    ) -> Result<String> {
        let metadata = assemble_metadata(container);
        let covers = self.covers.derive(container, &metadata.title);

        let mut record = BookRecord::from_metadata(metadata);
        record.file = Some(file.clone());
        record.cover = covers.full_path();
        record.cover_small = covers.thumbnail_path();

        if let Err(e) = self.store.insert_book(&record) {
            covers.discard();
            return Err(e);
        }
        info!(
            id = %record.id,
            title = %record.metadata.title,
            file = %file.name,
            "book extracted"
        );
        Ok(record.metadata.title)
    }
}
