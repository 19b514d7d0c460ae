pub mod database;
pub mod repositories;

use crate::error::Result;
use crate::models::BookRecord;

/// Write side of the catalog as seen by the metadata extractor.
pub trait CatalogStore {
    fn insert_book(&self, record: &BookRecord) -> Result<()>;
}
