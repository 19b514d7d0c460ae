mod book_repository;
mod file_repository;

pub use book_repository::{BookRepository, SqliteBookRepository};
pub use file_repository::{FileRepository, SqliteFileRepository};

use crate::error::Result;

pub trait Repository {
    type Entity;
    type Id;

    fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>>;
    fn save(&self, entity: &Self::Entity) -> Result<()>;
    fn delete(&self, id: &Self::Id) -> Result<bool>;
}

/// Form of a keyword in the lookup table: lower-cased, empty tokens dropped.
pub(crate) fn normalize_keyword(keyword: &str) -> Option<String> {
    (!keyword.is_empty()).then(|| keyword.to_lowercase())
}
