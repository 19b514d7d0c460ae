mod connection;
mod migrations;
mod schema;

pub use connection::ConnectionPool;
pub use migrations::{Migration, get_applied_versions, run_migrations};
pub use schema::SCHEMA_VERSION;

use std::io::{Cursor, Read};
use std::path::Path;

use uuid::Uuid;

use crate::error::{LibraryError, Result};
use crate::models::{BookId, BookRecord, BookUpdate, FileId, StoredFile};

use super::CatalogStore;
use super::repositories::{
    BookRepository, FileRepository, Repository, SqliteBookRepository, SqliteFileRepository,
};

pub fn open_database(path: &Path) -> Result<ConnectionPool> {
    let pool = ConnectionPool::open(path)?;
    {
        let conn = pool.get_connection();
        migrations::run_migrations(&conn)?;
    }
    Ok(pool)
}

pub fn open_in_memory() -> Result<ConnectionPool> {
    let pool = ConnectionPool::open_in_memory()?;
    {
        let conn = pool.get_connection();
        migrations::run_migrations(&conn)?;
    }
    Ok(pool)
}

/// Parse a user-supplied book id; malformed ids are reported as not found.
pub fn parse_book_id(id: &str) -> Result<BookId> {
    Uuid::parse_str(id.trim()).map_err(|_| LibraryError::BookNotFound(id.to_string()))
}

/// Book records plus the binary file store, backed by one SQLite database.
pub struct Catalog {
    pool: ConnectionPool,
}

impl Catalog {
    pub fn open(path: &Path) -> Result<Self> {
        let pool = open_database(path)?;
        Ok(Self { pool })
    }

    pub fn open_in_memory() -> Result<Self> {
        let pool = open_in_memory()?;
        Ok(Self { pool })
    }

    pub fn path(&self) -> Option<&str> {
        self.pool.path()
    }

    fn books(&self) -> SqliteBookRepository<'_> {
        SqliteBookRepository::new(self.pool.get_connection())
    }

    fn files(&self) -> SqliteFileRepository<'_> {
        SqliteFileRepository::new(self.pool.get_connection())
    }

    // ─── Books ─────────────────────────────────────────────

    pub fn save_book(&self, record: &BookRecord) -> Result<()> {
        self.books().save(record)
    }

    pub fn get_book(&self, id: &BookId) -> Result<BookRecord> {
        self.books()
            .find_by_id(id)?
            .ok_or_else(|| LibraryError::BookNotFound(id.to_string()))
    }

    pub fn list_books(
        &self,
        active: Option<bool>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<BookRecord>> {
        self.books().list(active, limit, offset)
    }

    pub fn count_books(&self, active: Option<bool>) -> Result<usize> {
        self.books().count(active)
    }

    /// Merge an edit into the stored record, recompute keywords and persist.
    pub fn update_book(&self, id: &BookId, update: &BookUpdate) -> Result<BookRecord> {
        let repo = self.books();
        let mut record = repo
            .find_by_id(id)?
            .ok_or_else(|| LibraryError::BookNotFound(id.to_string()))?;
        record.apply_update(update);
        repo.save(&record)?;
        Ok(record)
    }

    pub fn set_published(&self, id: &BookId, path: &str) -> Result<()> {
        if !self.books().set_published(id, path)? {
            return Err(LibraryError::BookNotFound(id.to_string()));
        }
        Ok(())
    }

    pub fn remove_book(&self, id: &BookId) -> Result<()> {
        if !self.books().delete(id)? {
            return Err(LibraryError::BookNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Active records whose keywords contain every token, case-insensitively.
    pub fn count_keyword_matches(&self, tokens: &[String]) -> Result<usize> {
        self.books().count_matching_keywords(tokens)
    }

    // ─── Files ─────────────────────────────────────────────

    pub fn store_file(&self, name: &str, mut reader: impl Read) -> Result<StoredFile> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        self.files().store(name, &data)
    }

    pub fn open_file(&self, id: &FileId) -> Result<Cursor<Vec<u8>>> {
        self.files()
            .load(id)?
            .map(Cursor::new)
            .ok_or_else(|| LibraryError::FileNotFound(id.to_string()))
    }

    pub fn file_size(&self, id: &FileId) -> Result<u64> {
        self.files()
            .size(id)?
            .ok_or_else(|| LibraryError::FileNotFound(id.to_string()))
    }

    pub fn delete_file(&self, id: &FileId) -> Result<()> {
        if !self.files().delete(id)? {
            return Err(LibraryError::FileNotFound(id.to_string()));
        }
        Ok(())
    }
}

impl CatalogStore for Catalog {
    fn insert_book(&self, record: &BookRecord) -> Result<()> {
        self.save_book(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn make_test_record(title: &str) -> BookRecord {
        let mut record = BookRecord::new(title);
        record.metadata.authors = vec!["Test Author".to_string()];
        record.metadata.subjects = vec!["Fiction".to_string()];
        record.refresh_keywords();
        record
    }

    #[test]
    fn test_open_in_memory() {
        let catalog = Catalog::open_in_memory().unwrap();
        assert_eq!(catalog.count_books(None).unwrap(), 0);
        assert!(catalog.path().is_none());
    }

    #[test]
    fn test_open_on_disk_creates_parent() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("db").join("catalog.db");
        let catalog = Catalog::open(&path).unwrap();
        catalog.insert_book(&make_test_record("Persisted")).unwrap();
        drop(catalog);

        let reopened = Catalog::open(&path).unwrap();
        assert_eq!(reopened.count_books(None).unwrap(), 1);
    }

    #[test]
    fn test_insert_and_get() {
        let catalog = Catalog::open_in_memory().unwrap();
        let record = make_test_record("Test Book");
        catalog.insert_book(&record).unwrap();

        let stored = catalog.get_book(&record.id).unwrap();
        assert_eq!(stored, record);
    }

    #[test]
    fn test_get_missing_book() {
        let catalog = Catalog::open_in_memory().unwrap();
        let err = catalog.get_book(&Uuid::now_v7()).unwrap_err();
        assert!(matches!(err, LibraryError::BookNotFound(_)));
    }

    #[test]
    fn test_list_books_paginated() {
        let catalog = Catalog::open_in_memory().unwrap();
        for title in ["Book A", "Book B", "Book C"] {
            catalog.insert_book(&make_test_record(title)).unwrap();
        }

        assert_eq!(catalog.list_books(None, 100, 0).unwrap().len(), 3);
        assert_eq!(catalog.list_books(None, 2, 0).unwrap().len(), 2);
        assert_eq!(catalog.list_books(None, 2, 2).unwrap().len(), 1);
        assert!(catalog.list_books(Some(true), 10, 0).unwrap().is_empty());
    }

    #[test]
    fn test_update_book_recomputes_keywords() {
        let catalog = Catalog::open_in_memory().unwrap();
        let record = make_test_record("Draft");
        catalog.insert_book(&record).unwrap();
        catalog.set_published(&record.id, "D/Draft.epub").unwrap();

        let updated = catalog
            .update_book(
                &record.id,
                &BookUpdate {
                    title: Some("Final Cut".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.keywords, vec!["Final", "Cut", "Test", "Author", "Fiction"]);
        assert!(updated.active);
        assert_eq!(catalog.count_keyword_matches(&["final".to_string()]).unwrap(), 1);
        assert_eq!(catalog.count_keyword_matches(&["Draft".to_string()]).unwrap(), 0);
    }

    #[test]
    fn test_remove_book() {
        let catalog = Catalog::open_in_memory().unwrap();
        let record = make_test_record("Gone");
        catalog.insert_book(&record).unwrap();

        catalog.remove_book(&record.id).unwrap();
        assert_eq!(catalog.count_books(None).unwrap(), 0);
        assert!(matches!(
            catalog.remove_book(&record.id),
            Err(LibraryError::BookNotFound(_))
        ));
    }

    #[test]
    fn test_file_store() {
        let catalog = Catalog::open_in_memory().unwrap();
        let file = catalog.store_file("a.epub", &b"payload"[..]).unwrap();
        assert_eq!(file.size_bytes, 7);
        assert_eq!(catalog.file_size(&file.id).unwrap(), 7);

        let mut data = Vec::new();
        catalog.open_file(&file.id).unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"payload");

        catalog.delete_file(&file.id).unwrap();
        assert!(matches!(
            catalog.open_file(&file.id),
            Err(LibraryError::FileNotFound(_))
        ));
        assert!(catalog.delete_file(&file.id).is_err());
    }

    #[test]
    fn test_parse_book_id() {
        let id = Uuid::now_v7();
        assert_eq!(parse_book_id(&format!(" {id} ")).unwrap(), id);
        assert!(matches!(
            parse_book_id("nope"),
            Err(LibraryError::BookNotFound(_))
        ));
    }
}
