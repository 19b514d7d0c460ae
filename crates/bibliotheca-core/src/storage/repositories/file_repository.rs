use std::sync::MutexGuard;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{FileId, StoredFile};

/// Binary payload store for uploaded e-books.
pub trait FileRepository {
    fn store(&self, name: &str, data: &[u8]) -> Result<StoredFile>;
    fn load(&self, id: &FileId) -> Result<Option<Vec<u8>>>;
    fn size(&self, id: &FileId) -> Result<Option<u64>>;
    fn delete(&self, id: &FileId) -> Result<bool>;
}

pub struct SqliteFileRepository<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl<'a> SqliteFileRepository<'a> {
    pub fn new(conn: MutexGuard<'a, Connection>) -> Self {
        Self { conn }
    }
}

impl FileRepository for SqliteFileRepository<'_> {
    fn store(&self, name: &str, data: &[u8]) -> Result<StoredFile> {
        let file = StoredFile {
            id: Uuid::now_v7(),
            name: name.to_string(),
            size_bytes: data.len() as u64,
        };
        self.conn.execute(
            "INSERT INTO files (id, name, size, data, uploaded_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                file.id.to_string(),
                file.name,
                file.size_bytes as i64,
                data,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(file)
    }

    fn load(&self, id: &FileId) -> Result<Option<Vec<u8>>> {
        let data = self
            .conn
            .query_row(
                "SELECT data FROM files WHERE id = ?1",
                params![id.to_string()],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(data)
    }

    fn size(&self, id: &FileId) -> Result<Option<u64>> {
        let size = self
            .conn
            .query_row(
                "SELECT size FROM files WHERE id = ?1",
                params![id.to_string()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(size.map(|s| s.max(0) as u64))
    }

    fn delete(&self, id: &FileId) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM files WHERE id = ?1", params![id.to_string()])?;
        Ok(deleted > 0)
    }
}
