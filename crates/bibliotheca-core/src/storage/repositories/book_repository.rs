use std::sync::MutexGuard;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{BookId, BookMetadata, BookRecord, StoredFile};

use super::{Repository, normalize_keyword};

const BOOK_COLUMNS: &str = "id, title, authors, contributor, publisher, description, subjects,
    date, languages, isbn, extra, file_id, file_name, file_size, cover, cover_small,
    active, path, keywords, created_at, updated_at";

pub trait BookRepository: Repository<Entity = BookRecord, Id = BookId> {
    /// Records ordered newest first; `active` filters published/new books.
    fn list(&self, active: Option<bool>, limit: usize, offset: usize) -> Result<Vec<BookRecord>>;
    fn count(&self, active: Option<bool>) -> Result<usize>;
    /// Number of active records whose keywords contain every given token
    /// (case-insensitive). Empty tokens are ignored; no tokens count 0.
    fn count_matching_keywords(&self, tokens: &[String]) -> Result<usize>;
    fn set_published(&self, id: &BookId, path: &str) -> Result<bool>;
}

pub struct SqliteBookRepository<'a> {
    conn: MutexGuard<'a, Connection>,
}

impl<'a> SqliteBookRepository<'a> {
    pub fn new(conn: MutexGuard<'a, Connection>) -> Self {
        Self { conn }
    }

    fn row_to_record(row: &Row) -> rusqlite::Result<BookRecord> {
        let file = match row.get::<_, Option<String>>(11)? {
            Some(file_id) => Some(StoredFile {
                id: parse_uuid(11, &file_id)?,
                name: row.get::<_, Option<String>>(12)?.unwrap_or_default(),
                size_bytes: row.get::<_, Option<i64>>(13)?.unwrap_or_default().max(0) as u64,
            }),
            None => None,
        };

        Ok(BookRecord {
            id: parse_uuid(0, &row.get::<_, String>(0)?)?,
            metadata: BookMetadata {
                title: row.get(1)?,
                authors: json_column(row, 2)?,
                contributor: row.get(3)?,
                publisher: row.get(4)?,
                description: row.get(5)?,
                subjects: json_column(row, 6)?,
                date: row.get(7)?,
                languages: json_column(row, 8)?,
                isbn: row.get(9)?,
                extra: json_column(row, 10)?,
            },
            file,
            cover: row.get(14)?,
            cover_small: row.get(15)?,
            active: row.get(16)?,
            path: row.get(17)?,
            keywords: json_column(row, 18)?,
            created_at: parse_time(19, &row.get::<_, String>(19)?)?,
            updated_at: parse_time(20, &row.get::<_, String>(20)?)?,
        })
    }

    fn replace_keywords(&self, record: &BookRecord) -> Result<()> {
        let id = record.id.to_string();
        self.conn
            .execute("DELETE FROM book_keywords WHERE book_id = ?1", params![id])?;
        let mut insert = self
            .conn
            .prepare("INSERT OR IGNORE INTO book_keywords (book_id, keyword) VALUES (?1, ?2)")?;
        for keyword in record.keywords.iter().filter_map(|k| normalize_keyword(k)) {
            insert.execute(params![id, keyword])?;
        }
        Ok(())
    }
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parse_uuid(idx: usize, value: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| conversion_error(idx, e))
}

fn parse_time(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn json_column<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e| conversion_error(idx, e))
}

fn active_filter(active: Option<bool>) -> &'static str {
    match active {
        Some(true) => "WHERE active = 1",
        Some(false) => "WHERE active = 0",
        None => "",
    }
}

impl Repository for SqliteBookRepository<'_> {
    type Entity = BookRecord;
    type Id = BookId;

    fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?1"),
                params![id.to_string()],
                Self::row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    fn save(&self, record: &Self::Entity) -> Result<()> {
        let metadata = &record.metadata;
        let authors_json = serde_json::to_string(&metadata.authors)?;
        let subjects_json = serde_json::to_string(&metadata.subjects)?;
        let languages_json = serde_json::to_string(&metadata.languages)?;
        let extra_json = serde_json::to_string(&metadata.extra)?;
        let keywords_json = serde_json::to_string(&record.keywords)?;

        let tx = self.conn.unchecked_transaction()?;
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO books ({BOOK_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                         ?16, ?17, ?18, ?19, ?20, ?21)"
            ),
            params![
                record.id.to_string(),
                metadata.title,
                authors_json,
                metadata.contributor,
                metadata.publisher,
                metadata.description,
                subjects_json,
                metadata.date,
                languages_json,
                metadata.isbn,
                extra_json,
                record.file.as_ref().map(|f| f.id.to_string()),
                record.file.as_ref().map(|f| f.name.as_str()),
                record.file.as_ref().map(|f| f.size_bytes as i64),
                record.cover,
                record.cover_small,
                record.active,
                record.path,
                keywords_json,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )?;
        self.replace_keywords(record)?;
        tx.commit()?;
        Ok(())
    }

    fn delete(&self, id: &Self::Id) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM books WHERE id = ?1", params![id.to_string()])?;
        Ok(deleted > 0)
    }
}

impl BookRepository for SqliteBookRepository<'_> {
    fn list(&self, active: Option<bool>, limit: usize, offset: usize) -> Result<Vec<BookRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BOOK_COLUMNS} FROM books {}
             ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
            active_filter(active)
        ))?;

        let rows = stmt
            .query_map(params![limit as i64, offset as i64], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn count(&self, active: Option<bool>) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM books {}", active_filter(active)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn count_matching_keywords(&self, tokens: &[String]) -> Result<usize> {
        let mut wanted: Vec<String> = tokens.iter().filter_map(|t| normalize_keyword(t)).collect();
        wanted.sort();
        wanted.dedup();
        if wanted.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; wanted.len()].join(", ");
        let sql = format!(
            "SELECT COUNT(*) FROM (
                SELECT k.book_id
                FROM book_keywords k
                JOIN books b ON b.id = k.book_id
                WHERE b.active = 1 AND k.keyword IN ({placeholders})
                GROUP BY k.book_id
                HAVING COUNT(DISTINCT k.keyword) = {}
            )",
            wanted.len()
        );
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(wanted.iter()), |row| row.get(0))?;
        Ok(count as usize)
    }

    fn set_published(&self, id: &BookId, path: &str) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE books SET active = 1, path = ?1, updated_at = ?2 WHERE id = ?3",
            params![path, Utc::now().to_rfc3339(), id.to_string()],
        )?;
        Ok(updated > 0)
    }
}
