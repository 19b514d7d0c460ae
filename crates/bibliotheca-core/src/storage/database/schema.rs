use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: u32 = 1;

pub fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        ",
    )?;
    Ok(())
}

pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS files (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            size        INTEGER NOT NULL,
            data        BLOB NOT NULL,
            uploaded_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS books (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            authors     TEXT NOT NULL DEFAULT '[]',
            contributor TEXT,
            publisher   TEXT,
            description TEXT,
            subjects    TEXT NOT NULL DEFAULT '[]',
            date        TEXT,
            languages   TEXT NOT NULL DEFAULT '[]',
            isbn        TEXT,
            extra       TEXT NOT NULL DEFAULT '{}',
            file_id     TEXT,
            file_name   TEXT,
            file_size   INTEGER,
            cover       TEXT,
            cover_small TEXT,
            active      INTEGER NOT NULL DEFAULT 0,
            path        TEXT,
            keywords    TEXT NOT NULL DEFAULT '[]',
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        -- Lower-cased keywords, one row per distinct keyword and book.
        CREATE TABLE IF NOT EXISTS book_keywords (
            book_id TEXT NOT NULL REFERENCES books(id) ON DELETE CASCADE,
            keyword TEXT NOT NULL,
            PRIMARY KEY (book_id, keyword)
        );
        ",
    )?;
    Ok(())
}

pub fn create_indexes(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_books_active ON books(active);
        CREATE INDEX IF NOT EXISTS idx_books_isbn   ON books(isbn);
        CREATE INDEX IF NOT EXISTS idx_books_file   ON books(file_id);
        CREATE INDEX IF NOT EXISTS idx_book_keywords_keyword ON book_keywords(keyword);
        ",
    )?;
    Ok(())
}
