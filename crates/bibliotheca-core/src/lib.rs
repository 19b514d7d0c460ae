pub mod config;
pub mod container;
pub mod covers;
pub mod duplicates;
pub mod error;
pub mod library;
pub mod metadata;
pub mod models;
pub mod paths;
pub mod storage;

#[cfg(test)]
mod testing;

pub use config::AppConfig;
pub use error::{LibraryError, Result};
pub use models::*;

pub use container::{Container, EpubContainer};
pub use covers::{CoverDeriver, Covers, ImageCovers, NoCovers};
pub use duplicates::{DuplicateCandidate, DuplicateFinder};
pub use library::{Library, Upload};
pub use metadata::{Extractor, assemble_metadata, derive_keywords};
pub use paths::valid_file_name;

pub use storage::CatalogStore;
pub use storage::database::{Catalog, ConnectionPool, open_database, open_in_memory, parse_book_id};

pub use storage::repositories::{
    BookRepository, FileRepository, Repository, SqliteBookRepository, SqliteFileRepository,
};
