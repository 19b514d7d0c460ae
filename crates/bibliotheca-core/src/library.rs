use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::AppConfig;
use crate::covers::ImageCovers;
use crate::duplicates::{DuplicateCandidate, DuplicateFinder};
use crate::error::{LibraryError, Result};
use crate::metadata::Extractor;
use crate::models::{BookId, BookRecord, BookUpdate};
use crate::paths::valid_file_name;
use crate::storage::database::Catalog;

/// Outcome of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub title: String,
}

/// The administrator's view of a library: catalog, published copies and covers
/// under one root directory.
pub struct Library {
    catalog: Catalog,
    config: AppConfig,
    covers: ImageCovers,
}

impl Library {
    pub fn open(config: AppConfig) -> Result<Self> {
        let catalog = Catalog::open(&config.database_path())?;
        Ok(Self::with_catalog(config, catalog))
    }

    pub fn with_catalog(config: AppConfig, catalog: Catalog) -> Self {
        let covers = ImageCovers::new(config.covers_dir(), config.covers.clone());
        Self {
            catalog,
            config,
            covers,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    // ─── Ingestion ─────────────────────────────────────────

    pub fn upload(&self, path: &Path) -> Result<Upload> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| LibraryError::ValidationError(format!("not a file: {}", path.display())))?;
        self.upload_reader(&file_name, File::open(path)?)
    }

    /// Store the raw bytes, then extract a new record from them. If extraction
    /// fails the stored bytes are removed again.
    pub fn upload_reader(&self, file_name: &str, reader: impl Read) -> Result<Upload> {
        let file = self.catalog.store_file(file_name, reader)?;
        let extracted = self
            .catalog
            .open_file(&file.id)
            .and_then(|stream| Extractor::new(&self.catalog, &self.covers).extract(&file, stream));

        match extracted {
            Ok(title) => Ok(Upload {
                file_name: file.name,
                title,
            }),
            Err(e) => {
                if let Err(cleanup) = self.catalog.delete_file(&file.id) {
                    warn!(file = %file.name, error = %cleanup, "could not remove rejected upload");
                }
                Err(e)
            }
        }
    }

    // ─── Queries ───────────────────────────────────────────

    pub fn get(&self, id: &BookId) -> Result<BookRecord> {
        self.catalog.get_book(id)
    }

    /// Published books, newest first. `limit` defaults to `listing.page_size`.
    pub fn list(&self, limit: Option<usize>, offset: usize) -> Result<Vec<BookRecord>> {
        let limit = limit.unwrap_or(self.config.listing.page_size);
        self.catalog.list_books(Some(true), limit, offset)
    }

    pub fn count_published(&self) -> Result<usize> {
        self.catalog.count_books(Some(true))
    }

    /// Unpublished books with their duplicate counts.
    pub fn new_books(&self) -> Result<Vec<DuplicateCandidate>> {
        DuplicateFinder::new(&self.catalog).new_books(self.config.listing.new_books_limit)
    }

    // ─── Administration ────────────────────────────────────

    pub fn edit(&self, id: &BookId, update: &BookUpdate) -> Result<BookRecord> {
        if update.is_empty() {
            return Err(LibraryError::ValidationError("nothing to update".to_string()));
        }
        let record = self.catalog.update_book(id, update)?;
        info!(id = %id, title = %record.metadata.title, "book updated");
        Ok(record)
    }

    /// Copy the stored file into the books directory and make the record
    /// public. Returns the copy's path relative to the books directory.
    pub fn publish(&self, id: &BookId) -> Result<String> {
        let record = self.catalog.get_book(id)?;
        if let (true, Some(path)) = (record.active, &record.path) {
            return Ok(path.clone());
        }
        let file = record
            .file
            .as_ref()
            .ok_or_else(|| LibraryError::ValidationError(format!("book {id} has no file")))?;

        let books_dir = self.config.books_dir();
        let relative = valid_file_name(&books_dir, &record.metadata.title, ".epub");
        let target = books_dir.join(&relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        copy_new_file(self.catalog.open_file(&file.id)?, &target)?;

        if let Err(e) = self.catalog.set_published(id, &relative) {
            remove_if_exists(&target);
            return Err(e);
        }
        info!(id = %id, path = %relative, "book published");
        Ok(relative)
    }

    /// Remove the record together with its covers, published copy and file.
    pub fn delete(&self, id: &BookId) -> Result<()> {
        let record = self.catalog.get_book(id)?;

        for cover in [&record.cover, &record.cover_small].into_iter().flatten() {
            remove_if_exists(Path::new(cover));
        }
        if let Some(path) = &record.path {
            remove_if_exists(&self.published_path(path));
        }
        if let Some(file) = &record.file {
            match self.catalog.delete_file(&file.id) {
                Ok(()) | Err(LibraryError::FileNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        self.catalog.remove_book(id)?;
        info!(id = %id, title = %record.metadata.title, "book deleted");
        Ok(())
    }

    pub fn published_path(&self, relative: &str) -> PathBuf {
        self.config.books_dir().join(relative)
    }
}

/// Write `source` to `target`; a failed copy leaves no partial file behind.
fn copy_new_file(mut source: impl Read, target: &Path) -> Result<()> {
    let copied = File::create(target).and_then(|mut out| io::copy(&mut source, &mut out));
    if let Err(e) = copied {
        remove_if_exists(target);
        return Err(e.into());
    }
    Ok(())
}

fn remove_if_exists(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "could not remove file"),
    }
}
