use serde::Serialize;

use crate::error::Result;
use crate::metadata::keyword_tokens;
use crate::models::BookRecord;
use crate::storage::database::Catalog;

/// A new (unpublished) book with the number of published books that look
/// like it, by title and by authors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateCandidate {
    pub book: BookRecord,
    pub title_matches: usize,
    pub author_matches: usize,
}

impl DuplicateCandidate {
    pub fn is_suspect(&self) -> bool {
        self.title_matches > 0 || self.author_matches > 0
    }
}

/// Flags new books whose title or author tokens all appear in the keywords of
/// an already published book.
#[derive(Clone, Copy)]
pub struct DuplicateFinder<'a> {
    catalog: &'a Catalog,
}

impl<'a> DuplicateFinder<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn title_matches(&self, title: &str) -> Result<usize> {
        self.catalog
            .count_keyword_matches(&keyword_tokens(title, &[], None, &[]))
    }

    pub fn author_matches(&self, authors: &[String]) -> Result<usize> {
        self.catalog
            .count_keyword_matches(&keyword_tokens("", authors, None, &[]))
    }

    pub fn check(&self, book: BookRecord) -> Result<DuplicateCandidate> {
        let title_matches = self.title_matches(&book.metadata.title)?;
        let author_matches = self.author_matches(&book.metadata.authors)?;
        Ok(DuplicateCandidate {
            book,
            title_matches,
            author_matches,
        })
    }

    /// The newest `limit` unpublished books, each with its match counts.
    pub fn new_books(&self, limit: usize) -> Result<Vec<DuplicateCandidate>> {
        self.catalog
            .list_books(Some(false), limit, 0)?
            .into_iter()
            .map(|book| self.check(book))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn published(catalog: &Catalog, title: &str, authors: &[&str]) {
        let mut record = BookRecord::new(title);
        record.metadata.authors = authors.iter().map(|a| a.to_string()).collect();
        record.refresh_keywords();
        record.active = true;
        catalog.save_book(&record).unwrap();
    }

    fn pending(catalog: &Catalog, title: &str, authors: &[&str]) -> BookRecord {
        let mut record = BookRecord::new(title);
        record.metadata.authors = authors.iter().map(|a| a.to_string()).collect();
        record.refresh_keywords();
        catalog.save_book(&record).unwrap();
        record
    }

    #[test]
    fn test_counts_title_and_author_matches() {
        let catalog = Catalog::open_in_memory().unwrap();
        published(&catalog, "The Old Man and the Sea", &["Ernest Hemingway"]);
        published(&catalog, "A Farewell to Arms", &["Ernest Hemingway"]);
        pending(&catalog, "the old man", &["Ernest Hemingway"]);

        let candidates = DuplicateFinder::new(&catalog).new_books(10).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title_matches, 1);
        assert_eq!(candidates[0].author_matches, 2);
        assert!(candidates[0].is_suspect());
    }

    #[test]
    fn test_partial_token_overlap_is_not_a_match() {
        let catalog = Catalog::open_in_memory().unwrap();
        published(&catalog, "Old Man", &["Jane Doe"]);
        let book = pending(&catalog, "Old Woman", &["John Doe"]);

        let candidate = DuplicateFinder::new(&catalog).check(book).unwrap();
        assert_eq!(candidate.title_matches, 0);
        assert_eq!(candidate.author_matches, 0);
        assert!(!candidate.is_suspect());
    }

    #[test]
    fn test_unpublished_books_are_not_counted() {
        let catalog = Catalog::open_in_memory().unwrap();
        pending(&catalog, "Twin", &[]);
        pending(&catalog, "Twin", &[]);

        let candidates = DuplicateFinder::new(&catalog).new_books(10).unwrap();
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|c| c.title_matches == 0));
    }

    #[test]
    fn test_empty_tokens_count_zero() {
        let catalog = Catalog::open_in_memory().unwrap();
        published(&catalog, "Anything", &[]);
        let finder = DuplicateFinder::new(&catalog);

        assert_eq!(finder.title_matches("").unwrap(), 0);
        assert_eq!(finder.author_matches(&[]).unwrap(), 0);
    }

    #[test]
    fn test_limit_applies_to_new_books() {
        let catalog = Catalog::open_in_memory().unwrap();
        for title in ["One", "Two", "Three"] {
            pending(&catalog, title, &[]);
        }
        assert_eq!(DuplicateFinder::new(&catalog).new_books(2).unwrap().len(), 2);
    }
}
