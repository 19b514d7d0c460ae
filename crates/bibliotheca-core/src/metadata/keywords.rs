use crate::models::BookMetadata;

/// Keywords stored with a record and used for duplicate matching.
///
/// Title, each author and the publisher are split on single spaces; subjects
/// are appended whole. Tokens are neither lower-cased nor deduplicated, and a
/// doubled space yields an empty token. Empty fields contribute nothing.
pub fn derive_keywords(metadata: &BookMetadata) -> Vec<String> {
    keyword_tokens(
        &metadata.title,
        &metadata.authors,
        metadata.publisher.as_deref(),
        &metadata.subjects,
    )
}

/// [`derive_keywords`] over loose parts, for transient candidates that are not
/// stored records.
pub fn keyword_tokens(
    title: &str,
    authors: &[String],
    publisher: Option<&str>,
    subjects: &[String],
) -> Vec<String> {
    let mut keywords = split_words(title);
    for author in authors {
        keywords.extend(split_words(author));
    }
    keywords.extend(split_words(publisher.unwrap_or_default()));
    keywords.extend(subjects.iter().cloned());
    keywords
}

fn split_words(s: &str) -> Vec<String> {
    if s.is_empty() {
        return Vec::new();
    }
    s.split(' ').map(str::to_string).collect()
}
