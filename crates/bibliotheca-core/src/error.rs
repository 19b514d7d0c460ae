use thiserror::Error;

/// All errors that can occur in bibliotheca-core.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Book not found: {0}")]
    BookNotFound(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    /// The e-book container could not be opened at all.
    #[error("Cannot open book container: {0}")]
    Container(String),

    /// A single metadata field could not be read from an open container.
    #[error("Metadata field unavailable: {0}")]
    FieldUnavailable(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl LibraryError {
    pub fn container(err: impl std::fmt::Display) -> Self {
        Self::Container(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
