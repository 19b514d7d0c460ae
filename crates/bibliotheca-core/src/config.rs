use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LibraryError, Result};

/// Root application configuration, loaded from `~/.config/bibliotheca/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub core: CoreConfig,
    pub covers: CoverConfig,
    pub listing: ListingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub library_path: String,
}

/// Cover derivation settings. Widths are in pixels, quality is the JPEG quality (1-100).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverConfig {
    pub width: u32,
    pub thumbnail_width: u32,
    pub quality: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    pub page_size: usize,
    pub new_books_limit: usize,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for CoreConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("bibliotheca");

        Self {
            library_path: data_dir.to_string_lossy().to_string(),
        }
    }
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            width: 300,
            thumbnail_width: 60,
            quality: 60,
        }
    }
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            new_books_limit: 50,
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/bibliotheca/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("BIBLIOTHECA_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("bibliotheca")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    /// `BIBLIOTHECA_LIBRARY_PATH` overrides the configured library root.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        if let Ok(path) = std::env::var("BIBLIOTHECA_LIBRARY_PATH") {
            config.set_library_path(PathBuf::from(path));
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.covers.quality) {
            return Err(LibraryError::ConfigError(format!(
                "covers.quality must be between 1 and 100, got {}",
                self.covers.quality
            )));
        }
        if self.covers.width == 0 || self.covers.thumbnail_width == 0 {
            return Err(LibraryError::ConfigError(
                "cover widths must be positive".to_string(),
            ));
        }
        if self.listing.page_size == 0 {
            return Err(LibraryError::ConfigError(
                "listing.page_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn set_library_path(&mut self, path: PathBuf) {
        self.core.library_path = path.to_string_lossy().to_string();
    }

    // ─── Derived paths ─────────────────────────────────────

    /// Path to the SQLite catalog file.
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.core.library_path)
            .join("db")
            .join("bibliotheca.db")
    }

    /// Directory published books are copied into.
    pub fn books_dir(&self) -> PathBuf {
        PathBuf::from(&self.core.library_path).join("books")
    }

    pub fn covers_dir(&self) -> PathBuf {
        PathBuf::from(&self.core.library_path).join("covers")
    }
}
