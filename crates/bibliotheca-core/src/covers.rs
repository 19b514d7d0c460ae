use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use tracing::{debug, warn};

use crate::config::CoverConfig;
use crate::container::Container;
use crate::error::Result;
use crate::paths::valid_file_name;

/// Storage paths of a derived cover pair. Empty strings mean "no cover".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Covers {
    pub full: String,
    pub thumbnail: String,
}

impl Covers {
    pub fn full_path(&self) -> Option<String> {
        (!self.full.is_empty()).then(|| self.full.clone())
    }

    pub fn thumbnail_path(&self) -> Option<String> {
        (!self.thumbnail.is_empty()).then(|| self.thumbnail.clone())
    }

    /// Delete the written files, e.g. when the record that owns them was
    /// never stored.
    pub fn discard(&self) {
        for path in [&self.full, &self.thumbnail] {
            if path.is_empty() {
                continue;
            }
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path, error = %e, "could not remove cover"),
            }
        }
    }
}

/// Produces a full-size cover and a thumbnail from an open container.
/// Never fails: problems are logged and yield empty paths.
pub trait CoverDeriver {
    fn derive<C: Container + ?Sized>(&self, container: &mut C, title: &str) -> Covers;
}

/// Skips cover derivation entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCovers;

impl CoverDeriver for NoCovers {
    fn derive<C: Container + ?Sized>(&self, _container: &mut C, _title: &str) -> Covers {
        Covers::default()
    }
}

/// Writes JPEG covers named after the book title under `dir`.
#[derive(Debug, Clone)]
pub struct ImageCovers {
    dir: PathBuf,
    config: CoverConfig,
}

impl ImageCovers {
    pub fn new(dir: impl Into<PathBuf>, config: CoverConfig) -> Self {
        Self {
            dir: dir.into(),
            config,
        }
    }

    fn write(&self, img: &DynamicImage, title: &str) -> Result<Covers> {
        let full = self.dir.join(valid_file_name(&self.dir, title, ".jpg"));
        save_jpeg(&scale_to_width(img, self.config.width), &full, self.config.quality)?;

        let thumbnail = self.dir.join(valid_file_name(&self.dir, title, "_small.jpg"));
        let small = scale_to_width(img, self.config.thumbnail_width);
        if let Err(e) = save_jpeg(&small, &thumbnail, self.config.quality) {
            let _ = fs::remove_file(&full);
            return Err(e);
        }

        Ok(Covers {
            full: full.to_string_lossy().to_string(),
            thumbnail: thumbnail.to_string_lossy().to_string(),
        })
    }
}

impl CoverDeriver for ImageCovers {
    fn derive<C: Container + ?Sized>(&self, container: &mut C, title: &str) -> Covers {
        let Some(bytes) = container.cover_image() else {
            debug!(title, "no cover image in container");
            return Covers::default();
        };

        let derived = image::load_from_memory(&bytes)
            .map_err(Into::into)
            .and_then(|img| self.write(&img, title));

        match derived {
            Ok(covers) => covers,
            Err(e) => {
                warn!(title, error = %e, "cover derivation failed");
                Covers::default()
            }
        }
    }
}

/// Resize to `width`, keeping the aspect ratio. Smaller images are enlarged.
fn scale_to_width(img: &DynamicImage, width: u32) -> DynamicImage {
    let width = width.max(1);
    let height = (u64::from(img.height()) * u64::from(width) / u64::from(img.width().max(1))).max(1);
    img.resize_exact(width, height.min(u64::from(u32::MAX)) as u32, FilterType::Triangle)
}

fn save_jpeg(img: &DynamicImage, path: &Path, quality: u8) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(File::create(path)?);
    let encoder = JpegEncoder::new_with_quality(writer, quality.clamp(1, 100));
    img.to_rgb8().write_with_encoder(encoder)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeContainer, png_bytes};
    use tempfile::TempDir;

    fn covers(dir: &Path) -> ImageCovers {
        ImageCovers::new(dir, CoverConfig::default())
    }

    #[test]
    fn test_derives_full_and_thumbnail() {
        let dir = TempDir::new().unwrap();
        let mut container = FakeContainer {
            cover: Some(png_bytes(600, 900)),
            ..Default::default()
        };

        let result = covers(dir.path()).derive(&mut container, "Sample");
        assert!(result.full.ends_with("S/Sample.jpg"));
        assert!(result.thumbnail.ends_with("S/Sample_small.jpg"));

        let full = image::open(&result.full).unwrap();
        assert_eq!((full.width(), full.height()), (300, 450));
        let small = image::open(&result.thumbnail).unwrap();
        assert_eq!((small.width(), small.height()), (60, 90));
    }

    #[test]
    fn test_same_title_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let deriver = covers(dir.path());
        let mut container = FakeContainer {
            cover: Some(png_bytes(30, 30)),
            ..Default::default()
        };

        let first = deriver.derive(&mut container, "Twin");
        let second = deriver.derive(&mut container, "Twin");
        assert_ne!(first.full, second.full);
        assert!(second.full.ends_with("T/Twin_0.jpg"));
    }

    #[test]
    fn test_missing_cover_gives_empty_paths() {
        let dir = TempDir::new().unwrap();
        let result = covers(dir.path()).derive(&mut FakeContainer::default(), "None");
        assert_eq!(result, Covers::default());
        assert_eq!(result.full_path(), None);
    }

    #[test]
    fn test_undecodable_cover_gives_empty_paths() {
        let dir = TempDir::new().unwrap();
        let mut container = FakeContainer {
            cover: Some(b"not an image".to_vec()),
            ..Default::default()
        };
        assert_eq!(covers(dir.path()).derive(&mut container, "Bad"), Covers::default());
    }

    #[test]
    fn test_discard_removes_both_files() {
        let dir = TempDir::new().unwrap();
        let mut container = FakeContainer {
            cover: Some(png_bytes(30, 30)),
            ..Default::default()
        };

        let result = covers(dir.path()).derive(&mut container, "Gone");
        assert!(Path::new(&result.full).exists());
        result.discard();
        assert!(!Path::new(&result.full).exists());
        assert!(!Path::new(&result.thumbnail).exists());

        // Nothing to remove the second time, and empty paths are skipped.
        result.discard();
        Covers::default().discard();
    }

    #[test]
    fn test_no_covers() {
        let mut container = FakeContainer {
            cover: Some(png_bytes(10, 10)),
            ..Default::default()
        };
        assert_eq!(NoCovers.derive(&mut container, "x"), Covers::default());
    }
}
