//! Cover image materialization.
//!
//! Covers are decoded, scaled down so the long edge fits the configured
//! maximum, re-encoded as JPEG and written into the covers directory under
//! a generated name. Writes go to a temporary file first and are renamed
//! into place, so a finished cover path never points at a partial file.

use crate::config::CoverConfig;
use crate::error::{ImportError, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// MIME type of every stored cover.
pub const COVER_MIME_TYPE: &str = "image/jpeg";

/// A cover written to storage.
#[derive(Debug, Clone)]
pub struct ImageArtifact {
    /// Decoded (and possibly scaled) image.
    pub image: DynamicImage,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Encoded size on disk.
    pub byte_size: u64,
    /// Final location of the file.
    pub path: PathBuf,
    /// MIME type of the encoded file.
    pub mime_type: &'static str,
}

/// Decodes cover bytes and stores them as normalized JPEG files.
#[derive(Debug, Clone)]
pub struct CoverMaterializer {
    dir: PathBuf,
    max_dimension: u32,
    quality: u8,
}

impl CoverMaterializer {
    /// Create a materializer writing into `dir`.
    pub fn new(dir: impl Into<PathBuf>, max_dimension: u32, quality: u8) -> Self {
        Self {
            dir: dir.into(),
            max_dimension: max_dimension.max(1),
            quality: quality.clamp(1, 100),
        }
    }

    /// Create a materializer from the `[cover]` configuration section.
    pub fn from_config(config: &CoverConfig) -> Self {
        Self::new(&config.covers_dir, config.max_dimension, config.quality)
    }

    /// Target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Decode, scale, encode and atomically store a cover.
    pub fn materialize(&self, raw: &[u8]) -> Result<ImageArtifact> {
        let img = ImageReader::new(Cursor::new(raw))
            .with_guessed_format()
            .map_err(|e| ImportError::Decode(format!("Failed to read image: {}", e)))?
            .decode()
            .map_err(|e| ImportError::Decode(format!("Failed to decode image: {}", e)))?;

        let (width, height) = scaled_dimensions(img.width(), img.height(), self.max_dimension);
        let img = if (width, height) != (img.width(), img.height()) {
            img.resize_exact(width, height, image::imageops::FilterType::Lanczos3)
        } else {
            img
        };
        // JPEG has no alpha channel.
        let rgb = img.to_rgb8();

        let mut jpeg_data = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut jpeg_data, self.quality);
        encoder
            .encode_image(&rgb)
            .map_err(|e| ImportError::Decode(format!("Failed to encode JPEG: {}", e)))?;
        let img = DynamicImage::ImageRgb8(rgb);

        let path = self.write_atomic(&jpeg_data)?;
        tracing::debug!(
            path = %path.display(),
            width,
            height,
            bytes = jpeg_data.len(),
            "Stored cover"
        );

        Ok(ImageArtifact {
            image: img,
            width,
            height,
            byte_size: jpeg_data.len() as u64,
            path,
            mime_type: COVER_MIME_TYPE,
        })
    }

    fn write_atomic(&self, data: &[u8]) -> Result<PathBuf> {
        let storage_err =
            |e: std::io::Error| ImportError::StorageWrite(format!("{}: {}", self.dir.display(), e));

        std::fs::create_dir_all(&self.dir).map_err(storage_err)?;

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(storage_err)?;
        tmp.write_all(data).map_err(storage_err)?;
        tmp.as_file().sync_all().map_err(storage_err)?;

        let path = self.dir.join(format!("{}.jpg", Uuid::new_v4()));
        tmp.persist(&path).map_err(|e| storage_err(e.error))?;
        Ok(path)
    }
}

/// Best-effort removal of a stored cover.
pub fn remove_cover(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed cover"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), "Failed to remove cover: {}", e),
    }
}

/// Scale `(width, height)` so the larger side is at most `max`.
///
/// Both sides use the same factor; neither drops below one pixel.
pub fn scaled_dimensions(width: u32, height: u32, max: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max || longest == 0 {
        return (width, height);
    }

    let scale = f64::from(max) / f64::from(longest);
    let fit = |side: u32| -> u32 {
        if side == longest {
            max
        } else {
            ((f64::from(side) * scale).round() as u32).clamp(1, max)
        }
    };
    (fit(width), fit(height))
}
