//! Image codec: decode source bytes, encode rasters, persist results.
//!
//! Writes go through a [`tempfile::NamedTempFile`] created in the destination
//! directory and renamed over the target, so a failed encode or a crash
//! mid-write never leaves a truncated image behind.

use crate::config::OutputFormat;
use crate::error::ImgkitError;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageReader};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Decode an in-memory image, guessing the format from its magic bytes.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, image::ImageError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()
}

/// Encode a raster into `format`.
///
/// JPEG has no alpha channel: RGBA input is reduced to RGB by dropping alpha,
/// so flatten first (see [`crate::pipeline::alpha::flatten`]) when the
/// transparent areas matter.
pub fn encode(img: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>, ImgkitError> {
    let mut buf = Vec::new();
    let result = match format {
        OutputFormat::Jpeg { quality } => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
            DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)
        }
        OutputFormat::Png => {
            let encoder = PngEncoder::new(&mut buf);
            if img.color().has_alpha() {
                DynamicImage::ImageRgba8(img.to_rgba8()).write_with_encoder(encoder)
            } else {
                DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)
            }
        }
    };
    result.map_err(|e| ImgkitError::EncodeFailed {
        format: format.name().to_string(),
        detail: e.to_string(),
    })?;

    debug!(
        "Encoded {}x{} image → {} bytes {}",
        img.width(),
        img.height(),
        buf.len(),
        format.name()
    );
    Ok(buf)
}

/// Atomically write `bytes` to `path`, creating parent directories.
pub fn persist(bytes: &[u8], path: &Path) -> Result<(), ImgkitError> {
    let write_err = |source: std::io::Error| ImgkitError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_err)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Encode and persist on the blocking pool. Returns the encoded size.
pub async fn save(
    img: DynamicImage,
    format: OutputFormat,
    path: impl AsRef<Path>,
) -> Result<u64, ImgkitError> {
    let path: PathBuf = path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || {
        let bytes = encode(&img, format)?;
        persist(&bytes, &path)?;
        Ok(bytes.len() as u64)
    })
    .await
    .map_err(|e| ImgkitError::Internal(format!("Encode task panicked: {}", e)))?
}

/// [`persist`] on the blocking pool, for bytes produced elsewhere.
pub async fn write(bytes: Vec<u8>, path: impl AsRef<Path>) -> Result<(), ImgkitError> {
    let path = path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || persist(&bytes, &path))
        .await
        .map_err(|e| ImgkitError::Internal(format!("Write task panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    fn red_square() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 128])))
    }

    #[test]
    fn png_keeps_alpha() {
        let bytes = encode(&red_square(), OutputFormat::Png).expect("encode should succeed");
        assert_eq!(&bytes[1..4], b"PNG");
        let back = decode(&bytes).unwrap();
        assert_eq!(back.dimensions(), (10, 10));
        assert_eq!(back.to_rgba8().get_pixel(3, 3)[3], 128);
    }

    #[test]
    fn jpeg_drops_alpha() {
        let bytes = encode(&red_square(), OutputFormat::Jpeg { quality: 90 }).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let back = decode(&bytes).unwrap();
        assert!(!back.color().has_alpha());
        assert_eq!(back.dimensions(), (10, 10));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode(b"definitely not an image").is_err());
    }

    #[test]
    fn persist_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/out.bin");
        persist(b"hello", &path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
    }

    #[test]
    fn persist_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        persist(b"abc", &path).unwrap();
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn save_writes_decodable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let size = save(red_square(), OutputFormat::Png, &path).await.unwrap();
        assert!(size > 0);
        let img = image::open(&path).unwrap();
        assert_eq!(img.dimensions(), (10, 10));
    }
}
