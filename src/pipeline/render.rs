//! pdfium plumbing: bind the library, rasterise a page, read document info,
//! and build a one-page PDF around an image.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! Every entry point here moves its work onto the blocking pool so the Tokio
//! worker threads never stall while a page is drawn or a document written.
//!
//! ## Binding order
//!
//! 1. `PDFIUM_LIB_PATH`, when set, is the only place looked at.
//! 2. Otherwise a platform-named library in the working directory.
//! 3. Otherwise the system library search path.

use crate::error::ImgkitError;
use crate::output::{PageSize, PdfInfo};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Bind to a pdfium shared library.
pub fn bind_pdfium() -> Result<Pdfium, ImgkitError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => {
            debug!("Binding pdfium from PDFIUM_LIB_PATH={}", path);
            Pdfium::bind_to_library(&path)
        }
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| ImgkitError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// PDF page size for an image printed at `resolution` pixels per inch.
pub fn page_size_points(width_px: u32, height_px: u32, resolution: f32) -> PageSize {
    let dpi = if resolution.is_finite() && resolution > 0.0 {
        resolution
    } else {
        72.0
    };
    PageSize {
        width: width_px as f32 * 72.0 / dpi,
        height: height_px as f32 * 72.0 / dpi,
    }
}

fn open_error(path: &Path, password: Option<&str>, e: PdfiumError) -> ImgkitError {
    match e {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            if password.is_some() {
                ImgkitError::WrongPassword {
                    path: path.to_path_buf(),
                }
            } else {
                ImgkitError::PasswordRequired {
                    path: path.to_path_buf(),
                }
            }
        }
        other => ImgkitError::CorruptPdf {
            path: path.to_path_buf(),
            detail: format!("{:?}", other),
        },
    }
}

// ── Rasterise ────────────────────────────────────────────────────────────

/// Render one page (1-indexed) at `zoom` × 72 DPI.
pub async fn render_page(
    pdf_path: &Path,
    page: usize,
    zoom: f32,
    password: Option<String>,
) -> Result<DynamicImage, ImgkitError> {
    let path = pdf_path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        render_page_blocking(&path, page, zoom, password.as_deref())
    })
    .await
    .map_err(|e| ImgkitError::Internal(format!("Render task panicked: {}", e)))?
}

fn render_page_blocking(
    pdf_path: &Path,
    page: usize,
    zoom: f32,
    password: Option<&str>,
) -> Result<DynamicImage, ImgkitError> {
    if !zoom.is_finite() || zoom <= 0.0 {
        return Err(ImgkitError::InvalidConfig(format!(
            "Zoom must be a positive number, got {zoom}"
        )));
    }

    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| open_error(pdf_path, password, e))?;

    let pages = document.pages();
    let total = pages.len() as usize;
    info!("PDF loaded: {} pages", total);

    if total == 0 {
        return Err(ImgkitError::EmptyPdf {
            path: pdf_path.to_path_buf(),
        });
    }
    if page == 0 || page > total {
        return Err(ImgkitError::PageOutOfRange { page, total });
    }

    let pdf_page = pages
        .iter()
        .nth(page - 1)
        .ok_or(ImgkitError::PageOutOfRange { page, total })?;

    let render_config = PdfRenderConfig::new().scale_page_by_factor(zoom);
    let image = pdf_page
        .render_with_config(&render_config)
        .map_err(|e| ImgkitError::RasterisationFailed {
            page,
            detail: format!("{:?}", e),
        })?
        .as_image();

    debug!(
        "Rendered page {} at zoom {} → {}x{} px",
        page,
        zoom,
        image.width(),
        image.height()
    );
    Ok(image)
}

// ── Inspect ──────────────────────────────────────────────────────────────

/// Read page count, version, page sizes and the common metadata tags.
pub async fn inspect(pdf_path: &Path, password: Option<String>) -> Result<PdfInfo, ImgkitError> {
    let path = pdf_path.to_path_buf();
    tokio::task::spawn_blocking(move || inspect_blocking(&path, password.as_deref()))
        .await
        .map_err(|e| ImgkitError::Internal(format!("Inspect task panicked: {}", e)))?
}

fn inspect_blocking(pdf_path: &Path, password: Option<&str>) -> Result<PdfInfo, ImgkitError> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| open_error(pdf_path, password, e))?;

    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata
            .get(tag)
            .map(|t| t.value().trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let pages: Vec<PageSize> = document
        .pages()
        .iter()
        .map(|p| PageSize {
            width: p.width().value,
            height: p.height().value,
        })
        .collect();

    Ok(PdfInfo {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        page_count: pages.len(),
        pdf_version: format!("{:?}", document.version()),
        pages,
    })
}

// ── Create ───────────────────────────────────────────────────────────────

/// Build a single-page PDF whose page is exactly covered by `image`.
pub async fn image_to_pdf_bytes(
    image: DynamicImage,
    resolution: f32,
) -> Result<Vec<u8>, ImgkitError> {
    tokio::task::spawn_blocking(move || image_to_pdf_blocking(&image, resolution))
        .await
        .map_err(|e| ImgkitError::Internal(format!("PDF task panicked: {}", e)))?
}

fn image_to_pdf_blocking(image: &DynamicImage, resolution: f32) -> Result<Vec<u8>, ImgkitError> {
    let write_err = |e: PdfiumError| ImgkitError::PdfWriteFailed(format!("{:?}", e));

    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    let size = page_size_points(rgb.width(), rgb.height(), resolution);
    let (w, h) = (PdfPoints::new(size.width), PdfPoints::new(size.height));

    let pdfium = bind_pdfium()?;
    let mut document = pdfium.create_new_pdf().map_err(write_err)?;
    {
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::Custom(w, h))
            .map_err(write_err)?;
        page.objects_mut()
            .create_image_object(PdfPoints::ZERO, PdfPoints::ZERO, &rgb, Some(w), Some(h))
            .map_err(write_err)?;
    }

    let bytes = document.save_to_bytes().map_err(write_err)?;
    debug!(
        "Built {:.1}x{:.1}pt PDF page from {}x{} px image ({} bytes)",
        size.width,
        size.height,
        rgb.width(),
        rgb.height(),
        bytes.len()
    );
    Ok(bytes)
}

/// Default file name for a rendered page: `<stem>-p<page>.<extension>`.
pub fn default_page_filename(pdf_path: &Path, page: usize, extension: &str) -> PathBuf {
    let stem = pdf_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("page");
    PathBuf::from(format!("{stem}-p{page}.{extension}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_at_100_dpi() {
        let size = page_size_points(1000, 500, 100.0);
        assert!((size.width - 720.0).abs() < 1e-3);
        assert!((size.height - 360.0).abs() < 1e-3);
    }

    #[test]
    fn page_size_at_72_dpi_is_identity() {
        let size = page_size_points(612, 792, 72.0);
        assert_eq!((size.width, size.height), (612.0, 792.0));
    }

    #[test]
    fn bad_resolution_falls_back_to_72() {
        let size = page_size_points(100, 100, 0.0);
        assert_eq!(size.width, 100.0);
    }

    #[test]
    fn default_filename_uses_stem() {
        assert_eq!(
            default_page_filename(Path::new("/a/report.pdf"), 3, "jpg"),
            PathBuf::from("report-p3.jpg")
        );
    }
}
