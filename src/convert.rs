//! Single-image operations: filters, transparency and PDF conversion.
//!
//! Each function reads one input, performs one transformation and writes one
//! result file (two for [`transparency_file`] when a flattened companion is
//! requested). Unlike collage sources, the input here is mandatory: a
//! missing or undecodable file is a fatal [`ImgkitError`].

use crate::config::{
    AdjustConfig, OutputFormat, PdfExportConfig, PdfRasterConfig, TransparencyConfig,
};
use crate::error::ImgkitError;
use crate::output::{PdfInfo, TransparencyOutput, WrittenFile};
use crate::pipeline::input::{self, DefaultLoader};
use crate::pipeline::{adjust, alpha, codec, render};
use image::DynamicImage;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Apply brightness and blur to one image.
///
/// The output format follows the extension of `output_path` (`.png`, else
/// JPEG at `config.jpeg_quality`).
pub async fn adjust_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &AdjustConfig,
) -> Result<WrittenFile, ImgkitError> {
    config.validate()?;
    let input_str = input_str.as_ref();
    let output_path = output_path.as_ref();
    let start = Instant::now();
    info!("Adjusting {}", input_str);

    let loader = DefaultLoader::new(config.loader)?;
    let img = input::load_required(&loader, input_str).await?;

    let settings = *config;
    let adjusted = tokio::task::spawn_blocking(move || adjust::adjust(&img, &settings))
        .await
        .map_err(|e| ImgkitError::Internal(format!("Filter task panicked: {}", e)))?;

    let format = OutputFormat::from_path(output_path, config.jpeg_quality);
    let written = save_image(adjusted, format, output_path).await?;
    info!(
        "Adjusted image written to {} in {}ms",
        output_path.display(),
        start.elapsed().as_millis()
    );
    Ok(written)
}

/// Reduce an image's opacity and write it as PNG.
///
/// `output_path` is always encoded as PNG, whatever its extension, because
/// that is the only supported format that keeps alpha. When
/// `config.flattened_output` is set, a second, opaque copy is blended onto
/// `config.background` and written there (format by extension).
pub async fn transparency_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &TransparencyConfig,
) -> Result<TransparencyOutput, ImgkitError> {
    let input_str = input_str.as_ref();
    let output_path = output_path.as_ref();
    if !config.opacity.is_finite() {
        return Err(ImgkitError::InvalidConfig(format!(
            "Opacity must be a number in [0, 1], got {}",
            config.opacity
        )));
    }
    info!("Applying opacity {} to {}", config.opacity, input_str);

    let loader = DefaultLoader::new(config.loader)?;
    let img = input::load_required(&loader, input_str).await?;

    let opacity = config.opacity;
    let background = config.background;
    let want_flat = config.flattened_output.is_some();
    let (translucent, flat) = tokio::task::spawn_blocking(move || {
        let translucent = alpha::with_opacity(&img, opacity);
        let flat = want_flat.then(|| alpha::flatten(&translucent, background));
        (translucent, flat)
    })
    .await
    .map_err(|e| ImgkitError::Internal(format!("Alpha task panicked: {}", e)))?;

    let translucent = save_image(
        DynamicImage::ImageRgba8(translucent),
        OutputFormat::Png,
        output_path,
    )
    .await?;

    let flattened = match (flat, config.flattened_output.as_deref()) {
        (Some(flat), Some(flat_path)) => {
            let format = OutputFormat::from_path(flat_path, config.jpeg_quality);
            Some(save_image(DynamicImage::ImageRgb8(flat), format, flat_path).await?)
        }
        _ => None,
    };

    Ok(TransparencyOutput {
        translucent,
        flattened,
    })
}

/// Wrap one image in a single-page PDF.
///
/// The page measures `pixels × 72 / resolution` points so the image prints at
/// `config.resolution` pixels per inch.
pub async fn image_to_pdf(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &PdfExportConfig,
) -> Result<WrittenFile, ImgkitError> {
    let input_str = input_str.as_ref();
    let output_path = output_path.as_ref();
    if !config.resolution.is_finite() || config.resolution <= 0.0 {
        return Err(ImgkitError::InvalidConfig(format!(
            "Resolution must be a positive number, got {}",
            config.resolution
        )));
    }
    info!("Converting {} to PDF at {} DPI", input_str, config.resolution);

    let loader = DefaultLoader::new(config.loader)?;
    let img = input::load_required(&loader, input_str).await?;
    let (width, height) = (img.width(), img.height());

    let bytes = render::image_to_pdf_bytes(img, config.resolution).await?;
    let size = bytes.len() as u64;
    codec::write(bytes, output_path).await?;
    info!("PDF written to {} ({} bytes)", output_path.display(), size);

    Ok(WrittenFile {
        path: output_path.to_path_buf(),
        format: "PDF".to_string(),
        width,
        height,
        bytes: size,
    })
}

/// Render one PDF page to an image file.
///
/// `input_str` may be a local path or an HTTP(S) URL; URLs are downloaded to
/// a temporary directory that is removed before this function returns.
pub async fn pdf_to_image(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &PdfRasterConfig,
) -> Result<WrittenFile, ImgkitError> {
    let input_str = input_str.as_ref();
    let output_path = output_path.as_ref();
    let start = Instant::now();
    info!(
        "Rendering page {} of {} at zoom {}",
        config.page, input_str, config.zoom
    );

    let resolved = input::resolve_pdf_input(input_str, config.download_timeout_secs).await?;
    let img = render::render_page(
        resolved.path(),
        config.page,
        config.zoom,
        config.password.clone(),
    )
    .await?;

    let format = OutputFormat::from_path(output_path, config.jpeg_quality);
    let written = save_image(img, format, output_path).await?;
    info!(
        "Page {} written to {} in {}ms",
        config.page,
        output_path.display(),
        start.elapsed().as_millis()
    );
    Ok(written)
}

/// Read PDF page count, version, page sizes and metadata without rendering.
///
/// URLs are downloaded first, giving up after `download_timeout_secs`.
pub async fn inspect_pdf(
    input_str: impl AsRef<str>,
    password: Option<&str>,
    download_timeout_secs: u64,
) -> Result<PdfInfo, ImgkitError> {
    let resolved = input::resolve_pdf_input(input_str.as_ref(), download_timeout_secs).await?;
    render::inspect(resolved.path(), password.map(str::to_string)).await
}

async fn save_image(
    img: DynamicImage,
    format: OutputFormat,
    path: &Path,
) -> Result<WrittenFile, ImgkitError> {
    let (width, height) = (img.width(), img.height());
    let bytes = codec::save(img, format, path).await?;
    Ok(WrittenFile {
        path: path.to_path_buf(),
        format: format.name().to_string(),
        width,
        height,
        bytes,
    })
}
