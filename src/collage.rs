//! Collage entry points.
//!
//! ## Why one cell at a time?
//!
//! The canvas has exactly one writer. Sources are loaded and pasted in
//! row-major order so source `i` always lands in cell `i`, and a build with
//! the same inputs produces the same picture. The CPU-heavy part of each
//! cell (crop and Lanczos resize) still runs on the blocking pool so the
//! runtime keeps servicing downloads.
//!
//! ## Why don't bad sources fail the build?
//!
//! A collage of 24 photos should not be lost to one 404. The loader reports
//! an unavailable source as a value; the compositor logs it, leaves the cell
//! at the background colour and records the reason in the
//! [`CollageReport`].

use crate::config::{CanvasSpec, CollageConfig, CropSpec, GridChoice, OutputFormat};
use crate::error::ImgkitError;
use crate::grid::{self, GridShape};
use crate::output::{CellResult, CellStatus, CollageOutput, CollageReport, CollageStats};
use crate::pipeline::compose;
use crate::pipeline::crop::crop_to_square;
use crate::pipeline::input::{DefaultLoader, ImageLoader, LoadOutcome};
use crate::pipeline::layout::CellLayout;
use crate::pipeline::codec;
use crate::progress::ProgressCallback;
use image::DynamicImage;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Fills a canvas cell by cell from images fetched through `L`.
pub struct Compositor<L: ImageLoader> {
    loader: L,
    progress: Option<ProgressCallback>,
}

impl<L: ImageLoader> Compositor<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            progress: None,
        }
    }

    pub fn with_progress(mut self, callback: Option<ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Composite `sources` onto a fresh canvas using a fixed grid.
    ///
    /// # Errors
    /// Only configuration problems are fatal: an empty source list or a
    /// layout that leaves no room for the cells. Unloadable sources are
    /// reported per cell.
    pub async fn build<S: AsRef<str>>(
        &self,
        sources: &[S],
        canvas: &CanvasSpec,
        grid: GridShape,
        crop: CropSpec,
    ) -> Result<CollageOutput, ImgkitError> {
        let start = Instant::now();
        if sources.is_empty() {
            return Err(ImgkitError::InvalidConfig(
                "No image sources given; a collage needs at least one".into(),
            ));
        }

        let layout = CellLayout::compute(canvas, grid, crop)?;
        let capacity = layout.cell_count();
        let assigned = sources.len().min(capacity);
        let ignored = sources.len() - assigned;

        info!(
            "Building {}x{} collage: {} source(s) in a {} grid, cells {}x{}",
            canvas.width,
            canvas.height,
            sources.len(),
            grid,
            layout.cell_width,
            layout.cell_height
        );
        if ignored > 0 {
            warn!(
                "{} source(s) exceed the {} grid capacity and will be ignored",
                ignored, grid
            );
        }

        if let Some(ref cb) = self.progress {
            cb.on_collage_start(assigned);
        }

        let mut canvas_img = compose::new_canvas(canvas.width, canvas.height, canvas.background);
        let mut cells = Vec::with_capacity(capacity);
        let mut placed = 0usize;
        let mut skipped = 0usize;

        for index in 0..capacity {
            let (row, col) = layout.position(index);
            let Some(source) = sources.get(index).map(|s| s.as_ref()) else {
                cells.push(CellResult {
                    index,
                    row,
                    col,
                    source: None,
                    status: CellStatus::Empty,
                });
                continue;
            };

            let cell_no = index + 1;
            if let Some(ref cb) = self.progress {
                cb.on_cell_start(cell_no, assigned, source);
            }

            let status = match self.loader.load(source).await {
                LoadOutcome::Loaded(img) => {
                    let thumb = prepare_thumbnail(img, &layout, crop).await?;
                    let (cell_x, cell_y) = layout.cell_origin(index);
                    let (dx, dy) = layout.centering_offset(thumb.width(), thumb.height());
                    let (x, y) = (cell_x + dx, cell_y + dy);
                    compose::paste(&mut canvas_img, &thumb, x, y);
                    debug!(
                        "Cell {} ({},{}) ← '{}' at ({}, {}) {}x{}",
                        cell_no,
                        row,
                        col,
                        source,
                        x,
                        y,
                        thumb.width(),
                        thumb.height()
                    );

                    placed += 1;
                    if let Some(ref cb) = self.progress {
                        cb.on_cell_complete(cell_no, assigned);
                    }
                    CellStatus::Placed {
                        x,
                        y,
                        width: thumb.width(),
                        height: thumb.height(),
                    }
                }
                LoadOutcome::Unavailable(error) => {
                    warn!("Skipping cell {}: {}", cell_no, error);
                    skipped += 1;
                    if let Some(ref cb) = self.progress {
                        cb.on_cell_skipped(cell_no, assigned, &error.to_string());
                    }
                    CellStatus::Unavailable { error }
                }
            };

            cells.push(CellResult {
                index,
                row,
                col,
                source: Some(source.to_string()),
                status,
            });
        }

        if let Some(ref cb) = self.progress {
            cb.on_collage_complete(assigned, placed);
        }

        let stats = CollageStats {
            total_sources: sources.len(),
            placed,
            skipped,
            empty_cells: capacity - assigned,
            ignored_sources: ignored,
            cell_width: layout.cell_width,
            cell_height: layout.cell_height,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            "Collage complete: {}/{} placed, {} skipped, {}ms",
            placed, assigned, skipped, stats.duration_ms
        );

        Ok(CollageOutput {
            image: DynamicImage::ImageRgba8(canvas_img),
            grid,
            report: CollageReport { cells, stats },
        })
    }
}

/// Crop (if enabled) and fit one source into the layout's thumbnail box.
async fn prepare_thumbnail(
    img: DynamicImage,
    layout: &CellLayout,
    crop: CropSpec,
) -> Result<DynamicImage, ImgkitError> {
    let (max_w, max_h) = (layout.thumb_width, layout.thumb_height);
    tokio::task::spawn_blocking(move || {
        let img = if crop.enabled {
            crop_to_square(img, crop.gravity())
        } else {
            img
        };
        compose::fit_into(img, max_w, max_h)
    })
    .await
    .map_err(|e| ImgkitError::Internal(format!("Thumbnail task panicked: {}", e)))
}

/// The grid a config asks for, given the number of sources.
pub fn resolve_grid(source_count: usize, config: &CollageConfig) -> Result<GridShape, ImgkitError> {
    match config.grid {
        GridChoice::Fixed(shape) => Ok(shape),
        GridChoice::Auto => {
            let solution =
                grid::solve_for_canvas(source_count, config.canvas.width, config.canvas.height)
                    .ok_or_else(|| {
                        ImgkitError::InvalidConfig(
                            "No image sources given; a collage needs at least one".into(),
                        )
                    })?;
            debug!(
                "Auto grid for {} source(s): {} ({:?}, {} spare cell(s))",
                source_count, solution.shape, solution.formula, solution.error
            );
            Ok(solution.shape)
        }
    }
}

/// Output format for `path`: `.png` and `.jpg`/`.jpeg` decide, anything
/// else falls back to `config.output_format`.
pub fn output_format_for(path: &Path, config: &CollageConfig) -> OutputFormat {
    let quality = match config.output_format {
        OutputFormat::Jpeg { quality } => quality,
        OutputFormat::Png => OutputFormat::DEFAULT_JPEG_QUALITY,
    };
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("png") => OutputFormat::Png,
        Some(ext) if ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg") => {
            OutputFormat::Jpeg { quality }
        }
        _ => config.output_format,
    }
}

// ── Entry points ─────────────────────────────────────────────────────────

/// Build a collage with the default loader (files, URLs, `data:` URIs).
///
/// # Example
/// ```rust,no_run
/// use edgequake_imgkit::{build_collage, CollageConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = CollageConfig::builder().size(1200, 800).build()?;
/// let out = build_collage(&["a.jpg", "b.jpg", "c.jpg"], &config).await?;
/// println!("grid {} with {} placed", out.grid, out.report.stats.placed);
/// # Ok(())
/// # }
/// ```
pub async fn build_collage<S: AsRef<str>>(
    sources: &[S],
    config: &CollageConfig,
) -> Result<CollageOutput, ImgkitError> {
    let loader = DefaultLoader::new(config.loader)?;
    build_collage_with(loader, sources, config).await
}

/// Build a collage with a caller-supplied loader.
pub async fn build_collage_with<L: ImageLoader, S: AsRef<str>>(
    loader: L,
    sources: &[S],
    config: &CollageConfig,
) -> Result<CollageOutput, ImgkitError> {
    if sources.is_empty() {
        return Err(ImgkitError::InvalidConfig(
            "No image sources given; a collage needs at least one".into(),
        ));
    }
    let grid = resolve_grid(sources.len(), config)?;
    Compositor::new(loader)
        .with_progress(config.progress_callback.clone())
        .build(sources, &config.canvas, grid, config.crop)
        .await
}

/// Build a collage and write it to `output_path`.
///
/// The file is only created once the canvas is complete and encoded; a
/// configuration error or a failed encode leaves nothing on disk.
pub async fn build_collage_to_file<S: AsRef<str>>(
    sources: &[S],
    output_path: impl AsRef<Path>,
    config: &CollageConfig,
) -> Result<CollageReport, ImgkitError> {
    let loader = DefaultLoader::new(config.loader)?;
    build_collage_to_file_with(loader, sources, output_path, config).await
}

/// [`build_collage_to_file`] with a caller-supplied loader.
pub async fn build_collage_to_file_with<L: ImageLoader, S: AsRef<str>>(
    loader: L,
    sources: &[S],
    output_path: impl AsRef<Path>,
    config: &CollageConfig,
) -> Result<CollageReport, ImgkitError> {
    let output = build_collage_with(loader, sources, config).await?;
    save_collage(output, output_path, config).await
}

/// Encode a finished collage and persist it atomically to `output_path`.
///
/// The format follows [`output_format_for`]. Returns the cell report.
pub async fn save_collage(
    output: CollageOutput,
    output_path: impl AsRef<Path>,
    config: &CollageConfig,
) -> Result<CollageReport, ImgkitError> {
    let path = output_path.as_ref();
    let format = output_format_for(path, config);
    let size = codec::save(output.image, format, path).await?;
    info!(
        "Saved {} collage to {} ({} bytes)",
        format.name(),
        path.display(),
        size
    );
    Ok(output.report)
}

/// Synchronous wrapper around [`build_collage`].
///
/// Creates a temporary tokio runtime internally.
pub fn build_collage_sync<S: AsRef<str>>(
    sources: &[S],
    config: &CollageConfig,
) -> Result<CollageOutput, ImgkitError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ImgkitError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(build_collage(sources, config))
}
