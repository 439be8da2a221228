//! Result types returned by the collage entry points.

use crate::error::SourceError;
use crate::grid::GridShape;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A finished collage: the raster plus a report of what went where.
#[derive(Debug, Clone)]
pub struct CollageOutput {
    /// The composited canvas (RGBA, fully opaque).
    pub image: DynamicImage,
    /// The grid that was actually used (after auto-solving and orientation).
    pub grid: GridShape,
    pub report: CollageReport,
}

/// Serialisable description of a collage build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollageReport {
    /// One entry per grid cell, row-major.
    pub cells: Vec<CellResult>,
    pub stats: CollageStats,
}

impl CollageReport {
    /// Sources that were skipped, with the reason.
    pub fn unavailable(&self) -> impl Iterator<Item = &SourceError> {
        self.cells.iter().filter_map(|c| match &c.status {
            CellStatus::Unavailable { error } => Some(error),
            _ => None,
        })
    }
}

/// Outcome for a single grid cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellResult {
    /// 0-indexed position in row-major order.
    pub index: usize,
    pub row: u32,
    pub col: u32,
    /// The source assigned to this cell, if any.
    pub source: Option<String>,
    pub status: CellStatus,
}

/// What happened in a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CellStatus {
    /// An image was pasted with its top-left corner at `(x, y)`.
    Placed { x: u32, y: u32, width: u32, height: u32 },
    /// The source could not be loaded; the cell shows the background.
    Unavailable { error: SourceError },
    /// No source was assigned to this cell.
    Empty,
}

/// Counters for a collage build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollageStats {
    pub total_sources: usize,
    pub placed: usize,
    pub skipped: usize,
    pub empty_cells: usize,
    /// Sources past the grid capacity that were never assigned a cell.
    pub ignored_sources: usize,
    pub cell_width: u32,
    pub cell_height: u32,
    pub duration_ms: u64,
}

// ── Single-image operations ──────────────────────────────────────────────

/// A file written by one of the single-image operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub bytes: u64,
}

/// Files written by [`crate::convert::transparency_file`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransparencyOutput {
    pub translucent: WrittenFile,
    pub flattened: Option<WrittenFile>,
}

// ── PDF inspection ───────────────────────────────────────────────────────

/// Document-level facts about a PDF, read without rendering any page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PdfInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
    /// Page sizes in PDF points (1/72 inch), in document order.
    pub pages: Vec<PageSize>,
}

/// Page dimensions in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// Pixel size a render at `zoom` × 72 DPI produces (rounded).
    pub fn pixels_at(&self, zoom: f32) -> (u32, u32) {
        (
            (self.width * zoom).round().max(1.0) as u32,
            (self.height * zoom).round().max(1.0) as u32,
        )
    }
}
