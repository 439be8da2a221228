//! Cell geometry for a collage canvas.
//!
//! All arithmetic that can go negative is done in `i64` before it is
//! validated; a layout that leaves no room for its cells is a configuration
//! error, not a panic.

use crate::config::{CanvasSpec, CropSpec};
use crate::error::ImgkitError;
use crate::grid::GridShape;
use serde::{Deserialize, Serialize};

/// Largest canvas, in pixels, a collage may allocate (16384 × 16384).
pub const MAX_CANVAS_PIXELS: u64 = 1 << 28;

/// Resolved geometry for one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellLayout {
    pub grid: GridShape,
    pub cell_width: u32,
    pub cell_height: u32,
    /// Box images are fitted into; square when cropping is enabled.
    pub thumb_width: u32,
    pub thumb_height: u32,
    pub col_spacing: u32,
    pub row_spacing: u32,
    /// Top-left of the first cell; the grid is centred on the canvas.
    pub origin_x: u32,
    pub origin_y: u32,
}

impl CellLayout {
    pub fn compute(
        canvas: &CanvasSpec,
        grid: GridShape,
        crop: CropSpec,
    ) -> Result<Self, ImgkitError> {
        if grid.rows == 0 || grid.cols == 0 {
            return Err(ImgkitError::InvalidConfig(format!(
                "Grid dimensions must be ≥ 1, got {grid}"
            )));
        }

        let pixels = u64::from(canvas.width).checked_mul(u64::from(canvas.height));
        if pixels.is_none_or(|p| p > MAX_CANVAS_PIXELS) {
            return Err(ImgkitError::InvalidConfig(format!(
                "Canvas {}x{} exceeds the maximum of {} pixels",
                canvas.width, canvas.height, MAX_CANVAS_PIXELS
            )));
        }

        let usable_w = usable_extent(
            canvas.width,
            canvas.frame_margin,
            grid.cols,
            canvas.col_spacing,
        );
        if usable_w <= 0 {
            return Err(ImgkitError::InvalidConfig(format!(
                "Usable width is {usable_w}px: canvas width {} leaves no room for {} column(s) \
                 with margin {} and column spacing {}",
                canvas.width, grid.cols, canvas.frame_margin, canvas.col_spacing
            )));
        }
        let usable_h = usable_extent(
            canvas.height,
            canvas.frame_margin,
            grid.rows,
            canvas.row_spacing,
        );
        if usable_h <= 0 {
            return Err(ImgkitError::InvalidConfig(format!(
                "Usable height is {usable_h}px: canvas height {} leaves no room for {} row(s) \
                 with margin {} and row spacing {}",
                canvas.height, grid.rows, canvas.frame_margin, canvas.row_spacing
            )));
        }

        let cell_width = (usable_w / grid.cols as i64) as u32;
        let cell_height = (usable_h / grid.rows as i64) as u32;
        if cell_width == 0 || cell_height == 0 {
            return Err(ImgkitError::InvalidConfig(format!(
                "Cells would be {cell_width}x{cell_height}px: usable area {usable_w}x{usable_h} \
                 is too small for a {grid} grid"
            )));
        }

        let (thumb_width, thumb_height) = if crop.enabled {
            let side = cell_width.min(cell_height);
            (side, side)
        } else {
            (cell_width, cell_height)
        };

        let grid_w = span(grid.cols, cell_width, canvas.col_spacing);
        let grid_h = span(grid.rows, cell_height, canvas.row_spacing);
        let origin_x = ((canvas.width as i64 - grid_w).max(0) / 2) as u32;
        let origin_y = ((canvas.height as i64 - grid_h).max(0) / 2) as u32;

        Ok(Self {
            grid,
            cell_width,
            cell_height,
            thumb_width,
            thumb_height,
            col_spacing: canvas.col_spacing,
            row_spacing: canvas.row_spacing,
            origin_x,
            origin_y,
        })
    }

    /// Number of cells in the grid.
    pub fn cell_count(&self) -> usize {
        self.grid.capacity() as usize
    }

    /// `(row, col)` of a row-major cell index.
    pub fn position(&self, index: usize) -> (u32, u32) {
        let cols = self.grid.cols as usize;
        ((index / cols) as u32, (index % cols) as u32)
    }

    /// Top-left corner of a cell on the canvas.
    pub fn cell_origin(&self, index: usize) -> (u32, u32) {
        let (row, col) = self.position(index);
        (
            self.origin_x + col * (self.cell_width + self.col_spacing),
            self.origin_y + row * (self.cell_height + self.row_spacing),
        )
    }

    /// Offset that centres an image of the given size inside a cell.
    pub fn centering_offset(&self, img_width: u32, img_height: u32) -> (u32, u32) {
        (
            self.cell_width.saturating_sub(img_width) / 2,
            self.cell_height.saturating_sub(img_height) / 2,
        )
    }
}

fn usable_extent(total: u32, margin: u32, count: u32, spacing: u32) -> i64 {
    total as i64 - 2 * margin as i64 - (count as i64 - 1) * spacing as i64
}

fn span(count: u32, cell: u32, spacing: u32) -> i64 {
    count as i64 * cell as i64 + (count as i64 - 1) * spacing as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas(w: u32, h: u32, margin: u32, spacing: u32) -> CanvasSpec {
        CanvasSpec::new(w, h).with_spacing(margin, spacing, spacing)
    }

    fn compute(canvas: &CanvasSpec, rows: u32, cols: u32) -> Result<CellLayout, ImgkitError> {
        CellLayout::compute(canvas, GridShape::new(rows, cols), CropSpec::none())
    }

    fn compute_cropped(canvas: &CanvasSpec, rows: u32, cols: u32) -> CellLayout {
        CellLayout::compute(canvas, GridShape::new(rows, cols), CropSpec::square(0.5)).unwrap()
    }

    #[test]
    fn default_canvas_three_by_three() {
        let layout = compute(&CanvasSpec::default(), 3, 3).unwrap();
        // 1000 - 20 - 20 = 960 → 320 per cell
        assert_eq!(layout.cell_width, 320);
        assert_eq!(layout.cell_height, 320);
        // grid_w = 960 + 20 = 980 → origin 10
        assert_eq!((layout.origin_x, layout.origin_y), (10, 10));
        assert_eq!(layout.cell_origin(0), (10, 10));
        assert_eq!(layout.cell_origin(4), (340, 340));
        assert_eq!(layout.cell_origin(5), (670, 340));
    }

    #[test]
    fn floor_division_remainder_is_centred() {
        let layout = compute(&canvas(101, 50, 0, 0), 1, 2).unwrap();
        assert_eq!(layout.cell_width, 50);
        assert_eq!(layout.origin_x, 0);
        let layout = compute(&canvas(103, 50, 0, 0), 1, 2).unwrap();
        assert_eq!(layout.cell_width, 51);
        assert_eq!(layout.origin_x, 0);
        let layout = compute(&canvas(107, 50, 0, 0), 1, 3).unwrap();
        // 107 / 3 = 35, grid_w 105
        assert_eq!(layout.cell_width, 35);
        assert_eq!(layout.origin_x, 1);
    }

    #[test]
    fn crop_makes_square_thumb_box() {
        let layout = compute_cropped(&canvas(1000, 500, 0, 0), 1, 2);
        assert_eq!((layout.cell_width, layout.cell_height), (500, 500));
        let layout = compute_cropped(&canvas(900, 500, 0, 0), 1, 2);
        assert_eq!((layout.thumb_width, layout.thumb_height), (450, 450));
        assert_eq!(layout.cell_height, 500);
    }

    #[test]
    fn negative_usable_width_names_dimension() {
        let err = compute(&canvas(100, 1000, 60, 0), 1, 1).unwrap_err();
        match err {
            ImgkitError::InvalidConfig(msg) => assert!(msg.contains("width"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn negative_usable_height_names_dimension() {
        let err = compute(&canvas(1000, 100, 0, 50), 3, 1).unwrap_err();
        match err {
            ImgkitError::InvalidConfig(msg) => assert!(msg.contains("height"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn zero_sized_cell_rejected() {
        let err = compute(&canvas(3, 100, 0, 0), 1, 5).unwrap_err();
        assert!(matches!(err, ImgkitError::InvalidConfig(_)));
    }

    #[test]
    fn zero_grid_rejected() {
        let err = compute(&CanvasSpec::default(), 0, 2).unwrap_err();
        assert!(matches!(err, ImgkitError::InvalidConfig(_)));
    }

    #[test]
    fn oversized_canvas_rejected() {
        let err = compute(&CanvasSpec::new(u32::MAX, u32::MAX), 1, 1).unwrap_err();
        match err {
            ImgkitError::InvalidConfig(msg) => assert!(msg.contains("maximum"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(compute(&CanvasSpec::new(100_000, 100_000), 2, 2).is_err());
        assert!(compute(&CanvasSpec::new(16_384, 16_384), 2, 2).is_ok());
        assert!(compute(&CanvasSpec::new(16_385, 16_384), 2, 2).is_err());
    }

    #[test]
    fn centering_offset_halves_slack() {
        let layout = compute(&canvas(200, 100, 0, 0), 1, 1).unwrap();
        assert_eq!(layout.centering_offset(100, 100), (50, 0));
        assert_eq!(layout.centering_offset(199, 99), (0, 0));
    }

    #[test]
    fn row_major_positions() {
        let layout = compute(&CanvasSpec::default(), 2, 4).unwrap();
        assert_eq!(layout.position(0), (0, 0));
        assert_eq!(layout.position(3), (0, 3));
        assert_eq!(layout.position(4), (1, 0));
        assert_eq!(layout.cell_count(), 8);
    }
}
