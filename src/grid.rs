//! Grid solving: pick a near-square rows × cols shape for N images.
//!
//! Two shape families are considered for every `x`:
//!
//! ```text
//! Square          (x, x)      capacity x²
//! SquarePlusTwo   (x, x + 2)  capacity x(x + 2)
//! ```
//!
//! The search runs `x = 1 ..= floor(√n) + 1`, checking `Square` before
//! `SquarePlusTwo` at each `x`, and keeps a candidate only when its error
//! (empty cells) is strictly smaller than the best so far. That order decides
//! between equal-error shapes, so it must not be reshuffled.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An immutable grid shape. Both dimensions are at least 1 once validated by
/// the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    pub rows: u32,
    pub cols: u32,
}

impl GridShape {
    pub const fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    /// Number of cells in the grid.
    pub fn capacity(&self) -> u64 {
        u64::from(self.rows) * u64::from(self.cols)
    }

    /// The same grid with rows and columns exchanged.
    pub fn transposed(&self) -> Self {
        Self {
            rows: self.cols,
            cols: self.rows,
        }
    }
}

impl fmt::Display for GridShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// Parses `"RxC"` (also accepts `X` and `×`).
impl FromStr for GridShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (rows, cols) = s
            .split_once(['x', 'X', '×'])
            .ok_or_else(|| format!("expected ROWSxCOLS, got '{s}'"))?;
        let rows: u32 = rows
            .trim()
            .parse()
            .map_err(|_| format!("invalid row count '{}'", rows.trim()))?;
        let cols: u32 = cols
            .trim()
            .parse()
            .map_err(|_| format!("invalid column count '{}'", cols.trim()))?;
        if rows == 0 || cols == 0 {
            return Err(format!("grid dimensions must be ≥ 1, got {rows}x{cols}"));
        }
        Ok(Self { rows, cols })
    }
}

/// Which shape family produced a [`GridSolution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridFormula {
    /// `(x, x)`
    Square,
    /// `(x, x + 2)`
    SquarePlusTwo,
}

/// The solver's answer for a given image count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSolution {
    pub shape: GridShape,
    /// Empty cells: `rows * cols − n`.
    pub error: u64,
    pub formula: GridFormula,
}

/// Find the best-fit grid for `n` images.
///
/// Returns `None` when `n == 0`.
///
/// # Example
/// ```rust
/// use edgequake_imgkit::grid::{solve, GridFormula, GridShape};
///
/// let s = solve(24).unwrap();
/// assert_eq!(s.shape, GridShape::new(4, 6));
/// assert_eq!(s.error, 0);
/// assert_eq!(s.formula, GridFormula::SquarePlusTwo);
/// ```
pub fn solve(n: usize) -> Option<GridSolution> {
    if n == 0 {
        return None;
    }
    let n = n as u64;
    let upper = n.isqrt() + 1;

    let mut best: Option<GridSolution> = None;
    for x in 1..=upper {
        for formula in [GridFormula::Square, GridFormula::SquarePlusTwo] {
            let Some(candidate) = candidate(formula, x, n) else {
                continue;
            };
            if best.is_none_or(|b| candidate.error < b.error) {
                best = Some(candidate);
            }
        }
    }
    best
}

/// One candidate shape for side `x`, if it fits in `u32` rows/cols and
/// holds at least `n` cells.
fn candidate(formula: GridFormula, x: u64, n: u64) -> Option<GridSolution> {
    let rows = u32::try_from(x).ok()?;
    let cols = match formula {
        GridFormula::Square => rows,
        GridFormula::SquarePlusTwo => rows.checked_add(2)?,
    };
    let capacity = u64::from(rows).checked_mul(u64::from(cols))?;
    let error = capacity.checked_sub(n)?;
    Some(GridSolution {
        shape: GridShape::new(rows, cols),
        error,
        formula,
    })
}

/// Swap rows and columns so the grid follows the canvas orientation.
///
/// Landscape canvases prefer more columns, portrait canvases prefer more rows.
/// Square canvases keep the shape as given.
pub fn orient_for_canvas(shape: GridShape, width: u32, height: u32) -> GridShape {
    let landscape_but_tall = width > height && shape.rows > shape.cols;
    let portrait_but_wide = height > width && shape.cols > shape.rows;
    if landscape_but_tall || portrait_but_wide {
        shape.transposed()
    } else {
        shape
    }
}

/// [`solve`] followed by [`orient_for_canvas`].
pub fn solve_for_canvas(n: usize, width: u32, height: u32) -> Option<GridSolution> {
    solve(n).map(|s| GridSolution {
        shape: orient_for_canvas(s.shape, width, height),
        ..s
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_has_no_solution() {
        assert_eq!(solve(0), None);
    }

    #[test]
    fn one_is_single_cell() {
        let s = solve(1).unwrap();
        assert_eq!(s.shape, GridShape::new(1, 1));
        assert_eq!(s.error, 0);
        assert_eq!(s.formula, GridFormula::Square);
    }

    #[test]
    fn eight_prefers_exact_square_plus_two() {
        // (2,4) is the first zero-error candidate; (3,3) leaves one cell empty.
        let s = solve(8).unwrap();
        assert_eq!(s.shape, GridShape::new(2, 4));
        assert_eq!(s.error, 0);
        assert_eq!(s.formula, GridFormula::SquarePlusTwo);
    }

    #[test]
    fn twenty_four_is_four_by_six() {
        let s = solve(24).unwrap();
        assert_eq!(s.shape, GridShape::new(4, 6));
        assert_eq!(s.error, 0);
        assert_eq!(s.formula, GridFormula::SquarePlusTwo);
    }

    #[test]
    fn nine_is_perfect_square() {
        let s = solve(9).unwrap();
        assert_eq!(s.shape, GridShape::new(3, 3));
        assert_eq!(s.formula, GridFormula::Square);
    }

    #[test]
    fn smaller_error_beats_squarer_shape() {
        // n = 2: (1,3) error 1 is seen at x=1, (2,2) error 2 at x=2.
        let s = solve(2).unwrap();
        assert_eq!(s.shape, GridShape::new(1, 3));
        assert_eq!(s.error, 1);
        // n = 7: (2,4) error 1 at x=2 wins over (3,3) error 2.
        let s = solve(7).unwrap();
        assert_eq!(s.shape, GridShape::new(2, 4));
        assert_eq!(s.error, 1);
        // n = 14: (3,5) error 1 at x=3 beats (4,4) error 2.
        let s = solve(14).unwrap();
        assert_eq!(s.shape, GridShape::new(3, 5));
    }

    #[test]
    fn solution_always_covers_n_and_is_minimal() {
        for n in 1..=500usize {
            let s = solve(n).unwrap();
            let n64 = n as u64;
            assert!(s.shape.capacity() >= n64, "n={n} got {}", s.shape);
            assert_eq!(s.error, s.shape.capacity() - n64);

            let upper = n64.isqrt() + 1;
            let min_error = (1..=upper)
                .flat_map(|x| [x * x, x * (x + 2)])
                .filter(|&c| c >= n64)
                .map(|c| c - n64)
                .min()
                .unwrap();
            assert_eq!(s.error, min_error, "n={n}");
        }
    }

    #[test]
    fn candidates_past_u32_are_skipped() {
        let max = u64::from(u32::MAX);
        assert!(candidate(GridFormula::Square, max + 1, 1).is_none());
        assert!(candidate(GridFormula::SquarePlusTwo, max, 1).is_none());
        assert!(candidate(GridFormula::SquarePlusTwo, max - 1, 1).is_none());
        let sq = candidate(GridFormula::Square, max, 1).unwrap();
        assert_eq!(sq.shape, GridShape::new(u32::MAX, u32::MAX));
        assert_eq!(sq.error, max * max - 1);
    }

    #[test]
    fn candidate_below_n_is_invalid() {
        assert!(candidate(GridFormula::Square, 2, 5).is_none());
        assert_eq!(candidate(GridFormula::SquarePlusTwo, 1, 3).unwrap().error, 0);
    }

    #[test]
    fn landscape_keeps_wide_grid() {
        let shape = orient_for_canvas(GridShape::new(2, 4), 1600, 900);
        assert_eq!(shape, GridShape::new(2, 4));
    }

    #[test]
    fn landscape_swaps_tall_grid() {
        let shape = orient_for_canvas(GridShape::new(4, 2), 1600, 900);
        assert_eq!(shape, GridShape::new(2, 4));
    }

    #[test]
    fn portrait_swaps_wide_grid() {
        let shape = orient_for_canvas(GridShape::new(2, 4), 900, 1600);
        assert_eq!(shape, GridShape::new(4, 2));
    }

    #[test]
    fn square_canvas_keeps_native_orientation() {
        let shape = orient_for_canvas(GridShape::new(2, 4), 1000, 1000);
        assert_eq!(shape, GridShape::new(2, 4));
    }

    #[test]
    fn solve_for_canvas_orients() {
        let s = solve_for_canvas(8, 700, 1000).unwrap();
        assert_eq!(s.shape, GridShape::new(4, 2));
        assert_eq!(s.error, 0);
    }

    #[test]
    fn parse_grid_shape() {
        assert_eq!("3x4".parse::<GridShape>().unwrap(), GridShape::new(3, 4));
        assert_eq!(" 2 X 5 ".parse::<GridShape>().unwrap(), GridShape::new(2, 5));
        assert!("0x3".parse::<GridShape>().is_err());
        assert!("3".parse::<GridShape>().is_err());
        assert!("ax3".parse::<GridShape>().is_err());
    }
}
