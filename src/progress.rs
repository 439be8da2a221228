//! Progress-callback trait for per-cell collage events.
//!
//! Inject an [`Arc<dyn CollageProgressCallback>`] via
//! [`crate::config::CollageConfigBuilder::progress_callback`] to receive
//! events as the compositor fills each cell.
//!
//! # Example
//!
//! ```rust
//! use edgequake_imgkit::{CollageConfig, CollageProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     placed: Arc<AtomicUsize>,
//! }
//!
//! impl CollageProgressCallback for CountingCallback {
//!     fn on_cell_complete(&self, cell: usize, total_cells: usize) {
//!         let done = self.placed.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("cell {}/{} placed ({} so far)", cell, total_cells, done);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     placed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = CollageConfig::builder()
//!     .progress_callback(counter as Arc<dyn CollageProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the compositor as it processes each cell.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Cells are visited one at a time in row-major order,
/// but the trait is `Send + Sync` so it can be stored in a config shared
/// across tasks.
pub trait CollageProgressCallback: Send + Sync {
    /// Called once before the first source is loaded.
    ///
    /// # Arguments
    /// * `total_cells` — number of cells that will receive a source
    fn on_collage_start(&self, total_cells: usize) {
        let _ = total_cells;
    }

    /// Called before a cell's source is loaded.
    ///
    /// # Arguments
    /// * `cell`        — 1-indexed cell number in row-major order
    /// * `total_cells` — cells that will receive a source
    /// * `source`      — the source string being loaded
    fn on_cell_start(&self, cell: usize, total_cells: usize, source: &str) {
        let _ = (cell, total_cells, source);
    }

    /// Called when a source has been composited into its cell.
    fn on_cell_complete(&self, cell: usize, total_cells: usize) {
        let _ = (cell, total_cells);
    }

    /// Called when a source could not be loaded and its cell stays blank.
    ///
    /// # Arguments
    /// * `error` — human-readable reason
    fn on_cell_skipped(&self, cell: usize, total_cells: usize, error: &str) {
        let _ = (cell, total_cells, error);
    }

    /// Called once after every cell has been attempted.
    ///
    /// # Arguments
    /// * `total_cells`  — cells that received a source
    /// * `placed_count` — cells that ended up with an image
    fn on_collage_complete(&self, total_cells: usize, placed_count: usize) {
        let _ = (total_cells, placed_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl CollageProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::CollageConfig`].
pub type ProgressCallback = Arc<dyn CollageProgressCallback>;
