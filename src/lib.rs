//! # edgequake-imgkit
//!
//! Grid collages and a handful of single-image tools: brightness/blur,
//! opacity, image → PDF and PDF → image.
//!
//! ## Why this crate?
//!
//! Laying out N photos on a fixed canvas is mostly arithmetic that is easy to
//! get subtly wrong: pick a grid that wastes as few cells as possible, size
//! the cells from margins and spacing, crop without cutting off heads, and
//! never let one dead link sink the whole picture. This crate does that
//! arithmetic once, tests it, and reports exactly which cell got which
//! source.
//!
//! ## Pipeline Overview
//!
//! ```text
//! sources
//!  │
//!  ├─ 1. Grid     solve rows × cols for N, orient for the canvas
//!  ├─ 2. Layout   cell size and origin from margins and spacing
//!  ├─ 3. Load     file / URL / data: URI (skip-and-report on failure)
//!  ├─ 4. Crop     optional square crop with gravity
//!  ├─ 5. Fit      Lanczos3 downscale, centred in the cell
//!  └─ 6. Encode   JPEG or PNG, atomic write
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_imgkit::{build_collage_to_file, CollageConfig, CropSpec};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CollageConfig::builder()
//!         .size(1600, 1000)
//!         .crop(CropSpec::square(0.3))
//!         .build()?;
//!     let sources = ["one.jpg", "two.jpg", "https://example.com/three.png"];
//!     let report = build_collage_to_file(&sources, "collage.jpg", &config).await?;
//!     eprintln!("placed {} / skipped {}", report.stats.placed, report.stats.skipped);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `imgkit` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-imgkit = { version = "0.1", default-features = false }
//! ```
//!
//! PDF operations load the pdfium shared library at runtime; see
//! [`pipeline::render::bind_pdfium`] for where it is looked for.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod collage;
pub mod config;
pub mod convert;
pub mod error;
pub mod grid;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use collage::{
    build_collage, build_collage_sync, build_collage_to_file, build_collage_to_file_with,
    build_collage_with, save_collage, Compositor,
};
pub use config::{
    AdjustConfig, CanvasSpec, CollageConfig, CollageConfigBuilder, Color, CropSpec, GridChoice,
    LoaderConfig, OutputFormat, PdfExportConfig, PdfRasterConfig, TransparencyConfig,
};
pub use convert::{adjust_file, image_to_pdf, inspect_pdf, pdf_to_image, transparency_file};
pub use error::{ImgkitError, SourceError};
pub use grid::{orient_for_canvas, solve, solve_for_canvas, GridFormula, GridShape, GridSolution};
pub use output::{
    CellResult, CellStatus, CollageOutput, CollageReport, CollageStats, PageSize, PdfInfo,
    TransparencyOutput, WrittenFile,
};
pub use pipeline::input::{DefaultLoader, ImageLoader, LoadOutcome, MemoryLoader};
pub use progress::{CollageProgressCallback, NoopProgressCallback, ProgressCallback};
