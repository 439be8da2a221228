//! Pipeline stages shared by the collage builder and the single-image tools.
//!
//! Each submodule implements exactly one transformation step, so every stage
//! is testable on its own with in-memory rasters.
//!
//! ## Data Flow (collage)
//!
//! ```text
//! source ──▶ input ──▶ crop ──▶ compose ──▶ codec
//! (path/URL)  (load)  (square)  (fit+paste)  (encode+persist)
//!                ▲                  ▲
//!                └──── layout ──────┘
//!                     (cell geometry)
//! ```
//!
//! 1. [`input`]   — turn a path, URL or `data:` URI into a `DynamicImage`;
//!    failures become a per-cell [`crate::error::SourceError`]
//! 2. [`layout`]  — cell size, thumbnail box and grid origin for a canvas
//! 3. [`crop`]    — optional gravity-biased square crop
//! 4. [`compose`] — Lanczos3 fit into the thumbnail box and alpha paste
//! 5. [`codec`]   — JPEG/PNG encoding and atomic writes
//!
//! [`adjust`], [`alpha`] and [`render`] serve the single-image operations in
//! [`crate::convert`]; `render` is the only stage that touches pdfium.

pub mod adjust;
pub mod alpha;
pub mod codec;
pub mod compose;
pub mod crop;
pub mod input;
pub mod layout;
pub mod render;
