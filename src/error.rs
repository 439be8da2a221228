//! Error types for the edgequake-imgkit library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ImgkitError`] — **Fatal**: the operation cannot proceed at all
//!   (degenerate canvas, empty source list, unwritable output, broken PDF).
//!   Returned as `Err(ImgkitError)` from every top-level entry point.
//!
//! * [`SourceError`] — **Non-fatal**: a single collage source could not be
//!   loaded (missing file, HTTP 404, undecodable bytes). Stored inside
//!   [`crate::output::CellResult`] so callers can see exactly which cell was
//!   left blank instead of losing the whole collage to one bad image.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-imgkit library.
///
/// Per-source failures use [`SourceError`] and are stored in
/// [`crate::output::CellResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ImgkitError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// Layout or option validation failed (empty sources, degenerate cells…).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// The single mandatory input of an operation was not found.
    #[error("Input not found: '{input}'\nCheck the path exists and is readable.")]
    InputNotFound { input: String },

    /// The single mandatory input exists but could not be fetched or read.
    #[error("Failed to read '{input}': {reason}")]
    ReadFailed { input: String, reason: String },

    /// The input bytes are not a decodable image.
    #[error("Failed to decode image '{input}': {detail}")]
    DecodeFailed { input: String, detail: String },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The raster could not be encoded into the requested format.
    #[error("Failed to encode {format} output: {detail}")]
    EncodeFailed { format: String, detail: String },

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The document opened fine but has no pages.
    #[error("PDF '{path}' has no pages")]
    EmptyPdf { path: PathBuf },

    /// Selected page number exceeds the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// pdfium could not build or serialise a new document.
    #[error("Failed to create PDF: {0}")]
    PdfWriteFailed(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDF operations need the pdfium shared library at runtime. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Place libpdfium next to where you run imgkit.\n\
  • Install it system-wide (prebuilt: github.com/bblanchon/pdfium-binaries).\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single collage source.
///
/// The compositor logs it, leaves the cell at the background colour and
/// carries on with the next source.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum SourceError {
    /// Local file does not exist.
    #[error("'{input}': file not found")]
    NotFound { input: String },

    /// Local file exists but is not readable.
    #[error("'{input}': permission denied")]
    PermissionDenied { input: String },

    /// Any other local read failure.
    #[error("'{input}': read failed: {detail}")]
    Io { input: String, detail: String },

    /// Transport-level failure (DNS, TLS, connection reset…).
    #[error("'{input}': network error: {detail}")]
    Network { input: String, detail: String },

    /// Download exceeded the configured timeout.
    #[error("'{input}': download timed out after {secs}s")]
    Timeout { input: String, secs: u64 },

    /// Server answered with a non-success status.
    #[error("'{input}': HTTP {status}")]
    HttpStatus { input: String, status: u16 },

    /// Payload is larger than the configured limit.
    #[error("'{input}': {size} bytes exceeds the {limit} byte limit")]
    TooLarge { input: String, size: u64, limit: u64 },

    /// `data:` URI is malformed or not base64.
    #[error("'{input}': invalid data URI: {detail}")]
    InvalidDataUri { input: String, detail: String },

    /// Bytes were fetched but are not a decodable image.
    #[error("'{input}': decode failed: {detail}")]
    Decode { input: String, detail: String },
}

impl SourceError {
    /// The source string this error refers to.
    pub fn input(&self) -> &str {
        match self {
            SourceError::NotFound { input }
            | SourceError::PermissionDenied { input }
            | SourceError::Io { input, .. }
            | SourceError::Network { input, .. }
            | SourceError::Timeout { input, .. }
            | SourceError::HttpStatus { input, .. }
            | SourceError::TooLarge { input, .. }
            | SourceError::InvalidDataUri { input, .. }
            | SourceError::Decode { input, .. } => input,
        }
    }

    /// Promote a per-source failure to a fatal error, for operations whose
    /// only input is that source.
    pub fn into_fatal(self) -> ImgkitError {
        match self {
            SourceError::NotFound { input } => ImgkitError::InputNotFound { input },
            SourceError::Decode { input, detail } => ImgkitError::DecodeFailed { input, detail },
            other => ImgkitError::ReadFailed {
                input: other.input().to_string(),
                reason: other.to_string(),
            },
        }
    }
}
