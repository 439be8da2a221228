//! Configuration types for collages and the single-image operations.
//!
//! Collage behaviour is controlled through [`CollageConfig`], built via its
//! [`CollageConfigBuilder`]. The smaller operations (filters, transparency,
//! PDF conversion) take plain structs with sensible `Default`s.
//!
//! Value types that describe *what* to draw ([`CanvasSpec`], [`CropSpec`],
//! [`Color`], [`OutputFormat`]) are serde-serialisable so a run can be logged
//! or replayed; the config structs holding callbacks are not.

use crate::error::ImgkitError;
use crate::grid::GridShape;
use crate::progress::ProgressCallback;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

// ── Colour ───────────────────────────────────────────────────────────────

/// An opaque RGB colour used for canvas and flattening backgrounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const BLACK: Color = Color::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_rgb(self) -> image::Rgb<u8> {
        image::Rgb([self.r, self.g, self.b])
    }

    pub fn to_rgba(self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, 255])
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

static RE_HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#?([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap());

const NAMED_COLORS: &[(&str, Color)] = &[
    ("white", Color::new(255, 255, 255)),
    ("black", Color::new(0, 0, 0)),
    ("gray", Color::new(128, 128, 128)),
    ("grey", Color::new(128, 128, 128)),
    ("lightgray", Color::new(211, 211, 211)),
    ("darkgray", Color::new(169, 169, 169)),
    ("darkslategray", Color::new(47, 79, 79)),
    ("maroon", Color::new(128, 0, 0)),
    ("red", Color::new(255, 0, 0)),
    ("green", Color::new(0, 128, 0)),
    ("blue", Color::new(0, 0, 255)),
    ("navy", Color::new(0, 0, 128)),
    ("beige", Color::new(245, 245, 220)),
];

/// Parses `#rgb`, `#rrggbb` (the `#` is optional) or a CSS colour name.
impl FromStr for Color {
    type Err = ImgkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(caps) = RE_HEX_COLOR.captures(s) {
            let hex = &caps[1];
            let channel = |i: usize, len: usize| -> u8 {
                let v = u8::from_str_radix(&hex[i * len..(i + 1) * len], 16).unwrap_or(0);
                if len == 1 {
                    v * 17
                } else {
                    v
                }
            };
            let len = hex.len() / 3;
            return Ok(Color::new(channel(0, len), channel(1, len), channel(2, len)));
        }

        let lower = s.to_ascii_lowercase();
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, c)| *c)
            .ok_or_else(|| ImgkitError::InvalidConfig(format!("Unknown colour '{s}'")))
    }
}

// ── Output format ────────────────────────────────────────────────────────

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Lossy, no alpha. `quality` is 1–100.
    Jpeg { quality: u8 },
    /// Lossless, keeps alpha.
    Png,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Jpeg {
            quality: Self::DEFAULT_JPEG_QUALITY,
        }
    }
}

impl OutputFormat {
    pub const DEFAULT_JPEG_QUALITY: u8 = 95;

    /// Choose a format from the file extension; anything that is not `.png`
    /// is written as JPEG with `jpeg_quality`.
    pub fn from_path(path: impl AsRef<Path>, jpeg_quality: u8) -> Self {
        let is_png = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("png"));
        if is_png {
            OutputFormat::Png
        } else {
            OutputFormat::Jpeg {
                quality: jpeg_quality.clamp(1, 100),
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg { .. } => "JPEG",
            OutputFormat::Png => "PNG",
        }
    }
}

// ── Collage specs ────────────────────────────────────────────────────────

/// Output canvas geometry and background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSpec {
    pub width: u32,
    pub height: u32,
    /// Space reserved on every edge of the canvas.
    pub frame_margin: u32,
    /// Horizontal gap between neighbouring cells.
    pub col_spacing: u32,
    /// Vertical gap between neighbouring cells.
    pub row_spacing: u32,
    pub background: Color,
}

impl Default for CanvasSpec {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 1000,
            frame_margin: 10,
            col_spacing: 10,
            row_spacing: 10,
            background: Color::WHITE,
        }
    }
}

impl CanvasSpec {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Set frame margin, column spacing and row spacing in one go.
    pub fn with_spacing(mut self, frame_margin: u32, col_spacing: u32, row_spacing: u32) -> Self {
        self.frame_margin = frame_margin;
        self.col_spacing = col_spacing;
        self.row_spacing = row_spacing;
        self
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }
}

/// Square-crop settings. Gravity is always kept inside `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropSpec {
    pub enabled: bool,
    gravity: f32,
}

impl Default for CropSpec {
    fn default() -> Self {
        Self {
            enabled: false,
            gravity: 0.5,
        }
    }
}

impl CropSpec {
    /// Cropping disabled.
    pub fn none() -> Self {
        Self::default()
    }

    /// Cropping enabled with the given gravity (clamped; NaN becomes centre).
    pub fn square(gravity: f32) -> Self {
        Self {
            enabled: true,
            gravity: clamp_gravity(gravity),
        }
    }

    pub fn gravity(&self) -> f32 {
        self.gravity
    }
}

pub(crate) fn clamp_gravity(gravity: f32) -> f32 {
    if gravity.is_nan() {
        0.5
    } else {
        gravity.clamp(0.0, 1.0)
    }
}

/// How the collage grid is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GridChoice {
    /// Solve for the number of sources, then orient for the canvas. (default)
    #[default]
    Auto,
    /// Use exactly this shape.
    Fixed(GridShape),
}

// ── Loader settings ──────────────────────────────────────────────────────

/// Limits applied by [`crate::pipeline::input::DefaultLoader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Download timeout for URL sources in seconds. Default: 30.
    pub download_timeout_secs: u64,
    /// Largest accepted source payload in bytes. Default: 50 MiB.
    pub max_source_bytes: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            download_timeout_secs: 30,
            max_source_bytes: 50 * 1024 * 1024,
        }
    }
}

// ── Collage config ───────────────────────────────────────────────────────

/// Configuration for a collage build.
///
/// # Example
/// ```rust
/// use edgequake_imgkit::{CollageConfig, CropSpec, GridShape};
///
/// let config = CollageConfig::builder()
///     .size(1000, 700)
///     .spacing(20, 15, 15)
///     .background("#333".parse().unwrap())
///     .grid(GridShape::new(3, 3))
///     .crop(CropSpec::square(0.0))
///     .build()
///     .unwrap();
/// assert_eq!(config.canvas.frame_margin, 20);
/// ```
#[derive(Clone, Default)]
pub struct CollageConfig {
    pub canvas: CanvasSpec,
    pub grid: GridChoice,
    pub crop: CropSpec,
    /// Format used by the file-writing entry points when the path does not
    /// decide it. Default: JPEG quality 95.
    pub output_format: OutputFormat,
    pub loader: LoaderConfig,
    /// Optional per-cell progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for CollageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollageConfig")
            .field("canvas", &self.canvas)
            .field("grid", &self.grid)
            .field("crop", &self.crop)
            .field("output_format", &self.output_format)
            .field("loader", &self.loader)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn CollageProgressCallback>"),
            )
            .finish()
    }
}

impl CollageConfig {
    /// Create a new builder for `CollageConfig`.
    pub fn builder() -> CollageConfigBuilder {
        CollageConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`CollageConfig`].
#[derive(Debug)]
pub struct CollageConfigBuilder {
    config: CollageConfig,
}

impl CollageConfigBuilder {
    pub fn canvas(mut self, canvas: CanvasSpec) -> Self {
        self.config.canvas = canvas;
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.config.canvas.width = width;
        self.config.canvas.height = height;
        self
    }

    pub fn spacing(mut self, frame_margin: u32, col_spacing: u32, row_spacing: u32) -> Self {
        self.config.canvas = self
            .config
            .canvas
            .with_spacing(frame_margin, col_spacing, row_spacing);
        self
    }

    pub fn background(mut self, color: Color) -> Self {
        self.config.canvas.background = color;
        self
    }

    pub fn grid(mut self, shape: GridShape) -> Self {
        self.config.grid = GridChoice::Fixed(shape);
        self
    }

    pub fn auto_grid(mut self) -> Self {
        self.config.grid = GridChoice::Auto;
        self
    }

    pub fn crop(mut self, crop: CropSpec) -> Self {
        self.config.crop = crop;
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.output_format = OutputFormat::Jpeg {
            quality: quality.clamp(1, 100),
        };
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.loader.download_timeout_secs = secs;
        self
    }

    pub fn max_source_bytes(mut self, bytes: u64) -> Self {
        self.config.loader.max_source_bytes = bytes;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints that do not depend on
    /// the source count. Layout feasibility is checked again per build.
    pub fn build(self) -> Result<CollageConfig, ImgkitError> {
        let c = &self.config;
        if c.canvas.width == 0 || c.canvas.height == 0 {
            return Err(ImgkitError::InvalidConfig(format!(
                "Canvas must be at least 1x1, got {}x{}",
                c.canvas.width, c.canvas.height
            )));
        }
        if let GridChoice::Fixed(shape) = c.grid {
            if shape.rows == 0 || shape.cols == 0 {
                return Err(ImgkitError::InvalidConfig(format!(
                    "Grid dimensions must be ≥ 1, got {shape}"
                )));
            }
        }
        if c.loader.download_timeout_secs == 0 {
            return Err(ImgkitError::InvalidConfig(
                "Download timeout must be ≥ 1s".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Single-image operation configs ───────────────────────────────────────

/// Brightness and blur settings for [`crate::convert::adjust_file`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjustConfig {
    /// Channel multiplier; 1.0 leaves the image unchanged, 0.5 darkens by half.
    pub brightness: f32,
    /// Gaussian blur standard deviation in pixels; 0 disables the blur.
    pub blur_sigma: f32,
    /// JPEG quality when the output path is not `.png`. Default: 95.
    pub jpeg_quality: u8,
    pub loader: LoaderConfig,
}

impl Default for AdjustConfig {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            blur_sigma: 0.0,
            jpeg_quality: OutputFormat::DEFAULT_JPEG_QUALITY,
            loader: LoaderConfig::default(),
        }
    }
}

impl AdjustConfig {
    pub fn validate(&self) -> Result<(), ImgkitError> {
        if !self.brightness.is_finite() || self.brightness < 0.0 {
            return Err(ImgkitError::InvalidConfig(format!(
                "Brightness must be a finite value ≥ 0, got {}",
                self.brightness
            )));
        }
        if !self.blur_sigma.is_finite() || self.blur_sigma < 0.0 {
            return Err(ImgkitError::InvalidConfig(format!(
                "Blur sigma must be a finite value ≥ 0, got {}",
                self.blur_sigma
            )));
        }
        Ok(())
    }
}

/// Settings for [`crate::convert::transparency_file`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransparencyConfig {
    /// Alpha multiplier in `[0.0, 1.0]`. Default: 0.5.
    pub opacity: f32,
    /// Background used for the flattened companion image. Default: white.
    pub background: Color,
    /// Where to write the flattened (opaque) version, if anywhere.
    pub flattened_output: Option<std::path::PathBuf>,
    /// JPEG quality for the flattened output. Default: 95.
    pub jpeg_quality: u8,
    pub loader: LoaderConfig,
}

impl Default for TransparencyConfig {
    fn default() -> Self {
        Self {
            opacity: 0.5,
            background: Color::WHITE,
            flattened_output: None,
            jpeg_quality: OutputFormat::DEFAULT_JPEG_QUALITY,
            loader: LoaderConfig::default(),
        }
    }
}

/// Settings for [`crate::convert::image_to_pdf`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PdfExportConfig {
    /// Pixels per inch used to size the page. Default: 100.
    pub resolution: f32,
    pub loader: LoaderConfig,
}

impl Default for PdfExportConfig {
    fn default() -> Self {
        Self {
            resolution: 100.0,
            loader: LoaderConfig::default(),
        }
    }
}

/// Settings for [`crate::convert::pdf_to_image`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfRasterConfig {
    /// Page to render, 1-indexed. Default: 1.
    pub page: usize,
    /// Scale factor over 72 DPI. Default: 2.0 (144 DPI).
    pub zoom: f32,
    /// PDF user password for encrypted documents.
    pub password: Option<String>,
    /// JPEG quality when the output path is not `.png`. Default: 100.
    pub jpeg_quality: u8,
    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for PdfRasterConfig {
    fn default() -> Self {
        Self {
            page: 1,
            zoom: 2.0,
            password: None,
            jpeg_quality: 100,
            download_timeout_secs: 120,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_colors() {
        assert_eq!("#333".parse::<Color>().unwrap(), Color::new(0x33, 0x33, 0x33));
        assert_eq!("#2f4f4f".parse::<Color>().unwrap(), Color::new(47, 79, 79));
        assert_eq!("FFA500".parse::<Color>().unwrap(), Color::new(255, 165, 0));
    }

    #[test]
    fn parse_named_colors() {
        assert_eq!("maroon".parse::<Color>().unwrap(), Color::new(128, 0, 0));
        assert_eq!("DarkSlateGray".parse::<Color>().unwrap(), Color::new(47, 79, 79));
        assert!("not-a-colour".parse::<Color>().is_err());
        assert!("#12345".parse::<Color>().is_err());
    }

    #[test]
    fn color_display_round_trips() {
        let c = Color::new(1, 2, 255);
        assert_eq!(c.to_string(), "#0102ff");
        assert_eq!(c.to_string().parse::<Color>().unwrap(), c);
    }

    #[test]
    fn output_format_from_extension() {
        assert_eq!(OutputFormat::from_path("a.PNG", 90), OutputFormat::Png);
        assert_eq!(
            OutputFormat::from_path("a.jpg", 90),
            OutputFormat::Jpeg { quality: 90 }
        );
        assert_eq!(
            OutputFormat::from_path("noext", 0),
            OutputFormat::Jpeg { quality: 1 }
        );
    }

    #[test]
    fn crop_gravity_is_clamped() {
        assert_eq!(CropSpec::square(-1.0).gravity(), 0.0);
        assert_eq!(CropSpec::square(3.0).gravity(), 1.0);
        assert_eq!(CropSpec::square(f32::NAN).gravity(), 0.5);
        assert!(!CropSpec::none().enabled);
    }

    #[test]
    fn builder_sets_fields() {
        let config = CollageConfig::builder()
            .size(1000, 700)
            .spacing(20, 15, 15)
            .grid(GridShape::new(3, 3))
            .crop(CropSpec::square(0.5))
            .jpeg_quality(80)
            .build()
            .unwrap();
        assert_eq!(config.canvas.width, 1000);
        assert_eq!(config.canvas.height, 700);
        assert_eq!(config.canvas.col_spacing, 15);
        assert_eq!(config.grid, GridChoice::Fixed(GridShape::new(3, 3)));
        assert_eq!(config.output_format, OutputFormat::Jpeg { quality: 80 });
    }

    #[test]
    fn builder_rejects_zero_grid() {
        let err = CollageConfig::builder()
            .grid(GridShape::new(0, 3))
            .build()
            .unwrap_err();
        assert!(matches!(err, ImgkitError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_empty_canvas() {
        assert!(CollageConfig::builder().size(0, 10).build().is_err());
    }

    #[test]
    fn adjust_config_validation() {
        assert!(AdjustConfig::default().validate().is_ok());
        let bad = AdjustConfig {
            brightness: -1.0,
            ..AdjustConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = AdjustConfig {
            blur_sigma: f32::INFINITY,
            ..AdjustConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn canvas_spec_serialises() {
        let spec = CanvasSpec::new(800, 600).with_background(Color::BLACK);
        let json = serde_json::to_string(&spec).unwrap();
        let back: CanvasSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }
}
