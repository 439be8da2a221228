//! CLI binary for edgequake-imgkit.
//!
//! A thin shim over the library crate that maps subcommand flags to the
//! library configs and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_imgkit::{
    adjust_file, build_collage_to_file, image_to_pdf, inspect_pdf, pdf_to_image, solve_for_canvas,
    transparency_file, AdjustConfig, CanvasSpec, CollageConfig, CollageProgressCallback, Color,
    CropSpec, GridChoice, LoaderConfig, OutputFormat, PdfExportConfig, PdfRasterConfig,
    ProgressCallback, TransparencyConfig, WrittenFile,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the whole collage plus a log line
/// for every cell that had to be left blank.
struct CliProgressCallback {
    bar: ProgressBar,
    skipped: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} cells  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Collage");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            skipped: AtomicUsize::new(0),
        })
    }
}

impl CollageProgressCallback for CliProgressCallback {
    fn on_collage_start(&self, total_cells: usize) {
        self.bar.set_length(total_cells as u64);
        self.bar.reset_eta();
    }

    fn on_cell_start(&self, _cell: usize, _total: usize, source: &str) {
        self.bar.set_message(shorten(source, 48));
    }

    fn on_cell_complete(&self, _cell: usize, _total: usize) {
        self.bar.inc(1);
    }

    fn on_cell_skipped(&self, cell: usize, total: usize, error: &str) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} Cell {:>3}/{:<3}  {}",
            red("✗"),
            cell,
            total,
            red(&shorten(error, 80)),
        ));
        self.bar.inc(1);
    }

    fn on_collage_complete(&self, total_cells: usize, placed_count: usize) {
        self.bar.finish_and_clear();
        let skipped = self.skipped.load(Ordering::SeqCst);
        if skipped == 0 {
            eprintln!(
                "{} {} images placed",
                green("✔"),
                bold(&placed_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} images placed  ({} skipped)",
                if placed_count == 0 { red("✘") } else { cyan("⚠") },
                bold(&placed_count.to_string()),
                total_cells,
                red(&skipped.to_string()),
            );
        }
    }
}

/// Truncate long sources and error messages to keep output tidy.
fn shorten(s: &str, max: usize) -> String {
    match s.char_indices().nth(max.saturating_sub(1)) {
        Some((idx, _)) if s.chars().count() > max => format!("{}\u{2026}", &s[..idx]),
        _ => s.to_string(),
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # 3x3 collage on a 1000x1000 white canvas, grid chosen automatically
  imgkit collage a.jpg b.jpg c.jpg d.jpg e.jpg f.jpg g.jpg h.jpg i.jpg -o collage.jpg

  # Landscape canvas, dark background, square crops biased to the top
  imgkit collage photos/*.jpg -o wall.jpg --size 1600x900 --background darkslategray \
      --crop --gravity 0.2

  # Fixed grid and wider gaps, mixing files and URLs, JSON report on stdout
  imgkit collage a.png https://example.com/b.png -o out.png --grid 1x2 --margin 40 \
      --col-spacing 20 --json

  # Which grid would 24 images get?
  imgkit grid 24 --size 1200x800

  # Darken by half and blur
  imgkit adjust image.jpg -o modified_image.jpg --brightness 0.5 --blur 5

  # 10% opacity PNG plus a flattened JPEG on white
  imgkit alpha image.jpg -o output_image.png --opacity 0.1 --flatten output_white_bg.jpg

  # Image to a one-page PDF at 100 DPI
  imgkit to-pdf output.jpeg -o edited_example.pdf

  # First page of a PDF at 4x zoom (288 DPI)
  imgkit from-pdf example.pdf -o output.jpeg --zoom 4

  # PDF facts without rendering
  imgkit inspect example.pdf

ENVIRONMENT VARIABLES:
  RUST_LOG                Overrides the log filter (e.g. edgequake_imgkit=debug)
  PDFIUM_LIB_PATH         Path to libpdfium for to-pdf / from-pdf / inspect
  IMGKIT_*                Every flag can also be set from the environment
                          (IMGKIT_SIZE, IMGKIT_BACKGROUND, IMGKIT_QUALITY, …)

PDFIUM:
  PDF subcommands load pdfium at runtime. Looked up in order:
  PDFIUM_LIB_PATH, a platform library in the current directory, then the
  system library path. Prebuilt binaries: github.com/bblanchon/pdfium-binaries
"#;

/// Grid collages, filters, transparency and PDF/image conversion.
#[derive(Parser, Debug)]
#[command(
    name = "imgkit",
    version,
    about = "Grid collages, filters, transparency and PDF/image conversion",
    long_about = "Build grid collages from local files, URLs and data: URIs, and run small \
single-image transforms: brightness/blur, opacity, image to PDF and PDF to image.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "IMGKIT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "IMGKIT_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, global = true, env = "IMGKIT_DOWNLOAD_TIMEOUT", default_value_t = 30,
          value_parser = clap::value_parser!(u64).range(1..))]
    download_timeout: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose images into a grid collage.
    Collage(CollageArgs),
    /// Print the grid the solver picks for N images.
    Grid(GridArgs),
    /// Change brightness and apply a Gaussian blur.
    Adjust(AdjustArgs),
    /// Reduce opacity; optionally write a flattened copy.
    Alpha(AlphaArgs),
    /// Wrap an image in a one-page PDF.
    ToPdf(ToPdfArgs),
    /// Render one PDF page to an image.
    FromPdf(FromPdfArgs),
    /// Print PDF page count, version and page sizes.
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct CollageArgs {
    /// Image paths, HTTP(S) URLs or data: URIs, in cell order.
    #[arg(required = true)]
    sources: Vec<String>,

    /// Output file; `.png` keeps PNG, anything else is JPEG.
    #[arg(short, long, env = "IMGKIT_OUTPUT")]
    output: PathBuf,

    /// Canvas size as WIDTHxHEIGHT.
    #[arg(long, env = "IMGKIT_SIZE", default_value = "1000x1000", value_parser = parse_size)]
    size: (u32, u32),

    /// Grid as ROWSxCOLS, or `auto` to solve for the number of sources.
    #[arg(long, env = "IMGKIT_GRID", default_value = "auto", value_parser = parse_grid)]
    grid: GridChoice,

    /// Space on every canvas edge, in pixels.
    #[arg(long, env = "IMGKIT_MARGIN", default_value_t = 10)]
    margin: u32,

    /// Horizontal gap between cells, in pixels.
    #[arg(long, env = "IMGKIT_COL_SPACING", default_value_t = 10)]
    col_spacing: u32,

    /// Vertical gap between cells, in pixels.
    #[arg(long, env = "IMGKIT_ROW_SPACING", default_value_t = 10)]
    row_spacing: u32,

    /// Canvas colour: #rgb, #rrggbb or a name (white, black, maroon, …).
    #[arg(long, env = "IMGKIT_BACKGROUND", default_value = "white")]
    background: Color,

    /// Crop every image to a square before fitting it.
    #[arg(long, env = "IMGKIT_CROP")]
    crop: bool,

    /// Where the square crop sits: 0 = top/left, 0.5 = centre, 1 = bottom/right.
    #[arg(long, env = "IMGKIT_GRAVITY", default_value_t = 0.5)]
    gravity: f32,

    /// JPEG quality (1–100).
    #[arg(long, env = "IMGKIT_QUALITY", default_value_t = 95,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Largest accepted source in megabytes.
    #[arg(long, env = "IMGKIT_MAX_SOURCE_MB", default_value_t = 50)]
    max_source_mb: u64,

    /// Print the per-cell report as JSON on stdout.
    #[arg(long, env = "IMGKIT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "IMGKIT_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct GridArgs {
    /// Number of images.
    count: usize,

    /// Canvas size as WIDTHxHEIGHT, used to orient the grid.
    #[arg(long, env = "IMGKIT_SIZE", default_value = "1000x1000", value_parser = parse_size)]
    size: (u32, u32),

    /// Print the solution as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct AdjustArgs {
    /// Image path, URL or data: URI.
    input: String,

    #[arg(short, long)]
    output: PathBuf,

    /// Brightness factor; 1.0 leaves the image unchanged.
    #[arg(long, env = "IMGKIT_BRIGHTNESS", default_value_t = 1.0)]
    brightness: f32,

    /// Gaussian blur sigma in pixels; 0 disables the blur.
    #[arg(long, env = "IMGKIT_BLUR", default_value_t = 0.0)]
    blur: f32,

    /// JPEG quality (1–100).
    #[arg(long, env = "IMGKIT_QUALITY", default_value_t = 95,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,
}

#[derive(Args, Debug)]
struct AlphaArgs {
    /// Image path, URL or data: URI.
    input: String,

    /// Translucent output; always written as PNG.
    #[arg(short, long)]
    output: PathBuf,

    /// Alpha multiplier in [0, 1].
    #[arg(long, env = "IMGKIT_OPACITY", default_value_t = 0.5)]
    opacity: f32,

    /// Also write an opaque copy blended onto --background.
    #[arg(long)]
    flatten: Option<PathBuf>,

    /// Background for --flatten.
    #[arg(long, env = "IMGKIT_BACKGROUND", default_value = "white")]
    background: Color,

    /// JPEG quality for --flatten (1–100).
    #[arg(long, env = "IMGKIT_QUALITY", default_value_t = 95,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,
}

#[derive(Args, Debug)]
struct ToPdfArgs {
    /// Image path, URL or data: URI.
    input: String,

    #[arg(short, long)]
    output: PathBuf,

    /// Pixels per inch used to size the page.
    #[arg(long, env = "IMGKIT_RESOLUTION", default_value_t = 100.0)]
    resolution: f32,
}

#[derive(Args, Debug)]
struct FromPdfArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Output image; defaults to `<stem>-p<page>.jpg` in the current directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Page to render (1-indexed).
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    page: u64,

    /// Zoom over 72 DPI (2 = 144 DPI).
    #[arg(long, env = "IMGKIT_ZOOM", default_value_t = 2.0)]
    zoom: f32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "IMGKIT_PASSWORD")]
    password: Option<String>,

    /// JPEG quality (1–100).
    #[arg(long, env = "IMGKIT_QUALITY", default_value_t = 100,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "IMGKIT_PASSWORD")]
    password: Option<String>,

    /// Print as JSON.
    #[arg(long)]
    json: bool,
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .trim()
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let w: u32 = w.trim().parse().map_err(|_| format!("invalid width '{w}'"))?;
    let h: u32 = h.trim().parse().map_err(|_| format!("invalid height '{h}'"))?;
    if w == 0 || h == 0 {
        return Err(format!("canvas must be at least 1x1, got {w}x{h}"));
    }
    Ok((w, h))
}

fn parse_grid(s: &str) -> Result<GridChoice, String> {
    if s.trim().eq_ignore_ascii_case("auto") {
        Ok(GridChoice::Auto)
    } else {
        s.parse().map(GridChoice::Fixed)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = match &cli.command {
        Command::Collage(args) => !cli.quiet && !args.no_progress && !args.json,
        _ => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let loader = LoaderConfig {
        download_timeout_secs: cli.download_timeout,
        ..LoaderConfig::default()
    };

    match cli.command {
        Command::Collage(args) => run_collage(args, loader, show_progress, cli.quiet).await,
        Command::Grid(args) => run_grid(args),
        Command::Adjust(args) => {
            let config = AdjustConfig {
                brightness: args.brightness,
                blur_sigma: args.blur,
                jpeg_quality: args.quality,
                loader,
            };
            let written = adjust_file(&args.input, &args.output, &config)
                .await
                .context("Adjust failed")?;
            report_written(&written, cli.quiet);
            Ok(())
        }
        Command::Alpha(args) => {
            let config = TransparencyConfig {
                opacity: args.opacity,
                background: args.background,
                flattened_output: args.flatten,
                jpeg_quality: args.quality,
                loader,
            };
            let out = transparency_file(&args.input, &args.output, &config)
                .await
                .context("Transparency failed")?;
            report_written(&out.translucent, cli.quiet);
            if let Some(ref flat) = out.flattened {
                report_written(flat, cli.quiet);
            }
            Ok(())
        }
        Command::ToPdf(args) => {
            let config = PdfExportConfig {
                resolution: args.resolution,
                loader,
            };
            let written = image_to_pdf(&args.input, &args.output, &config)
                .await
                .context("Image to PDF conversion failed")?;
            report_written(&written, cli.quiet);
            Ok(())
        }
        Command::FromPdf(args) => {
            let page = args.page as usize;
            let output = args.output.unwrap_or_else(|| {
                edgequake_imgkit::pipeline::render::default_page_filename(
                    std::path::Path::new(&args.input),
                    page,
                    "jpg",
                )
            });
            let config = PdfRasterConfig {
                page,
                zoom: args.zoom,
                password: args.password,
                jpeg_quality: args.quality,
                download_timeout_secs: cli.download_timeout,
            };
            let written = pdf_to_image(&args.input, &output, &config)
                .await
                .context("PDF rendering failed")?;
            report_written(&written, cli.quiet);
            Ok(())
        }
        Command::Inspect(args) => run_inspect(args, cli.download_timeout).await,
    }
}

async fn run_collage(
    args: CollageArgs,
    loader: LoaderConfig,
    show_progress: bool,
    quiet: bool,
) -> Result<()> {
    let (width, height) = args.size;
    let canvas = CanvasSpec::new(width, height)
        .with_spacing(args.margin, args.col_spacing, args.row_spacing)
        .with_background(args.background);
    let crop = if args.crop {
        CropSpec::square(args.gravity)
    } else {
        CropSpec::none()
    };

    let mut builder = CollageConfig::builder()
        .canvas(canvas)
        .crop(crop)
        .output_format(OutputFormat::Jpeg {
            quality: args.quality,
        })
        .download_timeout_secs(loader.download_timeout_secs)
        .max_source_bytes(args.max_source_mb.saturating_mul(1024 * 1024));
    builder = match args.grid {
        GridChoice::Auto => builder.auto_grid(),
        GridChoice::Fixed(shape) => builder.grid(shape),
    };
    if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new();
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    let report = build_collage_to_file(&args.sources, &args.output, &config)
        .await
        .context("Collage failed")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !quiet {
        let stats = &report.stats;
        eprintln!(
            "{}  {}/{} placed  {}x{} cells  {}ms  →  {}",
            if stats.skipped == 0 { green("✔") } else { cyan("⚠") },
            stats.placed,
            stats.total_sources,
            stats.cell_width,
            stats.cell_height,
            stats.duration_ms,
            bold(&args.output.display().to_string()),
        );
        if stats.ignored_sources > 0 {
            eprintln!(
                "   {}",
                dim(&format!(
                    "{} source(s) did not fit the grid and were ignored",
                    stats.ignored_sources
                ))
            );
        }
    }
    Ok(())
}

fn run_grid(args: GridArgs) -> Result<()> {
    let (width, height) = args.size;
    let solution = solve_for_canvas(args.count, width, height)
        .context("A grid needs at least one image")?;
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&solution).context("Failed to serialise grid")?
        );
    } else {
        println!("Grid:     {}", solution.shape);
        println!("Formula:  {:?}", solution.formula);
        println!("Empty:    {}", solution.error);
    }
    Ok(())
}

async fn run_inspect(args: InspectArgs, download_timeout: u64) -> Result<()> {
    let info = inspect_pdf(&args.input, args.password.as_deref(), download_timeout)
        .await
        .context("Failed to inspect PDF")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&info).context("Failed to serialize metadata")?
        );
        return Ok(());
    }

    println!("File:         {}", args.input);
    if let Some(ref t) = info.title {
        println!("Title:        {}", t);
    }
    if let Some(ref a) = info.author {
        println!("Author:       {}", a);
    }
    println!("Pages:        {}", info.page_count);
    println!("PDF Version:  {}", info.pdf_version);
    if let Some(ref p) = info.producer {
        println!("Producer:     {}", p);
    }
    if let Some(ref c) = info.creator {
        println!("Creator:      {}", c);
    }
    for (i, page) in info.pages.iter().enumerate() {
        let (w, h) = page.pixels_at(2.0);
        println!(
            "  p{:<4} {:>7.1} x {:<7.1} pt  {}",
            i + 1,
            page.width,
            page.height,
            dim(&format!("({w}x{h} px at zoom 2)"))
        );
    }
    Ok(())
}

fn report_written(written: &WrittenFile, quiet: bool) {
    if quiet {
        return;
    }
    eprintln!(
        "{}  {} {}x{}  {} bytes  →  {}",
        green("✔"),
        written.format,
        written.width,
        written.height,
        written.bytes,
        bold(&written.path.display().to_string()),
    );
}
