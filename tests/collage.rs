//! Integration tests for the collage builder.
//!
//! Everything here runs against images written to a scratch directory, so no
//! network or pdfium is needed.
//!
//! Run with:
//!   cargo test --test collage -- --nocapture

use edgequake_imgkit::{
    build_collage, build_collage_sync, build_collage_to_file, build_collage_to_file_with,
    build_collage_with, save_collage, CellStatus, CollageConfig, CollageProgressCallback, Color,
    CropSpec, GridShape, ImgkitError, MemoryLoader, OutputFormat, ProgressCallback, SourceError,
};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn write_image(dir: &Path, name: &str, w: u32, h: u32, px: [u8; 3]) -> String {
    let path = dir.join(name);
    RgbImage::from_pixel(w, h, Rgb(px)).save(&path).unwrap();
    path.to_string_lossy().to_string()
}

fn sources(dir: &Path, n: usize) -> Vec<String> {
    (0..n)
        .map(|i| write_image(dir, &format!("img{i}.png"), 120, 80, [(i * 20) as u8, 90, 200]))
        .collect()
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

// ── Fatal errors ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_empty_sources_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let out: PathBuf = dir.path().join("collage.jpg");
    let config = CollageConfig::default();
    let empty: Vec<String> = Vec::new();

    let err = build_collage_to_file(&empty, &out, &config)
        .await
        .unwrap_err();
    assert!(matches!(err, ImgkitError::InvalidConfig(_)), "got {err:?}");
    assert!(!out.exists());
    assert_eq!(count_files(dir.path()), 0);
}

#[tokio::test]
async fn test_degenerate_canvas_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let srcs = sources(dir.path(), 2);
    let out = dir.path().join("collage.jpg");
    let config = CollageConfig::builder()
        .size(50, 50)
        .spacing(30, 0, 0)
        .build()
        .unwrap();

    let err = build_collage_to_file(&srcs, &out, &config)
        .await
        .unwrap_err();
    match err {
        ImgkitError::InvalidConfig(msg) => assert!(msg.contains("width"), "{msg}"),
        other => panic!("unexpected {other:?}"),
    }
    assert!(!out.exists());
}

// ── Partial failures ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_one_missing_source_among_many() {
    let dir = tempfile::tempdir().unwrap();
    let mut srcs = sources(dir.path(), 5);
    srcs.insert(2, dir.path().join("nope.jpg").to_string_lossy().to_string());

    let config = CollageConfig::builder()
        .size(600, 400)
        .grid(GridShape::new(2, 3))
        .build()
        .unwrap();
    let out = build_collage(&srcs, &config).await.unwrap();

    assert_eq!(out.report.stats.placed, 5);
    assert_eq!(out.report.stats.skipped, 1);
    assert_eq!(out.report.cells.len(), 6);
    assert!(matches!(
        out.report.cells[2].status,
        CellStatus::Unavailable {
            error: SourceError::NotFound { .. }
        }
    ));
    assert_eq!(out.image.dimensions(), (600, 400));
}

#[tokio::test]
async fn test_undecodable_source_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let mut srcs = sources(dir.path(), 1);
    let bogus = dir.path().join("bogus.jpg");
    std::fs::write(&bogus, b"<html>not an image</html>").unwrap();
    srcs.push(bogus.to_string_lossy().to_string());

    let config = CollageConfig::builder().size(200, 100).build().unwrap();
    let out = build_collage(&srcs, &config).await.unwrap();

    assert_eq!(out.report.stats.placed, 1);
    let errors: Vec<&SourceError> = out.report.unavailable().collect();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], SourceError::Decode { .. }));
}

// ── Output files ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_writes_jpeg_with_canvas_size() {
    let dir = tempfile::tempdir().unwrap();
    let srcs = sources(dir.path(), 9);
    let out = dir.path().join("out/collage.jpg");
    let config = CollageConfig::builder().size(900, 600).build().unwrap();

    let report = build_collage_to_file(&srcs, &out, &config).await.unwrap();
    assert_eq!(report.stats.placed, 9);

    let bytes = std::fs::read(&out).unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    let img = image::open(&out).unwrap();
    assert_eq!(img.dimensions(), (900, 600));
}

#[tokio::test]
async fn test_png_extension_writes_png() {
    let dir = tempfile::tempdir().unwrap();
    let srcs = sources(dir.path(), 2);
    let out = dir.path().join("collage.png");
    let config = CollageConfig::builder()
        .size(300, 200)
        .background(Color::BLACK)
        .build()
        .unwrap();

    build_collage_to_file(&srcs, &out, &config).await.unwrap();
    let img = image::open(&out).unwrap().to_rgba8();
    // frame margin stays background
    assert_eq!(img.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
}

#[tokio::test]
async fn test_unknown_extension_uses_configured_format() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("collage.out");
    let config = CollageConfig::builder()
        .size(40, 40)
        .spacing(0, 0, 0)
        .output_format(OutputFormat::Png)
        .build()
        .unwrap();
    let loader =
        MemoryLoader::new().with("a", DynamicImage::ImageRgba8(RgbaImage::new(10, 10)));

    build_collage_to_file_with(loader, &["a"], &out, &config)
        .await
        .unwrap();
    let bytes = std::fs::read(&out).unwrap();
    assert_eq!(&bytes[1..4], b"PNG");
}

#[tokio::test]
async fn test_build_then_save() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested/collage.png");
    let config = CollageConfig::builder().size(120, 60).build().unwrap();
    let loader = MemoryLoader::new()
        .with("a", DynamicImage::ImageRgba8(RgbaImage::new(30, 30)))
        .with("b", DynamicImage::ImageRgba8(RgbaImage::new(30, 30)));

    let output = build_collage_with(loader, &["a", "b"], &config).await.unwrap();
    assert!(!out.exists());
    let report = save_collage(output, &out, &config).await.unwrap();
    assert_eq!(report.stats.placed, 2);
    assert_eq!(image::open(&out).unwrap().dimensions(), (120, 60));
}

#[tokio::test]
async fn test_unwritable_output_is_fatal_and_leaves_no_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    // the output path is an existing directory, so the final rename fails
    let out = dir.path().join("collage.jpg");
    std::fs::create_dir(&out).unwrap();
    let config = CollageConfig::builder().size(60, 60).build().unwrap();
    let loader = MemoryLoader::new().with("a", DynamicImage::ImageRgba8(RgbaImage::new(10, 10)));

    let err = build_collage_to_file_with(loader, &["a"], &out, &config)
        .await
        .unwrap_err();
    match err {
        ImgkitError::OutputWriteFailed { path, .. } => assert_eq!(path, out),
        other => panic!("unexpected {other:?}"),
    }

    let entries: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(entries, vec!["collage.jpg".to_string()]);
    assert!(out.is_dir());
    assert_eq!(count_files(&out), 0);
}

// ── Grid selection ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_auto_grid_orients_for_portrait() {
    let dir = tempfile::tempdir().unwrap();
    let srcs = sources(dir.path(), 8);

    let landscape = CollageConfig::builder().size(1000, 500).build().unwrap();
    let out = build_collage(&srcs, &landscape).await.unwrap();
    assert_eq!(out.grid, GridShape::new(2, 4));

    let portrait = CollageConfig::builder().size(500, 1000).build().unwrap();
    let out = build_collage(&srcs, &portrait).await.unwrap();
    assert_eq!(out.grid, GridShape::new(4, 2));
    assert_eq!(out.report.stats.placed, 8);
}

#[tokio::test]
async fn test_crop_makes_square_thumbnails() {
    let dir = tempfile::tempdir().unwrap();
    let srcs = sources(dir.path(), 4);
    let config = CollageConfig::builder()
        .size(420, 420)
        .grid(GridShape::new(2, 2))
        .crop(CropSpec::square(0.0))
        .build()
        .unwrap();

    let out = build_collage(&srcs, &config).await.unwrap();
    for cell in &out.report.cells {
        match cell.status {
            CellStatus::Placed { width, height, .. } => assert_eq!(width, height),
            ref other => panic!("cell {} not placed: {other:?}", cell.index),
        }
    }
}

// ── Progress & sync API ──────────────────────────────────────────────────────

#[derive(Default)]
struct Completed(AtomicUsize);

impl CollageProgressCallback for Completed {
    fn on_collage_complete(&self, _total: usize, placed_count: usize) {
        self.0.store(placed_count, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_callback_send_in_tokio_spawn() {
    let dir = tempfile::tempdir().unwrap();
    let srcs = sources(dir.path(), 3);
    let cb = Arc::new(Completed::default());
    let config = CollageConfig::builder()
        .size(300, 100)
        .progress_callback(cb.clone() as ProgressCallback)
        .build()
        .unwrap();

    let handle = tokio::spawn(async move { build_collage(&srcs, &config).await });
    let out = handle.await.unwrap().unwrap();
    assert_eq!(out.report.stats.placed, 3);
    assert_eq!(cb.0.load(Ordering::SeqCst), 3);
}

#[test]
fn test_sync_wrapper() {
    let dir = tempfile::tempdir().unwrap();
    let srcs = sources(dir.path(), 2);
    let config = CollageConfig::builder().size(200, 100).build().unwrap();
    let out = build_collage_sync(&srcs, &config).unwrap();
    assert_eq!(out.report.stats.placed, 2);
}

#[tokio::test]
async fn test_report_is_json_serialisable() {
    let dir = tempfile::tempdir().unwrap();
    let mut srcs = sources(dir.path(), 1);
    srcs.push("/missing/file.png".to_string());
    let config = CollageConfig::builder().size(200, 100).build().unwrap();

    let out = build_collage(&srcs, &config).await.unwrap();
    let json = serde_json::to_value(&out.report).unwrap();
    assert_eq!(json["cells"][0]["status"]["status"], "placed");
    assert_eq!(json["cells"][1]["status"]["status"], "unavailable");
    assert_eq!(json["stats"]["placed"], 1);
}
