//! Canvas creation, thumbnail fitting and pasting.

use crate::config::Color;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};

/// Size an image of `width × height` takes when fitted into the box,
/// keeping its aspect ratio. Images already inside the box keep their size.
pub fn fit_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }
    let scale = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );
    let w = ((width as f64 * scale).round() as u32).clamp(1, max_width.max(1));
    let h = ((height as f64 * scale).round() as u32).clamp(1, max_height.max(1));
    (w, h)
}

/// Downscale `img` with Lanczos3 so it fits the box. Never enlarges.
pub fn fit_into(img: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    let (w, h) = fit_dimensions(img.width(), img.height(), max_width, max_height);
    if (w, h) == (img.width(), img.height()) {
        return img;
    }
    img.resize_exact(w, h, FilterType::Lanczos3)
}

/// A fresh canvas filled with the opaque background colour.
pub fn new_canvas(width: u32, height: u32, background: Color) -> RgbaImage {
    RgbaImage::from_pixel(width, height, background.to_rgba())
}

/// Alpha-blend `img` onto the canvas with its top-left corner at `(x, y)`.
/// Parts falling outside the canvas are clipped.
pub fn paste(canvas: &mut RgbaImage, img: &DynamicImage, x: u32, y: u32) {
    let top = img.to_rgba8();
    imageops::overlay(canvas, &top, x as i64, y as i64);
}
