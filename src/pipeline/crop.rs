//! Square cropping with gravity.
//!
//! Gravity picks where along the longer axis the square is taken:
//! `0.0` keeps the top (or left) edge, `1.0` the bottom (or right), `0.5`
//! the centre.

use crate::config::clamp_gravity;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Pixel rectangle inside a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropBox {
    /// Bottom-right corner (exclusive).
    pub fn end(&self) -> (u32, u32) {
        (self.x + self.width, self.y + self.height)
    }
}

/// The square box `crop_to_square` would cut from a `width × height` image.
pub fn square_crop_box(width: u32, height: u32, gravity: f32) -> CropBox {
    let g = clamp_gravity(gravity);
    let side = width.min(height);

    // floor((len - side) * g); the product is non-negative and below len
    let offset = |len: u32| ((len - side) as f64 * g as f64).floor() as u32;

    let (x, y) = if width > height {
        (offset(width), 0)
    } else if height > width {
        (0, offset(height))
    } else {
        (0, 0)
    };

    CropBox {
        x,
        y,
        width: side,
        height: side,
    }
}

/// Cut the largest square out of `img`. Square input is returned unchanged.
pub fn crop_to_square(img: DynamicImage, gravity: f32) -> DynamicImage {
    if img.width() == img.height() {
        return img;
    }
    let b = square_crop_box(img.width(), img.height(), gravity);
    img.crop_imm(b.x, b.y, b.width, b.height)
}
