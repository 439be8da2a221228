//! Alpha scaling and flattening onto an opaque background.

use crate::config::Color;
use image::{DynamicImage, RgbImage, RgbaImage};

/// Scale every alpha value by `factor` (clamped to `[0, 1]`), truncating.
pub fn with_opacity(img: &DynamicImage, factor: f32) -> RgbaImage {
    let factor = if factor.is_nan() { 1.0 } else { factor.clamp(0.0, 1.0) };
    let mut out = img.to_rgba8();
    for px in out.pixels_mut() {
        px.0[3] = (px.0[3] as f32 * factor) as u8;
    }
    out
}

/// Blend onto `background`: `out = fg·a + bg·(1 − a)` per channel.
pub fn flatten(img: &RgbaImage, background: Color) -> RgbImage {
    let bg = [background.r, background.g, background.b];
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let [r, g, b, a] = img.get_pixel(x, y).0;
        let a = a as u32;
        let mix = |fg: u8, bg: u8| ((fg as u32 * a + bg as u32 * (255 - a) + 127) / 255) as u8;
        image::Rgb([mix(r, bg[0]), mix(g, bg[1]), mix(b, bg[2])])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba};

    fn solid(px: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 3, Rgba(px)))
    }

    #[test]
    fn opacity_scales_alpha() {
        let out = with_opacity(&solid([10, 20, 30, 255]), 0.5);
        assert_eq!(out.get_pixel(1, 1), &Rgba([10, 20, 30, 127]));
        let out = with_opacity(&solid([10, 20, 30, 255]), 0.1);
        assert_eq!(out.get_pixel(0, 0)[3], 25);
    }

    #[test]
    fn opacity_is_clamped() {
        assert_eq!(with_opacity(&solid([0, 0, 0, 200]), 4.0).get_pixel(0, 0)[3], 200);
        assert_eq!(with_opacity(&solid([0, 0, 0, 200]), -1.0).get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn opaque_rgb_gets_full_alpha_first() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([1, 2, 3])));
        assert_eq!(with_opacity(&rgb, 0.5).get_pixel(0, 0), &Rgba([1, 2, 3, 127]));
    }

    #[test]
    fn flatten_blends_with_background() {
        let fg = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0]));
        assert_eq!(flatten(&fg, Color::WHITE).get_pixel(0, 0), &Rgb([255, 255, 255]));

        let fg = RgbaImage::from_pixel(1, 1, Rgba([200, 100, 0, 255]));
        assert_eq!(flatten(&fg, Color::WHITE).get_pixel(0, 0), &Rgb([200, 100, 0]));

        let fg = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128]));
        assert_eq!(flatten(&fg, Color::WHITE).get_pixel(0, 0), &Rgb([127, 127, 127]));
    }
}
