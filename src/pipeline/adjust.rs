//! Brightness and Gaussian blur.

use crate::config::AdjustConfig;
use image::{DynamicImage, Pixel};
use tracing::debug;

/// Multiply every colour channel by `factor`, saturating at 255. Alpha is
/// left alone. `factor` below zero is treated as zero.
pub fn brighten(img: &DynamicImage, factor: f32) -> DynamicImage {
    let factor = factor.max(0.0);
    let scale = |c: u8| (c as f32 * factor).round().clamp(0.0, 255.0) as u8;

    if img.color().has_alpha() {
        let mut buf = img.to_rgba8();
        for px in buf.pixels_mut() {
            let [r, g, b, a] = px.0;
            px.0 = [scale(r), scale(g), scale(b), a];
        }
        DynamicImage::ImageRgba8(buf)
    } else {
        let mut buf = img.to_rgb8();
        for px in buf.pixels_mut() {
            px.apply(scale);
        }
        DynamicImage::ImageRgb8(buf)
    }
}

/// Brightness first, then blur, the order the two filters compose in.
pub fn adjust(img: &DynamicImage, config: &AdjustConfig) -> DynamicImage {
    debug!(
        "Adjusting {}x{} image: brightness {}, blur σ {}",
        img.width(),
        img.height(),
        config.brightness,
        config.blur_sigma
    );
    let out = if (config.brightness - 1.0).abs() > f32::EPSILON {
        brighten(img, config.brightness)
    } else {
        img.clone()
    };
    if config.blur_sigma > 0.0 {
        out.blur(config.blur_sigma)
    } else {
        out
    }
}
