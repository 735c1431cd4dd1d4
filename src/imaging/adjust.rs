//! Per-pixel tone adjustments: modulation and linear transforms.
//!
//! Channels are normalized to `[0, 1]` before the formula is applied and
//! clamped afterwards. Alpha is never touched. The result keeps the source's
//! bit depth class (8-bit, 16-bit or float), widened to RGBA.

use image::{ColorType, DynamicImage};

/// Rec.709 luma weights.
const LUMA: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Brightness multiplier for a `[-1, 1]` adjustment: `0` means no change.
pub fn brightness_multiplier(value: f64) -> f64 {
    value + 1.0
}

/// Saturation multiplier for a `[-1, 1]` adjustment: `0` means no change.
pub fn saturation_multiplier(value: f64) -> f64 {
    value + 1.0
}

/// Slope and intercept for a `[-1, 1]` contrast adjustment.
///
/// The slope is `contrast + 1`. The intercept keeps mid-grey (0.5) fixed:
/// `0.5 - 0.5 * slope`.
pub fn contrast_coefficients(contrast: f64) -> (f64, f64) {
    let slope = contrast + 1.0;
    (slope, -(0.5 * slope) + 0.5)
}

fn map_rgb(img: &DynamicImage, f: impl Fn([f32; 3]) -> [f32; 3]) -> DynamicImage {
    let mut buf = img.to_rgba32f();
    for px in buf.pixels_mut() {
        let [r, g, b, a] = px.0;
        let [r, g, b] = f([r, g, b]);
        px.0 = [r.clamp(0.0, 1.0), g.clamp(0.0, 1.0), b.clamp(0.0, 1.0), a];
    }
    restore_depth(img.color(), DynamicImage::ImageRgba32F(buf))
}

fn restore_depth(original: ColorType, adjusted: DynamicImage) -> DynamicImage {
    match original {
        ColorType::Rgb32F | ColorType::Rgba32F => adjusted,
        ColorType::L16 | ColorType::La16 | ColorType::Rgb16 | ColorType::Rgba16 => {
            DynamicImage::ImageRgba16(adjusted.to_rgba16())
        }
        _ => DynamicImage::ImageRgba8(adjusted.to_rgba8()),
    }
}

/// Multiply every color channel by `multiplier`.
pub fn modulate_brightness(img: &DynamicImage, multiplier: f64) -> DynamicImage {
    let m = multiplier as f32;
    map_rgb(img, |[r, g, b]| [r * m, g * m, b * m])
}

/// Scale each channel's distance from the pixel's luma by `multiplier`.
pub fn modulate_saturation(img: &DynamicImage, multiplier: f64) -> DynamicImage {
    let m = multiplier as f32;
    map_rgb(img, |[r, g, b]| {
        let luma = LUMA[0] * r + LUMA[1] * g + LUMA[2] * b;
        [
            luma + (r - luma) * m,
            luma + (g - luma) * m,
            luma + (b - luma) * m,
        ]
    })
}

/// Apply `c' = slope·c + intercept` to every color channel.
pub fn linear(img: &DynamicImage, slope: f64, intercept: f64) -> DynamicImage {
    let (a, b) = (slope as f32, intercept as f32);
    map_rgb(img, |[r, g, bl]| [a * r + b, a * g + b, a * bl + b])
}
