//! Shared test utilities for the image-tools test suite.
//!
//! Synthetic fixtures are generated in code so tests never depend on binary
//! files in the repository.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let path = tmp.path().join("a.png");
//! create_test_png(&path, 40, 30);
//! assert_eq!(text_lines(&response), vec![format!("Resized {} → ...", path.display())]);
//! ```

use crate::tools::ToolResponse;
use image::{GrayAlphaImage, ImageEncoder, LumaA, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::Path;

// =========================================================================
// Fixture setup
// =========================================================================

/// Create a small valid JPEG file with the given dimensions.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Create a small RGBA PNG whose pixels encode their own coordinates.
///
/// Every column has a distinct red value, so mirrored output can be checked
/// pixel-for-pixel against the source.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            64,
            255,
        ])
    });
    img.save(path).unwrap();
}

/// Create a grayscale-with-alpha PNG (LumaA8).
pub fn create_test_gray_alpha_png(path: &Path, width: u32, height: u32) {
    let img = GrayAlphaImage::from_fn(width, height, |x, y| {
        LumaA([((x + y) * 16 % 256) as u8, 200])
    });
    img.save(path).unwrap();
}

// =========================================================================
// Response helpers
// =========================================================================

/// All text entries of a tool response, in order.
pub fn text_lines(response: &ToolResponse) -> Vec<&str> {
    response.content.iter().map(|c| c.text()).collect()
}
