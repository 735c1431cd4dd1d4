//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, GIF) | `image::ImageReader` with content sniffing |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3`, then crop or pad per [`plan_resize`] |
//! | Rotate (multiples of 90°) | `DynamicImage::rotate90/180/270` (lossless) |
//! | Rotate (other angles) | `imageproc::geometric_transformations::rotate_about_center` on an expanded canvas |
//! | Flip / flop | `DynamicImage::flipv` / `fliph` |
//! | Modulate / linear | [`adjust`](super::adjust) |
//! | Blur | `DynamicImage::blur` (Gaussian) |
//! | Sharpen | `DynamicImage::unsharpen` |
//! | Encode → JPEG | `jpeg-encoder` (quality, progressive) |
//! | Encode → WebP with quality | `webp::Encoder` (lossy, libwebp) |
//! | Encode → PNG / WebP / TIFF / GIF | `image` codecs (WebP without quality is lossless) |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e) |
//!
//! Every canvas a pipeline would allocate is checked against
//! [`within_limits`] first, and encoding happens in memory: the output file
//! is only written once the whole image encoded successfully.

use super::adjust;
use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{
    MAX_PIXELS, Placement, plan_resize, quarter_turns, rotated_bounds, within_limits,
};
use super::params::{
    EncoderOptions, MetadataPolicy, Modulation, Operation, OutputFormat, Pipeline, Quality,
};
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageFormat, ImageReader, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, instrument};

/// Canvas fill for padding and rotation corners: opaque black.
const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Accepted Gaussian blur sigma range.
const BLUR_SIGMA_RANGE: std::ops::RangeInclusive<f64> = 0.3..=1000.0;

/// libwebp's per-edge limit.
const WEBP_MAX_DIMENSION: u32 = 16_383;

/// Encoder defaults used when a pipeline leaves a setting unspecified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodingDefaults {
    pub jpeg_quality: Quality,
    pub avif_quality: Quality,
    /// rav1e speed, 1 (slowest) to 10 (fastest).
    pub avif_speed: u8,
}

impl Default for EncodingDefaults {
    fn default() -> Self {
        Self {
            jpeg_quality: Quality::new(80),
            avif_quality: Quality::new(50),
            avif_speed: 6,
        }
    }
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend {
    defaults: EncodingDefaults,
    overwrite: bool,
}

impl RustBackend {
    pub fn new() -> Self {
        Self {
            defaults: EncodingDefaults::default(),
            overwrite: true,
        }
    }

    pub fn with_defaults(mut self, defaults: EncodingDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// When false, an existing output file is a write error instead of being replaced.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk, sniffing the format from content.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    let reader = ImageReader::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            BackendError::Open(format!("Input file is missing: {}", path.display()))
        }
        _ => BackendError::Open(format!("Failed to open {}: {}", path.display(), e)),
    })?;
    reader
        .with_guessed_format()
        .map_err(|e| BackendError::Open(format!("Failed to read {}: {}", path.display(), e)))?
        .decode()
        .map_err(|e| BackendError::Open(format!("Failed to decode {}: {}", path.display(), e)))
}

/// Refuse a canvas before allocating it.
fn check_canvas(width: u32, height: u32) -> Result<(), BackendError> {
    if within_limits(width, height) {
        Ok(())
    } else {
        Err(BackendError::Transform(format!(
            "Resulting image {width}x{height} exceeds the limit of {MAX_PIXELS} pixels"
        )))
    }
}

/// Rotate clockwise by `degrees`, expanding the canvas for non-right angles.
fn rotate(img: DynamicImage, degrees: f64) -> Result<DynamicImage, BackendError> {
    let rotated = match quarter_turns(degrees) {
        Some(0) => img,
        Some(1) => img.rotate90(),
        Some(2) => img.rotate180(),
        Some(_) => img.rotate270(),
        None => {
            let (w, h) = (img.width(), img.height());
            let (bw, bh) = rotated_bounds(w, h, degrees);
            // Work on a canvas large enough for both the source and the result,
            // so nothing is clipped before the rotation.
            let (cw, ch) = (w.max(bw), h.max(bh));
            check_canvas(cw, ch)?;
            let mut canvas = RgbaImage::from_pixel(cw, ch, BACKGROUND);
            image::imageops::overlay(
                &mut canvas,
                &img.to_rgba8(),
                ((cw - w) / 2) as i64,
                ((ch - h) / 2) as i64,
            );
            let rotated = rotate_about_center(
                &canvas,
                degrees.to_radians() as f32,
                Interpolation::Bilinear,
                BACKGROUND,
            );
            DynamicImage::ImageRgba8(rotated).crop_imm((cw - bw) / 2, (ch - bh) / 2, bw, bh)
        }
    };
    Ok(rotated)
}

fn apply(img: DynamicImage, op: &Operation) -> Result<DynamicImage, BackendError> {
    debug!(?op, "applying");
    let out = match *op {
        Operation::Resize(ref spec) => {
            let plan = plan_resize((img.width(), img.height()), spec);
            check_canvas(plan.width, plan.height)?;
            let (out_w, out_h) = plan.output_dimensions();
            check_canvas(out_w, out_h)?;
            let scaled = if (plan.width, plan.height) == (img.width(), img.height()) {
                img
            } else {
                img.resize_exact(plan.width, plan.height, FilterType::Lanczos3)
            };
            match plan.placement {
                Placement::None => scaled,
                Placement::Crop {
                    x,
                    y,
                    width,
                    height,
                } => scaled.crop_imm(x, y, width, height),
                Placement::Pad {
                    canvas_width,
                    canvas_height,
                    x,
                    y,
                } => {
                    let mut canvas = RgbaImage::from_pixel(canvas_width, canvas_height, BACKGROUND);
                    image::imageops::overlay(&mut canvas, &scaled.to_rgba8(), x as i64, y as i64);
                    DynamicImage::ImageRgba8(canvas)
                }
            }
        }
        Operation::Rotate(degrees) => rotate(img, degrees)?,
        Operation::Flip => img.flipv(),
        Operation::Flop => img.fliph(),
        Operation::Modulate(Modulation::Brightness(m)) => adjust::modulate_brightness(&img, m),
        Operation::Modulate(Modulation::Saturation(m)) => adjust::modulate_saturation(&img, m),
        Operation::Linear { slope, intercept } => adjust::linear(&img, slope, intercept),
        Operation::Blur(sigma) => {
            if !BLUR_SIGMA_RANGE.contains(&sigma) {
                return Err(BackendError::Transform(format!(
                    "Expected number between 0.3 and 1000 for blur sigma but received {sigma}"
                )));
            }
            img.blur(sigma as f32)
        }
        Operation::Sharpen(sharpening) => {
            if sharpening.sigma <= 0.0 || sharpening.sigma > 10.0 {
                return Err(BackendError::Transform(format!(
                    "Expected number between 0.000001 and 10 for sharpen sigma but received {}",
                    sharpening.sigma
                )));
            }
            img.unsharpen(sharpening.sigma, sharpening.threshold)
        }
    };
    Ok(out)
}

/// Resolve the written format, rejecting formats without an encoder.
fn resolve_format(pipeline: &Pipeline, output: &Path) -> Result<OutputFormat, BackendError> {
    match pipeline.effective_format(output) {
        Some(OutputFormat::Heif) => Err(BackendError::Transform(
            "HEIF output is not supported: no HEIF encoder is available".to_string(),
        )),
        Some(format) => Ok(format),
        None => Err(BackendError::Transform(format!(
            "Unsupported output format: {}",
            output
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_else(|| "(no extension)".to_string())
        ))),
    }
}

fn png_compression(level: Option<u8>) -> CompressionType {
    match level {
        None => CompressionType::Default,
        Some(0..=3) => CompressionType::Fast,
        Some(4..=6) => CompressionType::Default,
        Some(_) => CompressionType::Best,
    }
}

/// Float images have no 8/16-bit encoder path; widen them to RGBA16.
fn integer_depth(img: &DynamicImage) -> DynamicImage {
    match img.color() {
        ColorType::Rgb32F | ColorType::Rgba32F => DynamicImage::ImageRgba16(img.to_rgba16()),
        _ => img.clone(),
    }
}

/// The TIFF encoder has no gray+alpha layout; widen those to RGBA.
fn tiff_layout(img: &DynamicImage) -> DynamicImage {
    match img.color() {
        ColorType::La8 => DynamicImage::ImageRgba8(img.to_rgba8()),
        ColorType::La16 => DynamicImage::ImageRgba16(img.to_rgba16()),
        _ => integer_depth(img),
    }
}

fn encode_failed(format: OutputFormat, e: impl std::fmt::Display) -> BackendError {
    BackendError::Write(format!("{} encode failed: {}", format.as_str().to_uppercase(), e))
}

/// Encode `img` as `format` into memory.
fn encode_image(
    img: &DynamicImage,
    format: OutputFormat,
    encoder: &EncoderOptions,
    defaults: &EncodingDefaults,
) -> Result<Vec<u8>, BackendError> {
    let mut buf = Cursor::new(Vec::new());

    match format {
        OutputFormat::Jpeg => {
            let rgb = img.to_rgb8();
            let (w, h) = rgb.dimensions();
            let (w, h) = match (u16::try_from(w), u16::try_from(h)) {
                (Ok(w), Ok(h)) => (w, h),
                _ => {
                    return Err(BackendError::Write(format!(
                        "JPEG output is limited to 65535x65535, got {w}x{h}"
                    )));
                }
            };
            let quality = encoder.jpeg.quality.unwrap_or(defaults.jpeg_quality);
            let mut jpeg = jpeg_encoder::Encoder::new(&mut buf, quality.value() as u8);
            jpeg.set_progressive(encoder.jpeg.progressive);
            jpeg.encode(rgb.as_raw(), w, h, jpeg_encoder::ColorType::Rgb)
                .map_err(|e| encode_failed(format, e))?;
        }
        OutputFormat::Png => {
            if encoder.png.progressive {
                debug!("interlaced PNG output is not available; writing non-interlaced");
            }
            let png = PngEncoder::new_with_quality(
                &mut buf,
                png_compression(encoder.png.compression_level),
                PngFilter::Adaptive,
            );
            integer_depth(img)
                .write_with_encoder(png)
                .map_err(|e| encode_failed(format, e))?;
        }
        OutputFormat::Webp => {
            let rgba = img.to_rgba8();
            let (w, h) = rgba.dimensions();
            if w > WEBP_MAX_DIMENSION || h > WEBP_MAX_DIMENSION {
                return Err(BackendError::Write(format!(
                    "WebP output is limited to {WEBP_MAX_DIMENSION}x{WEBP_MAX_DIMENSION}, got {w}x{h}"
                )));
            }
            match encoder.webp.quality {
                Some(quality) => {
                    let memory = webp::Encoder::from_rgba(rgba.as_raw(), w, h)
                        .encode_simple(false, quality.value() as f32)
                        .map_err(|e| encode_failed(format, format!("{e:?}")))?;
                    return Ok(memory.to_vec());
                }
                None => {
                    let webp = image::codecs::webp::WebPEncoder::new_lossless(&mut buf);
                    DynamicImage::ImageRgba8(rgba)
                        .write_with_encoder(webp)
                        .map_err(|e| encode_failed(format, e))?;
                }
            }
        }
        OutputFormat::Tiff => tiff_layout(img)
            .write_to(&mut buf, ImageFormat::Tiff)
            .map_err(|e| encode_failed(format, e))?,
        OutputFormat::Gif => DynamicImage::ImageRgba8(img.to_rgba8())
            .write_to(&mut buf, ImageFormat::Gif)
            .map_err(|e| encode_failed(format, e))?,
        OutputFormat::Avif => {
            let quality = encoder.avif.quality.unwrap_or(defaults.avif_quality);
            let avif = image::codecs::avif::AvifEncoder::new_with_speed_quality(
                &mut buf,
                defaults.avif_speed,
                quality.value() as u8,
            );
            DynamicImage::ImageRgba8(img.to_rgba8())
                .write_with_encoder(avif)
                .map_err(|e| encode_failed(format, e))?;
        }
        OutputFormat::Heif => {
            return Err(BackendError::Transform(
                "HEIF output is not supported: no HEIF encoder is available".to_string(),
            ));
        }
    }
    Ok(buf.into_inner())
}

/// Write encoded bytes, removing any partial file on failure.
fn write_output(path: &Path, bytes: &[u8]) -> Result<(), BackendError> {
    std::fs::write(path, bytes).map_err(|e| {
        let _ = std::fs::remove_file(path);
        BackendError::Write(format!("Failed to write {}: {}", path.display(), e))
    })
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = ImageReader::open(path)
            .map_err(|e| BackendError::Open(format!("Failed to open {}: {}", path.display(), e)))?
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|e| {
                BackendError::Open(format!("Failed to read dimensions: {}", e))
            })?;
        Ok(Dimensions { width, height })
    }

    #[instrument(skip_all, fields(source = %source.display()))]
    fn process(
        &self,
        source: &Path,
        pipeline: &Pipeline,
        output: &Path,
    ) -> Result<(), BackendError> {
        let mut img = load_image(source)?;
        let format = resolve_format(pipeline, output)?;

        if pipeline.metadata_policy() == MetadataPolicy::Keep {
            debug!("metadata retention is not available; output carries pixel data only");
        }

        for op in pipeline.operations() {
            img = apply(img, op)?;
        }

        if !self.overwrite && output.exists() {
            return Err(BackendError::Write(format!(
                "Output file already exists: {}",
                output.display()
            )));
        }

        let bytes = encode_image(&img, format, pipeline.encoder(), &self.defaults)?;
        write_output(output, &bytes)?;
        debug!(
            width = img.width(),
            height = img.height(),
            format = %format,
            "written"
        );
        Ok(())
    }
}
