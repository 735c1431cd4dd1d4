//! Parameter types for image operations.
//!
//! These types describe *what* to do, not *how* to do it. A [`Pipeline`] is
//! the interface between the [`tools`](crate::tools) (which decide which steps
//! a request needs) and the [`backend`](super::backend) (which does the pixel
//! work). Keeping the operation list explicit lets tests inspect exactly what
//! a tool asked for using a mock backend.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100). Clamped on construction.
//! - [`Sharpening`]: Unsharp-mask parameters (sigma + threshold).
//! - [`FitMode`]: How a target box is reconciled with the source aspect ratio.
//! - [`OutputFormat`]: Encodable target formats.
//! - [`Operation`]: One named step of a pipeline.
//! - [`Pipeline`]: Ordered operation list plus encoder settings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// Sharpening parameters for unsharp mask.
///
/// - `sigma`: Standard deviation of the Gaussian blur (higher = more sharpening)
/// - `threshold`: Minimum brightness difference to sharpen (0 = sharpen all pixels)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sharpening {
    pub sigma: f32,
    pub threshold: i32,
}

impl Sharpening {
    /// Sharpening driven by a 0–100 intensity, mapped to `sigma = intensity / 20`.
    pub fn from_intensity(intensity: f64) -> Self {
        Self {
            sigma: (intensity / 20.0) as f32,
            threshold: 0,
        }
    }
}

/// Policy for reconciling a target width/height with the source aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Scale to fit, then letterbox to the exact target box.
    Contain,
    /// Scale to cover, then center-crop to the exact target box.
    Cover,
    /// Stretch to the exact target box, ignoring aspect ratio.
    Fill,
    /// Scale to fit within the target box, keeping aspect ratio.
    Inside,
    /// Scale so both edges reach the target box, keeping aspect ratio.
    Outside,
}

impl FitMode {
    pub const ALL: [FitMode; 5] = [
        FitMode::Contain,
        FitMode::Cover,
        FitMode::Fill,
        FitMode::Inside,
        FitMode::Outside,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FitMode::Contain => "contain",
            FitMode::Cover => "cover",
            FitMode::Fill => "fill",
            FitMode::Inside => "inside",
            FitMode::Outside => "outside",
        }
    }
}

/// Target formats a conversion may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    Webp,
    Tiff,
    Gif,
    Avif,
    Heif,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 7] = [
        OutputFormat::Jpeg,
        OutputFormat::Png,
        OutputFormat::Webp,
        OutputFormat::Tiff,
        OutputFormat::Gif,
        OutputFormat::Avif,
        OutputFormat::Heif,
    ];

    /// Format name, also used verbatim as the converted file's extension.
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
            OutputFormat::Tiff => "tiff",
            OutputFormat::Gif => "gif",
            OutputFormat::Avif => "avif",
            OutputFormat::Heif => "heif",
        }
    }

    pub fn extension(self) -> &'static str {
        self.as_str()
    }

    /// Infer the format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "jpe" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            "webp" => Some(OutputFormat::Webp),
            "tif" | "tiff" => Some(OutputFormat::Tiff),
            "gif" => Some(OutputFormat::Gif),
            "avif" => Some(OutputFormat::Avif),
            "heif" | "heic" => Some(OutputFormat::Heif),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target box for a resize. Either edge may be left to the source ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeSpec {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit: FitMode,
    /// When false, the scale factor is capped at 1.
    pub allow_enlargement: bool,
}

/// Channels a modulation multiplies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Modulation {
    Brightness(f64),
    Saturation(f64),
}

/// One step in a [`Pipeline`], applied in list order.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Resize(ResizeSpec),
    /// Clockwise rotation in degrees.
    Rotate(f64),
    /// Mirror about the horizontal axis (top ↔ bottom).
    Flip,
    /// Mirror about the vertical axis (left ↔ right).
    Flop,
    Modulate(Modulation),
    /// `c' = slope·c + intercept` on channels normalized to `[0, 1]`.
    Linear { slope: f64, intercept: f64 },
    /// Gaussian blur with the given sigma.
    Blur(f64),
    Sharpen(Sharpening),
}

/// Whether metadata from the source should be carried into the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MetadataPolicy {
    #[default]
    Strip,
    Keep,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JpegOptions {
    pub quality: Option<Quality>,
    pub progressive: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PngOptions {
    /// zlib effort, 0 (fastest) to 9 (smallest).
    pub compression_level: Option<u8>,
    pub progressive: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WebpOptions {
    pub quality: Option<Quality>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AvifOptions {
    pub quality: Option<Quality>,
}

/// Per-format encoder settings. Only the entry for the written format is used.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EncoderOptions {
    pub jpeg: JpegOptions,
    pub png: PngOptions,
    pub webp: WebpOptions,
    pub avif: AvifOptions,
}

/// Ordered list of operations plus how to encode the result.
///
/// Built fluently by each tool, then handed to
/// [`ImageBackend::process`](super::backend::ImageBackend::process) once per
/// input. Steps run in the order they were added; encoder settings and the
/// forced format only matter at the final write.
///
/// ```
/// use image_tools::imaging::{Pipeline, OutputFormat, Quality};
///
/// let pipeline = Pipeline::new()
///     .rotate(90.0)
///     .flop()
///     .to_format(OutputFormat::Webp)
///     .webp_quality(Quality::new(75));
/// assert_eq!(pipeline.operations().len(), 2);
/// assert_eq!(pipeline.format(), Some(OutputFormat::Webp));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    operations: Vec<Operation>,
    format: Option<OutputFormat>,
    encoder: EncoderOptions,
    metadata: MetadataPolicy,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, op: Operation) -> Self {
        self.operations.push(op);
        self
    }

    pub fn resize(self, spec: ResizeSpec) -> Self {
        self.push(Operation::Resize(spec))
    }

    pub fn rotate(self, degrees: f64) -> Self {
        self.push(Operation::Rotate(degrees))
    }

    pub fn flip(self) -> Self {
        self.push(Operation::Flip)
    }

    pub fn flop(self) -> Self {
        self.push(Operation::Flop)
    }

    pub fn modulate(self, modulation: Modulation) -> Self {
        self.push(Operation::Modulate(modulation))
    }

    pub fn linear(self, slope: f64, intercept: f64) -> Self {
        self.push(Operation::Linear { slope, intercept })
    }

    pub fn blur(self, sigma: f64) -> Self {
        self.push(Operation::Blur(sigma))
    }

    pub fn sharpen(self, sharpening: Sharpening) -> Self {
        self.push(Operation::Sharpen(sharpening))
    }

    /// Force the written format regardless of the output file extension.
    pub fn to_format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn metadata(mut self, policy: MetadataPolicy) -> Self {
        self.metadata = policy;
        self
    }

    pub fn jpeg_quality(mut self, quality: Quality) -> Self {
        self.encoder.jpeg.quality = Some(quality);
        self
    }

    pub fn jpeg_progressive(mut self, progressive: bool) -> Self {
        self.encoder.jpeg.progressive = progressive;
        self
    }

    pub fn png_compression(mut self, level: u8) -> Self {
        self.encoder.png.compression_level = Some(level.min(9));
        self
    }

    pub fn png_progressive(mut self, progressive: bool) -> Self {
        self.encoder.png.progressive = progressive;
        self
    }

    pub fn webp_quality(mut self, quality: Quality) -> Self {
        self.encoder.webp.quality = Some(quality);
        self
    }

    pub fn avif_quality(mut self, quality: Quality) -> Self {
        self.encoder.avif.quality = Some(quality);
        self
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn format(&self) -> Option<OutputFormat> {
        self.format
    }

    pub fn encoder(&self) -> &EncoderOptions {
        &self.encoder
    }

    pub fn metadata_policy(&self) -> MetadataPolicy {
        self.metadata
    }

    /// The format that will actually be written to `output`.
    pub fn effective_format(&self, output: &Path) -> Option<OutputFormat> {
        self.format.or_else(|| OutputFormat::from_path(output))
    }
}
