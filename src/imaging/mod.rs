//! Image processing in pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `ImageReader::into_dimensions` |
//! | **Resize / crop / pad** | `resize_exact` (Lanczos3) + [`plan_resize`](calculations::plan_resize) |
//! | **Rotate** | lossless quarter turns, `imageproc` for other angles |
//! | **Tone** | modulate / linear in [`adjust`] |
//! | **Encode** | `jpeg-encoder`, `image` codecs |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: The [`Pipeline`] builder and the types it carries
//! - **Adjust**: Per-pixel tone formulas
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod adjust;
pub mod backend;
pub mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use params::{
    AvifOptions, EncoderOptions, FitMode, JpegOptions, MetadataPolicy, Modulation, Operation,
    OutputFormat, Pipeline, PngOptions, Quality, ResizeSpec, Sharpening, WebpOptions,
};
pub use rust_backend::{EncodingDefaults, RustBackend};
