//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations every backend must
//! support: identify (read dimensions without decoding pixels) and process
//! (decode, apply a [`Pipeline`], encode and write).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Errors are classified by
//! the stage that failed so callers can report open, transform and write
//! failures distinctly.

use super::params::Pipeline;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The source is missing, unreadable, or not a decodable image.
    #[error("{0}")]
    Open(String),
    /// A pipeline step or encoder setting cannot be applied to this image.
    #[error("{0}")]
    Transform(String),
    /// Encoding or writing the output failed.
    #[error("{0}")]
    Write(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// Implementations must be usable behind `&dyn ImageBackend`, since each tool
/// receives the backend as a trait object from the server.
pub trait ImageBackend {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode `source`, run `pipeline`, and write the result to `output`.
    fn process(&self, source: &Path, pipeline: &Pipeline, output: &Path)
    -> Result<(), BackendError>;
}
