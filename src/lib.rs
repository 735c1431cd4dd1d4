//! # Image Tools
//!
//! Image conversion, resizing, compression, rotation and tone adjustment,
//! exposed as named tools over a line-delimited JSON-RPC stdio server.
//!
//! Every tool follows the same contract: take a list of image paths, apply
//! one operation pipeline to each image independently, write each result next
//! to its input under a derived name, and report one line per input.
//!
//! ```text
//! tools/call  →  validate  →  Pipeline  →  process_batch  →  one line per input
//!                   │                          │
//!                   └─ reject before any I/O   └─ a failing item never stops the batch
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`tools`] | The six tools: parameters, validation, pipeline building, registry |
//! | [`batch`] | Output naming and the per-item batch driver |
//! | [`imaging`] | Pipeline types, dimension math, pixel adjustments, the `image`-crate backend |
//! | [`output`] | Formatting of batch outcomes into response lines |
//! | [`server`] | JSON-RPC 2.0 stdio transport: initialize, tools/list, tools/call, ping |
//! | [`config`] | `config.toml` loading, merging over stock defaults, validation |
//!
//! # Design Decisions
//!
//! ## Pipelines as Data
//!
//! Tools never touch pixels. Each one turns its arguments into a
//! [`imaging::Pipeline`], an ordered list of operations plus per-format
//! encoder settings, and hands it to an [`imaging::ImageBackend`]. Unit tests
//! swap in a mock backend and assert on the recorded pipeline, so tool logic
//! is tested without encoding a single image.
//!
//! ## Two Error Tiers
//!
//! Request-level problems (bad arguments, unknown tool, an aspect-ratio
//! mismatch in resize) reject the whole call before any file is written.
//! Per-image problems (missing file, undecodable data, an encoder that cannot
//! handle the target) are recorded for that image only and reported inline.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding and encoding use the `image` crate, `jpeg-encoder` for JPEG
//! output, `webp` (bundled libwebp) for lossy WebP and `imageproc` for
//! arbitrary-angle rotation. Nothing is linked from the system.

pub mod batch;
pub mod config;
pub mod imaging;
pub mod output;
pub mod server;
pub mod tools;

#[cfg(test)]
pub(crate) mod test_helpers;
