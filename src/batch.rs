//! Batch processing: apply one pipeline to many images, isolating failures.
//!
//! Every tool funnels through [`process_batch`]. It walks the input paths in
//! order, derives each output path with an [`OutputPolicy`], asks the backend
//! to open, transform and write, and records one [`ProcessingOutcome`] per
//! input. A failing item never aborts the batch: partial failure is an
//! ordinary result.
//!
//! ## Output naming
//!
//! ```text
//! Suffix("resized")      /photos/dawn.jpg  →  /photos/dawn_resized.jpg
//! Convert("converted",   /photos/dawn.jpg  →  /photos/dawn_converted.webp
//!         Webp)
//! Suffix("resized")      /photos/README    →  /photos/README_resized
//! ```

use crate::imaging::{BackendError, ImageBackend, OutputFormat, Pipeline};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// How a tool names its output files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPolicy {
    /// Insert `_<suffix>` before the extension.
    Suffix(&'static str),
    /// Insert `_<suffix>` and replace the extension with the format's.
    Convert(&'static str, OutputFormat),
}

/// Derive the output path for `source` under `policy`.
pub fn output_path(source: &Path, policy: OutputPolicy) -> PathBuf {
    let (suffix, new_ext) = match policy {
        OutputPolicy::Suffix(suffix) => (suffix, None),
        OutputPolicy::Convert(suffix, format) => (suffix, Some(format.extension())),
    };

    let stem = source.file_stem().unwrap_or_default();
    let mut name = OsString::from(stem);
    name.push("_");
    name.push(suffix);

    match (new_ext, source.extension()) {
        (Some(ext), _) => {
            name.push(".");
            name.push(ext);
        }
        (None, Some(ext)) => {
            name.push(".");
            name.push(ext);
        }
        (None, None) => {}
    }

    source.with_file_name(name)
}

/// Outcome of processing a single input.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingOutcome {
    pub source: PathBuf,
    /// Written output path, or the error message for this item.
    pub result: Result<PathBuf, String>,
}

impl ProcessingOutcome {
    pub fn success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.result.as_ref().ok().map(PathBuf::as_path)
    }

    pub fn error(&self) -> Option<&str> {
        self.result.as_ref().err().map(String::as_str)
    }
}

/// Outcomes in input order, one per input path.
pub type BatchResult = Vec<ProcessingOutcome>;

/// Process a single input: derive its output path and run the pipeline.
fn process_one(
    backend: &dyn ImageBackend,
    source: &Path,
    pipeline: &Pipeline,
    policy: OutputPolicy,
) -> Result<PathBuf, BackendError> {
    if source.file_name().is_none() {
        return Err(BackendError::Open(format!(
            "Input path has no file name: {}",
            source.display()
        )));
    }
    let output = output_path(source, policy);
    if output == source {
        return Err(BackendError::Write(format!(
            "Refusing to overwrite input {}",
            source.display()
        )));
    }
    backend.process(source, pipeline, &output)?;
    Ok(output)
}

/// Apply `pipeline` to every path in order, collecting one outcome per path.
pub fn process_batch(
    backend: &dyn ImageBackend,
    paths: &[PathBuf],
    pipeline: &Pipeline,
    policy: OutputPolicy,
) -> BatchResult {
    paths
        .iter()
        .map(|source| {
            let result = process_one(backend, source, pipeline, policy).map_err(|e| e.to_string());
            match &result {
                Ok(output) => debug!(
                    source = %source.display(),
                    output = %output.display(),
                    "processed"
                ),
                Err(error) => warn!(source = %source.display(), %error, "failed"),
            }
            ProcessingOutcome {
                source: source.clone(),
                result,
            }
        })
        .collect()
}
