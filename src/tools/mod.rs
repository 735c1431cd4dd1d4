//! Tool definitions: the six image operations exposed to clients.
//!
//! Each tool is a small module with three parts:
//!
//! 1. A parameter struct deserialized from the request arguments.
//! 2. A pure `validate()` that range-checks those parameters.
//! 3. A pipeline builder that turns the parameters into a [`Pipeline`].
//!
//! The [`Tool`] trait glues them to the batch adapter. Validation always runs
//! before any file is touched, so an invalid request never produces output.
//!
//! ## Registered tools
//!
//! | Name | Output suffix |
//! |---|---|
//! | `image.convertFormat` | `_converted.<format>` |
//! | `image.cropResize` | `_cropped` |
//! | `image.compressOptimize` | `_compressed` |
//! | `image.resize` | `_resized` |
//! | `image.rotateFlip` | `_rotatedFlipped` |
//! | `image.postProcess` | `_postProcessed` |

pub mod compress;
pub mod convert;
pub mod crop_resize;
pub mod post_process;
pub mod resize;
pub mod rotate_flip;

use crate::batch::{OutputPolicy, process_batch};
use crate::imaging::calculations::MAX_DIMENSION;
use crate::imaging::{ImageBackend, Pipeline};
use crate::output::{Verbs, format_outcomes};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Value, json};
use std::path::{MAIN_SEPARATOR, PathBuf};
use thiserror::Error;
use tracing::info;

// =========================================================================
// Errors
// =========================================================================

/// A parameter that failed validation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Request-level failures. Per-item failures never surface here.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    Validation(#[from] ValidationError),
    #[error("Invalid arguments: {0}")]
    Json(#[from] serde_json::Error),
    /// The request was well formed but cannot be processed as a whole.
    #[error("{0}")]
    Precheck(String),
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

// =========================================================================
// Responses
// =========================================================================

/// One content entry of a tool response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

impl Content {
    pub fn text(&self) -> &str {
        match self {
            Content::Text { text } => text,
        }
    }
}

/// Result of a tool call: `{ content: [{ type: "text", text }], isError? }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResponse {
    pub content: Vec<Content>,
    #[serde(rename = "isError", skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResponse {
    pub fn from_lines(lines: Vec<String>) -> Self {
        Self {
            content: lines.into_iter().map(|text| Content::Text { text }).collect(),
            is_error: false,
        }
    }

    /// A single-entry response flagged as a request-level error.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }
}

// =========================================================================
// Invocation context
// =========================================================================

/// How input path strings are interpreted before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathRules {
    pub require_absolute: bool,
    /// Rewrite both `/` and `\` to the host separator.
    pub normalize_separators: bool,
}

impl Default for PathRules {
    fn default() -> Self {
        Self {
            require_absolute: true,
            normalize_separators: true,
        }
    }
}

/// Everything a tool needs besides its own arguments.
pub struct ToolContext<'a> {
    pub backend: &'a dyn ImageBackend,
    pub paths: PathRules,
}

impl<'a> ToolContext<'a> {
    pub fn new(backend: &'a dyn ImageBackend) -> Self {
        Self {
            backend,
            paths: PathRules::default(),
        }
    }

    pub fn with_paths(mut self, paths: PathRules) -> Self {
        self.paths = paths;
        self
    }
}

/// Interface every tool implements.
pub trait Tool {
    /// Stable name clients invoke the tool by.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON Schema of the arguments object.
    fn input_schema(&self) -> Value;

    /// Validate `args` and run the tool over every input.
    fn call(&self, ctx: &ToolContext<'_>, args: Value) -> Result<ToolResponse, ToolError>;
}

// =========================================================================
// Registry
// =========================================================================

/// The fixed set of tools, in listing order.
pub struct Registry {
    tools: Vec<Box<dyn Tool>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            tools: vec![
                Box::new(convert::ConvertFormat) as Box<dyn Tool>,
                Box::new(crop_resize::CropResize),
                Box::new(compress::CompressOptimize),
                Box::new(resize::Resize),
                Box::new(rotate_flip::RotateFlip),
                Box::new(post_process::PostProcess),
            ],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Tool> {
        self.tools.iter().map(|t| t.as_ref())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.iter().find(|t| t.name() == name)
    }

    /// Descriptors for `tools/list`.
    pub fn descriptors(&self) -> Vec<Value> {
        self.iter()
            .map(|t| {
                json!({
                    "name": t.name(),
                    "description": t.description(),
                    "inputSchema": t.input_schema(),
                })
            })
            .collect()
    }

    pub fn call(
        &self,
        name: &str,
        ctx: &ToolContext<'_>,
        args: Value,
    ) -> Result<ToolResponse, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        info!(tool = name, "tool call");
        tool.call(ctx, args)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Shared helpers
// =========================================================================

/// Deserialize arguments, treating a missing object as empty.
pub(crate) fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    let args = if args.is_null() { json!({}) } else { args };
    Ok(serde_json::from_value(args)?)
}

/// Normalize and check the raw path list.
pub fn resolve_paths(raw: &[String], rules: PathRules) -> Result<Vec<PathBuf>, ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::new(
            "imagesPath",
            "at least one path is required",
        ));
    }
    raw.iter()
        .map(|entry| {
            let normalized = if rules.normalize_separators {
                entry.replace(['/', '\\'], &MAIN_SEPARATOR.to_string())
            } else {
                entry.clone()
            };
            let path = PathBuf::from(normalized);
            if rules.require_absolute && !path.is_absolute() {
                return Err(ValidationError::new(
                    "imagesPath",
                    format!("path must be absolute: {entry}"),
                ));
            }
            Ok(path)
        })
        .collect()
}

pub(crate) fn check_range(
    field: &str,
    value: Option<f64>,
    min: f64,
    max: f64,
) -> Result<(), ValidationError> {
    match value {
        Some(v) if !(min..=max).contains(&v) => Err(ValidationError::new(
            field,
            format!("must be between {min} and {max}, got {v}"),
        )),
        _ => Ok(()),
    }
}

/// A requested edge length: positive and at most [`MAX_DIMENSION`].
pub(crate) fn check_dimension(field: &str, value: Option<u32>) -> Result<(), ValidationError> {
    match value {
        Some(0) => Err(ValidationError::new(field, "must be greater than 0")),
        Some(v) if v > MAX_DIMENSION => Err(ValidationError::new(
            field,
            format!("must be at most {MAX_DIMENSION}, got {v}"),
        )),
        _ => Ok(()),
    }
}

/// Schema for the common path list.
fn images_path_schema() -> Value {
    json!({
        "type": "array",
        "items": { "type": "string" },
        "minItems": 1,
        "description": "Absolute paths of the images to process",
    })
}

/// Object schema with `imagesPath` added to `properties` and `required`.
pub(crate) fn object_schema(mut properties: Value, required: &[&str]) -> Value {
    if let Some(map) = properties.as_object_mut() {
        map.insert("imagesPath".to_string(), images_path_schema());
    }
    let mut all_required = vec!["imagesPath"];
    all_required.extend_from_slice(required);
    json!({
        "type": "object",
        "properties": properties,
        "required": all_required,
    })
}

/// Run `pipeline` over `paths` and format one line per input.
pub(crate) fn run_batch(
    ctx: &ToolContext<'_>,
    paths: &[PathBuf],
    pipeline: &Pipeline,
    policy: OutputPolicy,
    verbs: Verbs,
) -> ToolResponse {
    let outcomes = process_batch(ctx.backend, paths, pipeline, policy);
    let failed = outcomes.iter().filter(|o| !o.success()).count();
    info!(total = outcomes.len(), failed, "batch finished");
    ToolResponse::from_lines(format_outcomes(&outcomes, verbs))
}
