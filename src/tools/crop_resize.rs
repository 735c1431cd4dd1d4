//! `image.cropResize`: resize into a box with an explicit fit mode, then
//! optionally rotate and mirror.

use super::{
    Tool, ToolContext, ToolError, ToolResponse, ValidationError, check_dimension, check_range,
    object_schema, parse_args, resolve_paths, run_batch,
};
use crate::batch::OutputPolicy;
use crate::imaging::calculations::MAX_DIMENSION;
use crate::imaging::{FitMode, Pipeline, ResizeSpec};
use crate::output::Verbs;
use serde::Deserialize;
use serde_json::{Value, json};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropResizeParams {
    #[serde(rename = "imagesPath", alias = "imagePaths")]
    pub images_path: Vec<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub resize_mode: FitMode,
    /// Accepted for compatibility; `resize_mode` alone decides the geometry.
    #[serde(default = "default_true")]
    pub maintain_ratio: bool,
    pub rotate: Option<f64>,
    #[serde(default)]
    pub flip: bool,
    #[serde(default)]
    pub mirror: bool,
}

impl CropResizeParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_dimension("width", self.width)?;
        check_dimension("height", self.height)?;
        check_range("rotate", self.rotate, -360.0, 360.0)
    }

    pub fn pipeline(&self) -> Pipeline {
        let mut pipeline = Pipeline::new();
        if self.width.is_some() || self.height.is_some() {
            pipeline = pipeline.resize(ResizeSpec {
                width: self.width,
                height: self.height,
                fit: self.resize_mode,
                allow_enlargement: self.resize_mode != FitMode::Inside,
            });
        }
        if let Some(angle) = self.rotate.filter(|&a| a != 0.0) {
            pipeline = pipeline.rotate(angle);
        }
        if self.flip {
            pipeline = pipeline.flip();
        }
        if self.mirror {
            pipeline = pipeline.flop();
        }
        pipeline
    }
}

pub struct CropResize;

impl Tool for CropResize {
    fn name(&self) -> &'static str {
        "image.cropResize"
    }

    fn description(&self) -> &'static str {
        "Crop or resize images with a fit mode, optionally rotating and mirroring"
    }

    fn input_schema(&self) -> Value {
        let modes: Vec<_> = FitMode::ALL.iter().map(|m| m.as_str()).collect();
        object_schema(
            json!({
                "width": { "type": "integer", "exclusiveMinimum": 0, "maximum": MAX_DIMENSION },
                "height": { "type": "integer", "exclusiveMinimum": 0, "maximum": MAX_DIMENSION },
                "resizeMode": { "type": "string", "enum": modes },
                "maintainRatio": { "type": "boolean", "default": true },
                "rotate": { "type": "number", "minimum": -360, "maximum": 360 },
                "flip": { "type": "boolean", "description": "Flip vertically" },
                "mirror": { "type": "boolean", "description": "Mirror horizontally" },
            }),
            &["resizeMode"],
        )
    }

    fn call(&self, ctx: &ToolContext<'_>, args: Value) -> Result<ToolResponse, ToolError> {
        let params: CropResizeParams = parse_args(args)?;
        params.validate()?;
        let paths = resolve_paths(&params.images_path, ctx.paths)?;
        Ok(run_batch(
            ctx,
            &paths,
            &params.pipeline(),
            OutputPolicy::Suffix("cropped"),
            Verbs::PROCESS,
        ))
    }
}
