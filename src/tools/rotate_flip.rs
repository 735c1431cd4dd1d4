//! `image.rotateFlip`: rotate, then mirror horizontally and/or vertically.

use super::{
    Tool, ToolContext, ToolError, ToolResponse, ValidationError, check_range, object_schema,
    parse_args, resolve_paths, run_batch,
};
use crate::batch::OutputPolicy;
use crate::imaging::Pipeline;
use crate::output::Verbs;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotateFlipParams {
    #[serde(rename = "imagesPath", alias = "imagePaths")]
    pub images_path: Vec<String>,
    pub rotate_angle: Option<f64>,
    #[serde(default)]
    pub flip_horizontal: bool,
    #[serde(default)]
    pub flip_vertical: bool,
}

impl RotateFlipParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range("rotateAngle", self.rotate_angle, -360.0, 360.0)
    }

    pub fn pipeline(&self) -> Pipeline {
        let mut pipeline = Pipeline::new();
        if let Some(angle) = self.rotate_angle.filter(|&a| a != 0.0) {
            pipeline = pipeline.rotate(angle);
        }
        if self.flip_horizontal {
            pipeline = pipeline.flop();
        }
        if self.flip_vertical {
            pipeline = pipeline.flip();
        }
        pipeline
    }
}

pub struct RotateFlip;

impl Tool for RotateFlip {
    fn name(&self) -> &'static str {
        "image.rotateFlip"
    }

    fn description(&self) -> &'static str {
        "Rotate and flip images"
    }

    fn input_schema(&self) -> Value {
        object_schema(
            json!({
                "rotateAngle": { "type": "number", "minimum": -360, "maximum": 360 },
                "flipHorizontal": { "type": "boolean" },
                "flipVertical": { "type": "boolean" },
            }),
            &[],
        )
    }

    fn call(&self, ctx: &ToolContext<'_>, args: Value) -> Result<ToolResponse, ToolError> {
        let params: RotateFlipParams = parse_args(args)?;
        params.validate()?;
        let paths = resolve_paths(&params.images_path, ctx.paths)?;
        Ok(run_batch(
            ctx,
            &paths,
            &params.pipeline(),
            OutputPolicy::Suffix("rotatedFlipped"),
            Verbs::PROCESS,
        ))
    }
}
