//! `image.postProcess`: tone adjustments, blur and sharpening.
//!
//! Brightness, contrast and saturation add their step whenever they are
//! present, even at 0 (which is an identity adjustment). Blur and sharpen are
//! skipped at 0.

use super::{
    Tool, ToolContext, ToolError, ToolResponse, ValidationError, check_range, object_schema,
    parse_args, resolve_paths, run_batch,
};
use crate::batch::OutputPolicy;
use crate::imaging::adjust::{brightness_multiplier, contrast_coefficients, saturation_multiplier};
use crate::imaging::{Modulation, Pipeline, Sharpening};
use crate::output::Verbs;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostProcessParams {
    #[serde(rename = "imagesPath", alias = "imagePaths")]
    pub images_path: Vec<String>,
    pub brightness: Option<f64>,
    pub contrast: Option<f64>,
    pub saturation: Option<f64>,
    pub blur: Option<f64>,
    pub sharpen: Option<f64>,
}

impl PostProcessParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range("brightness", self.brightness, -1.0, 1.0)?;
        check_range("contrast", self.contrast, -1.0, 1.0)?;
        check_range("saturation", self.saturation, -1.0, 1.0)?;
        if self.blur.is_some_and(|r| r < 0.0) {
            return Err(ValidationError::new("blur", "must not be negative"));
        }
        check_range("sharpen", self.sharpen, 0.0, 100.0)
    }

    pub fn pipeline(&self) -> Pipeline {
        let mut pipeline = Pipeline::new();
        if let Some(b) = self.brightness {
            pipeline = pipeline.modulate(Modulation::Brightness(brightness_multiplier(b)));
        }
        if let Some(c) = self.contrast {
            let (slope, intercept) = contrast_coefficients(c);
            pipeline = pipeline.linear(slope, intercept);
        }
        if let Some(s) = self.saturation {
            pipeline = pipeline.modulate(Modulation::Saturation(saturation_multiplier(s)));
        }
        if let Some(sigma) = self.blur.filter(|&r| r != 0.0) {
            pipeline = pipeline.blur(sigma);
        }
        if let Some(intensity) = self.sharpen.filter(|&s| s != 0.0) {
            pipeline = pipeline.sharpen(Sharpening::from_intensity(intensity));
        }
        pipeline
    }
}

pub struct PostProcess;

impl Tool for PostProcess {
    fn name(&self) -> &'static str {
        "image.postProcess"
    }

    fn description(&self) -> &'static str {
        "Adjust brightness, contrast and saturation, blur or sharpen images"
    }

    fn input_schema(&self) -> Value {
        object_schema(
            json!({
                "brightness": { "type": "number", "minimum": -1, "maximum": 1 },
                "contrast": { "type": "number", "minimum": -1, "maximum": 1 },
                "saturation": { "type": "number", "minimum": -1, "maximum": 1 },
                "blur": { "type": "number", "minimum": 0 },
                "sharpen": { "type": "number", "minimum": 0, "maximum": 100 },
            }),
            &[],
        )
    }

    fn call(&self, ctx: &ToolContext<'_>, args: Value) -> Result<ToolResponse, ToolError> {
        let params: PostProcessParams = parse_args(args)?;
        params.validate()?;
        let paths = resolve_paths(&params.images_path, ctx.paths)?;
        Ok(run_batch(
            ctx,
            &paths,
            &params.pipeline(),
            OutputPolicy::Suffix("postProcessed"),
            Verbs::PROCESS,
        ))
    }
}
