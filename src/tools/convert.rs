//! `image.convertFormat`: re-encode images into another format.
//!
//! The output extension is the format name itself, so converting to JPEG
//! writes `<name>_converted.jpeg`.

use super::{
    Tool, ToolContext, ToolError, ToolResponse, ValidationError, check_range, object_schema,
    parse_args, resolve_paths, run_batch,
};
use crate::batch::OutputPolicy;
use crate::imaging::{OutputFormat, Pipeline, Quality};
use crate::output::Verbs;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatParams {
    pub quality: Option<u32>,
    pub compression_level: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertParams {
    #[serde(rename = "imagesPath", alias = "imagePaths")]
    pub images_path: Vec<String>,
    pub output_format: OutputFormat,
    #[serde(default)]
    pub format_params: FormatParams,
}

impl ConvertParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let params = &self.format_params;
        check_range(
            "formatParams.quality",
            params.quality.map(f64::from),
            0.0,
            100.0,
        )?;
        check_range(
            "formatParams.compressionLevel",
            params.compression_level.map(f64::from),
            0.0,
            9.0,
        )
    }

    /// Force the format, then hand non-zero settings to that format's encoder.
    pub fn pipeline(&self) -> Pipeline {
        let format = self.output_format;
        let mut pipeline = Pipeline::new().to_format(format);

        if let Some(quality) = self.format_params.quality.filter(|&q| q != 0) {
            let quality = Quality::new(quality);
            pipeline = match format {
                OutputFormat::Jpeg => pipeline.jpeg_quality(quality),
                OutputFormat::Webp => pipeline.webp_quality(quality),
                OutputFormat::Avif => pipeline.avif_quality(quality),
                _ => pipeline,
            };
        }
        if let Some(level) = self.format_params.compression_level.filter(|&l| l != 0) {
            if format == OutputFormat::Png {
                pipeline = pipeline.png_compression(level as u8);
            }
        }
        pipeline
    }
}

pub struct ConvertFormat;

impl Tool for ConvertFormat {
    fn name(&self) -> &'static str {
        "image.convertFormat"
    }

    fn description(&self) -> &'static str {
        "Convert images to another format"
    }

    fn input_schema(&self) -> Value {
        let formats: Vec<_> = OutputFormat::ALL.iter().map(|f| f.as_str()).collect();
        object_schema(
            json!({
                "outputFormat": { "type": "string", "enum": formats },
                "formatParams": {
                    "type": "object",
                    "properties": {
                        "quality": { "type": "integer", "minimum": 0, "maximum": 100 },
                        "compressionLevel": { "type": "integer", "minimum": 0, "maximum": 9 },
                    },
                },
            }),
            &["outputFormat"],
        )
    }

    fn call(&self, ctx: &ToolContext<'_>, args: Value) -> Result<ToolResponse, ToolError> {
        let params: ConvertParams = parse_args(args)?;
        params.validate()?;
        let paths = resolve_paths(&params.images_path, ctx.paths)?;
        Ok(run_batch(
            ctx,
            &paths,
            &params.pipeline(),
            OutputPolicy::Convert("converted", params.output_format),
            Verbs::CONVERT,
        ))
    }
}
