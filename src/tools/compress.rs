//! `image.compressOptimize`: re-encode with tighter settings, keeping the
//! format.
//!
//! Quality is recorded for both the JPEG and WebP encoders and progressive
//! for both JPEG and PNG. Only the settings matching the written format (the
//! input's extension) take effect; the format itself never changes.

use super::{
    Tool, ToolContext, ToolError, ToolResponse, ValidationError, check_range, object_schema,
    parse_args, resolve_paths, run_batch,
};
use crate::batch::OutputPolicy;
use crate::imaging::{MetadataPolicy, Pipeline, Quality};
use crate::output::Verbs;
use serde::Deserialize;
use serde_json::{Value, json};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressParams {
    #[serde(rename = "imagesPath", alias = "imagePaths")]
    pub images_path: Vec<String>,
    pub quality: Option<u32>,
    #[serde(default = "default_true")]
    pub strip_metadata: bool,
    #[serde(default)]
    pub progressive: bool,
}

impl CompressParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range("quality", self.quality.map(f64::from), 0.0, 100.0)
    }

    pub fn pipeline(&self) -> Pipeline {
        let policy = if self.strip_metadata {
            MetadataPolicy::Strip
        } else {
            MetadataPolicy::Keep
        };
        let mut pipeline = Pipeline::new().metadata(policy);

        if let Some(quality) = self.quality.filter(|&q| q != 0) {
            let quality = Quality::new(quality);
            pipeline = pipeline.jpeg_quality(quality).webp_quality(quality);
        }
        if self.progressive {
            pipeline = pipeline.jpeg_progressive(true).png_progressive(true);
        }
        pipeline
    }
}

pub struct CompressOptimize;

impl Tool for CompressOptimize {
    fn name(&self) -> &'static str {
        "image.compressOptimize"
    }

    fn description(&self) -> &'static str {
        "Compress images and optimize their encoding"
    }

    fn input_schema(&self) -> Value {
        object_schema(
            json!({
                "quality": { "type": "integer", "minimum": 0, "maximum": 100 },
                "stripMetadata": { "type": "boolean", "default": true },
                "progressive": { "type": "boolean" },
            }),
            &[],
        )
    }

    fn call(&self, ctx: &ToolContext<'_>, args: Value) -> Result<ToolResponse, ToolError> {
        let params: CompressParams = parse_args(args)?;
        params.validate()?;
        let paths = resolve_paths(&params.images_path, ctx.paths)?;
        Ok(run_batch(
            ctx,
            &paths,
            &params.pipeline(),
            OutputPolicy::Suffix("compressed"),
            Verbs::COMPRESS,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::EncoderOptions;
    use crate::imaging::backend::tests::MockBackend;
    use crate::test_helpers::text_lines;

    fn params(args: Value) -> CompressParams {
        parse_args(args).unwrap()
    }

    #[test]
    fn defaults_strip_metadata_and_change_nothing_else() {
        let pipeline = params(json!({ "imagesPath": ["/a.jpg"] })).pipeline();
        assert_eq!(pipeline.metadata_policy(), MetadataPolicy::Strip);
        assert_eq!(pipeline.encoder(), &EncoderOptions::default());
        assert_eq!(pipeline.format(), None);
        assert!(pipeline.operations().is_empty());
    }

    #[test]
    fn quality_recorded_for_jpeg_and_webp() {
        let pipeline = params(json!({ "imagesPath": ["/a.jpg"], "quality": 40 })).pipeline();
        assert_eq!(pipeline.encoder().jpeg.quality, Some(Quality::new(40)));
        assert_eq!(pipeline.encoder().webp.quality, Some(Quality::new(40)));
        assert_eq!(pipeline.encoder().avif.quality, None);
    }

    #[test]
    fn progressive_recorded_for_jpeg_and_png() {
        let pipeline = params(json!({ "imagesPath": ["/a.png"], "progressive": true })).pipeline();
        assert!(pipeline.encoder().jpeg.progressive);
        assert!(pipeline.encoder().png.progressive);
    }

    #[test]
    fn keep_metadata_when_not_stripping() {
        let pipeline =
            params(json!({ "imagesPath": ["/a.png"], "stripMetadata": false })).pipeline();
        assert_eq!(pipeline.metadata_policy(), MetadataPolicy::Keep);
    }

    #[test]
    fn quality_out_of_range_rejected() {
        let p = params(json!({ "imagesPath": ["/a.png"], "quality": 150 }));
        assert_eq!(p.validate().unwrap_err().field, "quality");
    }

    #[test]
    fn call_keeps_extension() {
        let backend = MockBackend::new();
        let ctx = ToolContext::new(&backend);
        let response = CompressOptimize
            .call(&ctx, json!({ "imagesPath": ["/c/photo.jpg"], "quality": 60 }))
            .unwrap();
        assert_eq!(
            text_lines(&response),
            vec!["Compressed /c/photo.jpg \u{2192} /c/photo_compressed.jpg"]
        );
    }
}
