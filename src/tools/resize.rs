//! `image.resize`: scale images to a target size.
//!
//! With `maintainRatio` (the default) and both edges given, the requested
//! ratio must match the first image's ratio within
//! [`ASPECT_RATIO_TOLERANCE`](crate::imaging::calculations::ASPECT_RATIO_TOLERANCE).
//! A mismatch rejects the whole request before anything is written.

use super::{
    Tool, ToolContext, ToolError, ToolResponse, ValidationError, check_dimension, object_schema,
    parse_args, resolve_paths, run_batch,
};
use crate::batch::OutputPolicy;
use crate::imaging::calculations::{MAX_DIMENSION, aspect_ratio_matches};
use crate::imaging::{FitMode, Pipeline, ResizeSpec};
use crate::output::Verbs;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::Path;
use tracing::info;

pub const RATIO_MISMATCH: &str = "Error: in maintain-ratio mode the requested width/height ratio does not match the original image; adjust the parameters.";

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeParams {
    #[serde(rename = "imagesPath", alias = "imagePaths")]
    pub images_path: Vec<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(default = "default_true")]
    pub maintain_ratio: bool,
    pub fit_mode: Option<FitMode>,
}

impl ResizeParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_dimension("width", self.width)?;
        check_dimension("height", self.height)
    }

    /// Target box to compare against the first image, if the check applies.
    pub fn ratio_target(&self) -> Option<(u32, u32)> {
        match (self.maintain_ratio, self.width, self.height) {
            (true, Some(w), Some(h)) => Some((w, h)),
            _ => None,
        }
    }

    pub fn fit(&self) -> FitMode {
        self.fit_mode.unwrap_or(if self.maintain_ratio {
            FitMode::Contain
        } else {
            FitMode::Fill
        })
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new().resize(ResizeSpec {
            width: self.width,
            height: self.height,
            fit: self.fit(),
            allow_enlargement: self.fit_mode != Some(FitMode::Inside),
        })
    }
}

/// Compare the first input's ratio with the requested box.
///
/// Returns `Ok(false)` on a mismatch. An unreadable first image fails the
/// request outright.
fn first_image_ratio_matches(
    ctx: &ToolContext<'_>,
    first: &Path,
    target: (u32, u32),
) -> Result<bool, ToolError> {
    let dims = ctx.backend.identify(first).map_err(|e| {
        ToolError::Precheck(format!("Cannot read {}: {}", first.display(), e))
    })?;
    Ok(aspect_ratio_matches((dims.width, dims.height), target))
}

pub struct Resize;

impl Tool for Resize {
    fn name(&self) -> &'static str {
        "image.resize"
    }

    fn description(&self) -> &'static str {
        "Resize images, optionally keeping the original aspect ratio"
    }

    fn input_schema(&self) -> Value {
        let modes: Vec<_> = FitMode::ALL.iter().map(|m| m.as_str()).collect();
        object_schema(
            json!({
                "width": { "type": "integer", "exclusiveMinimum": 0, "maximum": MAX_DIMENSION },
                "height": { "type": "integer", "exclusiveMinimum": 0, "maximum": MAX_DIMENSION },
                "maintainRatio": { "type": "boolean", "default": true },
                "fitMode": { "type": "string", "enum": modes },
            }),
            &[],
        )
    }

    fn call(&self, ctx: &ToolContext<'_>, args: Value) -> Result<ToolResponse, ToolError> {
        let params: ResizeParams = parse_args(args)?;
        params.validate()?;
        let paths = resolve_paths(&params.images_path, ctx.paths)?;

        if let (Some(target), Some(first)) = (params.ratio_target(), paths.first()) {
            if !first_image_ratio_matches(ctx, first, target)? {
                info!(first = %first.display(), "aspect ratio mismatch, request rejected");
                return Ok(ToolResponse::error(RATIO_MISMATCH));
            }
        }

        Ok(run_batch(
            ctx,
            &paths,
            &params.pipeline(),
            OutputPolicy::Suffix("resized"),
            Verbs::RESIZE,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Operation;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::test_helpers::text_lines;

    fn params(args: Value) -> ResizeParams {
        parse_args(args).unwrap()
    }

    fn resize_spec(p: &ResizeParams) -> ResizeSpec {
        match p.pipeline().operations() {
            [Operation::Resize(spec)] => *spec,
            other => panic!("expected a single resize, got {other:?}"),
        }
    }

    #[test]
    fn default_fit_is_contain_when_keeping_ratio() {
        let spec = resize_spec(&params(json!({ "imagesPath": ["/a.png"], "width": 10 })));
        assert_eq!(spec.fit, FitMode::Contain);
        assert!(spec.allow_enlargement);
    }

    #[test]
    fn default_fit_is_fill_when_ratio_free() {
        let spec = resize_spec(&params(json!({
            "imagesPath": ["/a.png"],
            "width": 10,
            "height": 10,
            "maintainRatio": false
        })));
        assert_eq!(spec.fit, FitMode::Fill);
    }

    #[test]
    fn explicit_inside_disables_enlargement() {
        let spec = resize_spec(&params(json!({
            "imagesPath": ["/a.png"],
            "width": 10,
            "fitMode": "inside"
        })));
        assert_eq!(spec.fit, FitMode::Inside);
        assert!(!spec.allow_enlargement);
    }

    #[test]
    fn ratio_check_needs_both_edges() {
        assert!(params(json!({ "imagesPath": ["/a"], "width": 5 })).ratio_target().is_none());
        assert!(
            params(json!({ "imagesPath": ["/a"], "width": 5, "height": 5, "maintainRatio": false }))
                .ratio_target()
                .is_none()
        );
        assert_eq!(
            params(json!({ "imagesPath": ["/a"], "width": 5, "height": 4 })).ratio_target(),
            Some((5, 4))
        );
    }

    #[test]
    fn ratio_mismatch_rejects_whole_request() {
        let backend = MockBackend::new().with_dimensions("/r/wide.png", 250, 100);
        let ctx = ToolContext::new(&backend);
        let response = Resize
            .call(
                &ctx,
                json!({
                    "imagesPath": ["/r/wide.png", "/r/other.png"],
                    "width": 200,
                    "height": 100
                }),
            )
            .unwrap();

        assert!(response.is_error);
        assert_eq!(text_lines(&response), vec![RATIO_MISMATCH]);
        assert!(backend.processed().is_empty());
    }

    #[test]
    fn ratio_within_tolerance_proceeds() {
        let backend = MockBackend::new().with_dimensions("/r/a.png", 200, 100);
        let ctx = ToolContext::new(&backend);
        let response = Resize
            .call(
                &ctx,
                json!({ "imagesPath": ["/r/a.png"], "width": 100, "height": 50 }),
            )
            .unwrap();

        assert!(!response.is_error);
        assert_eq!(
            text_lines(&response),
            vec!["Resized /r/a.png \u{2192} /r/a_resized.png"]
        );
        assert_eq!(
            backend.get_operations()[0],
            RecordedOp::Identify("/r/a.png".to_string())
        );
    }

    #[test]
    fn only_first_image_is_checked() {
        let backend = MockBackend::new().with_dimensions("/r/a.png", 200, 100);
        let ctx = ToolContext::new(&backend);
        Resize
            .call(
                &ctx,
                json!({ "imagesPath": ["/r/a.png", "/r/b.png"], "width": 100, "height": 50 }),
            )
            .unwrap();

        let identified: Vec<_> = backend
            .get_operations()
            .into_iter()
            .filter(|op| matches!(op, RecordedOp::Identify(_)))
            .collect();
        assert_eq!(identified.len(), 1);
        assert_eq!(backend.processed().len(), 2);
    }

    #[test]
    fn unreadable_first_image_fails_request() {
        let backend = MockBackend::new();
        let ctx = ToolContext::new(&backend);
        let err = Resize
            .call(
                &ctx,
                json!({ "imagesPath": ["/r/gone.png"], "width": 100, "height": 50 }),
            )
            .unwrap_err();
        assert!(matches!(err, ToolError::Precheck(_)));
        assert!(backend.processed().is_empty());
    }

    #[test]
    fn no_precheck_without_ratio_constraint() {
        let backend = MockBackend::new();
        let ctx = ToolContext::new(&backend);
        Resize
            .call(
                &ctx,
                json!({ "imagesPath": ["/r/a.png"], "width": 100, "height": 50, "maintainRatio": false }),
            )
            .unwrap();
        assert!(
            backend
                .get_operations()
                .iter()
                .all(|op| !matches!(op, RecordedOp::Identify(_)))
        );
    }

    #[test]
    fn oversized_target_rejected_before_any_io() {
        let backend = MockBackend::new();
        let ctx = ToolContext::new(&backend);
        let err = Resize
            .call(
                &ctx,
                json!({
                    "imagesPath": ["/r/a.png"],
                    "width": 4_000_000_000u32,
                    "height": 4_000_000_000u32,
                    "maintainRatio": false
                }),
            )
            .unwrap_err();
        assert!(matches!(err, ToolError::Validation(ref e) if e.field == "width"));
        assert!(backend.get_operations().is_empty());
    }
}
