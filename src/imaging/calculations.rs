//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::{FitMode, ResizeSpec};

/// Tolerance used when comparing a requested width/height ratio with the source.
pub const ASPECT_RATIO_TOLERANCE: f64 = 0.01;

/// Largest width or height accepted in a request or produced by a pipeline.
pub const MAX_DIMENSION: u32 = 65_535;

/// Largest pixel count allocated for a single canvas (16383×16383).
pub const MAX_PIXELS: u64 = 16_383 * 16_383;

/// Whether a `width`×`height` canvas fits both the edge and pixel limits.
pub fn within_limits(width: u32, height: u32) -> bool {
    width <= MAX_DIMENSION
        && height <= MAX_DIMENSION
        && u64::from(width) * u64::from(height) <= MAX_PIXELS
}

/// What happens to the scaled image to reach the final canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The scaled image is the output.
    None,
    /// Cut a centered window out of the scaled image.
    Crop {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    /// Center the scaled image on a larger canvas.
    Pad {
        canvas_width: u32,
        canvas_height: u32,
        x: u32,
        y: u32,
    },
}

/// Result of planning a resize: scale to `width`×`height`, then apply `placement`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizePlan {
    pub width: u32,
    pub height: u32,
    pub placement: Placement,
}

impl ResizePlan {
    /// Final output dimensions after placement.
    pub fn output_dimensions(&self) -> (u32, u32) {
        match self.placement {
            Placement::None => (self.width, self.height),
            Placement::Crop { width, height, .. } => (width, height),
            Placement::Pad {
                canvas_width,
                canvas_height,
                ..
            } => (canvas_width, canvas_height),
        }
    }
}

fn scaled(source: (u32, u32), scale: f64) -> (u32, u32) {
    let (w, h) = source;
    (
        ((w as f64 * scale).round() as u32).max(1),
        ((h as f64 * scale).round() as u32).max(1),
    )
}

fn cap(scale: f64, allow_enlargement: bool) -> f64 {
    if allow_enlargement {
        scale
    } else {
        scale.min(1.0)
    }
}

/// Plan a resize of `source` (width, height) according to `spec`.
///
/// With only one target edge the other follows the source aspect ratio,
/// whatever the fit mode. With both edges:
///
/// | Fit | Scale factor | Placement |
/// |---|---|---|
/// | `fill` | independent per axis | none |
/// | `inside` | `min(tw/sw, th/sh)` | none |
/// | `outside` | `max(tw/sw, th/sh)` | none |
/// | `cover` | `max(tw/sw, th/sh)` | centered crop to target |
/// | `contain` | `min(tw/sw, th/sh)` | centered pad to target |
///
/// # Examples
/// ```
/// # use image_tools::imaging::calculations::plan_resize;
/// # use image_tools::imaging::{FitMode, ResizeSpec};
/// let spec = ResizeSpec { width: Some(400), height: Some(400), fit: FitMode::Cover, allow_enlargement: true };
/// let plan = plan_resize((800, 600), &spec);
/// assert_eq!((plan.width, plan.height), (533, 400));
/// assert_eq!(plan.output_dimensions(), (400, 400));
/// ```
pub fn plan_resize(source: (u32, u32), spec: &ResizeSpec) -> ResizePlan {
    let (src_w, src_h) = (source.0.max(1), source.1.max(1));
    let source = (src_w, src_h);
    let unplaced = |(width, height): (u32, u32)| ResizePlan {
        width,
        height,
        placement: Placement::None,
    };

    match (spec.width, spec.height) {
        (None, None) => unplaced(source),
        (Some(tw), None) => {
            let scale = cap(tw as f64 / src_w as f64, spec.allow_enlargement);
            unplaced(scaled(source, scale))
        }
        (None, Some(th)) => {
            let scale = cap(th as f64 / src_h as f64, spec.allow_enlargement);
            unplaced(scaled(source, scale))
        }
        (Some(tw), Some(th)) => {
            let sx = tw as f64 / src_w as f64;
            let sy = th as f64 / src_h as f64;
            match spec.fit {
                FitMode::Fill => {
                    if spec.allow_enlargement {
                        unplaced((tw, th))
                    } else {
                        unplaced((tw.min(src_w), th.min(src_h)))
                    }
                }
                FitMode::Inside => unplaced(scaled(source, cap(sx.min(sy), spec.allow_enlargement))),
                FitMode::Outside => {
                    unplaced(scaled(source, cap(sx.max(sy), spec.allow_enlargement)))
                }
                FitMode::Cover => {
                    let (w, h) = scaled(source, cap(sx.max(sy), spec.allow_enlargement));
                    let (cw, ch) = (tw.min(w), th.min(h));
                    ResizePlan {
                        width: w,
                        height: h,
                        placement: Placement::Crop {
                            x: (w - cw) / 2,
                            y: (h - ch) / 2,
                            width: cw,
                            height: ch,
                        },
                    }
                }
                FitMode::Contain => {
                    let (w, h) = scaled(source, cap(sx.min(sy), spec.allow_enlargement));
                    // Rounding can push the scaled edge one pixel past the box.
                    let (w, h) = (w.min(tw), h.min(th));
                    ResizePlan {
                        width: w,
                        height: h,
                        placement: Placement::Pad {
                            canvas_width: tw,
                            canvas_height: th,
                            x: (tw - w) / 2,
                            y: (th - h) / 2,
                        },
                    }
                }
            }
        }
    }
}

/// Bounding box of a `width`×`height` image rotated by `degrees`.
pub fn rotated_bounds(width: u32, height: u32, degrees: f64) -> (u32, u32) {
    let theta = degrees.to_radians();
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
    let w = width as f64;
    let h = height as f64;
    // Trim float noise so 45° on a square does not gain an extra pixel.
    let bw = (w * cos + h * sin - 1e-9).ceil().max(1.0);
    let bh = (w * sin + h * cos - 1e-9).ceil().max(1.0);
    (bw as u32, bh as u32)
}

/// Quarter turns for angles that are exact multiples of 90°, normalized to 0..4.
pub fn quarter_turns(degrees: f64) -> Option<u8> {
    let normalized = degrees.rem_euclid(360.0);
    let turns = normalized / 90.0;
    if (turns - turns.round()).abs() < 1e-9 {
        Some((turns.round() as u32 % 4) as u8)
    } else {
        None
    }
}

/// Compare the aspect ratio of `source` with a requested `target` box.
pub fn aspect_ratio_matches(source: (u32, u32), target: (u32, u32)) -> bool {
    let original = source.0 as f64 / source.1 as f64;
    let requested = target.0 as f64 / target.1 as f64;
    (original - requested).abs() <= ASPECT_RATIO_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(width: Option<u32>, height: Option<u32>, fit: FitMode) -> ResizeSpec {
        ResizeSpec {
            width,
            height,
            fit,
            allow_enlargement: true,
        }
    }

    // =========================================================================
    // plan_resize tests
    // =========================================================================

    #[test]
    fn width_only_keeps_ratio() {
        let plan = plan_resize((800, 600), &spec(Some(400), None, FitMode::Fill));
        assert_eq!(plan.output_dimensions(), (400, 300));
    }

    #[test]
    fn height_only_keeps_ratio() {
        let plan = plan_resize((800, 600), &spec(None, Some(150), FitMode::Cover));
        assert_eq!(plan.output_dimensions(), (200, 150));
    }

    #[test]
    fn no_target_keeps_source() {
        let plan = plan_resize((320, 240), &spec(None, None, FitMode::Contain));
        assert_eq!(plan.output_dimensions(), (320, 240));
        assert_eq!(plan.placement, Placement::None);
    }

    #[test]
    fn fill_stretches_to_exact_box() {
        let plan = plan_resize((800, 600), &spec(Some(100), Some(100), FitMode::Fill));
        assert_eq!(plan.output_dimensions(), (100, 100));
    }

    #[test]
    fn inside_fits_within_box() {
        // 800x600 into 400x400: limited by width → 400x300
        let plan = plan_resize((800, 600), &spec(Some(400), Some(400), FitMode::Inside));
        assert_eq!(plan.output_dimensions(), (400, 300));
    }

    #[test]
    fn outside_covers_box_without_crop() {
        // 800x600 over 400x400: limited by height → 533x400
        let plan = plan_resize((800, 600), &spec(Some(400), Some(400), FitMode::Outside));
        assert_eq!(plan.output_dimensions(), (533, 400));
    }

    #[test]
    fn cover_crops_centered() {
        let plan = plan_resize((800, 600), &spec(Some(400), Some(400), FitMode::Cover));
        assert_eq!((plan.width, plan.height), (533, 400));
        assert_eq!(
            plan.placement,
            Placement::Crop {
                x: 66,
                y: 0,
                width: 400,
                height: 400
            }
        );
    }

    #[test]
    fn contain_pads_centered() {
        let plan = plan_resize((800, 600), &spec(Some(400), Some(400), FitMode::Contain));
        assert_eq!((plan.width, plan.height), (400, 300));
        assert_eq!(
            plan.placement,
            Placement::Pad {
                canvas_width: 400,
                canvas_height: 400,
                x: 0,
                y: 50
            }
        );
    }

    #[test]
    fn inside_without_enlargement_keeps_small_source() {
        let mut s = spec(Some(1000), Some(1000), FitMode::Inside);
        s.allow_enlargement = false;
        let plan = plan_resize((200, 100), &s);
        assert_eq!(plan.output_dimensions(), (200, 100));
    }

    #[test]
    fn inside_without_enlargement_still_shrinks() {
        let mut s = spec(Some(100), Some(100), FitMode::Inside);
        s.allow_enlargement = false;
        let plan = plan_resize((200, 100), &s);
        assert_eq!(plan.output_dimensions(), (100, 50));
    }

    #[test]
    fn tiny_scale_never_reaches_zero() {
        let plan = plan_resize((1000, 10), &spec(Some(10), None, FitMode::Inside));
        assert_eq!(plan.output_dimensions(), (10, 1));
    }

    // =========================================================================
    // rotation helpers
    // =========================================================================

    #[test]
    fn rotated_bounds_quarter_turn_swaps_edges() {
        assert_eq!(rotated_bounds(200, 100, 90.0), (100, 200));
    }

    #[test]
    fn rotated_bounds_45_degrees_grows() {
        // 100x100 at 45° → diagonal ≈ 141.42
        assert_eq!(rotated_bounds(100, 100, 45.0), (142, 142));
    }

    #[test]
    fn quarter_turns_detects_multiples() {
        assert_eq!(quarter_turns(90.0), Some(1));
        assert_eq!(quarter_turns(-90.0), Some(3));
        assert_eq!(quarter_turns(360.0), Some(0));
        assert_eq!(quarter_turns(-180.0), Some(2));
        assert_eq!(quarter_turns(30.0), None);
    }

    #[test]
    fn within_limits_checks_edges_and_area() {
        assert!(within_limits(16_383, 16_383));
        assert!(within_limits(MAX_DIMENSION, 100));
        assert!(!within_limits(MAX_DIMENSION + 1, 1));
        assert!(!within_limits(MAX_DIMENSION, MAX_DIMENSION));
        assert!(!within_limits(30_000, 30_000));
    }

    // =========================================================================
    // aspect_ratio_matches tests
    // =========================================================================

    #[test]
    fn aspect_ratio_mismatch_detected() {
        // 250x100 (2.5) vs 200x100 (2.0)
        assert!(!aspect_ratio_matches((250, 100), (200, 100)));
    }

    #[test]
    fn aspect_ratio_within_tolerance() {
        // 1920x1080 (1.7778) vs 640x360 (1.7778)
        assert!(aspect_ratio_matches((1920, 1080), (640, 360)));
        // 1.333 vs 1.34 → diff 0.0067
        assert!(aspect_ratio_matches((400, 300), (134, 100)));
    }
}
