// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective correction — warps the region bounded by a quadrilateral into
// an axis-aligned rectangle.

use docscan_core::error::{Result, ScanError};
use docscan_core::{FrameSize, Quadrilateral};
use image::{Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use tracing::{debug, info, instrument, warn};

/// Corners within this many pixels of the frame bounds count as "the whole
/// frame".
const FULL_FRAME_TOLERANCE: f32 = 1.0;

/// Output dimensions for correcting `quad`: the longer of each pair of
/// opposite edges. Capped at twice the source frame so a wild quadrilateral
/// cannot request an enormous buffer.
pub fn output_size(quad: &Quadrilateral, frame: FrameSize) -> FrameSize {
    let (top, right, bottom, left) = quad.edge_lengths();
    let width = top.max(bottom).round().max(0.0) as u32;
    let height = left.max(right).round().max(0.0) as u32;
    FrameSize::new(
        width.min(frame.width.saturating_mul(2)),
        height.min(frame.height.saturating_mul(2)),
    )
}

/// Warp the region of `image` bounded by `quad` into a rectangle of
/// [`output_size`].
///
/// A quadrilateral covering the whole frame returns the input unchanged.
/// Degenerate quadrilaterals and singular transforms fail with
/// [`ScanError::CorrectionFailure`]; the caller decides on a fallback.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn correct_perspective(image: &RgbaImage, quad: &Quadrilateral) -> Result<RgbaImage> {
    let frame = FrameSize::new(image.width(), image.height());

    if covers_frame(quad, frame) {
        debug!("Quadrilateral covers the frame; skipping warp");
        return Ok(image.clone());
    }

    quad.validate()
        .map_err(|err| ScanError::CorrectionFailure(err.to_string()))?;

    let out = output_size(quad, frame);
    if out.width == 0 || out.height == 0 {
        return Err(ScanError::CorrectionFailure(format!(
            "output would be {}x{}",
            out.width, out.height
        )));
    }

    let src: [(f32, f32); 4] = quad.corners().map(|p| (p.x, p.y));
    let (w, h) = (out.width as f32, out.height as f32);
    let dest: [(f32, f32); 4] = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];

    // `warp_into` samples the source through the inverse of this mapping.
    let Some(projection) = Projection::from_control_points(src, dest) else {
        warn!(?quad, "Projective transform is singular");
        return Err(ScanError::CorrectionFailure(
            "projective transform is singular".into(),
        ));
    };

    let mut output = RgbaImage::new(out.width, out.height);
    warp_into(
        image,
        &projection,
        Interpolation::Bilinear,
        Rgba([255, 255, 255, 255]),
        &mut output,
    );

    info!(out_w = out.width, out_h = out.height, "Perspective correction applied");
    Ok(output)
}

/// Whether every corner sits on the matching frame corner (either on the
/// last pixel or one past it).
fn covers_frame(quad: &Quadrilateral, frame: FrameSize) -> bool {
    let (w, h) = (frame.width as f32, frame.height as f32);
    let near = |v: f32, edge: f32| (v - edge).abs() <= FULL_FRAME_TOLERANCE;
    let near_far = |v: f32, extent: f32| near(v, extent) || near(v, extent - 1.0);

    near(quad.top_left.x, 0.0)
        && near(quad.top_left.y, 0.0)
        && near_far(quad.top_right.x, w)
        && near(quad.top_right.y, 0.0)
        && near_far(quad.bottom_right.x, w)
        && near_far(quad.bottom_right.y, h)
        && near(quad.bottom_left.x, 0.0)
        && near_far(quad.bottom_left.y, h)
}
