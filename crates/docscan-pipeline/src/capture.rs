// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture orchestrator — turns a capture request and a frame into a finished
// `CaptureResult`.
//
// Steps: orient the raw buffer, map the source quadrilateral onto it, warp,
// filter the corrected image. A failed warp is not fatal: the capture falls
// back to the uncorrected frame and is marked degraded. Whatever happens, the
// stability tracker is reset so scanning can move on to the next document.

use chrono::Utc;
use docscan_core::error::{Result, ScanError};
use docscan_core::{
    CaptureId, CaptureQuality, CaptureRequest, CaptureResult, FilterConfig, Frame, FrameSize,
    QualityVerdict, ResolvedOrientation,
};
use docscan_vision::{ImageProcessor, correct_perspective};
use tracing::{info, instrument, warn};

use crate::stability::StabilityTracker;

/// Everything the orchestrator needs besides the request itself.
#[derive(Debug, Clone, Copy)]
pub struct CaptureContext<'a> {
    pub id: CaptureId,
    /// Frame to capture, or `None` when no frame has arrived yet.
    pub frame: Option<&'a Frame>,
    pub orientation: ResolvedOrientation,
    /// Verdict of the most recent detection pass.
    pub verdict: QualityVerdict,
}

#[derive(Debug, Clone, Default)]
pub struct CaptureOrchestrator {
    filter: FilterConfig,
}

impl CaptureOrchestrator {
    pub fn new(filter: FilterConfig) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &FilterConfig {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: FilterConfig) {
        self.filter = filter;
    }

    /// Produce a capture and reset `tracker`, on success and on failure.
    ///
    /// # Errors
    ///
    /// - [`ScanError::CaptureUnavailable`] when there is no frame.
    /// - [`ScanError::DegenerateGeometry`] when an auto request carries an
    ///   invalid quadrilateral.
    #[instrument(skip_all, fields(id = %ctx.id, auto = request.is_auto()))]
    pub fn capture(
        &self,
        request: &CaptureRequest,
        ctx: CaptureContext<'_>,
        tracker: &mut StabilityTracker,
    ) -> Result<CaptureResult> {
        let result = self.produce(request, ctx);
        tracker.reset();
        result
    }

    fn produce(&self, request: &CaptureRequest, ctx: CaptureContext<'_>) -> Result<CaptureResult> {
        let frame = ctx.frame.ok_or_else(|| {
            ScanError::CaptureUnavailable("no camera frame has been received".into())
        })?;

        if let CaptureRequest::Auto { quad } = request {
            quad.quad.validate()?;
        }

        let original = ImageProcessor::from_rgba(frame.pixels().clone())
            .orient(ctx.orientation)
            .into_rgba();
        let size = FrameSize::new(original.width(), original.height());
        let source_quad = request.source_quad().and_then(|tracked| {
            let mapped = tracked.quad_in(size, ctx.orientation);
            if mapped.is_none() {
                warn!(
                    detected = ?tracked.orientation,
                    current = ?ctx.orientation,
                    "Quadrilateral belongs to another orientation; capturing uncorrected"
                );
            }
            mapped
        });

        let (corrected, degraded) = match &source_quad {
            None => (original.clone(), false),
            Some(quad) => match correct_perspective(&original, quad) {
                Ok(warped) => (warped, false),
                Err(err) => {
                    warn!(error = %err, "Perspective correction failed; keeping uncorrected frame");
                    (original.clone(), true)
                }
            },
        };

        let corrected = ImageProcessor::from_rgba(corrected)
            .filter(&self.filter)
            .into_rgba();

        info!(
            sequence = frame.sequence(),
            width = corrected.width(),
            height = corrected.height(),
            degraded,
            "Capture produced"
        );

        Ok(CaptureResult {
            id: ctx.id,
            corrected,
            original,
            source_quad,
            quality: CaptureQuality {
                verdict: ctx.verdict,
                degraded,
            },
            orientation: ctx.orientation,
            frame_sequence: frame.sequence(),
            captured_at: Utc::now(),
        })
    }
}
