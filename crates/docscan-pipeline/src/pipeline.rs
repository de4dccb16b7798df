// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Frame-processing pipeline — one synchronous type composing orientation,
// detection, classification, stability, capture and filtering.
//
// `ScannerPipeline` is the single writer of the stability state: every frame
// passes through `process_frame` as one unit, and captures go through the
// same `&mut self`. The async session wraps it in a mutex and feeds it one
// frame at a time.

use std::sync::Arc;

use docscan_core::config::ScannerConfig;
use docscan_core::error::Result;
use docscan_core::{
    CameraPosition, CaptureId, CaptureRequest, CaptureResult, DetectionResult, DeviceOrientation,
    FilterConfig, Frame, FrameSize, InterfaceOrientation, QualityVerdict, ResolvedOrientation,
    TrackedQuad,
};
use docscan_vision::{ImageProcessor, OrientationResolver, QualityClassifier, RectangleDetector};
use image::RgbaImage;
use tracing::{debug, info, instrument};

use crate::capture::{CaptureContext, CaptureOrchestrator};
use crate::stability::{StabilityState, StabilityTracker};

/// What one processed frame produced.
#[derive(Debug, Clone)]
pub struct FrameOutcome {
    pub sequence: u64,
    /// Size of the upright frame the detection refers to.
    pub frame_size: FrameSize,
    pub detection: DetectionResult,
    pub verdict: QualityVerdict,
    /// Filtered upright frame, when previews are enabled.
    pub preview: Option<Arc<RgbaImage>>,
    /// Set on the frame that armed the stability tracker.
    pub auto_request: Option<CaptureRequest>,
}

pub struct ScannerPipeline {
    config: ScannerConfig,
    resolver: OrientationResolver,
    device_orientation: DeviceOrientation,
    interface_orientation: InterfaceOrientation,
    detector: RectangleDetector,
    classifier: QualityClassifier,
    tracker: StabilityTracker,
    orchestrator: CaptureOrchestrator,
    /// Most recently processed frame and the orientation it was resolved with.
    last_frame: Option<(Frame, ResolvedOrientation)>,
    last_verdict: QualityVerdict,
    /// Last Good quadrilateral, used to correct manual captures.
    last_good: Option<TrackedQuad>,
}

impl ScannerPipeline {
    /// Build a pipeline from a validated configuration.
    pub fn new(config: ScannerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            resolver: OrientationResolver::new(config.capture.camera_position),
            device_orientation: DeviceOrientation::Portrait,
            interface_orientation: InterfaceOrientation::Portrait,
            detector: RectangleDetector::new(config.detection.clone()),
            classifier: QualityClassifier::new(config.quality.clone()),
            tracker: StabilityTracker::new(config.stability.clone()),
            orchestrator: CaptureOrchestrator::new(config.filter),
            last_frame: None,
            last_verdict: QualityVerdict::None,
            last_good: None,
            config,
        })
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn stability(&self) -> StabilityState {
        self.tracker.state()
    }

    pub fn last_verdict(&self) -> QualityVerdict {
        self.last_verdict
    }

    pub fn last_good_quad(&self) -> Option<TrackedQuad> {
        self.last_good
    }

    // -- Per-frame processing -------------------------------------------------

    /// Run one frame through orientation, detection, classification and the
    /// stability tracker.
    #[instrument(skip_all, fields(sequence = frame.sequence()))]
    pub fn process_frame(&mut self, frame: Frame) -> FrameOutcome {
        let orientation = self.resolver.resolve(
            self.device_orientation,
            self.interface_orientation,
            frame.native_rotation(),
        );
        let upright = ImageProcessor::from_rgba(frame.pixels().clone())
            .orient(orientation)
            .into_rgba();
        let frame_size = FrameSize::new(upright.width(), upright.height());

        let (detection, verdict) = if self.config.border_detection_enabled {
            let detection = self.detector.detect(&upright);
            let verdict = self.classifier.classify(&detection, frame_size);
            (detection, verdict)
        } else {
            (DetectionResult::none(), QualityVerdict::None)
        };

        let tracked = detection
            .quad
            .map(|quad| TrackedQuad::new(quad, frame_size).in_orientation(orientation));
        match (verdict, tracked) {
            (QualityVerdict::Good, Some(tracked)) => self.last_good = Some(tracked),
            (QualityVerdict::None, _) => self.last_good = None,
            _ => {}
        }

        let auto_request = self.tracker.observe_tracked(verdict, tracked);

        let preview = self.config.emit_preview.then(|| {
            Arc::new(
                ImageProcessor::from_rgba(upright)
                    .filter(&self.config.filter)
                    .into_rgba(),
            )
        });

        debug!(
            ?verdict,
            confidence = detection.confidence,
            count = self.tracker.state().consecutive_good,
            "Frame processed"
        );

        let sequence = frame.sequence();
        self.last_frame = Some((frame, orientation));
        self.last_verdict = verdict;

        FrameOutcome {
            sequence,
            frame_size,
            detection,
            verdict,
            preview,
            auto_request,
        }
    }

    // -- Capture --------------------------------------------------------------

    /// Capture a still.
    ///
    /// `fresh` is a frame newer than the last processed one, if the camera has
    /// delivered one; otherwise the last processed frame is used. A manual
    /// request without a quadrilateral is corrected with the last Good
    /// quadrilateral while border detection is on.
    ///
    /// When the device turned between detection and capture, the fresh frame
    /// resolves to a different orientation than the quadrilateral. The frame
    /// the quadrilateral was found in is captured instead; if that is gone too
    /// the capture is left uncorrected.
    pub fn capture(
        &mut self,
        id: CaptureId,
        request: CaptureRequest,
        fresh: Option<Frame>,
    ) -> Result<CaptureResult> {
        let request = match request {
            CaptureRequest::Manual { quad: None } if self.config.border_detection_enabled => {
                CaptureRequest::Manual {
                    quad: self.last_good,
                }
            }
            other => other,
        };

        let fresh = fresh.map(|frame| {
            let orientation = self.resolver.resolve(
                self.device_orientation,
                self.interface_orientation,
                frame.native_rotation(),
            );
            (frame, orientation)
        });
        let quad_orientation = request.source_quad().map(|tracked| tracked.orientation);
        let chosen = match (fresh.as_ref(), quad_orientation) {
            (Some((_, current)), Some(detected)) if *current != detected => {
                debug!(?current, ?detected, "Orientation changed since detection");
                self.last_frame
                    .as_ref()
                    .filter(|(_, orientation)| *orientation == detected)
                    .or(fresh.as_ref())
            }
            _ => fresh.as_ref().or(self.last_frame.as_ref()),
        };

        let ctx = CaptureContext {
            id,
            frame: chosen.map(|(frame, _)| frame),
            orientation: chosen
                .map(|(_, orientation)| *orientation)
                .unwrap_or_else(|| self.resolver.current()),
            verdict: self.last_verdict,
        };

        let result = self.orchestrator.capture(&request, ctx, &mut self.tracker);
        self.last_good = None;
        result
    }

    // -- Configuration --------------------------------------------------------

    pub fn set_border_detection_enabled(&mut self, enabled: bool) {
        info!(enabled, "Border detection toggled");
        self.config.border_detection_enabled = enabled;
        if !enabled {
            self.tracker.reset();
            self.last_good = None;
        }
    }

    pub fn set_filter_config(&mut self, filter: FilterConfig) {
        debug!(?filter, "Filter changed");
        self.config.filter = filter;
        self.orchestrator.set_filter(filter);
    }

    pub fn set_auto_capture_threshold(&mut self, frames: u32) {
        self.config.stability.auto_capture_threshold = frames;
        self.tracker.set_threshold(frames);
    }

    pub fn update_orientation(&mut self, device: DeviceOrientation, interface: InterfaceOrientation) {
        self.device_orientation = device;
        self.interface_orientation = interface;
    }

    pub fn set_camera_position(&mut self, camera: CameraPosition) {
        self.config.capture.camera_position = camera;
        self.resolver.set_camera(camera);
    }

    /// Forget frames, quadrilaterals and the stability streak.
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.last_frame = None;
        self.last_good = None;
        self.last_verdict = QualityVerdict::None;
    }
}
