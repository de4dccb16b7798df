// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Events emitted by the scanner to the hosting UI layer.

use std::sync::Arc;

use image::RgbaImage;

use crate::geometry::Quadrilateral;
use crate::types::{CaptureId, CaptureResult, DeviceSetup, FrameSize, QualityVerdict};

/// Everything the scanner tells its host about.
///
/// Large payloads are behind `Arc` so one event can fan out to several
/// subscribers without copying pixels.
#[derive(Debug, Clone)]
pub enum ScannerEvent {
    /// The camera session is ready.
    DeviceSetup(DeviceSetup),
    TorchChanged { enabled: bool },
    /// Emitted once per processed frame for live overlay rendering.
    RectangleDetected {
        sequence: u64,
        verdict: QualityVerdict,
        quad: Option<Quadrilateral>,
        confidence: u8,
        frame_size: FrameSize,
    },
    /// Filtered copy of a live frame.
    PreviewReady {
        sequence: u64,
        image: Arc<RgbaImage>,
    },
    /// A capture was committed; correction is still running.
    PictureTaken { id: CaptureId, auto: bool },
    /// Correction and filtering finished.
    PictureProcessed(Arc<CaptureResult>),
    /// Capture `id` ran into trouble.
    ///
    /// When `recoverable` is set the capture still completes with a
    /// `PictureProcessed` carrying the same id (a degraded result);
    /// otherwise no image follows for that id.
    ErrorProcessingImage {
        id: CaptureId,
        reason: String,
        recoverable: bool,
    },
}

impl ScannerEvent {
    /// Short name for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DeviceSetup(_) => "device_setup",
            Self::TorchChanged { .. } => "torch_changed",
            Self::RectangleDetected { .. } => "rectangle_detected",
            Self::PreviewReady { .. } => "preview_ready",
            Self::PictureTaken { .. } => "picture_taken",
            Self::PictureProcessed(_) => "picture_processed",
            Self::ErrorProcessingImage { .. } => "error_processing_image",
        }
    }
}
