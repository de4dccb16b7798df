// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Quality classification — turns one frame's detection into the verdict the
// overlay and the stability tracker act on.

use docscan_core::config::QualityConfig;
use docscan_core::{DetectionResult, FrameSize, QualityVerdict};
use tracing::trace;

/// Classifies a detection as Good, BadAngle, TooFar or None.
///
/// Checks run in a fixed order and the first failure wins: a missing or
/// degenerate quadrilateral, then corner angles, then size. A skewed document
/// that is also small therefore reports `BadAngle`.
#[derive(Debug, Clone, Default)]
pub struct QualityClassifier {
    config: QualityConfig,
}

impl QualityClassifier {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    pub fn classify(&self, detection: &DetectionResult, frame: FrameSize) -> QualityVerdict {
        let Some(quad) = detection.quad else {
            return QualityVerdict::None;
        };
        if quad.validate().is_err() || frame.area() <= 0.0 {
            return QualityVerdict::None;
        }

        let deviation = quad.max_angle_deviation();
        if deviation > self.config.max_angle_deviation_deg {
            trace!(deviation, "Corner angles out of tolerance");
            return QualityVerdict::BadAngle;
        }

        let fraction = quad.area() / frame.area();
        if fraction < self.config.too_far_area_fraction {
            trace!(fraction, "Document too small in frame");
            return QualityVerdict::TooFar;
        }

        QualityVerdict::Good
    }
}
