// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanner configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, ScanError};
use crate::types::{CameraPosition, FilterConfig};

/// Rectangle candidate search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Noise floor: candidates enclosing less than this fraction of the frame
    /// are discarded before scoring.
    pub min_area_fraction: f32,
    /// Frames are downscaled so their larger side is at most this many pixels
    /// before edge detection.
    pub max_processing_dimension: u32,
    /// Gaussian pre-blur sigma.
    pub blur_sigma: f32,
    /// Canny hysteresis thresholds.
    pub canny_low: f32,
    pub canny_high: f32,
    /// Polygon simplification tolerance as a fraction of the contour perimeter.
    pub polygon_epsilon_fraction: f64,
    /// Radius (pixels) used to close small gaps in the edge map.
    pub edge_dilation: u8,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_area_fraction: 0.02,
            max_processing_dimension: 480,
            blur_sigma: 1.0,
            canny_low: 40.0,
            canny_high: 100.0,
            polygon_epsilon_fraction: 0.02,
            edge_dilation: 2,
        }
    }
}

/// Thresholds for the Good / BadAngle / TooFar verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Largest tolerated deviation of any corner angle from 90 degrees.
    pub max_angle_deviation_deg: f32,
    /// A rectangle smaller than this fraction of the frame is "too far".
    pub too_far_area_fraction: f32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            max_angle_deviation_deg: 20.0,
            too_far_area_fraction: 0.20,
        }
    }
}

/// Multi-frame auto-capture gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    /// Consecutive steady Good frames required to auto-capture. 0 disables
    /// auto-capture.
    pub auto_capture_threshold: u32,
    /// Largest corner movement between frames, as a fraction of the larger
    /// frame dimension, that still counts as the same rectangle.
    pub max_corner_displacement_fraction: f32,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            auto_capture_threshold: 10,
            max_corner_displacement_fraction: 0.05,
        }
    }
}

/// Still-capture output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// JPEG quality in `0.1..=1.0`.
    pub jpeg_quality: f32,
    pub camera_position: CameraPosition,
}

impl CaptureConfig {
    /// JPEG quality clamped to the supported range and scaled to 1..=100.
    pub fn jpeg_quality_percent(&self) -> u8 {
        let quality = if self.jpeg_quality.is_finite() {
            self.jpeg_quality.clamp(0.1, 1.0)
        } else {
            0.8
        };
        (quality * 100.0).round() as u8
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 0.5,
            camera_position: CameraPosition::Back,
        }
    }
}

/// Complete scanner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub detection: DetectionConfig,
    pub quality: QualityConfig,
    pub stability: StabilityConfig,
    pub capture: CaptureConfig,
    pub filter: FilterConfig,
    /// When false, frames are not searched for rectangles and auto-capture
    /// never fires.
    pub border_detection_enabled: bool,
    /// Hand a filtered copy of every processed frame to the host.
    pub emit_preview: bool,
    /// Minimum spacing between two detection passes in milliseconds.
    pub detection_interval_ms: u64,
    /// Buffered events per subscriber before slow subscribers start lagging.
    pub event_capacity: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            detection: DetectionConfig::default(),
            quality: QualityConfig::default(),
            stability: StabilityConfig::default(),
            capture: CaptureConfig::default(),
            filter: FilterConfig::default(),
            border_detection_enabled: true,
            emit_preview: true,
            detection_interval_ms: 0,
            event_capacity: 64,
        }
    }
}

impl ScannerConfig {
    /// Reject values that would make the pipeline misbehave.
    pub fn validate(&self) -> Result<()> {
        let fraction = |name: &str, value: f32| -> Result<()> {
            if !value.is_finite() || value <= 0.0 || value > 1.0 {
                return Err(ScanError::InvalidConfig(format!(
                    "{name} must be in (0, 1], got {value}"
                )));
            }
            Ok(())
        };

        fraction("detection.min_area_fraction", self.detection.min_area_fraction)?;
        fraction("quality.too_far_area_fraction", self.quality.too_far_area_fraction)?;
        fraction(
            "stability.max_corner_displacement_fraction",
            self.stability.max_corner_displacement_fraction,
        )?;

        if self.quality.too_far_area_fraction < self.detection.min_area_fraction {
            return Err(ScanError::InvalidConfig(
                "quality.too_far_area_fraction must not be below detection.min_area_fraction"
                    .into(),
            ));
        }

        let angle = self.quality.max_angle_deviation_deg;
        if !angle.is_finite() || !(0.0..=90.0).contains(&angle) {
            return Err(ScanError::InvalidConfig(format!(
                "quality.max_angle_deviation_deg must be in [0, 90], got {angle}"
            )));
        }

        if self.detection.max_processing_dimension < 32 {
            return Err(ScanError::InvalidConfig(
                "detection.max_processing_dimension must be at least 32".into(),
            ));
        }

        if self.detection.canny_low > self.detection.canny_high {
            return Err(ScanError::InvalidConfig(
                "detection.canny_low must not exceed detection.canny_high".into(),
            ));
        }

        let filter = &self.filter;
        if !(filter.saturation.is_finite() && filter.contrast.is_finite() && filter.brightness.is_finite())
        {
            return Err(ScanError::InvalidConfig("filter values must be finite".into()));
        }

        if self.event_capacity == 0 {
            return Err(ScanError::InvalidConfig("event_capacity must be positive".into()));
        }

        Ok(())
    }

    /// Load a configuration from a JSON file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        info!(path = %path.as_ref().display(), "scanner configuration loaded");
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        debug!(path = %path.as_ref().display(), "scanner configuration saved");
        Ok(())
    }
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FilterKind;

    #[test]
    fn default_config_is_valid() {
        ScannerConfig::default().validate().expect("defaults must validate");
    }

    #[test]
    fn too_far_below_noise_floor_is_rejected() {
        let mut config = ScannerConfig::default();
        config.detection.min_area_fraction = 0.3;
        config.quality.too_far_area_fraction = 0.1;
        assert!(matches!(config.validate(), Err(ScanError::InvalidConfig(_))));
    }

    #[test]
    fn non_finite_filter_is_rejected() {
        let mut config = ScannerConfig::default();
        config.filter.contrast = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn jpeg_quality_is_clamped() {
        let mut capture = CaptureConfig::default();
        assert_eq!(capture.jpeg_quality_percent(), 50);
        capture.jpeg_quality = 4.0;
        assert_eq!(capture.jpeg_quality_percent(), 100);
        capture.jpeg_quality = 0.0;
        assert_eq!(capture.jpeg_quality_percent(), 10);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("scanner.json");

        let mut config = ScannerConfig::default();
        config.stability.auto_capture_threshold = 4;
        config.filter.kind = FilterKind::Sepia;
        config.save(&path).expect("save");

        let loaded = ScannerConfig::load(&path).expect("load");
        assert_eq!(loaded.stability.auto_capture_threshold, 4);
        assert_eq!(loaded.filter.kind, FilterKind::Sepia);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "stability": { "auto_capture_threshold": 6 } }"#)
            .expect("write");

        let loaded = ScannerConfig::load(&path).expect("load");
        assert_eq!(loaded.stability.auto_capture_threshold, 6);
        assert!((loaded.stability.max_corner_displacement_fraction - 0.05).abs() < 1e-6);
        assert!(loaded.border_detection_enabled);
    }
}
