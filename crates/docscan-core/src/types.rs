// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the docscan frame-processing pipeline.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::Quadrilateral;

/// Pixel dimensions of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total area in pixels.
    pub fn area(&self) -> f32 {
        self.width as f32 * self.height as f32
    }

    /// The larger of width and height.
    pub fn max_dimension(&self) -> u32 {
        self.width.max(self.height)
    }

    /// Size after rotating by `rotation`.
    pub fn rotated(&self, rotation: Rotation) -> Self {
        match rotation {
            Rotation::Deg90 | Rotation::Deg270 => Self::new(self.height, self.width),
            Rotation::Deg0 | Rotation::Deg180 => *self,
        }
    }
}

// -- Orientation --------------------------------------------------------------

/// Clockwise rotation in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(&self) -> u32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Snap an arbitrary angle (any sign) to the nearest quarter turn.
    pub fn from_degrees(degrees: i32) -> Self {
        let quarter = ((degrees as f32 / 90.0).round() as i32).rem_euclid(4);
        match quarter {
            1 => Self::Deg90,
            2 => Self::Deg180,
            3 => Self::Deg270,
            _ => Self::Deg0,
        }
    }

    /// Compose two clockwise rotations.
    pub fn then(self, other: Rotation) -> Rotation {
        Self::from_degrees((self.degrees() + other.degrees()) as i32)
    }

    /// The rotation that undoes this one.
    pub fn inverse(self) -> Rotation {
        Self::from_degrees(360 - self.degrees() as i32)
    }
}

/// Physical attitude of the device as reported by its motion sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceOrientation {
    Portrait,
    PortraitUpsideDown,
    /// Device rotated so its top points left.
    LandscapeLeft,
    /// Device rotated so its top points right.
    LandscapeRight,
    FaceUp,
    FaceDown,
    Unknown,
}

impl DeviceOrientation {
    /// Clockwise rotation of the device away from portrait, or `None` when the
    /// attitude says nothing about how the camera is rolled.
    pub fn rotation(&self) -> Option<Rotation> {
        match self {
            Self::Portrait => Some(Rotation::Deg0),
            Self::LandscapeRight => Some(Rotation::Deg90),
            Self::PortraitUpsideDown => Some(Rotation::Deg180),
            Self::LandscapeLeft => Some(Rotation::Deg270),
            Self::FaceUp | Self::FaceDown | Self::Unknown => None,
        }
    }
}

/// Orientation of the host user interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InterfaceOrientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
}

impl InterfaceOrientation {
    /// Clockwise rotation of the interface away from portrait.
    pub fn rotation(&self) -> Rotation {
        match self {
            Self::Portrait => Rotation::Deg0,
            Self::LandscapeRight => Rotation::Deg90,
            Self::PortraitUpsideDown => Rotation::Deg180,
            Self::LandscapeLeft => Rotation::Deg270,
        }
    }
}

/// Which physical camera produces the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CameraPosition {
    #[default]
    Back,
    /// Front cameras deliver mirrored buffers.
    Front,
}

/// Rotation and mirroring to apply to a raw buffer before any geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ResolvedOrientation {
    pub rotation: Rotation,
    pub mirrored: bool,
}

// -- Frames -------------------------------------------------------------------

/// One camera tick: an immutable pixel buffer plus its native orientation.
///
/// Pixels sit behind an `Arc`, so cloning a frame never copies the buffer and
/// the detection and capture paths can read the same frame concurrently.
#[derive(Debug, Clone)]
pub struct Frame {
    sequence: u64,
    native_rotation: Rotation,
    pixels: Arc<RgbaImage>,
}

impl Frame {
    pub fn new(sequence: u64, native_rotation: Rotation, pixels: RgbaImage) -> Self {
        Self {
            sequence,
            native_rotation,
            pixels: Arc::new(pixels),
        }
    }

    /// Upright frame with no native rotation.
    pub fn upright(sequence: u64, pixels: RgbaImage) -> Self {
        Self::new(sequence, Rotation::Deg0, pixels)
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Rotation the sensor applied to this buffer relative to upright portrait.
    pub fn native_rotation(&self) -> Rotation {
        self.native_rotation
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Size of the raw (not yet normalised) buffer.
    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.pixels.width(), self.pixels.height())
    }
}

// -- Detection ----------------------------------------------------------------

/// Outcome of the rectangle search on one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Best candidate, or `None` when nothing cleared the noise floor.
    pub quad: Option<Quadrilateral>,
    /// Confidence in `0..=100`.
    pub confidence: u8,
}

impl DetectionResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn found(quad: Quadrilateral, confidence: u8) -> Self {
        Self {
            quad: Some(quad),
            confidence: confidence.min(100),
        }
    }

    pub fn is_found(&self) -> bool {
        self.quad.is_some()
    }
}

/// Geometric quality of a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QualityVerdict {
    Good,
    BadAngle,
    TooFar,
    /// No rectangle in this frame.
    #[default]
    None,
}

impl QualityVerdict {
    pub fn is_good(&self) -> bool {
        matches!(self, Self::Good)
    }
}

/// A quadrilateral together with the size and orientation of the frame it
/// was found in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackedQuad {
    pub quad: Quadrilateral,
    pub frame_size: FrameSize,
    #[serde(default)]
    pub orientation: ResolvedOrientation,
}

impl TrackedQuad {
    /// Quad found in an upright, unmirrored frame.
    pub fn new(quad: Quadrilateral, frame_size: FrameSize) -> Self {
        Self {
            quad,
            frame_size,
            orientation: ResolvedOrientation::default(),
        }
    }

    pub fn in_orientation(mut self, orientation: ResolvedOrientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Corners mapped onto a frame of size `to` with the same orientation.
    pub fn quad_for(&self, to: FrameSize) -> Quadrilateral {
        self.quad.rescaled(self.frame_size, to)
    }

    /// Corners mapped onto a frame of size `to` oriented by `orientation`, or
    /// `None` when that orientation differs from the one the quad was found
    /// in. Rescaling across a rotation would stretch the corners onto the
    /// wrong region.
    pub fn quad_in(&self, to: FrameSize, orientation: ResolvedOrientation) -> Option<Quadrilateral> {
        (orientation == self.orientation).then(|| self.quad_for(to))
    }
}

// -- Filters ------------------------------------------------------------------

/// Stylistic filter applied after the colour adjustments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FilterKind {
    #[default]
    None,
    Greyscale,
    BlackAndWhite,
    Sepia,
    ColorEnhance,
}

impl FilterKind {
    /// Map the numeric filter ids used by older host integrations
    /// (1 photo, 2 greyscale, 3 colour, 4 black & white).
    pub fn from_legacy_id(id: u32) -> Self {
        match id {
            2 => Self::Greyscale,
            3 => Self::ColorEnhance,
            4 => Self::BlackAndWhite,
            _ => Self::None,
        }
    }
}

impl std::str::FromStr for FilterKind {
    type Err = crate::error::ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "none" | "photo" | "original" => Ok(Self::None),
            "greyscale" | "grayscale" => Ok(Self::Greyscale),
            "blackandwhite" | "bw" => Ok(Self::BlackAndWhite),
            "sepia" => Ok(Self::Sepia),
            "colorenhance" | "color" | "colour" => Ok(Self::ColorEnhance),
            other => Err(crate::error::ScanError::InvalidConfig(format!(
                "unknown filter kind: {other}"
            ))),
        }
    }
}

/// Colour adjustments plus a stylistic filter.
///
/// The neutral configuration (`FilterKind::None`, saturation 1, contrast 1,
/// brightness 0) leaves pixels untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub kind: FilterKind,
    /// Multiplier on chroma around luma; 1.0 is neutral, 0.0 is grey.
    pub saturation: f32,
    /// Multiplier around mid-grey; 1.0 is neutral.
    pub contrast: f32,
    /// Offset as a fraction of full scale (-1.0..=1.0); 0.0 is neutral.
    pub brightness: f32,
}

impl FilterConfig {
    pub const NEUTRAL: Self = Self {
        kind: FilterKind::None,
        saturation: 1.0,
        contrast: 1.0,
        brightness: 0.0,
    };

    pub fn with_kind(kind: FilterKind) -> Self {
        Self {
            kind,
            ..Self::NEUTRAL
        }
    }

    /// Whether the colour adjustments are all at their neutral values.
    pub fn adjustments_are_neutral(&self) -> bool {
        self.saturation == 1.0 && self.contrast == 1.0 && self.brightness == 0.0
    }

    pub fn is_identity(&self) -> bool {
        self.kind == FilterKind::None && self.adjustments_are_neutral()
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

// -- Capture ------------------------------------------------------------------

/// Why a capture is happening.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CaptureRequest {
    /// User-triggered; corrects with the last good quadrilateral if one exists.
    Manual { quad: Option<TrackedQuad> },
    /// Fired by the stability tracker with the quadrilateral that held steady.
    Auto { quad: TrackedQuad },
}

impl CaptureRequest {
    pub fn manual() -> Self {
        Self::Manual { quad: None }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, Self::Auto { .. })
    }

    pub fn source_quad(&self) -> Option<&TrackedQuad> {
        match self {
            Self::Manual { quad } => quad.as_ref(),
            Self::Auto { quad } => Some(quad),
        }
    }
}

/// Unique identifier for a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptureId(pub Uuid);

impl CaptureId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CaptureId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CaptureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Quality recorded at the moment of capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CaptureQuality {
    pub verdict: QualityVerdict,
    /// Perspective correction was attempted but failed; the corrected image
    /// is the uncorrected frame.
    pub degraded: bool,
}

/// Finished capture, handed to the host and never touched again by the pipeline.
#[derive(Debug, Clone)]
pub struct CaptureResult {
    pub id: CaptureId,
    /// Perspective-corrected and filtered document.
    pub corrected: RgbaImage,
    /// Orientation-normalised frame, without correction or filtering.
    pub original: RgbaImage,
    /// Quadrilateral used for correction, in `original` pixel coordinates.
    pub source_quad: Option<Quadrilateral>,
    pub quality: CaptureQuality,
    /// Orientation applied to the raw buffer.
    pub orientation: ResolvedOrientation,
    pub frame_sequence: u64,
    pub captured_at: DateTime<Utc>,
}

/// Camera parameters reported once the session is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceSetup {
    pub width: u32,
    pub height: u32,
    pub has_camera: bool,
    pub permission_granted: bool,
    pub flash_available: bool,
    pub torch_available: bool,
}

/// Capture images encoded for hand-off to a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCapture {
    pub id: CaptureId,
    pub corrected: Vec<u8>,
    pub original: Vec<u8>,
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_composition_wraps() {
        assert_eq!(Rotation::Deg90.then(Rotation::Deg270), Rotation::Deg0);
        assert_eq!(Rotation::Deg180.then(Rotation::Deg270), Rotation::Deg90);
        assert_eq!(Rotation::Deg90.inverse(), Rotation::Deg270);
        assert_eq!(Rotation::from_degrees(-90), Rotation::Deg270);
        assert_eq!(Rotation::from_degrees(450), Rotation::Deg90);
    }

    #[test]
    fn face_up_has_no_rotation() {
        assert_eq!(DeviceOrientation::FaceUp.rotation(), None);
        assert_eq!(DeviceOrientation::FaceDown.rotation(), None);
        assert_eq!(
            DeviceOrientation::LandscapeRight.rotation(),
            Some(Rotation::Deg90)
        );
    }

    #[test]
    fn legacy_filter_ids() {
        assert_eq!(FilterKind::from_legacy_id(1), FilterKind::None);
        assert_eq!(FilterKind::from_legacy_id(2), FilterKind::Greyscale);
        assert_eq!(FilterKind::from_legacy_id(3), FilterKind::ColorEnhance);
        assert_eq!(FilterKind::from_legacy_id(4), FilterKind::BlackAndWhite);
        assert_eq!(FilterKind::from_legacy_id(99), FilterKind::None);
    }

    #[test]
    fn filter_kind_parses_aliases() {
        assert_eq!("black-and-white".parse::<FilterKind>().unwrap(), FilterKind::BlackAndWhite);
        assert_eq!("Sepia".parse::<FilterKind>().unwrap(), FilterKind::Sepia);
        assert!("vaporwave".parse::<FilterKind>().is_err());
    }

    #[test]
    fn neutral_filter_is_identity() {
        assert!(FilterConfig::default().is_identity());
        assert!(!FilterConfig::with_kind(FilterKind::Sepia).is_identity());
    }

    #[test]
    fn detection_confidence_is_capped() {
        let quad = Quadrilateral::from_rect(0.0, 0.0, 10.0, 10.0);
        assert_eq!(DetectionResult::found(quad, 250).confidence, 100);
        assert!(!DetectionResult::none().is_found());
    }

    #[test]
    fn tracked_quad_rescales() {
        let tracked = TrackedQuad::new(
            Quadrilateral::from_rect(10.0, 10.0, 10.0, 10.0),
            FrameSize::new(100, 100),
        );
        let quad = tracked.quad_for(FrameSize::new(50, 50));
        assert_eq!(quad.top_left.x, 5.0);
    }

    #[test]
    fn tracked_quad_refuses_other_orientation() {
        let tracked = TrackedQuad::new(
            Quadrilateral::from_rect(60.0, 50.0, 280.0, 200.0),
            FrameSize::new(400, 300),
        );
        let sideways = ResolvedOrientation {
            rotation: Rotation::Deg90,
            mirrored: false,
        };
        assert!(tracked.quad_in(FrameSize::new(300, 400), sideways).is_none());
        assert!(
            tracked
                .quad_in(FrameSize::new(400, 300), ResolvedOrientation::default())
                .is_some()
        );

        let turned = tracked.in_orientation(sideways);
        assert!(turned.quad_in(FrameSize::new(400, 300), sideways).is_some());
    }
}
