// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable guidance for the live overlay and for capture errors.
//
// Every verdict and error maps to a short plain-English message, a suggestion
// the user can act on, and the overlay colour the host should draw.

use crate::error::ScanError;
use crate::types::QualityVerdict;

/// How urgently the host should surface a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Everything is fine; no message needed.
    Info,
    /// The user should adjust how they hold the camera.
    Adjust,
    /// Something went wrong but scanning can continue.
    Recoverable,
    /// Scanning cannot continue without outside help (permissions, hardware).
    Blocking,
}

/// Overlay fill/stroke colour as RGB.
pub type OverlayColor = [u8; 3];

/// Default document highlight (amber).
pub const GOOD_COLOR: OverlayColor = [255, 181, 6];
pub const BAD_ANGLE_COLOR: OverlayColor = [230, 57, 70];
pub const TOO_FAR_COLOR: OverlayColor = [244, 140, 6];

/// A message for the user with an actionable suggestion.
#[derive(Debug, Clone)]
pub struct Guidance {
    pub message: String,
    pub suggestion: String,
    pub severity: Severity,
    /// Colour for the rectangle overlay, or `None` to draw nothing.
    pub overlay: Option<OverlayColor>,
}

/// Overlay guidance for one frame's verdict.
pub fn guidance_for_verdict(verdict: QualityVerdict) -> Guidance {
    match verdict {
        QualityVerdict::Good => Guidance {
            message: "Document found.".into(),
            suggestion: "Hold still, the picture will be taken automatically.".into(),
            severity: Severity::Info,
            overlay: Some(GOOD_COLOR),
        },
        QualityVerdict::BadAngle => Guidance {
            message: "The document is at an angle.".into(),
            suggestion: "Hold the phone flat above the page.".into(),
            severity: Severity::Adjust,
            overlay: Some(BAD_ANGLE_COLOR),
        },
        QualityVerdict::TooFar => Guidance {
            message: "The document is too far away.".into(),
            suggestion: "Move closer so the page fills more of the screen.".into(),
            severity: Severity::Adjust,
            overlay: Some(TOO_FAR_COLOR),
        },
        QualityVerdict::None => Guidance {
            message: "Looking for a document.".into(),
            suggestion: "Place the page on a contrasting surface with good light.".into(),
            severity: Severity::Info,
            overlay: None,
        },
    }
}

/// Convert a `ScanError` into something a user can act on.
pub fn humanize_error(err: &ScanError) -> Guidance {
    let (message, suggestion, severity) = match err {
        ScanError::DegenerateGeometry(_) => (
            "The document edges could not be traced.",
            "Try again with the whole page visible.".to_string(),
            Severity::Recoverable,
        ),
        ScanError::CaptureUnavailable(detail) => (
            "The picture could not be taken.",
            format!("Make sure the camera is running and try again. ({detail})"),
            Severity::Recoverable,
        ),
        ScanError::CorrectionFailure(_) => (
            "The page could not be straightened.",
            "The picture was kept as taken. Try again from directly above.".to_string(),
            Severity::Recoverable,
        ),
        ScanError::ImageError(detail) => (
            "The picture could not be processed.",
            format!("Try again. ({detail})"),
            Severity::Recoverable,
        ),
        ScanError::InvalidConfig(detail) => (
            "The scanner settings are invalid.",
            format!("Reset the scanner settings to their defaults. ({detail})"),
            Severity::Blocking,
        ),
        ScanError::Session(detail) => (
            "The camera stopped working.",
            format!("Close other apps using the camera and restart scanning. ({detail})"),
            Severity::Blocking,
        ),
        ScanError::NotRunning => (
            "The scanner is not running.",
            "Start scanning first.".to_string(),
            Severity::Recoverable,
        ),
        ScanError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::PermissionDenied => (
                "The scanner is not allowed to use a file it needs.",
                "Check the app's storage permissions.".to_string(),
                Severity::Blocking,
            ),
            _ => (
                "A file could not be read or written.",
                format!("Check there is enough free space. ({io_err})"),
                Severity::Recoverable,
            ),
        },
        ScanError::Serialization(_) => (
            "The scanner settings file is damaged.",
            "Delete the settings file to restore the defaults.".to_string(),
            Severity::Recoverable,
        ),
        ScanError::PlatformUnavailable => (
            "There is no camera on this device.",
            "Use a device with a camera, or import a photo instead.".to_string(),
            Severity::Blocking,
        ),
    };

    Guidance {
        message: message.into(),
        suggestion,
        severity,
        overlay: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_detections_draw_an_overlay() {
        assert_eq!(guidance_for_verdict(QualityVerdict::Good).overlay, Some(GOOD_COLOR));
        assert!(guidance_for_verdict(QualityVerdict::TooFar).overlay.is_some());
        assert!(guidance_for_verdict(QualityVerdict::None).overlay.is_none());
    }

    #[test]
    fn capture_unavailable_is_recoverable() {
        let guidance = humanize_error(&ScanError::CaptureUnavailable("no frame".into()));
        assert_eq!(guidance.severity, Severity::Recoverable);
        assert!(guidance.suggestion.contains("no frame"));
    }

    #[test]
    fn missing_camera_blocks() {
        let guidance = humanize_error(&ScanError::PlatformUnavailable);
        assert_eq!(guidance.severity, Severity::Blocking);
    }
}
