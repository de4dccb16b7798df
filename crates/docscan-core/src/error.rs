// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for docscan.

use thiserror::Error;

/// Top-level error type for all scanner operations.
///
/// "No rectangle in this frame" has no variant: it is a normal
/// per-frame outcome, represented by an empty `DetectionResult`.
#[derive(Debug, Error)]
pub enum ScanError {
    // -- Geometry / capture --
    #[error("degenerate quadrilateral: {0}")]
    DegenerateGeometry(String),

    #[error("capture unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("perspective correction failed: {0}")]
    CorrectionFailure(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -- Session lifecycle --
    #[error("camera session error: {0}")]
    Session(String),

    #[error("scanner is not running")]
    NotRunning,

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanError>;
