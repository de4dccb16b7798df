// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docscan-vision — Per-frame image work for the docscan pipeline.
//
// Provides orientation resolution, rectangle candidate detection, quality
// classification, perspective correction and the filter pipeline. Everything
// here is stateless per call apart from the orientation resolver's memory of
// the last valid device attitude.

pub mod filter;
pub mod image;
pub mod orientation;
pub mod scan;

// Re-export the primary structs so callers can use `docscan_vision::RectangleDetector` etc.
pub use filter::apply_filter;
pub use crate::image::processor::{ImageProcessor, encode_capture};
pub use orientation::OrientationResolver;
pub use scan::correct::correct_perspective;
pub use scan::detect::RectangleDetector;
pub use scan::quality::QualityClassifier;
