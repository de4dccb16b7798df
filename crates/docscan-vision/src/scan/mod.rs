// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline — rectangle detection, quality classification and
// perspective correction.

pub mod correct;
pub mod detect;
pub mod quality;

pub use correct::correct_perspective;
pub use detect::RectangleDetector;
pub use quality::QualityClassifier;
