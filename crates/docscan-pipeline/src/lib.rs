// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docscan-pipeline — Stateful side of the scanner.
//
// `ScannerPipeline` runs one frame at a time through detection, quality
// classification and the stability gate. `ScannerSession` drives it from a
// camera session on tokio and publishes `ScannerEvent`s.

pub mod capture;
pub mod pipeline;
pub mod session;
pub mod stability;

pub use capture::{CaptureContext, CaptureOrchestrator};
pub use pipeline::{FrameOutcome, ScannerPipeline};
pub use session::{ScannerHandle, ScannerSession, SessionStatus};
pub use stability::{StabilityPhase, StabilityState, StabilityTracker};
