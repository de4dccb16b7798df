// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docscan — Boundary between the scanner and the platform camera / host UI.
//
// Defines the capability traits the scanner consumes (`CameraSession`) and
// exposes (`FrameConsumer`, `CaptureTrigger`, `ConfigSink`), a stub camera
// for builds without camera hardware, and a replay camera that streams
// still images.

pub mod replay;
pub mod stub;
pub mod traits;

pub use replay::ReplayCamera;
pub use stub::StubCamera;
pub use traits::{CameraSession, CaptureTrigger, ConfigSink, FrameConsumer};

/// The camera session for this build.
///
/// Platform integrations hand their own `CameraSession` to the scanner;
/// without one this falls back to the stub, which reports
/// `PlatformUnavailable`.
pub fn platform_camera() -> Box<dyn CameraSession> {
    Box::new(StubCamera)
}
