// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capability traits at the boundary between the scanner and its host.
//
// The camera session pushes frames in through `FrameConsumer`; the host UI
// drives the scanner through `CaptureTrigger` and `ConfigSink`. Nothing here
// knows how the scanner is built.

use std::sync::Arc;

use docscan_core::error::Result;
use docscan_core::{DeviceOrientation, DeviceSetup, FilterConfig, Frame, InterfaceOrientation};

/// Receives raw frames from a camera session.
///
/// Called from the camera's own producer thread. Implementations must not
/// block: a slow consumer should overwrite, not queue.
pub trait FrameConsumer: Send + Sync {
    fn submit_frame(&self, frame: Frame);
}

/// A live camera session owned by the platform.
pub trait CameraSession: Send {
    /// Start streaming frames into `consumer`. Returns the session parameters
    /// once the camera is ready.
    fn start(&mut self, consumer: Arc<dyn FrameConsumer>) -> Result<DeviceSetup>;

    /// Stop streaming. Must be safe to call on an already stopped session.
    fn stop(&mut self) -> Result<()>;

    /// Switch the torch on or off.
    fn set_torch(&mut self, enabled: bool) -> Result<()>;
}

/// Requests a still capture outside the auto-capture path.
pub trait CaptureTrigger {
    fn request_capture(&self) -> Result<()>;
}

/// Runtime configuration coming from the host UI.
pub trait ConfigSink {
    fn set_enable_border_detection(&self, enabled: bool) -> Result<()>;

    fn set_filter_config(&self, config: FilterConfig) -> Result<()>;

    /// Consecutive stable frames required to auto-capture; 0 disables it.
    fn set_auto_capture_threshold(&self, frames: u32) -> Result<()>;

    fn update_orientation(
        &self,
        device: DeviceOrientation,
        interface: InterfaceOrientation,
    ) -> Result<()>;
}
