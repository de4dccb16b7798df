// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub camera for desktop/CI builds where no camera hardware is wired up.
//
// Starting the camera or the torch returns `PlatformUnavailable`; hosts that
// need frames on such platforms use `ReplayCamera` instead.

use std::sync::Arc;

use docscan_core::DeviceSetup;
use docscan_core::error::{Result, ScanError};

use crate::traits::{CameraSession, FrameConsumer};

/// No-op camera returned when no platform camera is available.
#[derive(Debug, Default)]
pub struct StubCamera;

impl CameraSession for StubCamera {
    fn start(&mut self, _consumer: Arc<dyn FrameConsumer>) -> Result<DeviceSetup> {
        tracing::warn!("CameraSession::start called on stub camera");
        Err(ScanError::PlatformUnavailable)
    }

    fn stop(&mut self) -> Result<()> {
        // Nothing is running, so stopping trivially succeeds.
        Ok(())
    }

    fn set_torch(&mut self, _enabled: bool) -> Result<()> {
        tracing::warn!("CameraSession::set_torch called on stub camera");
        Err(ScanError::PlatformUnavailable)
    }
}
