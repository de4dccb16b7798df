// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Orientation resolver — decides how a raw camera buffer must be rotated and
// mirrored before any geometry runs on it.
//
// All rotations are clockwise quarter turns:
//
//   effective = native ∘ device ∘ interface⁻¹
//
// `native` is the rotation that brings the sensor buffer upright when the
// device is held in portrait, `device` is how far the device is rolled away
// from portrait, and `interface` is how far the host UI has rotated with it.
// Front cameras are mirrored and roll the opposite way.

use docscan_core::{CameraPosition, DeviceOrientation, InterfaceOrientation, ResolvedOrientation, Rotation};
use tracing::debug;

/// Stateful resolver remembering the last valid device attitude.
#[derive(Debug, Clone)]
pub struct OrientationResolver {
    camera: CameraPosition,
    last: ResolvedOrientation,
    /// Whether a reading with a definite roll has arrived yet.
    has_attitude: bool,
}

impl OrientationResolver {
    pub fn new(camera: CameraPosition) -> Self {
        Self {
            camera,
            last: ResolvedOrientation {
                rotation: Rotation::Deg0,
                mirrored: camera == CameraPosition::Front,
            },
            has_attitude: false,
        }
    }

    /// The most recently resolved orientation.
    pub fn current(&self) -> ResolvedOrientation {
        self.last
    }

    pub fn camera(&self) -> CameraPosition {
        self.camera
    }

    /// Switch cameras. Mirroring of the remembered orientation follows.
    pub fn set_camera(&mut self, camera: CameraPosition) {
        self.camera = camera;
        self.last.mirrored = camera == CameraPosition::Front;
    }

    /// Resolve the rotation/mirroring for a buffer.
    ///
    /// A face-up, face-down or unknown device attitude carries no roll
    /// information; the previously resolved orientation is returned unchanged.
    /// Until the first definite reading the device is assumed to be held in
    /// portrait, so a session that starts flat on a desk still sees an
    /// upright buffer.
    pub fn resolve(
        &mut self,
        device: DeviceOrientation,
        interface: InterfaceOrientation,
        native: Rotation,
    ) -> ResolvedOrientation {
        let device_rotation = match device.rotation() {
            Some(rotation) => {
                self.has_attitude = true;
                rotation
            }
            None if self.has_attitude => {
                debug!(?device, last = ?self.last, "Ambiguous device attitude, keeping last orientation");
                return self.last;
            }
            None => Rotation::Deg0,
        };

        let roll = match self.camera {
            CameraPosition::Back => device_rotation,
            CameraPosition::Front => device_rotation.inverse(),
        };

        let resolved = ResolvedOrientation {
            rotation: native.then(roll).then(interface.rotation().inverse()),
            mirrored: self.camera == CameraPosition::Front,
        };

        if resolved != self.last {
            debug!(?device, ?interface, ?native, ?resolved, "Orientation changed");
        }
        self.last = resolved;
        resolved
    }
}

impl Default for OrientationResolver {
    fn default() -> Self {
        Self::new(CameraPosition::Back)
    }
}
