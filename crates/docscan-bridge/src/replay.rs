// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Replay camera — feeds a fixed set of still images into a scanner as if they
// were a live stream. Used by the CLI and by tests on machines without a
// camera.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use docscan_core::error::{Result, ScanError};
use docscan_core::{DeviceSetup, Frame, Rotation};
use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::traits::{CameraSession, FrameConsumer};

/// File extensions picked up by [`ReplayCamera::from_dir`].
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"];

/// Replay rates outside this range are clamped.
const FPS_RANGE: (f32, f32) = (0.1, 240.0);
const DEFAULT_FPS: f32 = 15.0;

/// Camera session backed by in-memory images, streamed on a producer thread.
pub struct ReplayCamera {
    frames: Arc<Vec<RgbaImage>>,
    interval: Duration,
    native_rotation: Rotation,
    looping: bool,
    torch: bool,
    running: Arc<AtomicBool>,
    producer: Option<JoinHandle<()>>,
}

impl ReplayCamera {
    /// Replay `frames` at `fps` frames per second, clamped to 0.1..=240.
    /// A non-finite or non-positive rate falls back to 15.
    pub fn new(frames: Vec<RgbaImage>, fps: f32) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 {
            fps.clamp(FPS_RANGE.0, FPS_RANGE.1)
        } else {
            DEFAULT_FPS
        };
        Self {
            frames: Arc::new(frames),
            interval: Duration::from_secs_f32(1.0 / fps),
            native_rotation: Rotation::Deg0,
            looping: false,
            torch: false,
            running: Arc::new(AtomicBool::new(false)),
            producer: None,
        }
    }

    /// Load every image in `dir`, sorted by file name.
    pub fn from_dir(dir: impl AsRef<Path>, fps: f32) -> Result<Self> {
        let mut paths: Vec<_> = std::fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            })
            .collect();
        paths.sort();

        let frames = paths
            .iter()
            .map(|path| {
                image::open(path).map(|img| img.to_rgba8()).map_err(|err| {
                    ScanError::ImageError(format!("failed to open {}: {}", path.display(), err))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(dir = %dir.as_ref().display(), frames = frames.len(), "Replay frames loaded");
        Ok(Self::new(frames, fps))
    }

    /// Tag every frame with this sensor rotation.
    pub fn with_native_rotation(mut self, rotation: Rotation) -> Self {
        self.native_rotation = rotation;
        self
    }

    /// Start over from the first frame after the last one.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn torch(&self) -> bool {
        self.torch
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl CameraSession for ReplayCamera {
    fn start(&mut self, consumer: Arc<dyn FrameConsumer>) -> Result<DeviceSetup> {
        let Some(first) = self.frames.first() else {
            return Err(ScanError::Session("replay camera has no frames".into()));
        };
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ScanError::Session("replay camera is already running".into()));
        }

        let setup = DeviceSetup {
            width: first.width(),
            height: first.height(),
            has_camera: true,
            permission_granted: true,
            flash_available: false,
            torch_available: true,
        };

        let frames = Arc::clone(&self.frames);
        let running = Arc::clone(&self.running);
        let interval = self.interval;
        let rotation = self.native_rotation;
        let looping = self.looping;

        let handle = std::thread::Builder::new()
            .name("docscan-replay".into())
            .spawn(move || {
                let mut sequence = 0u64;
                'replay: loop {
                    for pixels in frames.iter() {
                        if !running.load(Ordering::SeqCst) {
                            break 'replay;
                        }
                        consumer.submit_frame(Frame::new(sequence, rotation, pixels.clone()));
                        sequence += 1;
                        std::thread::sleep(interval);
                    }
                    if !looping {
                        break;
                    }
                }
                running.store(false, Ordering::SeqCst);
                debug!(frames = sequence, "Replay producer finished");
            })
            .map_err(|err| {
                self.running.store(false, Ordering::SeqCst);
                ScanError::Session(format!("failed to spawn replay thread: {err}"))
            })?;

        self.producer = Some(handle);
        info!(width = setup.width, height = setup.height, "Replay camera started");
        Ok(setup)
    }

    fn stop(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.producer.take() {
            if handle.join().is_err() {
                warn!("Replay producer thread panicked");
            }
        }
        Ok(())
    }

    fn set_torch(&mut self, enabled: bool) -> Result<()> {
        self.torch = enabled;
        Ok(())
    }
}

impl Drop for ReplayCamera {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}
