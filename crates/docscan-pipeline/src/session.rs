// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Live scanning session — connects a camera session to the pipeline and
// publishes events to the host.
//
// # Concurrency
//
// The camera pushes frames from its own thread into a `watch` slot. The slot
// holds only the newest frame, so a frame that arrives while the previous one
// is still being processed replaces any frame still waiting.
//
// A single processing task drains the slot. Detection and capture run on the
// blocking pool but are awaited one at a time, so the stability state never
// sees two concurrent writers. Manual capture requests travel on an `mpsc`
// channel into the same task. Events fan out on a bounded `broadcast`
// channel; a subscriber that falls behind loses old events instead of
// growing memory.
//
// `stop_scanning` stops the camera, signals the task through `Notify`, waits
// for it to finish and resets the stability tracker to Idle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use docscan_bridge::{CameraSession, CaptureTrigger, ConfigSink, FrameConsumer};
use docscan_core::config::ScannerConfig;
use docscan_core::error::{Result, ScanError};
use docscan_core::{
    CameraPosition, CaptureId, CaptureRequest, CaptureResult, DeviceOrientation, FilterConfig, Frame,
    InterfaceOrientation, ScannerEvent,
};
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::pipeline::ScannerPipeline;

/// Pending manual capture requests before `request_capture` pushes back.
const COMMAND_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Stopped,
    Running,
}

/// Work for the processing task besides frames.
#[derive(Debug)]
enum Command {
    Capture(CaptureRequest),
}

/// Latest-frame-wins slot the camera writes into.
struct FrameSlot {
    sender: watch::Sender<Option<Frame>>,
}

impl FrameConsumer for FrameSlot {
    fn submit_frame(&self, frame: Frame) {
        // Overwrites any frame the processing task has not picked up yet.
        self.sender.send_replace(Some(frame));
    }
}

/// Recover the guard from a poisoned lock; the pipeline holds no invariant
/// that a panicking detection pass could leave half-updated.
fn lock(pipeline: &Mutex<ScannerPipeline>) -> MutexGuard<'_, ScannerPipeline> {
    pipeline.lock().unwrap_or_else(PoisonError::into_inner)
}

fn emit(events: &broadcast::Sender<ScannerEvent>, event: ScannerEvent) {
    let name = event.name();
    if events.send(event).is_err() {
        debug!(event = name, "No subscribers for event");
    }
}

/// A running (or stoppable) scanner bound to one camera session.
pub struct ScannerSession {
    status: SessionStatus,
    camera: Box<dyn CameraSession>,
    pipeline: Arc<Mutex<ScannerPipeline>>,
    slot: Arc<FrameSlot>,
    events: broadcast::Sender<ScannerEvent>,
    commands: mpsc::Sender<Command>,
    /// Returned by the processing task when it exits, for the next start.
    command_rx: Option<mpsc::Receiver<Command>>,
    running: Arc<AtomicBool>,
    shutdown_signal: Arc<Notify>,
    task_handle: Option<JoinHandle<mpsc::Receiver<Command>>>,
    detection_interval: Duration,
    torch: bool,
}

impl ScannerSession {
    /// Create a stopped session. Fails if `config` does not validate.
    pub fn new(config: ScannerConfig, camera: Box<dyn CameraSession>) -> Result<Self> {
        let detection_interval = Duration::from_millis(config.detection_interval_ms);
        let (events, _) = broadcast::channel(config.event_capacity);
        let pipeline = ScannerPipeline::new(config)?;
        let (sender, _) = watch::channel(None);
        let (commands, command_rx) = mpsc::channel(COMMAND_CAPACITY);

        Ok(Self {
            status: SessionStatus::Stopped,
            camera,
            pipeline: Arc::new(Mutex::new(pipeline)),
            slot: Arc::new(FrameSlot { sender }),
            events,
            commands,
            command_rx: Some(command_rx),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_signal: Arc::new(Notify::new()),
            task_handle: None,
            detection_interval,
            torch: false,
        })
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn torch(&self) -> bool {
        self.torch
    }

    /// Receive scanner events. Subscribe before `start_scanning` to see
    /// `DeviceSetup`.
    pub fn subscribe(&self) -> broadcast::Receiver<ScannerEvent> {
        self.events.subscribe()
    }

    /// A cloneable control handle for the host UI.
    pub fn handle(&self) -> ScannerHandle {
        ScannerHandle {
            pipeline: Arc::clone(&self.pipeline),
            commands: self.commands.clone(),
            running: Arc::clone(&self.running),
        }
    }

    /// Start the camera and the processing task.
    ///
    /// # Errors
    ///
    /// Propagates camera start failures (`PlatformUnavailable` on the stub).
    pub async fn start_scanning(&mut self) -> Result<()> {
        if self.status == SessionStatus::Running {
            debug!("Scanner already running");
            return Ok(());
        }

        let Some(commands) = self.command_rx.take() else {
            return Err(ScanError::Session("command channel is unavailable".into()));
        };

        lock(&self.pipeline).reset();
        self.slot.sender.send_replace(None);
        let mut frames = self.slot.sender.subscribe();
        frames.mark_unchanged();

        let consumer: Arc<dyn FrameConsumer> = self.slot.clone();
        let setup = match self.camera.start(consumer) {
            Ok(setup) => setup,
            Err(err) => {
                self.command_rx = Some(commands);
                return Err(err);
            }
        };
        emit(&self.events, ScannerEvent::DeviceSetup(setup));

        let pipeline = Arc::clone(&self.pipeline);
        let events = self.events.clone();
        let shutdown = Arc::clone(&self.shutdown_signal);
        let interval = self.detection_interval;

        let handle = tokio::spawn(async move {
            Self::process_loop(pipeline, frames, commands, events, shutdown, interval).await
        });

        self.task_handle = Some(handle);
        self.running.store(true, Ordering::SeqCst);
        self.status = SessionStatus::Running;
        info!(width = setup.width, height = setup.height, "Scanning started");
        Ok(())
    }

    /// Stop the camera and the processing task and return the tracker to Idle.
    ///
    /// A capture already in progress finishes first.
    pub async fn stop_scanning(&mut self) -> Result<()> {
        if self.status != SessionStatus::Running {
            return Ok(());
        }

        info!("Stopping scanner");
        self.running.store(false, Ordering::SeqCst);
        let camera_result = self.camera.stop();
        if let Err(err) = &camera_result {
            warn!(error = %err, "Camera did not stop cleanly");
        }

        self.shutdown_signal.notify_one();
        if let Some(handle) = self.task_handle.take() {
            let commands = handle
                .await
                .map_err(|e| ScanError::Session(format!("processing task join: {e}")))?;
            self.command_rx = Some(commands);
        }

        lock(&self.pipeline).reset();
        self.slot.sender.send_replace(None);
        self.status = SessionStatus::Stopped;
        info!("Scanner stopped");
        camera_result
    }

    /// Request a manual capture.
    pub async fn capture_manual(&self) -> Result<()> {
        if self.status != SessionStatus::Running {
            return Err(ScanError::NotRunning);
        }
        self.commands
            .send(Command::Capture(CaptureRequest::manual()))
            .await
            .map_err(|_| ScanError::NotRunning)
    }

    pub fn set_torch(&mut self, enabled: bool) -> Result<()> {
        self.camera.set_torch(enabled)?;
        self.torch = enabled;
        emit(&self.events, ScannerEvent::TorchChanged { enabled });
        Ok(())
    }

    // -- Processing task ------------------------------------------------------

    async fn process_loop(
        pipeline: Arc<Mutex<ScannerPipeline>>,
        mut frames: watch::Receiver<Option<Frame>>,
        mut commands: mpsc::Receiver<Command>,
        events: broadcast::Sender<ScannerEvent>,
        shutdown: Arc<Notify>,
        interval: Duration,
    ) -> mpsc::Receiver<Command> {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.notified() => {
                    debug!("Processing task shutting down");
                    break;
                }
                Some(command) = commands.recv() => {
                    match command {
                        Command::Capture(request) => {
                            let fresh = frames.borrow().clone();
                            Self::run_capture(&pipeline, &events, request, fresh).await;
                        }
                    }
                }
                changed = frames.changed() => {
                    if changed.is_err() {
                        warn!("Frame source closed");
                        break;
                    }
                    let frame = frames.borrow_and_update().clone();
                    if let Some(frame) = frame {
                        Self::run_frame(&pipeline, &events, frame).await;
                        if !interval.is_zero() {
                            tokio::time::sleep(interval).await;
                        }
                    }
                }
            }
        }

        // Requests queued behind the shutdown belong to this run only.
        let mut dropped = 0usize;
        while commands.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped, "Discarded pending capture requests");
        }
        commands
    }

    async fn run_frame(
        pipeline: &Arc<Mutex<ScannerPipeline>>,
        events: &broadcast::Sender<ScannerEvent>,
        frame: Frame,
    ) {
        let worker = Arc::clone(pipeline);
        let outcome = match tokio::task::spawn_blocking(move || {
            let mut pipeline = lock(&worker);
            pipeline.process_frame(frame)
        })
        .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(error = %err, "Frame processing task failed");
                return;
            }
        };

        emit(
            events,
            ScannerEvent::RectangleDetected {
                sequence: outcome.sequence,
                verdict: outcome.verdict,
                quad: outcome.detection.quad,
                confidence: outcome.detection.confidence,
                frame_size: outcome.frame_size,
            },
        );
        if let Some(image) = outcome.preview {
            emit(
                events,
                ScannerEvent::PreviewReady {
                    sequence: outcome.sequence,
                    image,
                },
            );
        }
        if let Some(request) = outcome.auto_request {
            Self::run_capture(pipeline, events, request, None).await;
        }
    }

    async fn run_capture(
        pipeline: &Arc<Mutex<ScannerPipeline>>,
        events: &broadcast::Sender<ScannerEvent>,
        request: CaptureRequest,
        fresh: Option<Frame>,
    ) {
        let id = CaptureId::new();
        emit(
            events,
            ScannerEvent::PictureTaken {
                id,
                auto: request.is_auto(),
            },
        );

        let worker = Arc::clone(pipeline);
        let result = tokio::task::spawn_blocking(move || {
            let mut pipeline = lock(&worker);
            pipeline.capture(id, request, fresh)
        })
        .await;

        let result = match result {
            Ok(result) => result,
            Err(err) => {
                error!(error = %err, %id, "Capture task failed");
                Err(ScanError::Session(format!("capture task failed: {err}")))
            }
        };
        for event in capture_events(id, result) {
            emit(events, event);
        }
    }
}

/// Events announcing the outcome of capture `id`.
fn capture_events(id: CaptureId, result: Result<CaptureResult>) -> Vec<ScannerEvent> {
    match result {
        Ok(capture) if capture.quality.degraded => vec![
            ScannerEvent::ErrorProcessingImage {
                id,
                reason: "perspective correction failed; the uncorrected image was kept".into(),
                recoverable: true,
            },
            ScannerEvent::PictureProcessed(Arc::new(capture)),
        ],
        Ok(capture) => vec![ScannerEvent::PictureProcessed(Arc::new(capture))],
        Err(err) => {
            warn!(error = %err, %id, "Capture failed");
            vec![ScannerEvent::ErrorProcessingImage {
                id,
                reason: err.to_string(),
                recoverable: false,
            }]
        }
    }
}

// -- Host control handle ------------------------------------------------------

/// Cloneable handle implementing the host-facing capability traits.
#[derive(Clone)]
pub struct ScannerHandle {
    pipeline: Arc<Mutex<ScannerPipeline>>,
    commands: mpsc::Sender<Command>,
    running: Arc<AtomicBool>,
}

impl ScannerHandle {
    /// Switch between the back and front camera. Front frames are mirrored.
    pub fn set_camera_position(&self, camera: CameraPosition) {
        lock(&self.pipeline).set_camera_position(camera);
    }
}

impl CaptureTrigger for ScannerHandle {
    fn request_capture(&self) -> Result<()> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(ScanError::NotRunning);
        }
        self.commands
            .try_send(Command::Capture(CaptureRequest::manual()))
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => {
                    ScanError::CaptureUnavailable("a capture is already pending".into())
                }
                mpsc::error::TrySendError::Closed(_) => ScanError::NotRunning,
            })
    }
}

impl ConfigSink for ScannerHandle {
    fn set_enable_border_detection(&self, enabled: bool) -> Result<()> {
        lock(&self.pipeline).set_border_detection_enabled(enabled);
        Ok(())
    }

    fn set_filter_config(&self, config: FilterConfig) -> Result<()> {
        if !(config.saturation.is_finite() && config.contrast.is_finite() && config.brightness.is_finite()) {
            return Err(ScanError::InvalidConfig("filter values must be finite".into()));
        }
        lock(&self.pipeline).set_filter_config(config);
        Ok(())
    }

    fn set_auto_capture_threshold(&self, frames: u32) -> Result<()> {
        lock(&self.pipeline).set_auto_capture_threshold(frames);
        Ok(())
    }

    fn update_orientation(
        &self,
        device: DeviceOrientation,
        interface: InterfaceOrientation,
    ) -> Result<()> {
        lock(&self.pipeline).update_orientation(device, interface);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docscan_bridge::StubCamera;
    use docscan_core::{DeviceSetup, QualityVerdict};
    use image::{Rgba, RgbaImage};

    /// Camera whose frames are pushed by the test.
    #[derive(Clone, Default)]
    struct PushCamera {
        consumer: Arc<Mutex<Option<Arc<dyn FrameConsumer>>>>,
    }

    impl PushCamera {
        fn push(&self, sequence: u64) {
            let consumer = self.consumer.lock().expect("lock").clone();
            if let Some(consumer) = consumer {
                consumer.submit_frame(Frame::upright(sequence, page()));
            }
        }
    }

    impl CameraSession for PushCamera {
        fn start(&mut self, consumer: Arc<dyn FrameConsumer>) -> Result<DeviceSetup> {
            *self.consumer.lock().expect("lock") = Some(consumer);
            Ok(DeviceSetup {
                width: 400,
                height: 300,
                has_camera: true,
                permission_granted: true,
                ..DeviceSetup::default()
            })
        }

        fn stop(&mut self) -> Result<()> {
            *self.consumer.lock().expect("lock") = None;
            Ok(())
        }

        fn set_torch(&mut self, _enabled: bool) -> Result<()> {
            Ok(())
        }
    }

    fn page() -> RgbaImage {
        RgbaImage::from_fn(400, 300, |x, y| {
            if (60..340).contains(&x) && (50..250).contains(&y) {
                Rgba([235, 235, 225, 255])
            } else {
                Rgba([30, 30, 30, 255])
            }
        })
    }

    fn config(threshold: u32) -> ScannerConfig {
        let mut config = ScannerConfig::default();
        config.stability.auto_capture_threshold = threshold;
        config.emit_preview = false;
        config
    }

    async fn next_matching(
        rx: &mut broadcast::Receiver<ScannerEvent>,
        pred: impl Fn(&ScannerEvent) -> bool,
    ) -> ScannerEvent {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                match rx.recv().await {
                    Ok(event) if pred(&event) => return event,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }

    #[tokio::test]
    async fn steady_document_is_auto_captured_once() {
        let camera = PushCamera::default();
        let mut session = ScannerSession::new(config(3), Box::new(camera.clone())).expect("session");
        let mut rx = session.subscribe();

        session.start_scanning().await.expect("start");
        assert!(matches!(
            next_matching(&mut rx, |e| matches!(e, ScannerEvent::DeviceSetup(_))).await,
            ScannerEvent::DeviceSetup(setup) if setup.width == 400
        ));

        for sequence in 0..3 {
            camera.push(sequence);
            let event = next_matching(&mut rx, |e| matches!(e, ScannerEvent::RectangleDetected { .. })).await;
            if let ScannerEvent::RectangleDetected { sequence: seen, verdict, .. } = event {
                assert_eq!(seen, sequence);
                assert_eq!(verdict, QualityVerdict::Good);
            }
        }

        let taken = next_matching(&mut rx, |e| matches!(e, ScannerEvent::PictureTaken { .. })).await;
        assert!(matches!(taken, ScannerEvent::PictureTaken { auto: true, .. }));

        let processed = next_matching(&mut rx, |e| matches!(e, ScannerEvent::PictureProcessed(_))).await;
        let ScannerEvent::PictureProcessed(result) = processed else {
            unreachable!()
        };
        assert!(result.corrected.width() < 400);
        assert_eq!(result.original.dimensions(), (400, 300));

        session.stop_scanning().await.expect("stop");
        assert_eq!(session.status(), SessionStatus::Stopped);
        assert_eq!(
            session.pipeline.lock().expect("lock").stability(),
            crate::stability::StabilityState::default()
        );
    }

    #[tokio::test]
    async fn manual_capture_without_frames_reports_error() {
        let camera = PushCamera::default();
        let mut session = ScannerSession::new(config(0), Box::new(camera)).expect("session");
        let mut rx = session.subscribe();

        session.start_scanning().await.expect("start");
        session.capture_manual().await.expect("queued");

        let taken = next_matching(&mut rx, |e| matches!(e, ScannerEvent::PictureTaken { .. })).await;
        let ScannerEvent::PictureTaken { id: taken_id, auto } = taken else {
            unreachable!()
        };
        assert!(!auto);
        let error = next_matching(&mut rx, |e| matches!(e, ScannerEvent::ErrorProcessingImage { .. })).await;
        assert!(matches!(
            error,
            ScannerEvent::ErrorProcessingImage { id, reason, recoverable: false }
                if id == taken_id && reason.contains("capture unavailable")
        ));

        session.stop_scanning().await.expect("stop");
    }

    #[tokio::test]
    async fn manual_capture_uses_latest_frame() {
        let camera = PushCamera::default();
        let mut session = ScannerSession::new(config(0), Box::new(camera.clone())).expect("session");
        let mut rx = session.subscribe();
        session.start_scanning().await.expect("start");

        camera.push(0);
        next_matching(&mut rx, |e| matches!(e, ScannerEvent::RectangleDetected { .. })).await;

        let handle = session.handle();
        handle.request_capture().expect("queued");
        let processed = next_matching(&mut rx, |e| matches!(e, ScannerEvent::PictureProcessed(_))).await;
        let ScannerEvent::PictureProcessed(result) = processed else {
            unreachable!()
        };
        assert!(!result.quality.degraded);
        assert!(result.source_quad.is_some());

        session.stop_scanning().await.expect("stop");
    }

    #[tokio::test]
    async fn throttled_detection_skips_to_newest_frame() {
        let camera = PushCamera::default();
        let mut cfg = config(0);
        cfg.detection_interval_ms = 400;
        let mut session = ScannerSession::new(cfg, Box::new(camera.clone())).expect("session");
        let mut rx = session.subscribe();
        session.start_scanning().await.expect("start");

        camera.push(0);
        let first = next_matching(&mut rx, |e| matches!(e, ScannerEvent::RectangleDetected { .. })).await;
        assert!(matches!(first, ScannerEvent::RectangleDetected { sequence: 0, .. }));
        let started = tokio::time::Instant::now();

        // All of these land while the task waits out the interval.
        for sequence in 1..=5 {
            camera.push(sequence);
        }

        let next = next_matching(&mut rx, |e| matches!(e, ScannerEvent::RectangleDetected { .. })).await;
        assert!(matches!(next, ScannerEvent::RectangleDetected { sequence: 5, .. }), "{next:?}");
        assert!(started.elapsed() >= Duration::from_millis(300), "{:?}", started.elapsed());

        // Frames 1..=4 were overwritten, not queued.
        let extra = tokio::time::timeout(
            Duration::from_millis(900),
            next_matching(&mut rx, |e| matches!(e, ScannerEvent::RectangleDetected { .. })),
        )
        .await;
        assert!(extra.is_err(), "unexpected detection: {extra:?}");

        session.stop_scanning().await.expect("stop");
    }

    #[tokio::test]
    async fn queued_capture_does_not_survive_restart() {
        let camera = PushCamera::default();
        let mut cfg = config(0);
        cfg.detection_interval_ms = 400;
        let mut session = ScannerSession::new(cfg, Box::new(camera.clone())).expect("session");
        let mut rx = session.subscribe();
        session.start_scanning().await.expect("start");

        camera.push(0);
        next_matching(&mut rx, |e| matches!(e, ScannerEvent::RectangleDetected { .. })).await;

        // The task is inside the detection interval, so this request is still
        // queued when shutdown is signalled.
        session.handle().request_capture().expect("queued");
        session.stop_scanning().await.expect("stop");
        session.start_scanning().await.expect("restart");

        let taken = tokio::time::timeout(
            Duration::from_millis(500),
            next_matching(&mut rx, |e| matches!(e, ScannerEvent::PictureTaken { .. })),
        )
        .await;
        assert!(taken.is_err(), "stale capture ran after restart: {taken:?}");

        session.stop_scanning().await.expect("stop");
    }

    #[test]
    fn degraded_capture_reports_recoverable_error_then_result() {
        let id = CaptureId::new();
        let image = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let capture = CaptureResult {
            id,
            corrected: image.clone(),
            original: image,
            source_quad: None,
            quality: docscan_core::CaptureQuality {
                verdict: QualityVerdict::Good,
                degraded: true,
            },
            orientation: docscan_core::ResolvedOrientation::default(),
            frame_sequence: 3,
            captured_at: chrono::Utc::now(),
        };

        let events = capture_events(id, Ok(capture));
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            ScannerEvent::ErrorProcessingImage { id: err_id, recoverable: true, .. } if *err_id == id
        ));
        assert!(matches!(&events[1], ScannerEvent::PictureProcessed(result) if result.id == id));

        let failed = capture_events(id, Err(ScanError::CaptureUnavailable("no frame".into())));
        assert!(matches!(
            failed.as_slice(),
            [ScannerEvent::ErrorProcessingImage { recoverable: false, .. }]
        ));
    }

    #[tokio::test]
    async fn restart_after_stop() {
        let camera = PushCamera::default();
        let mut session = ScannerSession::new(config(0), Box::new(camera.clone())).expect("session");
        let mut rx = session.subscribe();

        session.start_scanning().await.expect("start");
        session.stop_scanning().await.expect("stop");
        session.start_scanning().await.expect("restart");

        camera.push(9);
        let event = next_matching(&mut rx, |e| matches!(e, ScannerEvent::RectangleDetected { .. })).await;
        assert!(matches!(event, ScannerEvent::RectangleDetected { sequence: 9, .. }));
        session.stop_scanning().await.expect("stop");
    }

    #[tokio::test]
    async fn stopped_session_rejects_capture() {
        let session = ScannerSession::new(config(0), Box::new(PushCamera::default())).expect("session");
        assert!(matches!(session.capture_manual().await, Err(ScanError::NotRunning)));
        assert!(matches!(session.handle().request_capture(), Err(ScanError::NotRunning)));
    }

    #[tokio::test]
    async fn stub_camera_cannot_start() {
        let mut session = ScannerSession::new(config(0), Box::new(StubCamera)).expect("session");
        assert!(matches!(
            session.start_scanning().await,
            Err(ScanError::PlatformUnavailable)
        ));
        assert_eq!(session.status(), SessionStatus::Stopped);
    }

    #[tokio::test]
    async fn torch_changes_are_announced() {
        let mut session = ScannerSession::new(config(0), Box::new(PushCamera::default())).expect("session");
        let mut rx = session.subscribe();
        session.set_torch(true).expect("torch");
        assert!(session.torch());
        let event = next_matching(&mut rx, |e| matches!(e, ScannerEvent::TorchChanged { .. })).await;
        assert!(matches!(event, ScannerEvent::TorchChanged { enabled: true }));
    }

    #[tokio::test]
    async fn config_sink_updates_pipeline() {
        let session = ScannerSession::new(config(5), Box::new(PushCamera::default())).expect("session");
        let handle = session.handle();
        handle.set_auto_capture_threshold(2).expect("threshold");
        handle.set_enable_border_detection(false).expect("border");
        assert!(handle
            .set_filter_config(FilterConfig {
                brightness: f32::NAN,
                ..FilterConfig::NEUTRAL
            })
            .is_err());

        handle.set_camera_position(CameraPosition::Front);

        let pipeline = session.pipeline.lock().expect("lock");
        assert_eq!(pipeline.config().stability.auto_capture_threshold, 2);
        assert!(!pipeline.config().border_detection_enabled);
        assert_eq!(pipeline.config().capture.camera_position, CameraPosition::Front);
    }
}
