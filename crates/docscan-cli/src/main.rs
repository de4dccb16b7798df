// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docscan — command-line front end.
//
// Runs rectangle detection on still images, applies scan filters, and replays
// a directory of frames through a live scanning session to exercise
// auto-capture end to end.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use docscan_bridge::{CameraSession, ReplayCamera, platform_camera};
use docscan_core::guidance::{guidance_for_verdict, humanize_error};
use docscan_core::{CaptureId, FilterConfig, FilterKind, FrameSize, ScannerConfig, ScannerEvent};
use docscan_pipeline::{ScannerSession, SessionStatus};
use docscan_vision::{ImageProcessor, QualityClassifier, RectangleDetector, encode_capture};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "docscan")]
#[command(about = "Detect documents in camera frames, auto-capture and straighten them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the document rectangle in a still image and print it as JSON.
    Detect {
        /// Path to the input image.
        #[arg(long)]
        image: PathBuf,

        /// Scanner configuration (JSON). Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Apply a scan filter to an image.
    Filter(FilterArgs),

    /// Run a live session (replayed frames or the platform camera) and save the first capture.
    Scan(ScanArgs),

    /// Write the default configuration as JSON.
    Config {
        /// Output path.
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
struct FilterArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Path to write the filtered image.
    #[arg(long)]
    out: PathBuf,

    /// none, greyscale, black-and-white, sepia or color-enhance.
    #[arg(long, default_value = "none")]
    kind: FilterKind,

    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    brightness: f32,

    #[arg(long, default_value = "1.0")]
    contrast: f32,

    #[arg(long, default_value = "1.0")]
    saturation: f32,
}

#[derive(Debug, Clone, Args)]
struct ScanArgs {
    /// Directory of frames, replayed in file-name order. Without it the
    /// platform camera is used.
    #[arg(long)]
    frames: Option<PathBuf>,

    /// Directory to write corrected.jpg and original.jpg into.
    #[arg(long)]
    out: PathBuf,

    /// Steady frames required before auto-capture (overrides the config).
    #[arg(long)]
    threshold: Option<u32>,

    /// Replay rate in frames per second.
    #[arg(long, default_value = "15.0")]
    fps: f32,

    /// Scanner configuration (JSON).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Disable auto-capture and trigger a manual capture on the first good frame.
    #[arg(long)]
    manual: bool,

    /// Give up after this many seconds without a capture.
    #[arg(long, default_value = "30")]
    timeout_secs: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Detect { image, config } => run_detect(&image, config.as_deref()),
        Commands::Filter(args) => run_filter(&args),
        Commands::Scan(args) => run_scan(args),
        Commands::Config { out } => run_config(&out),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        if let Some(scan_err) = err.downcast_ref::<docscan_core::ScanError>() {
            let guidance = humanize_error(scan_err);
            eprintln!("{} {}", guidance.message, guidance.suggestion);
        }
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> CliResult<ScannerConfig> {
    Ok(match path {
        Some(path) => ScannerConfig::load(path)?,
        None => ScannerConfig::default(),
    })
}

fn run_detect(image: &Path, config: Option<&Path>) -> CliResult<()> {
    let config = load_config(config)?;
    let frame = ImageProcessor::open(image)?.into_rgba();
    let size = FrameSize::new(frame.width(), frame.height());

    let detection = RectangleDetector::new(config.detection).detect(&frame);
    let verdict = QualityClassifier::new(config.quality).classify(&detection, size);
    let guidance = guidance_for_verdict(verdict);

    let report = json!({
        "image": image.display().to_string(),
        "frame_size": size,
        "detection": detection,
        "verdict": verdict,
        "message": guidance.message,
        "suggestion": guidance.suggestion,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_filter(args: &FilterArgs) -> CliResult<()> {
    let filter = FilterConfig {
        kind: args.kind,
        saturation: args.saturation,
        contrast: args.contrast,
        brightness: args.brightness,
    };
    ImageProcessor::open(&args.image)?
        .filter(&filter)
        .save(&args.out)?;
    info!(out = %args.out.display(), kind = ?args.kind, "Filtered image written");
    Ok(())
}

fn run_config(out: &Path) -> CliResult<()> {
    ScannerConfig::default().save(out)?;
    info!(path = %out.display(), "Default configuration written");
    Ok(())
}

fn run_scan(args: ScanArgs) -> CliResult<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(threshold) = args.threshold {
        config.stability.auto_capture_threshold = threshold;
    }
    if args.manual {
        config.stability.auto_capture_threshold = 0;
    }
    config.emit_preview = false;
    config.validate()?;

    let camera: Box<dyn CameraSession> = match &args.frames {
        Some(dir) => {
            let replay = ReplayCamera::from_dir(dir, args.fps)?.looping(true);
            info!(frames = replay.frame_count(), dir = %dir.display(), "Replaying frames");
            Box::new(replay)
        }
        None => platform_camera(),
    };
    let jpeg_quality = config.capture.jpeg_quality_percent();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let mut session = ScannerSession::new(config, camera)?;
        let mut events = session.subscribe();
        session.start_scanning().await?;

        let outcome = tokio::time::timeout(
            Duration::from_secs(args.timeout_secs),
            wait_for_capture(&session, &mut events, args.manual),
        )
        .await;

        if session.status() == SessionStatus::Running {
            session.stop_scanning().await?;
        }

        let capture = match outcome {
            Ok(result) => result?,
            Err(_) => return Err(format!("no capture within {} seconds", args.timeout_secs).into()),
        };

        std::fs::create_dir_all(&args.out)?;
        let encoded = encode_capture(&capture, jpeg_quality)?;
        std::fs::write(args.out.join("corrected.jpg"), &encoded.corrected)?;
        std::fs::write(args.out.join("original.jpg"), &encoded.original)?;

        let summary = json!({
            "id": capture.id,
            "frame_sequence": capture.frame_sequence,
            "verdict": capture.quality.verdict,
            "degraded": capture.quality.degraded,
            "source_quad": capture.source_quad,
            "corrected_size": [capture.corrected.width(), capture.corrected.height()],
            "captured_at": capture.captured_at,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        Ok::<(), CliError>(())
    })
}

/// Pump session events until a capture finishes or fails.
async fn wait_for_capture(
    session: &ScannerSession,
    events: &mut tokio::sync::broadcast::Receiver<ScannerEvent>,
    manual: bool,
) -> CliResult<std::sync::Arc<docscan_core::CaptureResult>> {
    let mut requested = false;
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event subscriber lagged");
                continue;
            }
            Err(RecvError::Closed) => return Err("scanner event channel closed".into()),
        };

        match event {
            ScannerEvent::DeviceSetup(setup) => {
                info!(width = setup.width, height = setup.height, "Camera ready");
            }
            ScannerEvent::RectangleDetected {
                sequence,
                verdict,
                confidence,
                ..
            } => {
                debug!(sequence, ?verdict, confidence, "Frame processed");
                if manual && !requested && verdict.is_good() {
                    session.capture_manual().await?;
                    requested = true;
                }
            }
            ScannerEvent::PictureTaken { id, auto } => {
                info!(%id, auto, "Picture taken");
            }
            ScannerEvent::PictureProcessed(result) => return Ok(result),
            ScannerEvent::ErrorProcessingImage {
                id,
                reason,
                recoverable,
            } => check_capture_error(id, &reason, recoverable)?,
            ScannerEvent::PreviewReady { .. } | ScannerEvent::TorchChanged { .. } => {}
        }
    }
}

/// A recoverable error is followed by a degraded image for the same capture,
/// so only the others end the wait.
fn check_capture_error(id: CaptureId, reason: &str, recoverable: bool) -> CliResult<()> {
    if recoverable {
        warn!(%id, reason, "Capture degraded; waiting for the uncorrected image");
        Ok(())
    } else {
        Err(format!("capture {id} failed: {reason}").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_capture_keeps_waiting() {
        let id = CaptureId::new();
        assert!(check_capture_error(id, "perspective correction failed", true).is_ok());

        let err = check_capture_error(id, "capture unavailable: no frame", false)
            .expect_err("fatal");
        assert!(err.to_string().contains(&id.to_string()));
    }
}
