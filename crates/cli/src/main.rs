mod settings;

use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use attendance_core::capture::infrastructure::ffmpeg_webcam::FfmpegMediaCapture;
use attendance_core::detection::domain::face_detector::{Delegate, FaceDetector};
use attendance_core::detection::infrastructure::onnx_blazeface_detector::OnnxBlazefaceDetector;
use attendance_core::pipeline::infrastructure::interval_frame_clock::IntervalFrameClock;
use attendance_core::pipeline::live_session::{LiveSession, SessionOutcome};
use attendance_core::pipeline::loop_logger::SummaryLoopLogger;
use attendance_core::rendering::overlay::DisplaySize;
use attendance_core::rendering::preview_file_surface::PreviewFileSurface;
use attendance_core::shared::model_resolver;
use attendance_core::upload::domain::image_sink::ImageSink;
use attendance_core::upload::infrastructure::http_image_sink::HttpImageSink;
use attendance_core::upload::infrastructure::logging_image_sink::LoggingImageSink;
use attendance_core::upload::infrastructure::png_frame_encoder::PngFrameEncoder;
use attendance_core::upload::infrastructure::threaded_upload_executor::ThreadedUploadExecutor;
use attendance_core::upload::uploader::Uploader;

use settings::Settings;

/// Watches a webcam for faces and uploads a snapshot whenever one appears.
#[derive(Parser)]
#[command(name = "attendance-cam")]
struct Cli {
    /// Capture device (e.g. /dev/video0, "0" on macOS, "video=..." on Windows).
    #[arg(long)]
    device: Option<String>,

    /// libavdevice input format (v4l2, avfoundation, dshow).
    #[arg(long)]
    input_format: Option<String>,

    /// Endpoint that receives snapshot uploads.
    #[arg(long)]
    upload_url: Option<String>,

    /// Minimum gap between uploads, in milliseconds.
    #[arg(long)]
    cooldown_ms: Option<u64>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Target frame rate of the detection loop.
    #[arg(long)]
    fps: Option<u32>,

    /// Overlay width in pixels (defaults to the camera resolution).
    #[arg(long, requires = "display_height")]
    display_width: Option<u32>,

    /// Overlay height in pixels (defaults to the camera resolution).
    #[arg(long, requires = "display_width")]
    display_height: Option<u32>,

    /// Run detection on the CPU instead of a GPU delegate.
    #[arg(long)]
    cpu: bool,

    /// Settings file (defaults to the per-user config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective settings to the settings file and exit.
    #[arg(long)]
    write_config: bool,

    /// Write the live view (mirrored frame with overlays) to this PNG,
    /// refreshed in place while the loop runs.
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Log snapshots instead of uploading them.
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    env_logger::init();

    match run() {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn run() -> Result<i32, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = apply_overrides(Settings::load(cli.config.as_deref())?, &cli);
    settings.validate()?;

    if cli.write_config {
        let path = cli
            .config
            .clone()
            .or_else(Settings::default_path)
            .ok_or("No config directory available")?;
        settings.save(&path)?;
        eprintln!("Settings written to {}", path.display());
        return Ok(0);
    }

    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;

    let capture = FfmpegMediaCapture::new(
        settings.device.clone(),
        settings.input_format.clone(),
        settings.target_fps,
    );
    let uploader = build_uploader(&settings, cli.dry_run)?;

    let detector_settings = settings.clone();
    let mut session = LiveSession::new(
        Box::new(capture),
        Box::new(move || build_detector(&detector_settings)),
        uploader,
    )
    .with_logger(Box::new(SummaryLoopLogger::new()))
    .with_first_frame_timeout(Duration::from_millis(settings.first_frame_timeout_ms));

    if let Some(path) = &settings.preview_path {
        log::info!("Writing live view to {}", path.display());
        session = session.with_surface(Box::new(PreviewFileSurface::new(
            path.clone(),
            Duration::from_millis(settings.preview_interval_ms),
        )));
    }
    if let (Some(w), Some(h)) = (settings.display_width, settings.display_height) {
        session = session.with_display_size(DisplaySize::new(w as f64, h as f64));
    }

    let mut clock = IntervalFrameClock::new(settings.target_fps, cancelled);
    Ok(exit_code(session.start(&mut clock)))
}

fn apply_overrides(mut settings: Settings, cli: &Cli) -> Settings {
    if let Some(device) = &cli.device {
        settings.device = device.clone();
    }
    if let Some(format) = &cli.input_format {
        settings.input_format = format.clone();
    }
    if let Some(url) = &cli.upload_url {
        settings.upload_url = url.clone();
    }
    if let Some(ms) = cli.cooldown_ms {
        settings.cooldown_ms = ms;
    }
    if let Some(confidence) = cli.confidence {
        settings.confidence = confidence;
    }
    if let Some(fps) = cli.fps {
        settings.target_fps = fps;
    }
    if cli.display_width.is_some() {
        settings.display_width = cli.display_width;
        settings.display_height = cli.display_height;
    }
    if cli.preview.is_some() {
        settings.preview_path = cli.preview.clone();
    }
    if cli.cpu {
        settings.delegate = Delegate::Cpu;
    }
    settings
}

fn build_uploader(
    settings: &Settings,
    dry_run: bool,
) -> Result<Uploader, Box<dyn std::error::Error>> {
    let sink: Arc<dyn ImageSink> = if dry_run {
        log::info!("Dry run: snapshots will not be uploaded");
        Arc::new(LoggingImageSink::new())
    } else {
        log::info!("Uploading snapshots to {}", settings.upload_url);
        Arc::new(HttpImageSink::new(settings.upload_url.clone())?)
    };
    Ok(Uploader::new(
        Arc::new(PngFrameEncoder::new()),
        sink,
        Box::new(ThreadedUploadExecutor::new()),
        settings.cooldown_ms,
    ))
}

fn build_detector(settings: &Settings) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {}", settings.model_name);
    let model_path = model_resolver::resolve(
        &settings.model_name,
        &settings.model_url,
        Some(Box::new(download_progress)),
    )?;

    let detector = match OnnxBlazefaceDetector::new(
        &model_path,
        settings.delegate,
        settings.confidence,
    ) {
        Ok(detector) => detector,
        Err(e) if settings.delegate == Delegate::Gpu => {
            log::warn!("GPU delegate failed ({e}), falling back to CPU");
            OnnxBlazefaceDetector::new(&model_path, Delegate::Cpu, settings.confidence)?
        }
        Err(e) => return Err(e),
    };
    Ok(Box::new(detector))
}

fn exit_code(outcome: SessionOutcome) -> i32 {
    match outcome {
        SessionOutcome::Stopped(stats) => {
            log::info!(
                "Stopped after {} frames: {} faces, {} uploads started, {} delivered, {} failed",
                stats.processed,
                stats.faces,
                stats.uploads.started,
                stats.uploads.delivered,
                stats.uploads.failed
            );
            0
        }
        SessionOutcome::CaptureUnsupported => {
            eprintln!("Error: webcam capture is not supported on this system");
            2
        }
        SessionOutcome::DetectorUnavailable(reason) => {
            eprintln!("Error: face detector unavailable: {reason}");
            3
        }
        SessionOutcome::StreamUnavailable(e) => {
            eprintln!("Error: {e}");
            4
        }
    }
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
