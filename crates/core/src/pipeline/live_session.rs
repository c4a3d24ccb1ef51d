use std::time::Duration;

use crate::capture::domain::video_source::{CaptureError, MediaCapture};
use crate::detection::domain::face_detector::FaceDetector;
use crate::pipeline::frame_clock::FrameClock;
use crate::pipeline::live_detection_loop::{LiveDetectionLoop, LoopStats};
use crate::pipeline::loop_logger::{LoopLogger, NullLoopLogger};
use crate::rendering::overlay::{DisplaySize, OverlayRenderer};
use crate::rendering::overlay_surface::{LoggingOverlaySurface, OverlaySurface};
use crate::shared::constants::FIRST_FRAME_TIMEOUT_MS;
use crate::upload::uploader::Uploader;

/// Builds the face detector. Typically resolves and loads a model, so it
/// is only invoked once camera capture is known to be available.
pub type DetectorFactory =
    Box<dyn FnOnce() -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>>>;

/// How a live session ended.
#[derive(Debug)]
pub enum SessionOutcome {
    /// The platform cannot capture video; the loop never started.
    CaptureUnsupported,
    /// The detector could not be built; the camera was never opened.
    DetectorUnavailable(String),
    /// The camera could not be opened or never produced a frame.
    StreamUnavailable(CaptureError),
    /// The loop ran and was cancelled.
    Stopped(LoopStats),
}

/// Startup sequence for the live loop: capability check, detector, camera,
/// first frame, then run until the clock is cancelled.
///
/// Every startup failure is logged and reported; none is retried.
pub struct LiveSession {
    capture: Box<dyn MediaCapture>,
    detector_factory: DetectorFactory,
    uploader: Uploader,
    surface: Box<dyn OverlaySurface>,
    logger: Box<dyn LoopLogger>,
    display: Option<DisplaySize>,
    first_frame_timeout: Duration,
}

impl LiveSession {
    pub fn new(
        capture: Box<dyn MediaCapture>,
        detector_factory: DetectorFactory,
        uploader: Uploader,
    ) -> Self {
        Self {
            capture,
            detector_factory,
            uploader,
            surface: Box::new(LoggingOverlaySurface::new()),
            logger: Box::new(NullLoopLogger),
            display: None,
            first_frame_timeout: Duration::from_millis(FIRST_FRAME_TIMEOUT_MS),
        }
    }

    pub fn with_surface(mut self, surface: Box<dyn OverlaySurface>) -> Self {
        self.surface = surface;
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn LoopLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Overrides the on-screen size used to place overlays. Defaults to
    /// the stream's native resolution.
    pub fn with_display_size(mut self, display: DisplaySize) -> Self {
        self.display = Some(display);
        self
    }

    pub fn with_first_frame_timeout(mut self, timeout: Duration) -> Self {
        self.first_frame_timeout = timeout;
        self
    }

    pub fn start(self, clock: &mut dyn FrameClock) -> SessionOutcome {
        let LiveSession {
            mut capture,
            detector_factory,
            uploader,
            surface,
            logger,
            display,
            first_frame_timeout,
        } = self;

        if !capture.is_supported() {
            log::warn!("Video capture is not supported on this platform");
            return SessionOutcome::CaptureUnsupported;
        }

        let detector = match detector_factory() {
            Ok(detector) => detector,
            Err(e) => {
                log::error!("Face detector unavailable: {e}");
                return SessionOutcome::DetectorUnavailable(e.to_string());
            }
        };

        let mut source = match capture.open_video_stream() {
            Ok(source) => source,
            Err(e) => {
                log::error!("{e}");
                return SessionOutcome::StreamUnavailable(e);
            }
        };

        if let Err(e) = source.wait_first_frame(first_frame_timeout) {
            log::error!("{e}");
            source.close();
            return SessionOutcome::StreamUnavailable(e);
        }

        let display = display.unwrap_or_else(|| {
            let (w, h) = source.native_size();
            DisplaySize::new(w as f64, h as f64)
        });
        log::info!(
            "Watching for faces ({}x{} overlay)",
            display.width,
            display.height
        );

        let mut live = LiveDetectionLoop::new(
            source,
            detector,
            OverlayRenderer::new(display),
            surface,
            uploader,
            logger,
        );
        SessionOutcome::Stopped(live.run(clock))
    }
}
