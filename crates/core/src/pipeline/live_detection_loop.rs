use std::time::Instant;

use crate::capture::domain::video_source::VideoSource;
use crate::detection::domain::face_detector::FaceDetector;
use crate::pipeline::frame_clock::FrameClock;
use crate::pipeline::loop_logger::LoopLogger;
use crate::rendering::overlay::{OverlayBatch, OverlayRenderer};
use crate::rendering::overlay_surface::OverlaySurface;
use crate::upload::uploader::{UploadAttempt, UploadStats, Uploader};

/// What a single frame tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// The video has not advanced since the last processed frame.
    Skipped,
    /// No decoded frame was available to process.
    NoFrame,
    Processed {
        faces: usize,
        upload: Option<UploadAttempt>,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: usize,
    pub skipped: usize,
    pub processed: usize,
    pub faces: usize,
    pub detect_failures: usize,
    pub frame_failures: usize,
    pub uploads: UploadStats,
}

/// Capture → detect → render → upload, one tick per frame.
///
/// Work within a tick is strictly sequential. Uploads started on one
/// tick may still be running on later ticks; the uploader's gate keeps
/// new ones from starting meanwhile.
pub struct LiveDetectionLoop {
    source: Box<dyn VideoSource>,
    detector: Box<dyn FaceDetector>,
    renderer: OverlayRenderer,
    surface: Box<dyn OverlaySurface>,
    uploader: Uploader,
    logger: Box<dyn LoopLogger>,
    last_video_time: Option<f64>,
    stats: LoopStats,
}

impl LiveDetectionLoop {
    pub fn new(
        source: Box<dyn VideoSource>,
        detector: Box<dyn FaceDetector>,
        renderer: OverlayRenderer,
        surface: Box<dyn OverlaySurface>,
        uploader: Uploader,
        logger: Box<dyn LoopLogger>,
    ) -> Self {
        Self {
            source,
            detector,
            renderer,
            surface,
            uploader,
            logger,
            last_video_time: None,
            stats: LoopStats::default(),
        }
    }

    /// Runs one tick at frame-clock time `now_ms`.
    pub fn step(&mut self, now_ms: f64) -> StepOutcome {
        self.stats.ticks += 1;
        self.uploader.poll(now_ms);

        let frame = match self.source.current_frame() {
            Ok(frame) => frame,
            Err(e) => {
                log::debug!("No frame to process: {e}");
                self.stats.frame_failures += 1;
                return StepOutcome::NoFrame;
            }
        };

        // Time and pixels come from the same snapshot; the decoder may
        // publish between two separate reads.
        let video_time = frame.timestamp();
        if self.last_video_time == Some(video_time) {
            self.stats.skipped += 1;
            return StepOutcome::Skipped;
        }
        self.last_video_time = Some(video_time);

        let started = Instant::now();
        let detections = match self.detector.detect_for_video(&frame, now_ms) {
            Ok(detections) => detections,
            Err(e) => {
                log::warn!("Face detection failed: {e}");
                self.stats.detect_failures += 1;
                Vec::new()
            }
        };
        self.logger.timing("detect", elapsed_ms(started));

        let started = Instant::now();
        let batch = self
            .renderer
            .render(&detections, self.uploader.gate().is_sending());
        self.surface.present(&frame, batch);
        self.logger.timing("render", elapsed_ms(started));

        let faces = detections.len();
        self.logger.metric("faces", faces as f64);
        self.stats.processed += 1;
        self.stats.faces += faces;

        let upload = (faces > 0).then(|| self.uploader.try_upload(&frame, now_ms));
        StepOutcome::Processed { faces, upload }
    }

    /// Ticks until the clock reports cancellation, then releases the camera.
    pub fn run(&mut self, clock: &mut dyn FrameClock) -> LoopStats {
        loop {
            self.step(clock.now_ms());
            if !clock.next_frame() {
                break;
            }
        }
        self.source.close();
        self.logger.info(&format!(
            "Frame loop stopped after {} ticks",
            self.stats.ticks
        ));
        self.logger.summary();
        self.stats()
    }

    pub fn stats(&self) -> LoopStats {
        LoopStats {
            uploads: self.uploader.stats(),
            ..self.stats
        }
    }

    pub fn overlay(&self) -> &OverlayBatch {
        self.renderer.current()
    }

    pub fn uploader(&self) -> &Uploader {
        &self.uploader
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
