use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use crate::shared::constants::{UPLOAD_FILE_NAME, UPLOAD_MIME_TYPE};
use crate::shared::frame::Frame;
use crate::upload::domain::frame_encoder::FrameEncoder;
use crate::upload::domain::image_sink::{EncodedImage, ImageSink, UploadError};
use crate::upload::domain::upload_executor::{UploadExecutor, UploadJob};
use crate::upload::domain::upload_gate::UploadGate;

/// What happened to a single upload once it settled.
#[derive(Debug)]
pub enum UploadOutcome {
    Delivered(Option<serde_json::Value>),
    Failed(UploadError),
}

/// Result of asking the uploader to send a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadAttempt {
    Started,
    /// Dropped because another upload is in flight or cooling down.
    Busy,
    /// The worker could not be started; the gate is already cooling down.
    NotStarted,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UploadStats {
    pub started: usize,
    pub busy: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Debounced snapshot uploader.
///
/// Owns the [`UploadGate`] and is the only thing that moves it. Work
/// runs on the [`UploadExecutor`]; results come back over a channel
/// and are applied on the caller's thread by [`poll`](Self::poll).
pub struct Uploader {
    gate: UploadGate,
    cooldown_ms: f64,
    encoder: Arc<dyn FrameEncoder>,
    sink: Arc<dyn ImageSink>,
    executor: Box<dyn UploadExecutor>,
    outcome_tx: Sender<UploadOutcome>,
    outcome_rx: Receiver<UploadOutcome>,
    stats: UploadStats,
}

impl Uploader {
    pub fn new(
        encoder: Arc<dyn FrameEncoder>,
        sink: Arc<dyn ImageSink>,
        executor: Box<dyn UploadExecutor>,
        cooldown_ms: u64,
    ) -> Self {
        let (outcome_tx, outcome_rx) = crossbeam_channel::unbounded();
        Self {
            gate: UploadGate::Idle,
            cooldown_ms: cooldown_ms as f64,
            encoder,
            sink,
            executor,
            outcome_tx,
            outcome_rx,
            stats: UploadStats::default(),
        }
    }

    pub fn gate(&self) -> &UploadGate {
        &self.gate
    }

    pub fn stats(&self) -> UploadStats {
        self.stats
    }

    /// Starts uploading `frame` unless an upload is already in flight.
    pub fn try_upload(&mut self, frame: &Frame, now_ms: f64) -> UploadAttempt {
        if !self.gate.try_begin() {
            self.stats.busy += 1;
            return UploadAttempt::Busy;
        }

        let encoder = Arc::clone(&self.encoder);
        let sink = Arc::clone(&self.sink);
        let tx = self.outcome_tx.clone();
        let frame = frame.clone();
        let job: UploadJob = Box::new(move || {
            let outcome = match upload_snapshot(encoder.as_ref(), sink.as_ref(), &frame) {
                Ok(response) => UploadOutcome::Delivered(response),
                Err(e) => UploadOutcome::Failed(e),
            };
            let _ = tx.send(outcome);
        });

        match self.executor.execute(job) {
            Ok(()) => {
                self.stats.started += 1;
                log::debug!("Uploading snapshot at {now_ms:.0}ms");
                UploadAttempt::Started
            }
            Err(e) => {
                log::error!("{}", UploadError::Worker(e));
                self.stats.failed += 1;
                self.gate.settle(now_ms, self.cooldown_ms);
                UploadAttempt::NotStarted
            }
        }
    }

    /// Applies any settled upload and reopens the gate once its
    /// cool-down has passed. Call once per frame tick.
    pub fn poll(&mut self, now_ms: f64) -> Option<UploadOutcome> {
        let settled = self.outcome_rx.try_recv().ok();

        if let Some(outcome) = &settled {
            self.gate.settle(now_ms, self.cooldown_ms);
            match outcome {
                UploadOutcome::Delivered(Some(body)) => {
                    self.stats.delivered += 1;
                    log::info!("Upload response: {body}");
                }
                UploadOutcome::Delivered(None) => {
                    self.stats.delivered += 1;
                    log::debug!("Upload delivered");
                }
                UploadOutcome::Failed(e) => {
                    self.stats.failed += 1;
                    log::error!("Upload failed: {e}");
                }
            }
        }

        if self.gate.release_if_due(now_ms) {
            log::trace!("Upload gate reopened at {now_ms:.0}ms");
        }

        settled
    }
}

fn upload_snapshot(
    encoder: &dyn FrameEncoder,
    sink: &dyn ImageSink,
    frame: &Frame,
) -> Result<Option<serde_json::Value>, UploadError> {
    let bytes = encoder.encode(frame)?;
    sink.submit(EncodedImage {
        bytes,
        file_name: UPLOAD_FILE_NAME.to_string(),
        mime_type: UPLOAD_MIME_TYPE.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::domain::frame_encoder::EncodeError;
    use std::sync::Mutex;

    struct FakeEncoder {
        fail: bool,
    }

    impl FrameEncoder for FakeEncoder {
        fn encode(&self, frame: &Frame) -> Result<Vec<u8>, EncodeError> {
            if self.fail {
                return Err(EncodeError::InvalidFrame {
                    width: frame.width(),
                    height: frame.height(),
                    channels: frame.channels(),
                });
            }
            Ok(vec![1, 2, 3])
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        received: Mutex<Vec<EncodedImage>>,
    }

    impl ImageSink for RecordingSink {
        fn submit(&self, image: EncodedImage) -> Result<Option<serde_json::Value>, UploadError> {
            self.received.lock().unwrap().push(image);
            Ok(Some(serde_json::json!({"ok": true})))
        }
    }

    /// Runs jobs on the calling thread.
    struct InlineExecutor;

    impl UploadExecutor for InlineExecutor {
        fn execute(&self, job: UploadJob) -> Result<(), std::io::Error> {
            job();
            Ok(())
        }
    }

    /// Holds jobs until the test releases them.
    #[derive(Clone, Default)]
    struct HeldExecutor {
        jobs: Arc<Mutex<Vec<UploadJob>>>,
    }

    impl HeldExecutor {
        fn run_all(&self) {
            let jobs: Vec<_> = self.jobs.lock().unwrap().drain(..).collect();
            for job in jobs {
                job();
            }
        }
    }

    impl UploadExecutor for HeldExecutor {
        fn execute(&self, job: UploadJob) -> Result<(), std::io::Error> {
            self.jobs.lock().unwrap().push(job);
            Ok(())
        }
    }

    struct BrokenExecutor;

    impl UploadExecutor for BrokenExecutor {
        fn execute(&self, _job: UploadJob) -> Result<(), std::io::Error> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "no threads"))
        }
    }

    fn frame() -> Frame {
        Frame::new(vec![0u8; 4 * 4 * 3], 4, 4, 3, 0.0)
    }

    fn uploader(fail_encode: bool, executor: Box<dyn UploadExecutor>) -> (Uploader, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let uploader = Uploader::new(
            Arc::new(FakeEncoder { fail: fail_encode }),
            sink.clone(),
            executor,
            1000,
        );
        (uploader, sink)
    }

    #[test]
    fn test_upload_posts_png_named_user() {
        let (mut up, sink) = uploader(false, Box::new(InlineExecutor));
        assert_eq!(up.try_upload(&frame(), 0.0), UploadAttempt::Started);

        let received = sink.received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].file_name, "user.png");
        assert_eq!(received[0].mime_type, "image/png");
        assert_eq!(received[0].bytes, vec![1, 2, 3]);
    }

    #[test]
    fn test_second_attempt_while_sending_is_busy() {
        let executor = HeldExecutor::default();
        let (mut up, sink) = uploader(false, Box::new(executor.clone()));

        assert_eq!(up.try_upload(&frame(), 0.0), UploadAttempt::Started);
        assert!(up.gate().is_sending());
        for t in 1..10 {
            assert_eq!(up.try_upload(&frame(), t as f64 * 16.0), UploadAttempt::Busy);
        }
        executor.run_all();
        assert_eq!(sink.received.lock().unwrap().len(), 1);
        assert_eq!(up.stats().busy, 9);
    }

    #[test]
    fn test_cooldown_starts_when_outcome_is_polled() {
        let executor = HeldExecutor::default();
        let (mut up, _sink) = uploader(false, Box::new(executor.clone()));
        up.try_upload(&frame(), 0.0);

        // Still sending: nothing settled yet.
        assert!(up.poll(300.0).is_none());
        assert!(up.gate().is_sending());

        executor.run_all();
        assert!(matches!(up.poll(400.0), Some(UploadOutcome::Delivered(Some(_)))));
        assert!(!up.gate().is_sending());
        assert!(up.gate().is_in_flight());

        assert!(up.poll(1399.0).is_none());
        assert_eq!(up.try_upload(&frame(), 1399.0), UploadAttempt::Busy);

        up.poll(1400.0);
        assert!(!up.gate().is_in_flight());
        assert_eq!(up.try_upload(&frame(), 1400.0), UploadAttempt::Started);
    }

    #[test]
    fn test_encode_failure_still_releases_gate() {
        let (mut up, sink) = uploader(true, Box::new(InlineExecutor));
        assert_eq!(up.try_upload(&frame(), 0.0), UploadAttempt::Started);

        assert!(matches!(
            up.poll(10.0),
            Some(UploadOutcome::Failed(UploadError::Encode(_)))
        ));
        assert!(sink.received.lock().unwrap().is_empty());
        assert!(up.gate().is_in_flight());

        up.poll(1010.0);
        assert!(!up.gate().is_in_flight());
        assert_eq!(up.stats().failed, 1);
    }

    #[test]
    fn test_worker_start_failure_cools_down() {
        let (mut up, _sink) = uploader(false, Box::new(BrokenExecutor));
        assert_eq!(up.try_upload(&frame(), 100.0), UploadAttempt::NotStarted);
        assert!(up.gate().is_in_flight());
        assert!(!up.gate().is_sending());

        up.poll(1100.0);
        assert!(!up.gate().is_in_flight());
    }
}
