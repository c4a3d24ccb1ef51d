use std::time::Duration;

use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("camera capture is not supported: {0}")]
    Unsupported(String),
    #[error("failed to open video stream {device}: {reason}")]
    Open { device: String, reason: String },
    #[error("no frame decoded within {0:?}")]
    FirstFrameTimeout(Duration),
    #[error("no frame has been decoded yet")]
    NoFrame,
    #[error("video stream ended")]
    Ended,
}

/// A live video stream, the equivalent of a playing `<video>` element.
///
/// Decoding happens elsewhere; callers only ever observe the most
/// recent frame and its presentation time.
pub trait VideoSource: Send {
    /// Blocks until the first frame has been decoded.
    fn wait_first_frame(&mut self, timeout: Duration) -> Result<(), CaptureError>;

    /// Snapshot of the newest decoded frame at native resolution.
    ///
    /// The frame's timestamp is its presentation time in seconds.
    fn current_frame(&self) -> Result<Frame, CaptureError>;

    /// Native `(width, height)` of the stream.
    fn native_size(&self) -> (u32, u32);

    /// Stops decoding and releases the device.
    fn close(&mut self);
}

/// Access to the platform's camera devices.
pub trait MediaCapture {
    /// Whether this platform can capture video at all.
    fn is_supported(&self) -> bool;

    /// Requests a video-only stream from the configured device.
    fn open_video_stream(&mut self) -> Result<Box<dyn VideoSource>, CaptureError>;
}
