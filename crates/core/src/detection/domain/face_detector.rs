use serde::{Deserialize, Serialize};

use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

/// Domain interface for per-frame face detection in video mode.
///
/// `timestamp_ms` is the monotonic time the frame is processed at.
/// Implementations running a streaming model may use it to reject
/// out-of-order frames, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect_for_video(
        &mut self,
        frame: &Frame,
        timestamp_ms: f64,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;
}

/// Hardware preference for running the detection model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delegate {
    #[default]
    Gpu,
    Cpu,
}

impl std::fmt::Display for Delegate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Delegate::Gpu => write!(f, "GPU"),
            Delegate::Cpu => write!(f, "CPU"),
        }
    }
}
