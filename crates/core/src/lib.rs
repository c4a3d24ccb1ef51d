//! Live webcam face detection with on-screen overlays and debounced
//! snapshot upload.
//!
//! Layout follows a ports-and-adapters split: each area has a `domain`
//! module with the traits and value types the loop depends on, and an
//! `infrastructure` module with the ffmpeg, ONNX Runtime, `image` and
//! `reqwest` backed implementations.

pub mod capture;
pub mod detection;
pub mod pipeline;
pub mod rendering;
pub mod shared;
pub mod upload;
