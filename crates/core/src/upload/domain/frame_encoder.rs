use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("frame {width}x{height} with {channels} channel(s) cannot be encoded")]
    InvalidFrame {
        width: u32,
        height: u32,
        channels: u8,
    },
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Turns a captured frame into an uploadable image file.
pub trait FrameEncoder: Send + Sync {
    fn encode(&self, frame: &Frame) -> Result<Vec<u8>, EncodeError>;
}
