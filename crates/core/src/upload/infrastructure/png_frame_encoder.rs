use std::io::Cursor;

use crate::shared::frame::Frame;
use crate::upload::domain::frame_encoder::{EncodeError, FrameEncoder};

/// Encodes frames as PNG at their native resolution using the `image` crate.
#[derive(Default)]
pub struct PngFrameEncoder;

impl PngFrameEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl FrameEncoder for PngFrameEncoder {
    fn encode(&self, frame: &Frame) -> Result<Vec<u8>, EncodeError> {
        let invalid = || EncodeError::InvalidFrame {
            width: frame.width(),
            height: frame.height(),
            channels: frame.channels(),
        };
        if frame.channels() != 3 || frame.width() == 0 || frame.height() == 0 {
            return Err(invalid());
        }

        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or_else(invalid)?;

        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
        Ok(bytes)
    }
}
