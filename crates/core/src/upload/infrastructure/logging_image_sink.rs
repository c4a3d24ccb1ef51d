use crate::upload::domain::image_sink::{EncodedImage, ImageSink, UploadError};

/// Sink for dry runs: logs what would have been posted.
#[derive(Default)]
pub struct LoggingImageSink;

impl LoggingImageSink {
    pub fn new() -> Self {
        Self
    }
}

impl ImageSink for LoggingImageSink {
    fn submit(&self, image: EncodedImage) -> Result<Option<serde_json::Value>, UploadError> {
        log::info!(
            "Dry run: would upload {} ({}, {} bytes)",
            image.file_name,
            image.mime_type,
            image.bytes.len()
        );
        Ok(None)
    }
}
