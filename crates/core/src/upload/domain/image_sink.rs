use thiserror::Error;

use crate::upload::domain::frame_encoder::EncodeError;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("upload request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("could not start upload worker: {0}")]
    Worker(#[source] std::io::Error),
}

/// An encoded snapshot ready to be posted as a multipart file field.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

/// Remote destination for snapshots.
///
/// The sink is opaque: a response body, if any, is handed back as JSON
/// for logging only. `Ok(None)` means delivered with no decodable body.
pub trait ImageSink: Send + Sync {
    fn submit(&self, image: EncodedImage) -> Result<Option<serde_json::Value>, UploadError>;
}
