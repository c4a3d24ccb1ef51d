use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};

use crate::shared::constants::UPLOAD_FIELD_NAME;
use crate::upload::domain::image_sink::{EncodedImage, ImageSink, UploadError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Posts snapshots as `multipart/form-data` to a fixed URL.
///
/// The endpoint is treated as a write-only sink: the HTTP status is
/// not inspected and a body that is not JSON is ignored.
pub struct HttpImageSink {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpImageSink {
    pub fn new(url: impl Into<String>) -> Result<Self, UploadError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ImageSink for HttpImageSink {
    fn submit(&self, image: EncodedImage) -> Result<Option<serde_json::Value>, UploadError> {
        let size = image.bytes.len();
        let part = Part::bytes(image.bytes)
            .file_name(image.file_name)
            .mime_str(&image.mime_type)?;
        let form = Form::new().part(UPLOAD_FIELD_NAME, part);

        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form)
            .send()?;
        log::debug!(
            "POST {} ({size} bytes) -> {}",
            self.url,
            response.status()
        );

        let body = match response.bytes() {
            Ok(body) => body,
            Err(e) => {
                log::debug!("Ignoring unreadable upload response: {e}");
                return Ok(None);
            }
        };
        match serde_json::from_slice(&body) {
            Ok(json) => Ok(Some(json)),
            Err(e) => {
                log::debug!("Ignoring non-JSON upload response: {e}");
                Ok(None)
            }
        }
    }
}
