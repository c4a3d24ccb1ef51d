use crate::upload::domain::upload_executor::{UploadExecutor, UploadJob};

/// Runs each upload on a short-lived named thread.
///
/// The gate guarantees at most one job at a time, so there is no pool.
#[derive(Default)]
pub struct ThreadedUploadExecutor;

impl ThreadedUploadExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl UploadExecutor for ThreadedUploadExecutor {
    fn execute(&self, job: UploadJob) -> Result<(), std::io::Error> {
        std::thread::Builder::new()
            .name("snapshot-upload".into())
            .spawn(job)
            .map(|_| ())
    }
}
