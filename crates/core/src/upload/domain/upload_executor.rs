/// A unit of upload work: encode, post, report back.
pub type UploadJob = Box<dyn FnOnce() + Send + 'static>;

/// Runs upload jobs off the frame loop.
///
/// This is a port. Infrastructure decides whether a job gets its own
/// thread; tests can run jobs inline or hold them back.
pub trait UploadExecutor: Send {
    fn execute(&self, job: UploadJob) -> Result<(), std::io::Error>;
}
