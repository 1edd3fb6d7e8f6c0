//! Progress reporting from protocol bodies

/// Receives progress updates while a protocol body runs
///
/// Called synchronously on the syncing thread, so implementations should
/// return quickly.
pub trait ProgressListener: Send + Sync {
    fn on_progress_changed(&self, message: &str, current: usize, max: usize);
}

impl<F> ProgressListener for F
where
    F: Fn(&str, usize, usize) + Send + Sync,
{
    fn on_progress_changed(&self, message: &str, current: usize, max: usize) {
        self(message, current, max)
    }
}
