use super::error::FetchError;

/// Progress callback for `fetch_all`.
pub trait FetchProgress: Send + Sync {
    /// Called before a source is fetched.
    fn on_start(&self, name: &str, index: usize, total: usize);

    /// Called after a source fetch finishes; `Ok` carries the observation count.
    fn on_complete(&self, name: &str, index: usize, total: usize, result: &Result<usize, FetchError>);

    /// Called once the whole batch is done.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Reports progress through `tracing`.
pub struct LogProgress;

impl FetchProgress for LogProgress {
    fn on_start(&self, name: &str, index: usize, total: usize) {
        tracing::info!(source = name, "[{}/{}] fetching", index + 1, total);
    }

    fn on_complete(
        &self,
        name: &str,
        _index: usize,
        _total: usize,
        result: &Result<usize, FetchError>,
    ) {
        match result {
            Ok(points) => tracing::info!(source = name, points, "fetched"),
            Err(e) => tracing::warn!(source = name, error = %e, "fetch failed"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        tracing::info!(succeeded, failed, total, "fetch batch complete");
    }
}

/// Discards all progress events.
pub struct NoProgress;

impl FetchProgress for NoProgress {
    fn on_start(&self, _name: &str, _index: usize, _total: usize) {}

    fn on_complete(
        &self,
        _name: &str,
        _index: usize,
        _total: usize,
        _result: &Result<usize, FetchError>,
    ) {
    }

    fn on_batch_complete(&self, _succeeded: usize, _failed: usize, _total: usize) {}
}
