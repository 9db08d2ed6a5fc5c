//! Next-track prefetching

/// Warms a cache for an audio URL ahead of playback
pub trait AudioPrefetcher: Send + Sync {
    /// Fire-and-forget; implementations must not block
    fn prefetch(&self, url: &str);
}

/// Prefetcher that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPrefetcher;

impl AudioPrefetcher for NoopPrefetcher {
    fn prefetch(&self, url: &str) {
        tracing::trace!(url, "Prefetch skipped (noop prefetcher)");
    }
}
