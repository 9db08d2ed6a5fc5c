//! Centralized constants for the reader
//!
//! Defaults for every tunable live here; `settings` falls back to them.

/// Backend endpoints
pub mod endpoints {
    /// Default backend origin
    pub const BASE_URL_DEFAULT: &str = "http://localhost:8080";

    /// Public prefix under which generated audio is served
    pub const STATIC_PREFIX: &str = "/static";

    pub const ARTICLES: &str = "/api/articles";
    pub const ARTICLE: &str = "/api/article";
    pub const UPLOAD: &str = "/upload";
    pub const TASK_STATUS: &str = "/task_status";
}

/// Playlist playback tuning
pub mod playlist {
    /// Retries per track before it is skipped
    pub const MAX_RETRIES: u32 = 10;

    /// Retry delay = min(BASE + attempt * STEP, MAX) milliseconds
    pub const RETRY_BASE_MS: u64 = 500;
    pub const RETRY_STEP_MS: u64 = 300;
    pub const RETRY_MAX_MS: u64 = 3000;

    /// Fraction of the current track after which the next one is prefetched
    pub const PREFETCH_THRESHOLD: f64 = 0.85;

    /// Seeks stop this far before the end so they do not fire `ended`
    pub const SEEK_END_EPSILON_SECS: f64 = 0.01;

    /// Query parameter appended to bust caches on retry
    pub const CACHE_BUST_PARAM: &str = "_";
}

/// Task status polling
pub mod reconciler {
    pub const POLL_INTERVAL_MS: u64 = 1500;
}

/// Timeouts (in seconds)
pub mod timeouts {
    pub const API_REQUEST_SECS: u64 = 10;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_bounds_ordering() {
        assert!(playlist::RETRY_BASE_MS < playlist::RETRY_MAX_MS);
        // The cap is reached before retries run out
        assert!(
            playlist::RETRY_BASE_MS + (playlist::MAX_RETRIES as u64 - 1) * playlist::RETRY_STEP_MS
                >= playlist::RETRY_MAX_MS
        );
    }

    #[test]
    fn test_prefetch_threshold_valid() {
        assert!(playlist::PREFETCH_THRESHOLD > 0.0 && playlist::PREFETCH_THRESHOLD <= 1.0);
    }
}
