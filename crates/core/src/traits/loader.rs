//! Playlist reload seam used by the reconciler

use async_trait::async_trait;

use crate::Track;

/// Receives refreshed track lists without owning the media element
#[async_trait]
pub trait TrackLoader: Send + Sync {
    /// Index of the track currently active in the playlist
    fn active_index(&self) -> usize;

    /// Replace the track list, keeping `start_index` active (clamped)
    async fn load(&self, tracks: Vec<Track>, start_index: usize);
}
