//! Playlist events

use std::time::Duration;

use crate::Notice;

/// Broadcast to observers of a [`crate::PlaylistEngine`]
#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistEvent {
    /// Track list replaced
    Loaded { len: usize, active_index: usize },
    /// A different track became active and its source was loaded
    TrackChanged { index: usize, track_id: String },
    PlaybackChanged { is_playing: bool },
    TimeUpdated { current_time: f64, duration: f64 },
    /// `valid` is false when the reported duration is unusable
    MetadataLoaded { duration: f64, valid: bool },
    RetryScheduled {
        track_id: String,
        attempt: u32,
        delay: Duration,
    },
    TrackSkipped { track_id: String },
    NoticeChanged { notice: Option<Notice> },
    Prefetched { track_id: String },
}
