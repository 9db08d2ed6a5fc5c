//! Media element abstraction
//!
//! Mirrors the subset of an HTML audio element the playlist needs. Commands are
//! synchronous except `play`, which may be refused by the platform. State changes
//! come back asynchronously as [`MediaEvent`]s on a channel owned by the host.

use async_trait::async_trait;

use crate::MediaError;

/// Events emitted by a media element
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Playback position advanced
    TimeUpdate { current_time: f64, duration: f64 },
    /// Source metadata is known; `duration` may be NaN or infinite
    LoadedMetadata { duration: f64 },
    /// Playback reached the end of the source
    Ended,
    /// Playback started
    Play,
    /// Playback paused
    Pause,
    /// Source could not be fetched or decoded
    Error { message: String },
}

/// Single audio playback resource
#[async_trait]
pub trait MediaElement: Send + Sync + 'static {
    /// Replace the source URL; does not start loading
    fn set_source(&self, url: &str);

    /// Start (re)loading the current source
    fn load(&self);

    /// Start playback
    async fn play(&self) -> Result<(), MediaError>;

    fn pause(&self);

    /// Playback position in seconds
    fn current_time(&self) -> f64;

    fn set_current_time(&self, secs: f64);

    /// Source duration in seconds, NaN while unknown
    fn duration(&self) -> f64;
}
