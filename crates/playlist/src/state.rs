//! Playlist state

use serde::{Deserialize, Serialize};

use ondu_core::Track;

/// What a notice reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeKind {
    /// Transient; cleared once the track loads
    Retrying,
    /// Terminal; stays until dismissed
    Skipped,
}

/// User-visible, non-blocking playback notice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn retrying(attempt: u32, max: u32) -> Self {
        Self {
            kind: NoticeKind::Retrying,
            message: format!("Waiting for audio to be ready… (retry {}/{})", attempt, max),
        }
    }

    pub fn skipped(track_id: &str) -> Self {
        Self {
            kind: NoticeKind::Skipped,
            message: format!("Audio unavailable for {}, skipping…", track_id),
        }
    }
}

/// Playlist state
///
/// `active_index` is always within `[0, len - 1]`, or 0 for an empty list.
/// The clock fields reset whenever the active track changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaylistState {
    pub tracks: Vec<Track>,
    pub active_index: usize,
    pub is_playing: bool,
    /// Set by the first `Play` event and never cleared
    pub has_ever_played: bool,
    pub current_time: f64,
    pub duration: f64,
    pub has_metadata: bool,
    /// Retries consumed by the active track
    pub retry_count: u32,
    pub notice: Option<Notice>,
    /// Id of the track already prefetched from this one
    pub prefetched_id: Option<String>,
}

impl PlaylistState {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn active_track(&self) -> Option<&Track> {
        self.tracks.get(self.active_index)
    }

    pub fn next_track(&self) -> Option<&Track> {
        self.tracks.get(self.active_index + 1)
    }

    pub fn is_last(&self) -> bool {
        self.active_index + 1 >= self.tracks.len()
    }

    /// Clamp an arbitrary index into the current bounds
    pub fn clamp_index(&self, index: isize) -> usize {
        if self.tracks.is_empty() || index <= 0 {
            return 0;
        }
        (index as usize).min(self.tracks.len() - 1)
    }

    /// `current_time / duration`, 0 while the duration is unknown
    pub fn progress(&self) -> f64 {
        if self.duration.is_finite() && self.duration > 0.0 {
            (self.current_time / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub(crate) fn reset_track(&mut self) {
        self.has_metadata = false;
        self.duration = 0.0;
        self.current_time = 0.0;
        self.retry_count = 0;
        self.prefetched_id = None;
        if matches!(&self.notice, Some(n) if n.kind == NoticeKind::Retrying) {
            self.notice = None;
        }
    }
}
