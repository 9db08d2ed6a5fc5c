//! Playlist engine
//!
//! Owns the media element and the playlist state. Commands come from the
//! host (transport controls, reconciler reloads) and media events arrive
//! through [`PlaylistEngine::handle_event`]. No lock is held across an await,
//! and at most one retry timer is outstanding at any time.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use ondu_config::PlaylistConfig;
use ondu_core::{AudioPrefetcher, MediaElement, MediaEvent, NoopPrefetcher, Track, TrackLoader};

use crate::retry::{cache_busted_url, RetryDecision, RetryPolicy};
use crate::state::{Notice, NoticeKind, PlaylistState};
use crate::PlaylistEvent;

const EVENT_CAPACITY: usize = 256;

struct Shared<M: MediaElement> {
    media: Arc<M>,
    state: Mutex<PlaylistState>,
    retry_timer: Mutex<Option<JoinHandle<()>>>,
    prefetcher: Arc<dyn AudioPrefetcher>,
    events: broadcast::Sender<PlaylistEvent>,
    policy: RetryPolicy,
    config: PlaylistConfig,
}

/// Cloneable handle to a playlist
pub struct PlaylistEngine<M: MediaElement> {
    shared: Arc<Shared<M>>,
}

impl<M: MediaElement> Clone for PlaylistEngine<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<M: MediaElement> PlaylistEngine<M> {
    pub fn new(media: Arc<M>, config: PlaylistConfig, prefetcher: Arc<dyn AudioPrefetcher>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                media,
                state: Mutex::new(PlaylistState::default()),
                retry_timer: Mutex::new(None),
                prefetcher,
                events,
                policy: RetryPolicy::from(&config),
                config,
            }),
        }
    }

    /// Engine with default configuration and no prefetching
    pub fn with_defaults(media: Arc<M>) -> Self {
        Self::new(media, PlaylistConfig::default(), Arc::new(NoopPrefetcher))
    }

    pub fn media(&self) -> &Arc<M> {
        &self.shared.media
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaylistEvent> {
        self.shared.events.subscribe()
    }

    pub fn snapshot(&self) -> PlaylistState {
        self.shared.state.lock().clone()
    }

    pub fn active_index(&self) -> usize {
        self.shared.state.lock().active_index
    }

    pub fn active_track(&self) -> Option<Track> {
        self.shared.state.lock().active_track().cloned()
    }

    pub fn is_playing(&self) -> bool {
        self.shared.state.lock().is_playing
    }

    pub fn progress(&self) -> f64 {
        self.shared.state.lock().progress()
    }

    /// Replace the track list, keeping `start_index` (clamped) active
    ///
    /// Blank-text tracks are dropped. When the active slot still holds the
    /// same track at the same URL the media element is left alone, so a
    /// reload never restarts in-progress playback.
    pub async fn load(&self, tracks: Vec<Track>, start_index: usize) {
        let tracks: Vec<Track> = tracks.into_iter().filter(Track::has_text).collect();

        let (changed, len, index) = {
            let mut state = self.shared.state.lock();
            let previous = state.active_track().cloned();
            state.tracks = tracks;
            state.active_index = start_index.min(state.len().saturating_sub(1));
            let current = state.active_track().cloned();

            let changed = match (previous, current) {
                (Some(prev), Some(next)) if prev.same_source(&next) => None,
                (_, Some(next)) => Some(next),
                (_, None) => {
                    state.reset_track();
                    None
                }
            };
            (changed, state.len(), state.active_index)
        };

        if len == 0 {
            self.cancel_retry();
        }

        tracing::debug!(tracks = len, active_index = index, "Playlist loaded");
        self.emit(PlaylistEvent::Loaded {
            len,
            active_index: index,
        });

        if let Some(track) = changed {
            self.change_track(index, track).await;
        }
    }

    pub async fn play(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.is_empty() {
                return;
            }
            state.is_playing = true;
        }
        self.emit(PlaylistEvent::PlaybackChanged { is_playing: true });
        self.start_media().await;
    }

    pub fn pause(&self) {
        let was_playing = {
            let mut state = self.shared.state.lock();
            std::mem::replace(&mut state.is_playing, false)
        };
        self.shared.media.pause();
        if was_playing {
            self.emit(PlaylistEvent::PlaybackChanged { is_playing: false });
        }
    }

    pub async fn toggle(&self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play().await;
        }
    }

    /// Make `index` (clamped) active; does not start playback
    pub async fn set_index(&self, index: isize) {
        let change = {
            let mut state = self.shared.state.lock();
            if state.is_empty() {
                return;
            }
            let target = state.clamp_index(index);
            if target == state.active_index {
                None
            } else {
                state.active_index = target;
                state.active_track().cloned().map(|t| (target, t))
            }
        };

        if let Some((index, track)) = change {
            self.change_track(index, track).await;
        }
    }

    /// Advance, or pause on the last track
    pub async fn next(&self) {
        let (empty, last, index) = {
            let state = self.shared.state.lock();
            (state.is_empty(), state.is_last(), state.active_index)
        };
        if empty {
            return;
        }
        if last {
            self.pause();
        } else {
            self.set_index(index as isize + 1).await;
        }
    }

    pub async fn prev(&self) {
        let index = self.active_index();
        if index > 0 {
            self.set_index(index as isize - 1).await;
        }
    }

    /// Seek to `ratio` of the duration
    ///
    /// The target is kept just short of the end so seeking never fires
    /// `Ended`. Returns the applied time, or `None` while the duration is
    /// unknown.
    pub fn seek(&self, ratio: f64) -> Option<f64> {
        if !ratio.is_finite() {
            return None;
        }
        let duration = self.shared.media.duration();
        if !duration.is_finite() || duration <= 0.0 {
            return None;
        }

        let upper = (duration - self.shared.config.seek_end_epsilon_secs).max(0.0);
        let target = (ratio.clamp(0.0, 1.0) * duration).clamp(0.0, upper);
        self.shared.media.set_current_time(target);
        self.shared.state.lock().current_time = target;
        Some(target)
    }

    pub fn dismiss_notice(&self) {
        let had = self.shared.state.lock().notice.take().is_some();
        if had {
            self.emit(PlaylistEvent::NoticeChanged { notice: None });
        }
    }

    /// Apply a media element event
    pub async fn handle_event(&self, event: MediaEvent) {
        match event {
            MediaEvent::TimeUpdate {
                current_time,
                duration,
            } => self.on_time_update(current_time, duration),
            MediaEvent::LoadedMetadata { duration } => self.on_loaded_metadata(duration),
            MediaEvent::Ended => self.next().await,
            MediaEvent::Play => {
                {
                    let mut state = self.shared.state.lock();
                    state.is_playing = true;
                    state.has_ever_played = true;
                }
                self.emit(PlaylistEvent::PlaybackChanged { is_playing: true });
            }
            MediaEvent::Pause => {
                self.shared.state.lock().is_playing = false;
                self.emit(PlaylistEvent::PlaybackChanged { is_playing: false });
            }
            MediaEvent::Error { message } => self.on_media_error(&message).await,
        }
    }

    /// Drive the engine from a media event channel until it closes
    pub async fn run(&self, mut events: mpsc::Receiver<MediaEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        tracing::debug!("Media event channel closed");
    }

    /// Cancel the retry timer and stop playback
    pub fn shutdown(&self) {
        self.cancel_retry();
        self.pause();
    }

    async fn change_track(&self, index: usize, track: Track) {
        let is_playing = {
            let mut state = self.shared.state.lock();
            state.reset_track();
            state.is_playing
        };
        self.cancel_retry();

        self.shared.media.set_source(&track.audio_url);
        self.shared.media.load();

        tracing::debug!(index, track_id = %track.id, "Track changed");
        self.emit(PlaylistEvent::TrackChanged {
            index,
            track_id: track.id,
        });

        if is_playing {
            self.start_media().await;
        }
    }

    /// `play()` on the media element, degrading to paused when refused
    async fn start_media(&self) {
        if let Err(e) = self.shared.media.play().await {
            tracing::warn!(error = %e, "Playback was rejected, staying paused");
            self.shared.state.lock().is_playing = false;
            self.emit(PlaylistEvent::PlaybackChanged { is_playing: false });
        }
    }

    fn on_time_update(&self, current_time: f64, duration: f64) {
        let prefetch = {
            let mut state = self.shared.state.lock();
            state.current_time = current_time;
            state.duration = duration;

            let past_threshold = duration.is_finite()
                && duration > 0.0
                && current_time / duration > self.shared.config.prefetch_threshold;

            let next = state.next_track().cloned();
            match next {
                Some(next)
                    if past_threshold
                        && !next.audio_url.is_empty()
                        && state.prefetched_id.as_deref() != Some(next.id.as_str()) =>
                {
                    state.prefetched_id = Some(next.id.clone());
                    Some(next)
                }
                _ => None,
            }
        };

        self.emit(PlaylistEvent::TimeUpdated {
            current_time,
            duration,
        });

        if let Some(next) = prefetch {
            tracing::debug!(track_id = %next.id, url = %next.audio_url, "Prefetching next track");
            self.shared.prefetcher.prefetch(&next.audio_url);
            self.emit(PlaylistEvent::Prefetched { track_id: next.id });
        }
    }

    fn on_loaded_metadata(&self, duration: f64) {
        let valid = duration.is_finite() && duration > 0.0;
        let cleared = {
            let mut state = self.shared.state.lock();
            state.has_metadata = valid;
            if valid {
                state.duration = duration;
                state.retry_count = 0;
                if matches!(&state.notice, Some(n) if n.kind == NoticeKind::Retrying) {
                    state.notice = None;
                    true
                } else {
                    false
                }
            } else {
                false
            }
        };

        self.emit(PlaylistEvent::MetadataLoaded { duration, valid });
        if cleared {
            self.emit(PlaylistEvent::NoticeChanged { notice: None });
        }
    }

    async fn on_media_error(&self, message: &str) {
        let decided = {
            let mut state = self.shared.state.lock();
            let Some(track) = state.active_track().cloned() else {
                return;
            };
            let decision = self.shared.policy.decide(state.retry_count);
            let notice = match decision {
                RetryDecision::Retry { attempt, .. } => {
                    state.retry_count = attempt;
                    Notice::retrying(attempt, self.shared.policy.max_retries)
                }
                RetryDecision::Skip => Notice::skipped(&track.id),
            };
            state.notice = Some(notice.clone());
            (track, decision, notice)
        };
        let (track, decision, notice) = decided;

        self.emit(PlaylistEvent::NoticeChanged {
            notice: Some(notice),
        });

        match decision {
            RetryDecision::Retry { attempt, delay } => {
                tracing::debug!(
                    track_id = %track.id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %message,
                    "Media error, retry scheduled"
                );
                metrics::counter!("ondu_playlist_retries_total").increment(1);
                self.schedule_retry(track.id.clone(), delay);
                self.emit(PlaylistEvent::RetryScheduled {
                    track_id: track.id,
                    attempt,
                    delay,
                });
            }
            RetryDecision::Skip => {
                tracing::warn!(
                    track_id = %track.id,
                    retries = self.shared.policy.max_retries,
                    error = %message,
                    "Retries exhausted, skipping track"
                );
                metrics::counter!("ondu_playlist_skips_total").increment(1);
                self.emit(PlaylistEvent::TrackSkipped {
                    track_id: track.id,
                });
                self.next().await;
            }
        }
    }

    /// Replace any outstanding retry timer
    fn schedule_retry(&self, track_id: String, delay: std::time::Duration) {
        let weak: Weak<Shared<M>> = Arc::downgrade(&self.shared);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = weak.upgrade() {
                let engine = PlaylistEngine { shared };
                engine.fire_retry(&track_id).await;
            }
        });

        if let Some(old) = self.shared.retry_timer.lock().replace(handle) {
            old.abort();
        }
    }

    async fn fire_retry(&self, track_id: &str) {
        // The slot holds this task's own handle; release it without aborting
        drop(self.shared.retry_timer.lock().take());

        let target = {
            let state = self.shared.state.lock();
            state
                .active_track()
                .filter(|t| t.id == track_id)
                .map(|t| (t.audio_url.clone(), state.is_playing))
        };
        let Some((url, is_playing)) = target else {
            return;
        };

        let busted = cache_busted_url(
            &url,
            &self.shared.config.cache_bust_param,
            chrono::Utc::now().timestamp_millis(),
        );
        tracing::debug!(track_id, url = %busted, "Retrying track");

        self.shared.media.set_source(&busted);
        self.shared.media.load();
        if is_playing {
            self.start_media().await;
        }
    }

    fn cancel_retry(&self) {
        if let Some(handle) = self.shared.retry_timer.lock().take() {
            handle.abort();
        }
    }

    fn emit(&self, event: PlaylistEvent) {
        // No subscribers is fine
        let _ = self.shared.events.send(event);
    }
}

#[async_trait]
impl<M: MediaElement> TrackLoader for PlaylistEngine<M> {
    fn active_index(&self) -> usize {
        PlaylistEngine::active_index(self)
    }

    async fn load(&self, tracks: Vec<Track>, start_index: usize) {
        PlaylistEngine::load(self, tracks, start_index).await;
    }
}
