//! Headless media backend
//!
//! Implements [`MediaElement`] without an audio device: the source is fetched
//! over HTTP, its duration is read from the WAV header, and playback advances
//! a clock that emits the same events a browser audio element would.

use std::io::Cursor;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Url;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use ondu_core::{MediaElement, MediaError, MediaEvent};
use ondu_playlist::PlaylistEngine;

/// Clock resolution; browsers fire `timeupdate` at roughly this rate
pub const DEFAULT_TICK: Duration = Duration::from_millis(250);

const EVENT_CAPACITY: usize = 64;

/// Read the duration in seconds of an in-memory WAV file
pub fn wav_duration(bytes: &[u8]) -> Result<f64, MediaError> {
    let reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|e| MediaError::Decode(e.to_string()))?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(MediaError::Decode("zero sample rate".to_string()));
    }
    Ok(reader.duration() as f64 / spec.sample_rate as f64)
}

struct ProbeState {
    source: Option<String>,
    duration: f64,
    current_time: f64,
    playing: bool,
    /// Bumped on every source change; stale loads compare against it
    generation: u64,
    clock: Option<JoinHandle<()>>,
    fetch: Option<JoinHandle<()>>,
}

impl ProbeState {
    fn has_duration(&self) -> bool {
        self.duration.is_finite() && self.duration > 0.0
    }

    fn stop_clock(&mut self) {
        if let Some(clock) = self.clock.take() {
            clock.abort();
        }
    }
}

struct Inner {
    http: reqwest::Client,
    base_url: Option<Url>,
    state: Mutex<ProbeState>,
    /// Each event carries the generation it was emitted under
    events: mpsc::Sender<(u64, MediaEvent)>,
    tick: Duration,
}

/// Media element backed by HTTP fetches and a virtual clock
pub struct ProbeMedia {
    inner: Arc<Inner>,
}

impl ProbeMedia {
    /// Create the element and the receiver its events arrive on
    pub fn new(http: reqwest::Client, base_url: Option<Url>, tick: Duration) -> (Self, ProbeEvents) {
        let (events, rx) = mpsc::channel(EVENT_CAPACITY);
        let inner = Inner {
            http,
            base_url,
            state: Mutex::new(ProbeState {
                source: None,
                duration: f64::NAN,
                current_time: 0.0,
                playing: false,
                generation: 0,
                clock: None,
                fetch: None,
            }),
            events,
            tick,
        };
        let inner = Arc::new(inner);
        let events = ProbeEvents {
            rx,
            inner: Arc::downgrade(&inner),
        };
        (Self { inner }, events)
    }

    pub fn source(&self) -> Option<String> {
        self.inner.state.lock().source.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.inner.state.lock().playing
    }

    fn resolve(&self, url: &str) -> Option<Url> {
        match &self.inner.base_url {
            Some(base) => base.join(url).ok(),
            None => Url::parse(url).ok(),
        }
    }
}

/// Events from a [`ProbeMedia`]
///
/// Events still queued when the source changes are discarded on receipt, so
/// a late `Error` or `Ended` from the previous track never reaches the new
/// one.
pub struct ProbeEvents {
    rx: mpsc::Receiver<(u64, MediaEvent)>,
    inner: Weak<Inner>,
}

impl ProbeEvents {
    /// Next event for the current source; `None` once the element is gone
    pub async fn recv(&mut self) -> Option<MediaEvent> {
        loop {
            let (generation, event) = self.rx.recv().await?;
            if self.is_current(generation)? {
                return Some(event);
            }
            tracing::trace!(generation, ?event, "Dropping event from a replaced source");
        }
    }

    /// Non-blocking [`recv`](Self::recv)
    pub fn try_recv(&mut self) -> Option<MediaEvent> {
        loop {
            let (generation, event) = self.rx.try_recv().ok()?;
            if self.is_current(generation)? {
                return Some(event);
            }
        }
    }

    /// Feed events into `playlist` until the element is dropped
    pub async fn run<M: MediaElement>(mut self, playlist: &PlaylistEngine<M>) {
        while let Some(event) = self.recv().await {
            playlist.handle_event(event).await;
        }
        tracing::debug!("Media event channel closed");
    }

    fn is_current(&self, generation: u64) -> Option<bool> {
        let inner = self.inner.upgrade()?;
        let current = inner.state.lock().generation == generation;
        Some(current)
    }
}

impl Inner {
    /// Must not be called with the state lock held
    fn emit(&self, event: MediaEvent) {
        let generation = self.state.lock().generation;
        self.emit_for(generation, event);
    }

    fn emit_for(&self, generation: u64, event: MediaEvent) {
        if let Err(e) = self.events.try_send((generation, event)) {
            tracing::debug!(error = %e, "Media event dropped");
        }
    }

    fn fail(&self, message: impl Into<String>) {
        self.emit(MediaEvent::Error {
            message: message.into(),
        });
    }

    /// Apply a finished load if it still belongs to the current source
    fn on_metadata(self: &Arc<Self>, generation: u64, duration: f64) {
        let resume = {
            let mut state = self.state.lock();
            if state.generation != generation {
                return;
            }
            state.duration = duration;
            state.fetch = None;
            state.playing
        };
        self.emit_for(generation, MediaEvent::LoadedMetadata { duration });
        if resume {
            self.start_clock(generation);
        }
    }

    fn start_clock(self: &Arc<Self>, generation: u64) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let inner = Arc::clone(self);
        let task = handle.spawn(async move {
            let mut ticker = tokio::time::interval(inner.tick);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let (update, ended) = {
                    let mut state = inner.state.lock();
                    if !state.playing || !state.has_duration() {
                        break;
                    }
                    state.current_time =
                        (state.current_time + inner.tick.as_secs_f64()).min(state.duration);
                    let ended = state.current_time >= state.duration;
                    if ended {
                        state.playing = false;
                    }
                    (
                        MediaEvent::TimeUpdate {
                            current_time: state.current_time,
                            duration: state.duration,
                        },
                        ended,
                    )
                };

                if inner.events.send((generation, update)).await.is_err() {
                    break;
                }
                if ended {
                    let _ = inner.events.send((generation, MediaEvent::Ended)).await;
                    break;
                }
            }
        });

        let mut state = self.state.lock();
        if state.generation != generation {
            task.abort();
            return;
        }
        state.stop_clock();
        state.clock = Some(task);
    }
}

async fn fetch_duration(http: &reqwest::Client, url: Url) -> Result<f64, MediaError> {
    let resp = http
        .get(url.clone())
        .send()
        .await
        .map_err(|e| MediaError::SourceUnavailable(e.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(MediaError::SourceUnavailable(format!("{} answered {}", url, status)));
    }
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| MediaError::SourceUnavailable(e.to_string()))?;
    wav_duration(&bytes)
}

#[async_trait]
impl MediaElement for ProbeMedia {
    fn set_source(&self, url: &str) {
        let mut state = self.inner.state.lock();
        state.generation += 1;
        state.source = Some(url.to_string()).filter(|u| !u.trim().is_empty());
        state.duration = f64::NAN;
        state.current_time = 0.0;
        state.stop_clock();
        if let Some(fetch) = state.fetch.take() {
            fetch.abort();
        }
    }

    fn load(&self) {
        let (source, generation) = {
            let mut state = self.inner.state.lock();
            // Loading always leaves the element paused
            state.playing = false;
            state.stop_clock();
            (state.source.clone(), state.generation)
        };

        let Some(source) = source else {
            self.inner.fail("No source");
            return;
        };
        let Some(url) = self.resolve(&source) else {
            self.inner.fail(format!("Unresolvable source {}", source));
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            self.inner.fail("No runtime to load media");
            return;
        };

        let inner = Arc::clone(&self.inner);
        let task = handle.spawn(async move {
            match fetch_duration(&inner.http, url).await {
                Ok(duration) => inner.on_metadata(generation, duration),
                Err(e) => inner.emit_for(
                    generation,
                    MediaEvent::Error {
                        message: e.to_string(),
                    },
                ),
            }
        });
        self.inner.state.lock().fetch = Some(task);
    }

    async fn play(&self) -> Result<(), MediaError> {
        let (ready, generation) = {
            let mut state = self.inner.state.lock();
            if state.source.is_none() {
                return Err(MediaError::NoSource);
            }
            state.playing = true;
            (state.has_duration(), state.generation)
        };
        self.inner.emit_for(generation, MediaEvent::Play);
        if ready {
            self.inner.start_clock(generation);
        }
        Ok(())
    }

    fn pause(&self) {
        let was_playing = {
            let mut state = self.inner.state.lock();
            state.stop_clock();
            std::mem::replace(&mut state.playing, false)
        };
        if was_playing {
            self.inner.emit(MediaEvent::Pause);
        }
    }

    fn current_time(&self) -> f64 {
        self.inner.state.lock().current_time
    }

    fn set_current_time(&self, secs: f64) {
        let update = {
            let mut state = self.inner.state.lock();
            let upper = if state.has_duration() { state.duration } else { 0.0 };
            state.current_time = secs.clamp(0.0, upper);
            MediaEvent::TimeUpdate {
                current_time: state.current_time,
                duration: state.duration,
            }
        };
        self.inner.emit(update);
    }

    fn duration(&self) -> f64 {
        self.inner.state.lock().duration
    }
}

impl Drop for ProbeMedia {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        state.playing = false;
        state.stop_clock();
        if let Some(fetch) = state.fetch.take() {
            fetch.abort();
        }
    }
}
