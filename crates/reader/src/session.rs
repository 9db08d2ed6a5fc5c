//! Reader session
//!
//! One open article: the playlist over its paragraphs, the reconciler
//! patching in finished audio, and the word highlight derived from the
//! playback clock. Timings are rebuilt explicitly when the active track or
//! its metadata changes; the active word follows every time update.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use ondu_config::Settings;
use ondu_core::{
    ApiError, Article, ArticleSource, AudioPrefetcher, MediaElement, TaskStatusMap,
    TaskStatusSource, TrackLoader,
};
use ondu_playlist::{PlaylistEngine, PlaylistEvent, PlaylistState};
use ondu_reconciler::{
    initial_statuses, status_label, GenerationProgress, ReconcilerHandle, TaskReconciler,
};
use ondu_text_processing::{
    find_active_word_index, highlight_segments, merge_timings, HighlightSegment, TokenCache,
    WordTiming,
};

use crate::format::time_label;
use crate::keys::KeyCommand;

/// Derived, render-ready view state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReaderView {
    /// Timings of the active paragraph; `None` until its duration is known
    pub timings: Option<Vec<WordTiming>>,
    pub active_word: Option<usize>,
    /// Announcement for assistive output
    pub now_playing: Option<String>,
    pub is_scrubbing: bool,
    pub has_focus: bool,
}

struct SessionView<M: MediaElement> {
    article: Arc<RwLock<Article>>,
    statuses: Arc<RwLock<TaskStatusMap>>,
    playlist: PlaylistEngine<M>,
    tokens: TokenCache,
    view: Mutex<ReaderView>,
    static_prefix: String,
}

impl<M: MediaElement> SessionView<M> {
    fn apply(&self, event: &PlaylistEvent) {
        match event {
            PlaylistEvent::Loaded { .. } => {
                let state = self.playlist.snapshot();
                self.tokens.retain(state.tracks.iter().map(|t| t.id.as_str()));
                self.refresh_timings_from(&state);
            }
            PlaylistEvent::TrackChanged { .. } | PlaylistEvent::MetadataLoaded { .. } => {
                self.refresh_timings();
            }
            PlaylistEvent::TimeUpdated { current_time, .. } => {
                self.update_active_word(*current_time);
            }
            _ => {}
        }
    }

    fn refresh_timings(&self) {
        let state = self.playlist.snapshot();
        self.refresh_timings_from(&state);
    }

    fn refresh_timings_from(&self, state: &PlaylistState) {
        let mut view = self.view.lock();
        match state.active_track() {
            Some(track) if state.has_metadata => {
                let tokens = self.tokens.get_or_tokenize(&track.id, &track.text);
                let timings = merge_timings(&tokens, None, state.duration);
                view.active_word = find_active_word_index(&timings, state.current_time);
                view.timings = Some(timings);
                view.now_playing = Some(format!("Now playing paragraph {}", state.active_index + 1));
            }
            _ => {
                view.timings = None;
                view.active_word = None;
            }
        }
    }

    fn update_active_word(&self, current_time: f64) {
        let mut view = self.view.lock();
        let active = view
            .timings
            .as_deref()
            .map(|timings| find_active_word_index(timings, current_time));
        if let Some(active) = active {
            view.active_word = active;
        }
    }
}

async fn observe<M: MediaElement>(
    view: Arc<SessionView<M>>,
    mut events: broadcast::Receiver<PlaylistEvent>,
) {
    loop {
        match events.recv().await {
            Ok(event) => view.apply(&event),
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Playlist observer lagged, resyncing");
                view.refresh_timings();
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// An open article
pub struct ReaderSession<M: MediaElement> {
    view: Arc<SessionView<M>>,
    reconciler: Mutex<Option<ReconcilerHandle>>,
    observer: Mutex<Option<JoinHandle<()>>>,
}

impl<M: MediaElement> ReaderSession<M> {
    /// Load `article_id` and start playback plumbing
    ///
    /// Failing to load the article is fatal; there is nothing to play
    /// without it. Playback starts paused at the first paragraph.
    pub async fn open<S>(
        backend: Arc<S>,
        article_id: &str,
        media: Arc<M>,
        prefetcher: Arc<dyn AudioPrefetcher>,
        settings: &Settings,
    ) -> Result<Self, ApiError>
    where
        S: ArticleSource + TaskStatusSource + 'static,
    {
        let article = backend.get_article(article_id).await.map_err(|e| {
            tracing::error!(article_id, error = %e, "Failed to load article");
            e
        })?;

        let statuses = initial_statuses(&article);
        let tracks = article.playable_tracks();
        let playlist = PlaylistEngine::new(media, settings.playlist.clone(), prefetcher);

        let view = Arc::new(SessionView {
            article: Arc::new(RwLock::new(article)),
            statuses: Arc::new(RwLock::new(statuses)),
            playlist: playlist.clone(),
            tokens: TokenCache::new(),
            view: Mutex::new(ReaderView::default()),
            static_prefix: settings.api.static_prefix.clone(),
        });
        for track in &tracks {
            view.tokens.get_or_tokenize(&track.id, &track.text);
        }

        let observer = tokio::spawn(observe(Arc::clone(&view), playlist.subscribe()));
        let playable = tracks.len();
        playlist.load(tracks, 0).await;

        let reconciler = TaskReconciler::new(
            Arc::clone(&view.article),
            Arc::clone(&view.statuses),
            backend as Arc<dyn TaskStatusSource>,
            Arc::new(playlist) as Arc<dyn TrackLoader>,
            settings.reconciler.clone(),
            settings.api.static_prefix.clone(),
        )
        .spawn();

        tracing::info!(article_id, paragraphs = playable, "Reader session opened");

        Ok(Self {
            view,
            reconciler: Mutex::new(Some(reconciler)),
            observer: Mutex::new(Some(observer)),
        })
    }

    pub fn playlist(&self) -> &PlaylistEngine<M> {
        &self.view.playlist
    }

    /// Latest article, including URLs patched in by the reconciler
    pub fn article(&self) -> Article {
        self.view.article.read().clone()
    }

    pub fn title(&self) -> String {
        self.view.article.read().title.clone()
    }

    pub fn statuses(&self) -> TaskStatusMap {
        self.view.statuses.read().clone()
    }

    pub fn status_label(&self, paragraph_id: &str) -> &'static str {
        status_label(&self.view.statuses.read(), paragraph_id)
    }

    pub fn progress(&self) -> GenerationProgress {
        let article = self.view.article.read();
        let statuses = self.view.statuses.read();
        GenerationProgress::compute(&article, &statuses, &self.view.static_prefix)
    }

    pub fn view(&self) -> ReaderView {
        self.view.view.lock().clone()
    }

    pub fn timings(&self) -> Option<Vec<WordTiming>> {
        self.view.view.lock().timings.clone()
    }

    pub fn active_word(&self) -> Option<usize> {
        self.view.view.lock().active_word
    }

    pub fn now_playing(&self) -> Option<String> {
        self.view.view.lock().now_playing.clone()
    }

    /// Recompute timings and the active word from the playlist state
    pub fn refresh(&self) {
        self.view.refresh_timings();
    }

    pub fn time_label(&self) -> String {
        let state = self.view.playlist.snapshot();
        time_label(state.has_metadata, state.current_time, state.duration)
    }

    /// Segments of the playlist paragraph at `index`, with the active word
    /// marked when it is the active paragraph
    pub fn segments(&self, index: usize) -> Option<Vec<HighlightSegment>> {
        let state = self.view.playlist.snapshot();
        let track = state.tracks.get(index)?;
        let active = if index == state.active_index {
            self.active_word()
        } else {
            None
        };
        Some(highlight_segments(&track.text, active))
    }

    pub async fn play(&self) {
        self.view.playlist.play().await;
    }

    pub fn pause(&self) {
        self.view.playlist.pause();
    }

    pub async fn toggle(&self) {
        self.view.playlist.toggle().await;
    }

    pub async fn next(&self) {
        self.view.playlist.next().await;
    }

    pub async fn prev(&self) {
        self.view.playlist.prev().await;
    }

    pub async fn set_index(&self, index: usize) {
        self.view.playlist.set_index(index as isize).await;
    }

    pub fn begin_scrub(&self) {
        self.view.view.lock().is_scrubbing = true;
    }

    /// Seek to `ratio` and move the highlight to the target right away,
    /// without waiting for the next time update
    pub fn scrub(&self, ratio: f64) -> Option<usize> {
        let target = self.view.playlist.seek(ratio)?;
        self.view.update_active_word(target);
        self.active_word()
    }

    pub fn end_scrub(&self) {
        self.view.view.lock().is_scrubbing = false;
    }

    /// Paragraph the display should keep in view; none while scrubbing
    pub fn follow_target(&self) -> Option<String> {
        if self.view.view.lock().is_scrubbing {
            return None;
        }
        self.view.playlist.active_track().map(|t| t.id)
    }

    pub fn set_focus(&self, has_focus: bool) {
        self.view.view.lock().has_focus = has_focus;
    }

    /// Run the command bound to `code`, if any
    pub async fn handle_key(&self, code: &str) -> Option<KeyCommand> {
        let has_focus = self.view.view.lock().has_focus;
        let command = KeyCommand::from_code(code, has_focus)?;
        match command {
            KeyCommand::Toggle => self.toggle().await,
            KeyCommand::Next => self.next().await,
            KeyCommand::Prev => self.prev().await,
        }
        Some(command)
    }

    /// Whether the reconciler has nothing left to do
    pub fn reconciler_finished(&self) -> bool {
        self.reconciler
            .lock()
            .as_ref()
            .map_or(true, ReconcilerHandle::is_finished)
    }

    /// Stop polling, cancel timers and pause playback
    pub fn close(&self) {
        if let Some(mut reconciler) = self.reconciler.lock().take() {
            reconciler.shutdown();
        }
        if let Some(observer) = self.observer.lock().take() {
            observer.abort();
        }
        self.view.playlist.shutdown();
        tracing::debug!("Reader session closed");
    }
}

impl<M: MediaElement> Drop for ReaderSession<M> {
    fn drop(&mut self) {
        let open = self.observer.lock().is_some();
        if open {
            self.close();
        }
    }
}
