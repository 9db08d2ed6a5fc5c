//! End-to-end reader session tests against an in-memory backend

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use ondu_config::Settings;
use ondu_core::{
    ApiError, Article, ArticleSource, MediaElement, MediaError, MediaEvent, NoopPrefetcher,
    Paragraph, TaskStatus, TaskStatusResponse, TaskStatusSource,
};
use ondu_reader::{KeyCommand, ReaderSession};
use ondu_text_processing::HighlightSegment;

#[derive(Default)]
struct FakeBackend {
    articles: Mutex<HashMap<String, Article>>,
    tasks: Mutex<HashMap<String, TaskStatusResponse>>,
    status_calls: AtomicUsize,
}

impl FakeBackend {
    fn with_article(article: Article) -> Arc<Self> {
        let backend = Self::default();
        backend.articles.lock().insert(article.id.clone(), article);
        Arc::new(backend)
    }

    fn set_task(&self, task_id: &str, response: TaskStatusResponse) {
        self.tasks.lock().insert(task_id.to_string(), response);
    }

    fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArticleSource for FakeBackend {
    async fn get_article(&self, id: &str) -> Result<Article, ApiError> {
        self.articles.lock().get(id).cloned().ok_or_else(|| ApiError::Status {
            status: 404,
            url: format!("http://backend.test/api/article/{}", id),
        })
    }
}

#[async_trait]
impl TaskStatusSource for FakeBackend {
    async fn task_status(&self, task_id: &str) -> Result<TaskStatusResponse, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .tasks
            .lock()
            .get(task_id)
            .cloned()
            .unwrap_or_else(|| TaskStatusResponse::with_status("PENDING")))
    }
}

#[derive(Default)]
struct FakeMedia {
    sources: Mutex<Vec<String>>,
    duration: Mutex<f64>,
    plays: AtomicUsize,
}

impl FakeMedia {
    fn sources(&self) -> Vec<String> {
        self.sources.lock().clone()
    }
}

#[async_trait]
impl MediaElement for FakeMedia {
    fn set_source(&self, url: &str) {
        self.sources.lock().push(url.to_string());
    }
    fn load(&self) {}
    async fn play(&self) -> Result<(), MediaError> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
    fn pause(&self) {}
    fn current_time(&self) -> f64 {
        0.0
    }
    fn set_current_time(&self, _secs: f64) {}
    fn duration(&self) -> f64 {
        *self.duration.lock()
    }
}

fn pending_article() -> Article {
    Article::new(
        "a1",
        "Greeting",
        vec![Paragraph::new("p1", "Hello world").with_task_id("t1")],
    )
}

fn ready_article() -> Article {
    Article::new(
        "a2",
        "Two paragraphs",
        vec![
            Paragraph::new("p1", "Hello world").with_audio_url("/static/p1.wav"),
            Paragraph::new("p2", "Second paragraph here").with_audio_url("/static/p2.wav"),
        ],
    )
}

async fn open(
    backend: &Arc<FakeBackend>,
    article_id: &str,
) -> (ReaderSession<FakeMedia>, Arc<FakeMedia>) {
    let media = Arc::new(FakeMedia::default());
    let session = ReaderSession::open(
        Arc::clone(backend),
        article_id,
        Arc::clone(&media),
        Arc::new(NoopPrefetcher),
        &Settings::default(),
    )
    .await
    .unwrap();
    (session, media)
}

/// Let spawned tasks run; time is paused, so this only advances the clock
/// once everything else is idle
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

async fn metadata(session: &ReaderSession<FakeMedia>, media: &FakeMedia, duration: f64) {
    *media.duration.lock() = duration;
    session
        .playlist()
        .handle_event(MediaEvent::LoadedMetadata { duration })
        .await;
    settle().await;
}

#[tokio::test(start_paused = true)]
async fn test_pending_task_resolves_to_static_url() {
    let backend = FakeBackend::with_article(pending_article());
    backend.set_task(
        "t1",
        TaskStatusResponse::with_status("SUCCESS").with_result_path("/out/p1.wav"),
    );

    let (session, media) = open(&backend, "a1").await;
    assert_eq!(session.statuses().get("p1"), Some(&TaskStatus::Pending));
    assert_eq!(session.status_label("p1"), "PENDING");
    assert_eq!(session.progress().label(), "0/1 ready");

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(session.article().paragraphs[0].audio_url, "/static/p1.wav");
    assert_eq!(session.status_label("p1"), "SUCCESS");
    assert_eq!(session.playlist().active_index(), 0);
    assert_eq!(
        session.playlist().active_track().map(|t| t.audio_url),
        Some("/static/p1.wav".to_string())
    );
    assert_eq!(media.sources().last().map(String::as_str), Some("/static/p1.wav"));

    let progress = session.progress();
    assert!(progress.is_complete());
    assert_eq!(progress.label(), "1/1 ready");
    assert_eq!(progress.caption(), "All audio ready.");

    // Nothing left to resolve, so polling has stopped
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(backend.status_calls(), 1);
    assert!(session.reconciler_finished());
}

#[tokio::test(start_paused = true)]
async fn test_open_fails_for_missing_article() {
    let backend = FakeBackend::with_article(ready_article());
    let result = ReaderSession::open(
        Arc::clone(&backend),
        "missing",
        Arc::new(FakeMedia::default()),
        Arc::new(NoopPrefetcher),
        &Settings::default(),
    )
    .await;

    match result {
        Err(e) => assert_eq!(e.status(), Some(404)),
        Ok(_) => panic!("opening a missing article must fail"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_timings_follow_metadata_and_time() {
    let backend = FakeBackend::with_article(ready_article());
    let (session, media) = open(&backend, "a2").await;
    settle().await;
    assert!(session.timings().is_none());
    assert_eq!(session.time_label(), "Loading audio…");

    metadata(&session, &media, 2.0).await;
    let timings = session.timings().unwrap();
    assert_eq!(timings.len(), 2);
    assert_eq!(timings[1].end, 2.0);
    assert_eq!(session.active_word(), Some(0));
    assert_eq!(session.now_playing().as_deref(), Some("Now playing paragraph 1"));

    session
        .playlist()
        .handle_event(MediaEvent::TimeUpdate {
            current_time: 1.5,
            duration: 2.0,
        })
        .await;
    settle().await;
    assert_eq!(session.active_word(), Some(1));
    assert_eq!(session.time_label(), "0:01 / 0:02");

    let segments = session.segments(0).unwrap();
    assert_eq!(
        segments.last(),
        Some(&HighlightSegment::Word {
            text: "world".to_string(),
            index: 1,
            active: true,
        })
    );
    assert!(session.segments(1).unwrap().iter().all(|s| !s.is_active()));
}

#[tokio::test(start_paused = true)]
async fn test_track_change_clears_timings_until_metadata() {
    let backend = FakeBackend::with_article(ready_article());
    let (session, media) = open(&backend, "a2").await;
    metadata(&session, &media, 2.0).await;
    assert!(session.timings().is_some());

    session.next().await;
    settle().await;
    assert!(session.timings().is_none());
    assert_eq!(session.active_word(), None);

    metadata(&session, &media, 3.0).await;
    assert_eq!(session.timings().map(|t| t.len()), Some(3));
    assert_eq!(session.now_playing().as_deref(), Some("Now playing paragraph 2"));
}

#[tokio::test(start_paused = true)]
async fn test_scrub_moves_highlight_and_pauses_follow() {
    let backend = FakeBackend::with_article(ready_article());
    let (session, media) = open(&backend, "a2").await;
    assert_eq!(session.scrub(0.5), None);

    metadata(&session, &media, 2.0).await;

    session.begin_scrub();
    assert_eq!(session.follow_target(), None);
    assert_eq!(session.scrub(0.75), Some(1));
    assert_eq!(session.scrub(0.1), Some(0));
    session.end_scrub();
    assert_eq!(session.follow_target().as_deref(), Some("p1"));
}

#[tokio::test(start_paused = true)]
async fn test_keys_require_focus() {
    let backend = FakeBackend::with_article(ready_article());
    let (session, media) = open(&backend, "a2").await;

    assert_eq!(session.handle_key("Space").await, None);
    assert!(!session.playlist().is_playing());

    session.set_focus(true);
    assert_eq!(session.handle_key("Space").await, Some(KeyCommand::Toggle));
    assert!(session.playlist().is_playing());
    assert_eq!(media.plays.load(Ordering::SeqCst), 1);

    assert_eq!(session.handle_key("ArrowRight").await, Some(KeyCommand::Next));
    assert_eq!(session.playlist().active_index(), 1);
    assert_eq!(session.handle_key("ArrowLeft").await, Some(KeyCommand::Prev));
    assert_eq!(session.playlist().active_index(), 0);
    assert_eq!(session.handle_key("KeyQ").await, None);
}

#[tokio::test(start_paused = true)]
async fn test_close_stops_polling() {
    let backend = FakeBackend::with_article(pending_article());
    let (session, _media) = open(&backend, "a1").await;

    settle().await;
    assert_eq!(backend.status_calls(), 1);

    session.close();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(backend.status_calls(), 1);
    assert!(session.reconciler_finished());
    assert_eq!(session.status_label("p1"), "PENDING");
}
