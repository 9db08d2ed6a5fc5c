//! Poll loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use ondu_config::ReconcilerConfig;
use ondu_core::{Article, TaskStatus, TaskStatusMap, TaskStatusSource, TrackLoader};

use crate::url::{is_ready_url, public_url, served_filename};

/// `PENDING` for every playable paragraph that has a task
pub fn initial_statuses(article: &Article) -> TaskStatusMap {
    article
        .paragraphs
        .iter()
        .filter(|p| p.is_playable())
        .filter_map(|p| p.task().map(|_| (p.id.clone(), TaskStatus::Pending)))
        .collect()
}

/// Badge text for a paragraph; unknown means pending
pub fn status_label(statuses: &TaskStatusMap, paragraph_id: &str) -> &'static str {
    statuses
        .get(paragraph_id)
        .copied()
        .unwrap_or_default()
        .as_str()
}

/// Result of one poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Torn down; nothing was applied
    Stopped,
    /// Nothing left to poll
    Idle,
    Polled(PollStats),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub polled: usize,
    pub failed: usize,
    pub updated_urls: usize,
    /// Paragraphs still unresolved after this cycle
    pub remaining: usize,
}

/// Polls task status for unresolved paragraphs
///
/// Article and status map are shared cells read fresh on every cycle, so a
/// poll never works from a stale snapshot.
pub struct TaskReconciler {
    article: Arc<RwLock<Article>>,
    statuses: Arc<RwLock<TaskStatusMap>>,
    source: Arc<dyn TaskStatusSource>,
    loader: Arc<dyn TrackLoader>,
    config: ReconcilerConfig,
    static_prefix: String,
    alive: Arc<AtomicBool>,
}

impl TaskReconciler {
    pub fn new(
        article: Arc<RwLock<Article>>,
        statuses: Arc<RwLock<TaskStatusMap>>,
        source: Arc<dyn TaskStatusSource>,
        loader: Arc<dyn TrackLoader>,
        config: ReconcilerConfig,
        static_prefix: impl Into<String>,
    ) -> Self {
        Self {
            article,
            statuses,
            source,
            loader,
            config,
            static_prefix: static_prefix.into(),
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Stop applying results; in-flight polls are discarded when they land
    pub fn stop(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// `(paragraph id, task id)` of every paragraph still awaiting audio
    pub fn pending(&self) -> Vec<(String, String)> {
        let article = self.article.read();
        let statuses = self.statuses.read();
        article
            .paragraphs
            .iter()
            .filter(|p| !is_ready_url(&p.audio_url, &self.static_prefix))
            .filter(|p| !statuses.get(&p.id).is_some_and(TaskStatus::is_terminal))
            .filter_map(|p| p.task().map(|t| (p.id.clone(), t.to_string())))
            .collect()
    }

    /// Run one cycle: poll every pending task concurrently, apply the batch,
    /// then reload the playlist if any URL changed
    pub async fn poll_once(&self) -> PollOutcome {
        if !self.is_alive() {
            return PollOutcome::Stopped;
        }
        let pending = self.pending();
        if pending.is_empty() {
            return PollOutcome::Idle;
        }

        metrics::counter!("ondu_reconciler_polls_total").increment(1);
        let results = join_all(pending.iter().map(|(paragraph_id, task_id)| async move {
            (paragraph_id, task_id, self.source.task_status(task_id).await)
        }))
        .await;

        if !self.is_alive() {
            tracing::debug!("Reconciler stopped during poll, discarding results");
            return PollOutcome::Stopped;
        }

        let mut stats = PollStats {
            polled: results.len(),
            ..Default::default()
        };
        let mut updated = self.article.read().clone();
        let mut statuses = self.statuses.read().clone();

        for (paragraph_id, task_id, result) in results {
            let resp = match result {
                Ok(resp) => resp,
                Err(e) => {
                    tracing::warn!(
                        paragraph_id = %paragraph_id,
                        task_id = %task_id,
                        error = %e,
                        "Task status poll failed"
                    );
                    metrics::counter!("ondu_reconciler_poll_errors_total").increment(1);
                    stats.failed += 1;
                    continue;
                }
            };

            let status = resp.normalized_status();
            statuses.insert(paragraph_id.clone(), status);
            if status != TaskStatus::Success {
                continue;
            }

            let Some(filename) = resp.result_path().and_then(served_filename) else {
                continue;
            };
            let url = public_url(&self.static_prefix, filename);
            if let Some(paragraph) = updated.paragraph_mut(paragraph_id) {
                if paragraph.audio_url != url {
                    tracing::debug!(paragraph_id = %paragraph_id, url = %url, "Audio ready");
                    paragraph.audio_url = url;
                    stats.updated_urls += 1;
                }
            }
        }

        *self.statuses.write() = statuses;
        if stats.updated_urls > 0 {
            *self.article.write() = updated;
            self.schedule_reload().await;
        }

        stats.remaining = self.pending().len();
        PollOutcome::Polled(stats)
    }

    /// Reload from the latest article on the next scheduler turn, keeping
    /// whatever track is active at that moment
    async fn schedule_reload(&self) {
        tokio::task::yield_now().await;
        if !self.is_alive() {
            return;
        }
        let tracks = self.article.read().playable_tracks();
        let index = self.loader.active_index();
        self.loader.load(tracks, index).await;
    }

    /// Poll on the configured interval until nothing is pending or the
    /// handle is dropped. The first cycle runs immediately.
    pub fn spawn(self) -> ReconcilerHandle {
        let alive = Arc::clone(&self.alive);
        let task = tokio::spawn(async move {
            let interval = self.config.poll_interval();
            tracing::info!(interval_ms = interval.as_millis() as u64, "Reconciler started");

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match self.poll_once().await {
                    PollOutcome::Stopped => break,
                    PollOutcome::Idle => break,
                    PollOutcome::Polled(stats) if stats.remaining == 0 => break,
                    PollOutcome::Polled(_) => {}
                }
            }
            tracing::debug!("Reconciler finished");
        });

        ReconcilerHandle {
            alive,
            task: Some(task),
        }
    }
}

/// Owned handle to a running reconciler; dropping it cancels polling
#[derive(Debug)]
pub struct ReconcilerHandle {
    alive: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl ReconcilerHandle {
    pub fn shutdown(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the loop to end on its own
    pub async fn wait(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for ReconcilerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ondu_core::{ApiError, Paragraph, TaskStatusResponse, Track};
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Default)]
    struct ScriptedSource {
        responses: Mutex<HashMap<String, TaskStatusResponse>>,
        failing: Mutex<Vec<String>>,
        calls: AtomicUsize,
        /// Response latency
        delay: Mutex<Duration>,
    }

    impl ScriptedSource {
        fn set(&self, task_id: &str, resp: TaskStatusResponse) {
            self.responses.lock().insert(task_id.to_string(), resp);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TaskStatusSource for ScriptedSource {
        async fn task_status(&self, task_id: &str) -> Result<TaskStatusResponse, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = *self.delay.lock();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if self.failing.lock().iter().any(|t| t == task_id) {
                return Err(ApiError::Status {
                    status: 500,
                    url: format!("/task_status/{}", task_id),
                });
            }
            Ok(self
                .responses
                .lock()
                .get(task_id)
                .cloned()
                .unwrap_or_else(|| TaskStatusResponse::with_status("PENDING")))
        }
    }

    #[derive(Default)]
    struct RecordingLoader {
        active: AtomicUsize,
        loads: Mutex<Vec<(Vec<Track>, usize)>>,
    }

    #[async_trait]
    impl TrackLoader for RecordingLoader {
        fn active_index(&self) -> usize {
            self.active.load(Ordering::SeqCst)
        }

        async fn load(&self, tracks: Vec<Track>, start_index: usize) {
            self.loads.lock().push((tracks, start_index));
        }
    }

    struct Fixture {
        article: Arc<RwLock<Article>>,
        statuses: Arc<RwLock<TaskStatusMap>>,
        source: Arc<ScriptedSource>,
        loader: Arc<RecordingLoader>,
    }

    impl Fixture {
        fn new(paragraphs: Vec<Paragraph>) -> Self {
            let article = Article::new("a1", "Title", paragraphs);
            let statuses = initial_statuses(&article);
            Self {
                article: Arc::new(RwLock::new(article)),
                statuses: Arc::new(RwLock::new(statuses)),
                source: Arc::new(ScriptedSource::default()),
                loader: Arc::new(RecordingLoader::default()),
            }
        }

        fn reconciler(&self) -> TaskReconciler {
            TaskReconciler::new(
                Arc::clone(&self.article),
                Arc::clone(&self.statuses),
                Arc::clone(&self.source) as Arc<dyn TaskStatusSource>,
                Arc::clone(&self.loader) as Arc<dyn TrackLoader>,
                ReconcilerConfig::default(),
                "/static",
            )
        }
    }

    #[test]
    fn test_initial_statuses_and_labels() {
        let article = Article::new(
            "a1",
            "T",
            vec![
                Paragraph::new("p1", "One").with_task_id("t1"),
                Paragraph::new("p2", "Two"),
                Paragraph::new("p3", " ").with_task_id("t3"),
            ],
        );
        let statuses = initial_statuses(&article);
        assert_eq!(statuses.len(), 1);
        assert_eq!(status_label(&statuses, "p1"), "PENDING");
        assert_eq!(status_label(&statuses, "missing"), "PENDING");
    }

    #[test]
    fn test_pending_selection() {
        let fx = Fixture::new(vec![
            Paragraph::new("p1", "Needs audio").with_task_id("t1"),
            Paragraph::new("p2", "Ready").with_task_id("t2").with_audio_url("/static/p2.wav"),
            Paragraph::new("p3", "No task"),
            Paragraph::new("p4", "Failed").with_task_id("t4"),
        ]);
        fx.statuses.write().insert("p4".into(), TaskStatus::Failure);

        let pending = fx.reconciler().pending();
        assert_eq!(pending, vec![("p1".to_string(), "t1".to_string())]);
    }

    #[tokio::test]
    async fn test_success_updates_url_and_reloads() {
        let fx = Fixture::new(vec![
            Paragraph::new("p1", "Hello world").with_task_id("t1"),
            Paragraph::new("p2", "Second").with_task_id("t2"),
        ]);
        fx.source.set(
            "t1",
            TaskStatusResponse::with_status("success").with_result_path(r"C:\out\p1.wav"),
        );
        fx.loader.active.store(1, Ordering::SeqCst);

        let outcome = fx.reconciler().poll_once().await;
        assert_eq!(
            outcome,
            PollOutcome::Polled(PollStats {
                polled: 2,
                failed: 0,
                updated_urls: 1,
                remaining: 1,
            })
        );

        assert_eq!(fx.article.read().paragraphs[0].audio_url, "/static/p1.wav");
        assert_eq!(fx.statuses.read().get("p1"), Some(&TaskStatus::Success));
        assert_eq!(fx.statuses.read().get("p2"), Some(&TaskStatus::Pending));

        let loads = fx.loader.loads.lock();
        assert_eq!(loads.len(), 1);
        assert_eq!(loads[0].1, 1);
        assert_eq!(loads[0].0[0].audio_url, "/static/p1.wav");
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_other_results() {
        let fx = Fixture::new(vec![
            Paragraph::new("p1", "One").with_task_id("t1"),
            Paragraph::new("p2", "Two").with_task_id("t2"),
        ]);
        fx.source.failing.lock().push("t1".into());
        fx.source
            .set("t2", TaskStatusResponse::with_status("SUCCESS").with_result_path("/out/p2.wav"));

        let PollOutcome::Polled(stats) = fx.reconciler().poll_once().await else {
            panic!("expected a poll cycle");
        };
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.updated_urls, 1);
        assert_eq!(fx.article.read().paragraphs[1].audio_url, "/static/p2.wav");
        assert_eq!(fx.statuses.read().get("p1"), Some(&TaskStatus::Pending));
    }

    #[tokio::test]
    async fn test_failure_status_is_terminal_without_reload() {
        let fx = Fixture::new(vec![Paragraph::new("p1", "One").with_task_id("t1")]);
        fx.source.set("t1", TaskStatusResponse::with_status("FAILURE"));

        let reconciler = fx.reconciler();
        let PollOutcome::Polled(stats) = reconciler.poll_once().await else {
            panic!("expected a poll cycle");
        };
        assert_eq!(stats.remaining, 0);
        assert!(fx.loader.loads.lock().is_empty());
        assert_eq!(reconciler.poll_once().await, PollOutcome::Idle);
        assert_eq!(fx.source.calls(), 1);
    }

    #[tokio::test]
    async fn test_stopped_discards_results() {
        let fx = Fixture::new(vec![Paragraph::new("p1", "One").with_task_id("t1")]);
        let reconciler = fx.reconciler();
        reconciler.stop();

        assert_eq!(reconciler.poll_once().await, PollOutcome::Stopped);
        assert_eq!(fx.source.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_inflight_poll_discards_results() {
        let fx = Fixture::new(vec![Paragraph::new("p1", "One").with_task_id("t1")]);
        fx.source.set(
            "t1",
            TaskStatusResponse::with_status("SUCCESS").with_result_path("/out/p1.wav"),
        );
        *fx.source.delay.lock() = Duration::from_millis(200);

        let reconciler = Arc::new(fx.reconciler());
        let poll = tokio::spawn({
            let reconciler = Arc::clone(&reconciler);
            async move { reconciler.poll_once().await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fx.source.calls(), 1);
        reconciler.stop();

        assert_eq!(poll.await.unwrap(), PollOutcome::Stopped);
        assert_eq!(fx.article.read().paragraphs[0].audio_url, "");
        assert_eq!(fx.statuses.read().get("p1"), Some(&TaskStatus::Pending));
        assert!(fx.loader.loads.lock().is_empty());
    }

    #[tokio::test]
    async fn test_success_without_path_only_updates_status() {
        let fx = Fixture::new(vec![Paragraph::new("p1", "One").with_task_id("t1")]);
        fx.source.set("t1", TaskStatusResponse::with_status("SUCCESS"));

        let reconciler = fx.reconciler();
        reconciler.poll_once().await;
        assert_eq!(fx.article.read().paragraphs[0].audio_url, "");
        assert_eq!(fx.statuses.read().get("p1"), Some(&TaskStatus::Success));
        assert!(fx.loader.loads.lock().is_empty());
        assert_eq!(reconciler.poll_once().await, PollOutcome::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_stops_when_resolved() {
        let fx = Fixture::new(vec![Paragraph::new("p1", "One").with_task_id("t1")]);
        let handle = fx.reconciler().spawn();

        tokio::time::sleep(Duration::from_millis(3100)).await;
        // Immediate cycle plus two interval ticks
        assert_eq!(fx.source.calls(), 3);

        fx.source
            .set("t1", TaskStatusResponse::with_status("SUCCESS").with_result_path("/out/p1.wav"));
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(fx.source.calls(), 4);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fx.source.calls(), 4);
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_drop_cancels_polling() {
        let fx = Fixture::new(vec![Paragraph::new("p1", "One").with_task_id("t1")]);
        let handle = fx.reconciler().spawn();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fx.source.calls(), 1);
        drop(handle);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fx.source.calls(), 1);
    }
}
