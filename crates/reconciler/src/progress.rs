//! Audio generation progress

use serde::Serialize;

use ondu_core::{Article, TaskStatus, TaskStatusMap};

use crate::url::is_ready_url;

/// Progress of background generation over the tracked paragraphs
///
/// A paragraph is tracked when it has text and a task id. It counts as ready
/// once its URL points under the static prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GenerationProgress {
    pub tracked: usize,
    pub ready: usize,
    pub failed: usize,
    /// 0..=100; 100 when nothing is tracked
    pub percent: u8,
}

impl GenerationProgress {
    pub fn compute(article: &Article, statuses: &TaskStatusMap, static_prefix: &str) -> Self {
        let tracked: Vec<_> = article
            .paragraphs
            .iter()
            .filter(|p| p.is_playable() && p.task().is_some())
            .collect();

        let ready = tracked
            .iter()
            .filter(|p| is_ready_url(&p.audio_url, static_prefix))
            .count();
        let failed = tracked
            .iter()
            .filter(|p| statuses.get(&p.id) == Some(&TaskStatus::Failure))
            .count();

        let percent = if tracked.is_empty() {
            100
        } else {
            ((ready as f64 / tracked.len() as f64) * 100.0).round() as u8
        };

        Self {
            tracked: tracked.len(),
            ready,
            failed,
            percent,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.percent >= 100
    }

    pub fn caption(&self) -> &'static str {
        if self.is_complete() {
            "All audio ready."
        } else {
            "Generating audio in the background…"
        }
    }

    /// `"3/5 ready"`, with `", 1 failed"` appended when any failed
    pub fn label(&self) -> String {
        if self.failed > 0 {
            format!("{}/{} ready, {} failed", self.ready, self.tracked, self.failed)
        } else {
            format!("{}/{} ready", self.ready, self.tracked)
        }
    }
}
