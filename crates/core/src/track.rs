//! Playlist tracks

use serde::{Deserialize, Serialize};

use crate::Paragraph;

/// One paragraph's playable audio unit plus its source text
///
/// Only `audio_url` changes after construction, when the reconciler learns
/// where the generated file is served from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub text: String,
    pub audio_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl Track {
    pub fn new(id: impl Into<String>, text: impl Into<String>, audio_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            audio_url: audio_url.into(),
            task_id: None,
        }
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// Same track at the same location; used to decide whether a reload
    /// must touch the media element
    pub fn same_source(&self, other: &Track) -> bool {
        self.id == other.id && self.audio_url == other.audio_url
    }
}

impl From<&Paragraph> for Track {
    fn from(p: &Paragraph) -> Self {
        Self {
            id: p.id.clone(),
            text: p.text.clone(),
            audio_url: p.audio_url.clone(),
            task_id: p.task().map(str::to_string),
        }
    }
}
