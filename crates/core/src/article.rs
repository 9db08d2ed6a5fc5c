//! Article payloads served by the backend
//!
//! `GET /api/article/{id}` returns `{id, title, paragraphs: [{id, text, audio_url, task_id?}]}`.
//! The upload endpoint emits an older shape (`{text, audio, task_id}` without `id`), which is
//! accepted here and normalized so the rest of the reader only sees one shape.

use serde::{Deserialize, Serialize};

use crate::Track;

/// Entry of `GET /api/articles`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub id: String,
    #[serde(default = "default_title")]
    pub title: String,
}

fn default_title() -> String {
    "Untitled".to_string()
}

/// One paragraph of an article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Unique within the article; assigned positionally when the backend omits it
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub text: String,

    /// Audio location; a ready file lives under the static prefix
    #[serde(default, alias = "audio")]
    pub audio_url: String,

    /// Background generation task, if audio is produced asynchronously
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl Paragraph {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            audio_url: String::new(),
            task_id: None,
        }
    }

    pub fn with_audio_url(mut self, url: impl Into<String>) -> Self {
        self.audio_url = url.into();
        self
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// Whether the paragraph has any non-whitespace text
    pub fn is_playable(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// Task id, treating an empty string as absent
    pub fn task(&self) -> Option<&str> {
        self.task_id.as_deref().filter(|t| !t.is_empty())
    }
}

/// A converted article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub id: String,

    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
}

impl Article {
    pub fn new(id: impl Into<String>, title: impl Into<String>, paragraphs: Vec<Paragraph>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            paragraphs,
        }
        .normalized()
    }

    /// Fill in positional ids (`p1`, `p2`, ...) and drop empty task ids
    pub fn normalized(mut self) -> Self {
        for (i, p) in self.paragraphs.iter_mut().enumerate() {
            if p.id.trim().is_empty() {
                p.id = format!("p{}", i + 1);
            }
            if p.task().is_none() {
                p.task_id = None;
            }
        }
        self
    }

    /// Paragraphs with non-empty text, as playlist tracks
    pub fn playable_tracks(&self) -> Vec<Track> {
        self.paragraphs
            .iter()
            .filter(|p| p.is_playable())
            .map(Track::from)
            .collect()
    }

    pub fn paragraph(&self, id: &str) -> Option<&Paragraph> {
        self.paragraphs.iter().find(|p| p.id == id)
    }

    pub fn paragraph_mut(&mut self, id: &str) -> Option<&mut Paragraph> {
        self.paragraphs.iter_mut().find(|p| p.id == id)
    }
}
