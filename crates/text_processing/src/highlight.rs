//! Word highlight segmentation
//!
//! Splits a paragraph into alternating word and whitespace segments, keeping
//! the whitespace verbatim so rendering the segments in order reproduces the
//! source text.

use serde::{Deserialize, Serialize};

/// One piece of a paragraph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HighlightSegment {
    Space(String),
    Word {
        text: String,
        /// Ordinal among words, matching token indices
        index: usize,
        active: bool,
    },
}

impl HighlightSegment {
    pub fn text(&self) -> &str {
        match self {
            HighlightSegment::Space(s) => s,
            HighlightSegment::Word { text, .. } => text,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, HighlightSegment::Word { active: true, .. })
    }
}

/// Segment `text`, marking the word at `active` (a token index)
pub fn highlight_segments(text: &str, active: Option<usize>) -> Vec<HighlightSegment> {
    let mut segments = Vec::new();
    let mut word_index = 0;
    let mut run_start = 0;
    let mut in_space: Option<bool> = None;

    let mut flush = |segments: &mut Vec<HighlightSegment>, run: &str, space: bool| {
        if run.is_empty() {
            return;
        }
        if space {
            segments.push(HighlightSegment::Space(run.to_string()));
        } else {
            segments.push(HighlightSegment::Word {
                text: run.to_string(),
                index: word_index,
                active: active == Some(word_index),
            });
            word_index += 1;
        }
    };

    for (pos, ch) in text.char_indices() {
        let space = ch.is_whitespace();
        match in_space {
            Some(prev) if prev != space => {
                flush(&mut segments, &text[run_start..pos], prev);
                run_start = pos;
            }
            _ => {}
        }
        in_space = Some(space);
    }
    if let Some(prev) = in_space {
        flush(&mut segments, &text[run_start..], prev);
    }

    segments
}
