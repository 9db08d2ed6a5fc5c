//! Word timing estimation
//!
//! The backend does not return forced-alignment data, so each word is given a
//! share of the paragraph's audio duration proportional to its character
//! length. Supplied timings replace the estimate when they line up with the
//! tokens one to one.

use serde::{Deserialize, Serialize};

use crate::Token;

/// Time window of one word, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

impl WordTiming {
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }
}

/// Proportional allocation of `duration` across `tokens`
///
/// Degenerate input (no tokens, non-finite or non-positive duration) yields
/// zero-width windows at 0. The last word always ends exactly at `duration`.
pub fn heuristic_timings(tokens: &[Token], duration: f64) -> Vec<WordTiming> {
    if tokens.is_empty() || !duration.is_finite() || duration <= 0.0 {
        return tokens
            .iter()
            .map(|t| WordTiming {
                word: t.word.clone(),
                start: 0.0,
                end: 0.0,
            })
            .collect();
    }

    let total_chars = tokens.iter().map(Token::char_len).sum::<usize>().max(1) as f64;
    let last = tokens.len() - 1;
    let mut cursor = 0.0_f64;

    tokens
        .iter()
        .enumerate()
        .map(|(i, token)| {
            let start = cursor.min(duration);
            let end = if i == last {
                duration
            } else {
                let portion = token.char_len() as f64 / total_chars;
                (cursor + portion * duration).min(duration)
            };
            cursor = end;
            WordTiming {
                word: token.word.clone(),
                start,
                end,
            }
        })
        .collect()
}

/// Prefer `supplied` when its length matches the token count, else estimate
pub fn merge_timings(
    tokens: &[Token],
    supplied: Option<&[WordTiming]>,
    duration: f64,
) -> Vec<WordTiming> {
    match supplied {
        Some(real) if real.len() == tokens.len() => real.to_vec(),
        Some(real) => {
            tracing::debug!(
                supplied = real.len(),
                tokens = tokens.len(),
                "Supplied timings do not match tokens, using estimate"
            );
            heuristic_timings(tokens, duration)
        }
        None => heuristic_timings(tokens, duration),
    }
}

/// Index of the word being spoken at `t`
///
/// Windows are half-open. A time past every window belongs to the last word,
/// so `None` is only returned for an empty sequence.
pub fn find_active_word_index(timings: &[WordTiming], t: f64) -> Option<usize> {
    if timings.is_empty() {
        return None;
    }
    timings
        .iter()
        .position(|w| w.contains(t))
        .or(Some(timings.len() - 1))
}
