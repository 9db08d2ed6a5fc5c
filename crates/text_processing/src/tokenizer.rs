//! Paragraph tokenization
//!
//! Splits on whitespace runs and records each word's character offsets in the
//! source string. Offsets are found by scanning forward from the end of the
//! previous match, so repeated words never resolve to an earlier occurrence.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A word and its position in the paragraph, in characters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub word: String,
    pub start_char: usize,
    pub end_char: usize,
}

impl Token {
    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.end_char - self.start_char
    }
}

/// Tokenize a paragraph; blank input yields no tokens
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut byte_cursor = 0;
    let mut char_cursor = 0;

    for word in text.split_whitespace() {
        let Some(rel) = text[byte_cursor..].find(word) else {
            continue;
        };
        let start_byte = byte_cursor + rel;
        let start_char = char_cursor + text[byte_cursor..start_byte].chars().count();
        let end_char = start_char + word.chars().count();

        tokens.push(Token {
            word: word.to_string(),
            start_char,
            end_char,
        });

        byte_cursor = start_byte + word.len();
        char_cursor = end_char;
    }

    tokens
}

/// Tokens cached per paragraph id
///
/// Paragraph text never changes for a given id, so entries are only
/// dropped when the paragraph leaves the playlist.
#[derive(Debug, Default)]
pub struct TokenCache {
    entries: RwLock<HashMap<String, Arc<[Token]>>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached tokens for `id`, tokenizing `text` on first use
    pub fn get_or_tokenize(&self, id: &str, text: &str) -> Arc<[Token]> {
        if let Some(tokens) = self.entries.read().get(id) {
            return Arc::clone(tokens);
        }

        let tokens: Arc<[Token]> = tokenize(text).into();
        self.entries
            .write()
            .entry(id.to_string())
            .or_insert_with(|| Arc::clone(&tokens))
            .clone()
    }

    pub fn get(&self, id: &str) -> Option<Arc<[Token]>> {
        self.entries.read().get(id).cloned()
    }

    /// Keep only entries whose id is in `ids`
    pub fn retain<'a>(&self, ids: impl IntoIterator<Item = &'a str>) {
        let keep: std::collections::HashSet<&str> = ids.into_iter().collect();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|id, _| keep.contains(id.as_str()));
        if entries.len() != before {
            tracing::trace!(evicted = before - entries.len(), "Evicted stale token entries");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
