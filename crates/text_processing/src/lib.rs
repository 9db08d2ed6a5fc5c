//! Text processing for word highlighting
//!
//! - `tokenizer`: whitespace tokenization with exact character offsets
//! - `timing`: heuristic per-word time windows and active-word lookup
//! - `highlight`: render-ready segments that keep whitespace verbatim

pub mod highlight;
pub mod timing;
pub mod tokenizer;

pub use highlight::{highlight_segments, HighlightSegment};
pub use timing::{find_active_word_index, heuristic_timings, merge_timings, WordTiming};
pub use tokenizer::{tokenize, Token, TokenCache};
