//! Playlist engine for paragraph audio
//!
//! Plays an ordered list of per-paragraph tracks through a single
//! [`ondu_core::MediaElement`]. Audio files are generated in the background and
//! may not exist yet when first requested, so a media error is retried with
//! backoff and a cache-busting URL before the track is skipped.
//!
//! ## Lifecycle
//!
//! ```text
//! load ─► track change ─► set_source/load ─► (play if playing)
//!               ▲                │
//!               │          Error event ──► retry timer ──► reload same URL
//!               │                │ retries exhausted
//!               └──── next ◄─────┘
//! ```

pub mod engine;
pub mod events;
pub mod prefetch;
pub mod retry;
pub mod state;

pub use engine::PlaylistEngine;
pub use events::PlaylistEvent;
pub use prefetch::HttpPrefetcher;
pub use retry::{cache_busted_url, RetryDecision, RetryPolicy};
pub use state::{Notice, NoticeKind, PlaylistState};
