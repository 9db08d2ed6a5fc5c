//! Reader session for one article
//!
//! Ties the playlist engine, task reconciler and word highlighting into a
//! single handle a front end drives:
//! - `session`: open an article, transport controls, scrubbing, keys
//! - `probe_media`: headless [`ondu_core::MediaElement`] over HTTP + WAV headers
//! - `format`: time labels
//! - `keys`: keyboard bindings

pub mod format;
pub mod keys;
pub mod probe_media;
pub mod session;

pub use format::{format_time, time_label};
pub use keys::KeyCommand;
pub use probe_media::{wav_duration, ProbeEvents, ProbeMedia, DEFAULT_TICK};
pub use session::{ReaderSession, ReaderView};
