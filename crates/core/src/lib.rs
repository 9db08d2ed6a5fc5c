//! Core types and traits for the Ondu reader
//!
//! This crate holds what every other crate agrees on:
//! - The article / paragraph payloads served by the backend
//! - Playlist tracks built from those paragraphs
//! - Task status normalization
//! - Seam traits for media playback, status polling and playlist reloads

pub mod article;
pub mod error;
pub mod task;
pub mod track;
pub mod traits;

pub use article::{Article, ArticleSummary, Paragraph};
pub use error::{ApiError, MediaError};
pub use task::{TaskStatus, TaskStatusMap, TaskStatusResponse};
pub use track::Track;
pub use traits::{
    ArticleSource, AudioPrefetcher, MediaElement, MediaEvent, NoopPrefetcher, TaskStatusSource,
    TrackLoader,
};
