//! Seam traits
//!
//! The playlist, reconciler and reader are written against these traits so
//! the platform pieces (audio output, HTTP backend) can be swapped or faked.

mod article_source;
mod loader;
mod media;
mod prefetch;
mod task_source;

pub use article_source::ArticleSource;
pub use loader::TrackLoader;
pub use media::{MediaElement, MediaEvent};
pub use prefetch::{AudioPrefetcher, NoopPrefetcher};
pub use task_source::TaskStatusSource;
