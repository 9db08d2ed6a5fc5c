//! Task status reconciliation
//!
//! Paragraph audio is produced by background tasks. The reconciler polls the
//! status of every unresolved task on a fixed interval, writes the served URL
//! of finished files into the shared article, and asks the playlist to reload
//! without moving the active track. It stops on its own once nothing is left
//! to resolve.

pub mod progress;
pub mod reconciler;
pub mod url;

pub use progress::GenerationProgress;
pub use reconciler::{
    initial_statuses, status_label, PollOutcome, PollStats, ReconcilerHandle, TaskReconciler,
};
pub use url::{is_ready_url, public_url, served_filename};
