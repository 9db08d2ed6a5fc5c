//! Task status source

use async_trait::async_trait;

use crate::{ApiError, TaskStatusResponse};

/// Anything that can report the status of a background generation task
#[async_trait]
pub trait TaskStatusSource: Send + Sync {
    async fn task_status(&self, task_id: &str) -> Result<TaskStatusResponse, ApiError>;
}
