//! Article source

use async_trait::async_trait;

use crate::{ApiError, Article};

/// Anything that can fetch a converted article by id
#[async_trait]
pub trait ArticleSource: Send + Sync {
    async fn get_article(&self, id: &str) -> Result<Article, ApiError>;
}
