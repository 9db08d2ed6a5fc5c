//! Backend HTTP client

use std::path::Path;

use async_trait::async_trait;
use reqwest::{multipart, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use ondu_config::{constants::endpoints, ApiConfig};
use ondu_core::{
    ApiError, Article, ArticleSource, ArticleSummary, TaskStatusResponse, TaskStatusSource,
};

use crate::response::{parse_delete_response, parse_upload_response};

/// Name given to pasted text so the backend treats it as a `.txt` upload
const RAW_TEXT_FILENAME: &str = "raw.txt";

/// Client for the Ondu backend
#[derive(Debug, Clone)]
pub struct OnduClient {
    http: reqwest::Client,
    base_url: Url,
}

impl OnduClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ApiError::InvalidInput(format!("base url '{}': {}", config.base_url, e))
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::Request {
                url: config.base_url.clone(),
                message: e.to_string(),
            })?;

        Ok(Self { http, base_url })
    }

    /// Reuse an existing reqwest client
    pub fn with_http(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Absolute form of a possibly relative URL (audio paths are served
    /// relative to the backend origin)
    pub fn resolve(&self, url: &str) -> Option<Url> {
        if url.trim().is_empty() {
            return None;
        }
        self.base_url.join(url).ok()
    }

    pub async fn list_articles(&self) -> Result<Vec<ArticleSummary>, ApiError> {
        let url = self.endpoint(endpoints::ARTICLES, None)?;
        self.get_json(url).await
    }

    pub async fn get_article(&self, id: &str) -> Result<Article, ApiError> {
        let url = self.endpoint(endpoints::ARTICLE, Some(id))?;
        let article: Article = self.get_json(url).await?;
        Ok(article.normalized())
    }

    pub async fn delete_article(&self, id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(endpoints::ARTICLE, Some(id))?;
        tracing::debug!(url = %url, "DELETE");

        let resp = self
            .http
            .delete(url.clone())
            .send()
            .await
            .map_err(|e| request_error(&url, e))?;
        let resp = check_status(&url, resp)?;
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        parse_delete_response(&body)
    }

    /// Upload pasted text; returns the created article
    pub async fn upload_text(&self, text: &str) -> Result<Article, ApiError> {
        if text.trim().is_empty() {
            return Err(ApiError::InvalidInput(
                "Please provide a file or raw text.".to_string(),
            ));
        }
        self.upload(text.as_bytes().to_vec(), RAW_TEXT_FILENAME.to_string(), "text/plain")
            .await
    }

    /// Upload a `.txt` or `.pdf` file; returns the created article
    pub async fn upload_file(&self, path: &Path) -> Result<Article, ApiError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .unwrap_or_default();
        let lower = name.to_ascii_lowercase();
        let mime = if lower.ends_with(".txt") {
            "text/plain"
        } else if lower.ends_with(".pdf") {
            "application/pdf"
        } else {
            return Err(ApiError::InvalidInput(
                "Only .txt and .pdf files are supported.".to_string(),
            ));
        };

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ApiError::InvalidInput(format!("cannot read {}: {}", path.display(), e))
        })?;
        self.upload(bytes, name, mime).await
    }

    pub async fn task_status(&self, task_id: &str) -> Result<TaskStatusResponse, ApiError> {
        let url = self.endpoint(endpoints::TASK_STATUS, Some(task_id))?;
        self.get_json(url).await
    }

    async fn upload(&self, bytes: Vec<u8>, filename: String, mime: &str) -> Result<Article, ApiError> {
        let url = self.endpoint(endpoints::UPLOAD, None)?;
        let part = multipart::Part::bytes(bytes)
            .file_name(filename.clone())
            .mime_str(mime)
            .map_err(|e| ApiError::InvalidInput(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        tracing::debug!(url = %url, filename = %filename, "Uploading");
        let resp = self
            .http
            .post(url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| request_error(&url, e))?;

        let success = resp.status().is_success();
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        parse_upload_response(success, body)
    }

    /// `base_url` + `path`, plus an optional percent-encoded segment
    fn endpoint(&self, path: &str, segment: Option<&str>) -> Result<Url, ApiError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| ApiError::InvalidInput(format!("endpoint '{}': {}", path, e)))?;

        if let Some(segment) = segment {
            url.path_segments_mut()
                .map_err(|_| ApiError::InvalidInput(format!("base url cannot hold '{}'", path)))?
                .push(segment);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        tracing::trace!(url = %url, "GET");
        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| request_error(&url, e))?;
        let resp = check_status(&url, resp)?;

        resp.json::<T>().await.map_err(|e| ApiError::InvalidResponse {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl ArticleSource for OnduClient {
    async fn get_article(&self, id: &str) -> Result<Article, ApiError> {
        OnduClient::get_article(self, id).await
    }
}

#[async_trait]
impl TaskStatusSource for OnduClient {
    async fn task_status(&self, task_id: &str) -> Result<TaskStatusResponse, ApiError> {
        OnduClient::task_status(self, task_id).await
    }
}

fn request_error(url: &Url, e: reqwest::Error) -> ApiError {
    ApiError::Request {
        url: url.to_string(),
        message: e.to_string(),
    }
}

fn check_status(url: &Url, resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(ApiError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        })
    }
}
