//! Interpretation of response bodies whose failure is reported in-band

use serde_json::Value;

use ondu_core::{ApiError, Article};

const UPLOAD_FAILED: &str = "Upload failed.";

/// An upload succeeded only if the backend answered 2xx with an article id
pub fn parse_upload_response(success: bool, body: Value) -> Result<Article, ApiError> {
    let has_id = body
        .get("id")
        .and_then(Value::as_str)
        .is_some_and(|id| !id.trim().is_empty());

    if !(success && has_id) {
        let detail = body
            .get("detail")
            .and_then(Value::as_str)
            .filter(|d| !d.is_empty())
            .unwrap_or(UPLOAD_FAILED);
        return Err(ApiError::Backend(detail.to_string()));
    }

    serde_json::from_value::<Article>(body)
        .map(Article::normalized)
        .map_err(|e| ApiError::InvalidResponse {
            url: "upload".to_string(),
            message: e.to_string(),
        })
}

/// Delete answers 2xx with `{"error": ...}` when the article does not exist
pub fn parse_delete_response(body: &Value) -> Result<(), ApiError> {
    match body.get("error") {
        Some(Value::Null) | None => Ok(()),
        Some(Value::String(msg)) => Err(ApiError::Backend(msg.clone())),
        Some(other) => Err(ApiError::Backend(other.to_string())),
    }
}
