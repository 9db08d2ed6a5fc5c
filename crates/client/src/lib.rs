//! Typed client for the Ondu backend REST API
//!
//! Covers article listing, fetch and delete, uploads, and background task
//! status. Articles are normalized before they are returned.

pub mod client;
mod response;

pub use client::OnduClient;
pub use response::{parse_delete_response, parse_upload_response};
