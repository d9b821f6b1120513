//! Galaxy REST collaborator.
//!
//! All server interaction goes through [`GalaxyApi`]. [`client::GalaxyClient`]
//! is the HTTP implementation; tests substitute an in-memory one.

pub mod client;
#[cfg(test)]
pub(crate) mod fake;
pub mod types;

use std::path::Path;

use thiserror::Error;

pub use client::GalaxyClient;
pub use types::{ContentItem, ContentType, DatasetDetails, HistorySummary, UploadReceipt};

/// Errors raised while talking to a Galaxy server.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid Galaxy URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Operations the helpers need from a Galaxy server.
pub trait GalaxyApi {
    /// Fetch the history summary. Also used as the cheap connectivity probe.
    fn show_history(&self, history_id: &str) -> Result<HistorySummary, ApiError>;

    /// List the contents of a history, optionally restricted to visible items.
    fn history_contents(
        &self,
        history_id: &str,
        visible_only: bool,
    ) -> Result<Vec<ContentItem>, ApiError>;

    fn show_dataset(&self, dataset_id: &str) -> Result<DatasetDetails, ApiError>;

    /// Download a single dataset to `dest`.
    fn download_dataset(&self, dataset_id: &str, dest: &Path) -> Result<(), ApiError>;

    /// Download a dataset collection as a zip archive to `dest`.
    fn download_collection(&self, collection_id: &str, dest: &Path) -> Result<(), ApiError>;

    /// Upload a local file into a history through the upload tool.
    fn upload_file(
        &self,
        history_id: &str,
        path: &Path,
        file_type: &str,
    ) -> Result<UploadReceipt, ApiError>;
}
