//! Wire records returned by the Galaxy REST API.
//!
//! Only the fields the helpers act on are typed; everything else the server
//! sends is preserved in `extra` so listings can be passed through untouched.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of an entry in a history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Dataset,
    DatasetCollection,
}

/// Summary of a history as returned by `GET /api/histories/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistorySummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Dataset ids grouped by state (`ok`, `queued`, `error`, ...).
    #[serde(default)]
    pub state_ids: HashMap<String, Vec<String>>,
}

impl HistorySummary {
    /// Ids of datasets that finished successfully.
    pub fn ok_dataset_ids(&self) -> &[String] {
        self.state_ids.get("ok").map(Vec::as_slice).unwrap_or_default()
    }
}

/// One entry of `GET /api/histories/{id}/contents`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub hid: u64,
    pub name: String,
    pub history_content_type: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentItem {
    pub fn is_collection(&self) -> bool {
        self.history_content_type == ContentType::DatasetCollection
    }
}

/// Dataset details from `GET /api/datasets/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetDetails {
    pub id: String,
    pub hid: u64,
    pub name: String,
    #[serde(default, alias = "file_ext")]
    pub extension: Option<String>,
}

/// Response of the upload tool submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub outputs: Vec<UploadOutput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadOutput {
    pub id: String,
    #[serde(default)]
    pub hid: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
}
