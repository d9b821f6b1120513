//! In-memory [`GalaxyApi`] used by unit tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Map;

use super::types::{
    ContentItem, ContentType, DatasetDetails, HistorySummary, UploadOutput, UploadReceipt,
};
use super::{ApiError, GalaxyApi};

#[derive(Debug, Default)]
pub struct FakeGalaxy {
    pub url: String,
    pub history_id: String,
    pub reachable: bool,
    pub contents: Vec<ContentItem>,
    /// Payload served for each dataset or collection id.
    pub payloads: HashMap<String, Vec<u8>>,
    /// Ids listed under `state_ids.ok`.
    pub ok_ids: Vec<String>,
    /// Upload fails for files with this name.
    pub reject_upload: Option<String>,

    pub downloads: RefCell<Vec<String>>,
    pub uploads: RefCell<Vec<PathBuf>>,
    pub content_listings: Cell<usize>,
}

impl FakeGalaxy {
    pub fn new(history_id: &str) -> Self {
        Self {
            url: "http://galaxy.test".to_string(),
            history_id: history_id.to_string(),
            reachable: true,
            ..Default::default()
        }
    }

    pub fn unreachable(url: &str) -> Self {
        Self {
            url: url.to_string(),
            reachable: false,
            ..Default::default()
        }
    }

    pub fn with_dataset(
        mut self,
        id: &str,
        hid: u64,
        name: &str,
        ext: &str,
        body: &[u8],
    ) -> Self {
        self.contents
            .push(item(id, hid, name, ContentType::Dataset, Some(ext)));
        self.payloads.insert(id.to_string(), body.to_vec());
        self.ok_ids.push(id.to_string());
        self
    }

    pub fn with_collection(mut self, id: &str, hid: u64, name: &str, zip: Vec<u8>) -> Self {
        self.contents
            .push(item(id, hid, name, ContentType::DatasetCollection, None));
        self.payloads.insert(id.to_string(), zip);
        self
    }

    pub fn download_count(&self) -> usize {
        self.downloads.borrow().len()
    }

    fn check_reachable(&self) -> Result<(), ApiError> {
        if self.reachable {
            Ok(())
        } else {
            Err(ApiError::Io {
                path: self.url.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                ),
            })
        }
    }

    fn not_found(&self, what: &str) -> ApiError {
        ApiError::Status {
            url: format!("{}/api/{what}", self.url),
            status: reqwest::StatusCode::NOT_FOUND,
            body: "{\"err_msg\": \"not found\"}".to_string(),
        }
    }

    fn write_payload(&self, id: &str, dest: &Path) -> Result<(), ApiError> {
        self.check_reachable()?;
        let body = self.payloads.get(id).ok_or_else(|| self.not_found(id))?;
        let mut file = std::fs::File::create(dest).map_err(|source| ApiError::Io {
            path: dest.display().to_string(),
            source,
        })?;
        file.write_all(body).map_err(|source| ApiError::Io {
            path: dest.display().to_string(),
            source,
        })?;
        self.downloads.borrow_mut().push(id.to_string());
        Ok(())
    }
}

fn item(id: &str, hid: u64, name: &str, kind: ContentType, ext: Option<&str>) -> ContentItem {
    ContentItem {
        id: id.to_string(),
        hid,
        name: name.to_string(),
        history_content_type: kind,
        extension: ext.map(str::to_string),
        extra: Map::new(),
    }
}

/// Build a zip archive in memory from `(name, body)` pairs.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    for (name, body) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(body).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

impl GalaxyApi for FakeGalaxy {
    fn show_history(&self, history_id: &str) -> Result<HistorySummary, ApiError> {
        self.check_reachable()?;
        if history_id != self.history_id {
            return Err(self.not_found(history_id));
        }
        let mut state_ids = HashMap::new();
        state_ids.insert("ok".to_string(), self.ok_ids.clone());
        Ok(HistorySummary {
            id: history_id.to_string(),
            name: "Unnamed history".to_string(),
            state_ids,
        })
    }

    fn history_contents(
        &self,
        history_id: &str,
        _visible_only: bool,
    ) -> Result<Vec<ContentItem>, ApiError> {
        self.show_history(history_id)?;
        self.content_listings.set(self.content_listings.get() + 1);
        Ok(self.contents.clone())
    }

    fn show_dataset(&self, dataset_id: &str) -> Result<DatasetDetails, ApiError> {
        self.check_reachable()?;
        self.contents
            .iter()
            .find(|c| c.id == dataset_id)
            .map(|c| DatasetDetails {
                id: c.id.clone(),
                hid: c.hid,
                name: c.name.clone(),
                extension: c.extension.clone(),
            })
            .ok_or_else(|| self.not_found(dataset_id))
    }

    fn download_dataset(&self, dataset_id: &str, dest: &Path) -> Result<(), ApiError> {
        self.write_payload(dataset_id, dest)
    }

    fn download_collection(&self, collection_id: &str, dest: &Path) -> Result<(), ApiError> {
        self.write_payload(collection_id, dest)
    }

    fn upload_file(
        &self,
        history_id: &str,
        path: &Path,
        _file_type: &str,
    ) -> Result<UploadReceipt, ApiError> {
        self.show_history(history_id)?;
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        if name.is_some() && name == self.reject_upload {
            return Err(ApiError::Io {
                path: path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "rejected"),
            });
        }
        self.uploads.borrow_mut().push(path.to_path_buf());
        Ok(UploadReceipt {
            outputs: vec![UploadOutput {
                id: format!("upload-{}", self.uploads.borrow().len()),
                hid: None,
                name,
            }],
        })
    }
}
