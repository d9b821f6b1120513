//! Blocking HTTP implementation of [`GalaxyApi`].

use std::fmt;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response, multipart};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use super::types::{ContentItem, DatasetDetails, HistorySummary, UploadReceipt};
use super::{ApiError, GalaxyApi};

/// Header Galaxy reads the API key from.
const API_KEY_HEADER: &str = "x-api-key";

/// Connect timeout only; transfers may legitimately run for a long time.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Galaxy tool that performs uploads into a history.
const UPLOAD_TOOL_ID: &str = "upload1";

/// Client bound to one Galaxy base URL and API key.
pub struct GalaxyClient {
    base_url: String,
    api_key: String,
    http: Client,
}

impl fmt::Debug for GalaxyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GalaxyClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl GalaxyClient {
    /// Build a client for `base_url`. Fails if the URL is not an absolute http(s) URL.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, ApiError> {
        let parsed = reqwest::Url::parse(base_url).map_err(|e| ApiError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(None::<Duration>)
            .user_agent(concat!("galaxy-ie-helpers/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ApiError::Http {
                url: base_url.to_string(),
                source,
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    fn send(&self, request: RequestBuilder, url: &str) -> Result<Response, ApiError> {
        debug!(url, "galaxy request");
        let response = request
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .map_err(|source| ApiError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ApiError::Status {
                url: url.to_string(),
                status,
                body,
            });
        }
        Ok(response)
    }

    fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, ApiError> {
        let response = self.send(self.http.get(&url), &url)?;
        response
            .json::<T>()
            .map_err(|source| ApiError::Decode { url, source })
    }

    /// Stream `url` into a temp file next to `dest`, then move it into place.
    fn download_to(&self, url: String, dest: &Path) -> Result<(), ApiError> {
        let mut response = self.send(self.http.get(&url), &url)?;

        let dir = dest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut staged =
            tempfile::NamedTempFile::new_in(dir).map_err(|source| io_error(dir, source))?;
        let bytes = response
            .copy_to(&mut staged)
            .map_err(|source| ApiError::Http {
                url: url.clone(),
                source,
            })?;
        staged.persist(dest).map_err(|e| io_error(dest, e.error))?;

        debug!(url, dest = %dest.display(), bytes, "download complete");
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ApiError {
    ApiError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl fmt::Display for GalaxyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url)
    }
}

impl GalaxyApi for GalaxyClient {
    fn show_history(&self, history_id: &str) -> Result<HistorySummary, ApiError> {
        self.get_json(self.endpoint(&format!("histories/{history_id}")))
    }

    fn history_contents(
        &self,
        history_id: &str,
        visible_only: bool,
    ) -> Result<Vec<ContentItem>, ApiError> {
        let mut url = self.endpoint(&format!("histories/{history_id}/contents"));
        if visible_only {
            url.push_str("?visible=true");
        }
        self.get_json(url)
    }

    fn show_dataset(&self, dataset_id: &str) -> Result<DatasetDetails, ApiError> {
        self.get_json(self.endpoint(&format!("datasets/{dataset_id}")))
    }

    fn download_dataset(&self, dataset_id: &str, dest: &Path) -> Result<(), ApiError> {
        self.download_to(self.endpoint(&format!("datasets/{dataset_id}/display")), dest)
    }

    fn download_collection(&self, collection_id: &str, dest: &Path) -> Result<(), ApiError> {
        self.download_to(
            self.endpoint(&format!("dataset_collections/{collection_id}/download")),
            dest,
        )
    }

    fn upload_file(
        &self,
        history_id: &str,
        path: &Path,
        file_type: &str,
    ) -> Result<UploadReceipt, ApiError> {
        let url = self.endpoint("tools");
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let inputs = json!({
            "file_count": 1,
            "dbkey": "?",
            "file_type": file_type,
            "files_0|type": "upload_dataset",
            "files_0|NAME": name,
            "files_0|to_posix_lines": "Yes",
        });

        let form = multipart::Form::new()
            .text("tool_id", UPLOAD_TOOL_ID)
            .text("history_id", history_id.to_string())
            .text("inputs", inputs.to_string())
            .file("files_0|file_data", path)
            .map_err(|source| io_error(path, source))?;

        let response = self.send(self.http.post(&url).multipart(form), &url)?;
        response
            .json::<UploadReceipt>()
            .map_err(|source| ApiError::Decode { url, source })
    }
}
