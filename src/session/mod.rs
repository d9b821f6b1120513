//! Dataset transfer operations bound to one Galaxy history.
//!
//! A [`Session`] pairs a [`GalaxyApi`] handle with the history it works on
//! and the directory downloads land in. The operations live in submodules:
//!
//! - **upload**: push local files into the history (`put`)
//! - **download**: fetch datasets and collections into the cache directory (`get`)
//! - **matching**: resolve dataset names by regex
//! - **history**: list visible history contents

pub mod download;
pub mod history;
pub mod matching;
pub mod upload;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, GalaxyConfig};
use crate::connection::{self, ConnectError};
use crate::galaxy::{ApiError, GalaxyApi, GalaxyClient};

pub use download::{Fetched, FetchedFile, GetOptions, Selector};
pub use matching::{ContentKey, MatchKey};

#[derive(Error, Debug)]
pub enum HelperError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("no history item matches identifier '{identifier}'")]
    UnknownIdentifier { identifier: String },

    #[error("identifier '{identifier}' does not name a path inside the import directory")]
    UnsafeIdentifier { identifier: String },

    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to unpack collection archive {}: {source}", .path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("collection archive {} contains unsafe entry '{entry}'", .path.display())]
    UnsafeEntry { path: PathBuf, entry: String },
}

impl HelperError {
    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> HelperError + '_ {
        move |source| HelperError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Galaxy handle, history and import directory for one invocation.
#[derive(Debug)]
pub struct Session<A> {
    api: A,
    history_id: String,
    import_dir: PathBuf,
}

impl<A: GalaxyApi> Session<A> {
    pub fn new(api: A, history_id: impl Into<String>, import_dir: impl Into<PathBuf>) -> Self {
        Self {
            api,
            history_id: history_id.into(),
            import_dir: import_dir.into(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn history_id(&self) -> &str {
        &self.history_id
    }

    pub fn import_dir(&self) -> &Path {
        &self.import_dir
    }
}

impl Session<GalaxyClient> {
    /// Resolve a reachable Galaxy and bind it to the requested history.
    pub fn connect(
        config: &GalaxyConfig,
        history_override: Option<&str>,
    ) -> Result<Self, HelperError> {
        let history_id = config.history_id(history_override)?;
        let conn = connection::resolve(config, &history_id)?;
        info!(gx = %conn.url, history = %history_id, "connected to galaxy");
        Ok(Self::new(conn.handle, history_id, &config.import_dir))
    }
}
