//! Cached downloads into the import directory.
//!
//! Every identifier maps to `<import_dir>/<identifier>`. If that path exists it
//! is reused as-is: a file is a downloaded dataset, a directory an expanded
//! collection. There is no staleness check.
//!
//! Collections arrive as zip archives. The archive is written to
//! `<identifier>.zip`, unpacked into a staging directory next to it, and the
//! staging directory is renamed into place, so a half-extracted collection is
//! never mistaken for a cached one.

use std::fmt;
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;
use zip::ZipArchive;

use super::matching::{ContentKey, MatchKey};
use super::{HelperError, Session};
use crate::galaxy::{ContentItem, GalaxyApi};

/// What to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Positions in the history.
    Hids(Vec<u64>),
    /// Exact dataset names.
    Names(Vec<String>),
    /// Case-insensitive regexes matched against names; resolved to hids.
    Patterns(Vec<String>),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GetOptions {
    /// Also report each item's declared extension.
    pub retrieve_datatype: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    pub path: PathBuf,
    pub extension: Option<String>,
}

/// Outcome of a download: a single file when exactly one path resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    One(FetchedFile),
    Many(Vec<FetchedFile>),
}

impl Fetched {
    fn from_files(mut files: Vec<FetchedFile>) -> Self {
        if files.len() == 1
            && let Some(file) = files.pop()
        {
            return Fetched::One(file);
        }
        Fetched::Many(files)
    }

    pub fn files(&self) -> &[FetchedFile] {
        match self {
            Fetched::One(file) => std::slice::from_ref(file),
            Fetched::Many(files) => files,
        }
    }

    pub fn paths(&self) -> Vec<&Path> {
        self.files().iter().map(|f| f.path.as_path()).collect()
    }
}

/// A single identifier after pattern resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Key {
    Hid(u64),
    Name(String),
}

impl Key {
    fn matches(&self, item: &ContentItem) -> bool {
        match self {
            Key::Hid(hid) => item.hid == *hid,
            Key::Name(name) => item.name == *name,
        }
    }
}

impl Key {
    /// `<import_dir>/<key>`, refusing names that would leave `import_dir`.
    fn cache_path(&self, import_dir: &Path) -> Result<PathBuf, HelperError> {
        let name = match self {
            Key::Hid(hid) => return Ok(import_dir.join(hid.to_string())),
            Key::Name(name) => Path::new(name),
        };
        let mut components = name.components().peekable();
        let plain = components.peek().is_some()
            && components.all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(HelperError::UnsafeIdentifier {
                identifier: self.to_string(),
            });
        }
        Ok(import_dir.join(name))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Hid(hid) => write!(f, "{hid}"),
            Key::Name(name) => f.write_str(name),
        }
    }
}

impl<A: GalaxyApi> Session<A> {
    /// Download the selected items into the import directory, reusing cached copies.
    pub fn get(&self, selector: Selector, options: GetOptions) -> Result<Fetched, HelperError> {
        let keys: Vec<Key> = match selector {
            Selector::Hids(hids) => hids.into_iter().map(Key::Hid).collect(),
            Selector::Names(names) => names.into_iter().map(Key::Name).collect(),
            Selector::Patterns(patterns) => self
                .find_matching_history_ids(patterns.as_slice(), MatchKey::Hid)?
                .into_iter()
                .filter_map(|key| match key {
                    ContentKey::Hid(hid) => Some(Key::Hid(hid)),
                    ContentKey::Id(_) => None,
                })
                .collect(),
        };

        fs::create_dir_all(&self.import_dir).map_err(HelperError::io(&self.import_dir))?;

        let mut contents = None;
        let mut files = Vec::new();
        for key in keys {
            let path = key.cache_path(&self.import_dir)?;
            info!(history = %self.history_id, dataset = %key, "downloading");

            if path.exists() {
                info!(path = %path.display(), "cached, not re-downloading");
                let extension = if options.retrieve_datatype {
                    self.lookup(&mut contents, &key)?
                        .and_then(|item| item.extension.clone())
                } else {
                    None
                };
                files.extend(cached_files(&path)?.into_iter().map(|path| FetchedFile {
                    path,
                    extension: extension.clone(),
                }));
                continue;
            }

            let item = self
                .lookup(&mut contents, &key)?
                .cloned()
                .ok_or_else(|| HelperError::UnknownIdentifier {
                    identifier: key.to_string(),
                })?;
            let extension = if options.retrieve_datatype {
                item.extension.clone()
            } else {
                None
            };

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(HelperError::io(parent))?;
            }

            if item.is_collection() {
                info!(history = %self.history_id, dataset = %key, "downloading collection");
                let extracted = self.fetch_collection(&item, &path)?;
                files.extend(extracted.into_iter().map(|path| FetchedFile {
                    path,
                    extension: extension.clone(),
                }));
            } else {
                self.api.download_dataset(&item.id, &path)?;
                files.push(FetchedFile { path, extension });
            }
        }

        Ok(Fetched::from_files(files))
    }

    /// History contents are listed at most once per `get` call.
    fn lookup<'a>(
        &self,
        cache: &'a mut Option<Vec<ContentItem>>,
        key: &Key,
    ) -> Result<Option<&'a ContentItem>, HelperError> {
        let items = match cache.take() {
            Some(items) => items,
            None => self.api.history_contents(&self.history_id, false)?,
        };
        let items: &'a Vec<ContentItem> = cache.insert(items);
        Ok(items.iter().find(|item| key.matches(item)))
    }

    fn fetch_collection(
        &self,
        item: &ContentItem,
        dest: &Path,
    ) -> Result<Vec<PathBuf>, HelperError> {
        let archive = archive_path(dest);
        self.api.download_collection(&item.id, &archive)?;

        let parent = dest.parent().unwrap_or(self.import_dir.as_path());
        let unpacked = unpack_into_place(&archive, parent, dest);
        // The archive goes whether or not unpacking worked.
        let removed = fs::remove_file(&archive).map_err(HelperError::io(&archive));
        let relative = unpacked?;
        removed?;
        debug!(dest = %dest.display(), files = relative.len(), "collection extracted");

        let mut paths: Vec<PathBuf> = relative.into_iter().map(|r| dest.join(r)).collect();
        paths.sort();
        Ok(paths)
    }
}

/// Extract into a staging directory under `parent`, then rename it to `dest`.
fn unpack_into_place(
    archive: &Path,
    parent: &Path,
    dest: &Path,
) -> Result<Vec<PathBuf>, HelperError> {
    let staging = tempfile::Builder::new()
        .prefix(".collection-")
        .tempdir_in(parent)
        .map_err(HelperError::io(parent))?;
    let relative = extract_archive(archive, staging.path())?;

    // The emptied staging path is cleaned up (or found missing) when `staging` drops.
    fs::rename(staging.path(), dest).map_err(HelperError::io(dest))?;
    Ok(relative)
}

/// Where a collection archive is written before extraction.
pub fn archive_path(dest: &Path) -> PathBuf {
    let mut raw = dest.as_os_str().to_owned();
    raw.push(".zip");
    PathBuf::from(raw)
}

/// Unpack `archive` into `dest`, returning the relative paths of extracted files.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<Vec<PathBuf>, HelperError> {
    let archive_error = |source| HelperError::Archive {
        path: archive.to_path_buf(),
        source,
    };
    let file = File::open(archive).map_err(HelperError::io(archive))?;
    let mut zip = ZipArchive::new(file).map_err(archive_error)?;

    let mut extracted = Vec::new();
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(archive_error)?;
        let Some(relative) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
            return Err(HelperError::UnsafeEntry {
                path: archive.to_path_buf(),
                entry: entry.name().to_string(),
            });
        };
        let target = dest.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(HelperError::io(&target))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(HelperError::io(parent))?;
        }
        let mut out = File::create(&target).map_err(HelperError::io(&target))?;
        std::io::copy(&mut entry, &mut out).map_err(HelperError::io(&target))?;
        extracted.push(relative);
    }
    Ok(extracted)
}

/// Files already materialized at `path`: the path itself, or every file below a directory.
fn cached_files(path: &Path) -> Result<Vec<PathBuf>, HelperError> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(path) {
        let entry = entry.map_err(|e| HelperError::Io {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}
