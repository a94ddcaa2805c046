//! # Directory Store
//!
//! A storage driver over a directory tree. The record of
//! `<scheme>:/<path>` lives in `<root>/<scheme>/<path>.o` as JSON:
//!
//! - objects: any JSON object
//! - lists: `{"uris": [...]}`
//! - maps: `{"uris": {"key": "uri", ...}}`
//! - sequences: `{"current": n}`
//!
//! Earlier versions of an object may be kept next to it as `<path>.o.v<n>`.

use refgraph_core::driver::{list_from_body, map_from_body, sequence_from_body};
use refgraph_core::{
    CollectionAccessor, ContentLoader, RawContent, RefgraphError, StorageUri, UriEnumerator,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Record file extension.
const RECORD_EXT: &str = ".o";

/// Storage driver reading JSON records from a directory tree.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Open a store rooted at `root`, which must be a directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, RefgraphError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(RefgraphError::Io(format!(
                "Store root '{}' is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    /// The store root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding the latest content of `uri`.
    pub fn record_path(&self, uri: &StorageUri) -> Result<PathBuf, RefgraphError> {
        let relative = Path::new(uri.path().trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(RefgraphError::load_failed(uri, "path escapes the store root"));
        }
        let mut file = self.root.join(uri.scheme()).join(relative).into_os_string();
        file.push(RECORD_EXT);
        Ok(PathBuf::from(file))
    }

    /// Write `body` as the latest content of `uri`, creating directories.
    pub fn write(&self, uri: &StorageUri, body: &Value) -> Result<PathBuf, RefgraphError> {
        let path = self.record_path(uri)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| RefgraphError::Io(e.to_string()))?;
        }
        let text = serde_json::to_string_pretty(body)
            .map_err(|e| RefgraphError::Deserialization(e.to_string()))?;
        fs::write(&path, text).map_err(|e| RefgraphError::Io(e.to_string()))?;
        Ok(path)
    }

    fn read(&self, uri: &StorageUri, path: &Path) -> Result<Value, RefgraphError> {
        let text = fs::read_to_string(path).map_err(|e| RefgraphError::load_failed(uri, e))?;
        serde_json::from_str(&text)
            .map_err(|e| RefgraphError::load_failed(uri, format!("invalid JSON: {}", e)))
    }

    /// Version numbers of the history files next to `record`, ascending.
    fn history_versions(&self, record: &Path) -> Vec<u64> {
        let (Some(dir), Some(name)) = (record.parent(), record.file_name()) else {
            return Vec::new();
        };
        let prefix = format!("{}.v", name.to_string_lossy());
        let Ok(listing) = fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut versions: Vec<u64> = listing
            .filter_map(Result::ok)
            .filter_map(|e| {
                e.file_name()
                    .to_str()
                    .and_then(|n| n.strip_prefix(&prefix))
                    .and_then(|v| v.parse().ok())
            })
            .collect();
        versions.sort_unstable();
        versions
    }

    fn history_path(record: &Path, version: u64) -> PathBuf {
        let mut file = record.as_os_str().to_owned();
        file.push(format!(".v{}", version));
        PathBuf::from(file)
    }

    fn latest_body(&self, uri: &StorageUri) -> Result<Value, RefgraphError> {
        let path = self.record_path(&uri.canonical())?;
        self.read(uri, &path)
    }
}

impl ContentLoader for DirectoryStore {
    fn load(&self, uri: &StorageUri) -> Result<RawContent, RefgraphError> {
        let record = self.record_path(&uri.canonical())?;
        match uri.version() {
            Some(v) => {
                let history = Self::history_path(&record, v);
                if history.is_file() {
                    return Ok(RawContent::versioned(v, self.read(uri, &history)?));
                }
                // the newest version is only kept in the record itself
                if self.history_versions(&record).last().map(|n| n + 1) == Some(v) {
                    return Ok(RawContent::versioned(v, self.read(uri, &record)?));
                }
                Err(RefgraphError::load_failed(uri, "no such version"))
            }
            None => Ok(RawContent::new(self.read(uri, &record)?)),
        }
    }

    fn load_history(&self, uri: &StorageUri) -> Result<Vec<RawContent>, RefgraphError> {
        let record = self.record_path(&uri.canonical())?;
        let versions = self.history_versions(&record);
        let mut history = Vec::with_capacity(versions.len() + 1);
        for v in &versions {
            let body = self.read(uri, &Self::history_path(&record, *v))?;
            history.push(RawContent::versioned(*v, body));
        }
        let latest = self.read(uri, &record)?;
        history.push(match versions.last() {
            Some(v) => RawContent::versioned(v + 1, latest),
            None => RawContent::new(latest),
        });
        Ok(history)
    }
}

impl UriEnumerator for DirectoryStore {
    fn list_all(&self) -> Result<Vec<StorageUri>, RefgraphError> {
        let mut uris = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(2).sort_by_file_name() {
            let entry = entry.map_err(|e| RefgraphError::Io(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            let Some((scheme, rest)) = parts.split_first() else {
                continue;
            };
            let joined = rest.join("/");
            let Some(path) = joined.strip_suffix(RECORD_EXT) else {
                continue;
            };
            match StorageUri::parse(&format!("{}:/{}", scheme, path)) {
                // Versions live in history files, never in record names.
                Ok(uri) if !uri.is_canonical() => {
                    debug!(file = %entry.path().display(), "skipped versioned record name");
                }
                Ok(uri) => uris.push(uri),
                Err(err) => debug!(file = %entry.path().display(), error = %err, "skipped file"),
            }
        }
        Ok(uris)
    }
}

impl CollectionAccessor for DirectoryStore {
    fn list_elements(&self, uri: &StorageUri) -> Result<Vec<StorageUri>, RefgraphError> {
        list_from_body(uri, &self.latest_body(uri)?)
    }

    fn map_entries(&self, uri: &StorageUri) -> Result<BTreeMap<String, StorageUri>, RefgraphError> {
        map_from_body(uri, &self.latest_body(uri)?)
    }

    fn sequence_value(&self, uri: &StorageUri) -> Result<Option<i64>, RefgraphError> {
        Ok(sequence_from_body(&self.latest_body(uri)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_escaping_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DirectoryStore::open(dir.path()).expect("open");
        let uri = StorageUri::parse("docs:/../etc/passwd").expect("uri");
        assert!(store.record_path(&uri).is_err());
    }

    #[test]
    fn history_file_names() {
        let record = Path::new("/s/docs/T/a.o");
        assert_eq!(DirectoryStore::history_path(record, 3), PathBuf::from("/s/docs/T/a.o.v3"));
    }
}
