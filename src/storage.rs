//! Storage collaborators: where inputs come from and where outputs go.
//!
//! - [`FileArrival`]: yields inputs that are ready to read (see [`crate::watch::DirectoryPoller`])
//! - [`OutputSink`]: accepts finished outputs ([`DirectorySink`])
//! - [`ObjectStore`]: a flat key/bytes store with modification times ([`LocalObjectStore`])

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

use walkdir::WalkDir;

use crate::error::ProcessingResult;

/// An input that finished arriving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrivedFile {
    /// Path or object key; its extension selects the platform.
    pub id: String,
    /// Whole file contents.
    pub bytes: Vec<u8>,
}

/// Source of ready-to-process inputs.
///
/// Every yielded file is settled by the caller with either [`Self::complete`] or
/// [`Self::release`].
pub trait FileArrival {
    /// Next input that is fully written, or `None` when nothing else is ready right now.
    fn next_ready_file(&mut self) -> ProcessingResult<Option<ArrivedFile>>;

    /// `file` was handled; it is not yielded again unless it changes.
    fn complete(&mut self, _file: &ArrivedFile) {}

    /// `file` could not be handled; it is yielded again on a later round.
    fn release(&mut self, _file: &ArrivedFile) {}

    /// Block until new inputs may be ready, for at most `timeout`.
    fn wait(&mut self, timeout: Duration) {
        thread::sleep(timeout);
    }
}

/// Destination for finished outputs.
pub trait OutputSink {
    /// Store `bytes` under `name`, returning where it ended up.
    fn write(&self, name: &str, bytes: &[u8]) -> ProcessingResult<String>;
}

/// Writes outputs as files in a directory, creating the directory on first use.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// Create a sink writing into `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl OutputSink for DirectorySink {
    fn write(&self, name: &str, bytes: &[u8]) -> ProcessingResult<String> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        fs::write(&path, bytes)?;
        Ok(path.to_string_lossy().into_owned())
    }
}

/// Listing entry of an [`ObjectStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// `/`-separated key relative to the store root.
    pub key: String,
    /// Last modification time.
    pub last_modified: SystemTime,
    /// Size in bytes.
    pub size: u64,
}

/// Minimal object-store interface used by the on-demand handler.
pub trait ObjectStore {
    /// Every object in the store.
    fn list(&self) -> ProcessingResult<Vec<ObjectMeta>>;

    /// Contents of `key`.
    fn get(&self, key: &str) -> ProcessingResult<Vec<u8>>;

    /// Store `bytes` under `key`, replacing any previous object.
    fn put(&self, key: &str, bytes: &[u8]) -> ProcessingResult<()>;

    /// Most recently modified object, if any.
    fn latest(&self) -> ProcessingResult<Option<ObjectMeta>> {
        Ok(self.list()?.into_iter().max_by_key(|o| o.last_modified))
    }
}

/// An [`ObjectStore`] backed by a local directory tree (one "bucket" per root directory).
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Create a store rooted at `root`. The directory is created on first `put`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn path_of(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|part| !part.is_empty() && *part != "." && *part != "..")
            .fold(self.root.clone(), |p, part| p.join(part))
    }
}

impl ObjectStore for LocalObjectStore {
    fn list(&self) -> ProcessingResult<Vec<ObjectMeta>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let meta = entry.metadata().map_err(std::io::Error::from)?;
            let rel = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
            let key = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push(ObjectMeta {
                key,
                last_modified: meta.modified()?,
                size: meta.len(),
            });
        }
        Ok(out)
    }

    fn get(&self, key: &str) -> ProcessingResult<Vec<u8>> {
        Ok(fs::read(self.path_of(key))?)
    }

    fn put(&self, key: &str, bytes: &[u8]) -> ProcessingResult<()> {
        let path = self.path_of(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)?;
        Ok(())
    }
}

impl OutputSink for LocalObjectStore {
    fn write(&self, name: &str, bytes: &[u8]) -> ProcessingResult<String> {
        self.put(name, bytes)?;
        Ok(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn directory_sink_creates_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(tmp.path().join("out").join("nested"));
        let written = sink.write("a_processado.csv", b"x").unwrap();
        assert!(written.ends_with("a_processado.csv"));
        assert_eq!(fs::read(sink.dir().join("a_processado.csv")).unwrap(), b"x");
    }

    #[test]
    fn local_store_lists_nested_keys_and_latest() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(tmp.path());
        store.put("2024/jan.csv", b"old").unwrap();
        store.put("feb.xlsx", b"new").unwrap();

        let old = SystemTime::now() - Duration::from_secs(3600);
        fs::File::options()
            .write(true)
            .open(tmp.path().join("2024").join("jan.csv"))
            .unwrap()
            .set_modified(old)
            .unwrap();

        let mut keys: Vec<String> = store.list().unwrap().into_iter().map(|o| o.key).collect();
        keys.sort();
        assert_eq!(keys, vec!["2024/jan.csv", "feb.xlsx"]);
        assert_eq!(store.latest().unwrap().unwrap().key, "feb.xlsx");
        assert_eq!(store.get("2024/jan.csv").unwrap(), b"old");
    }

    #[test]
    fn missing_root_is_an_empty_store() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(tmp.path().join("absent"));
        assert!(store.list().unwrap().is_empty());
        assert!(store.latest().unwrap().is_none());
    }

    #[test]
    fn keys_cannot_escape_the_root() {
        let store = LocalObjectStore::new("/srv/bucket");
        assert_eq!(store.path_of("../etc/passwd"), PathBuf::from("/srv/bucket/etc/passwd"));
    }
}
