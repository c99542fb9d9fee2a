//! Output writers.
//!
//! Paths handed to a sink are site-relative (`games-2.html`,
//! `vn/tags/romance.html`). The orchestrator plans every path before
//! writing, so a sink never sees two concurrent writes to one path.

use log::warn;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("failed to write {path}: {source}")]
pub struct SinkError {
    pub path: String,
    pub source: io::Error,
}

/// Destination for generated files. Must be `Sync` for parallel writes.
pub trait FileSink: Sync {
    /// Write `contents` to `path`, creating parent directories and
    /// replacing any existing file.
    fn write(&self, path: &str, contents: &[u8]) -> io::Result<()>;
}

/// Writes under a root directory on disk. Paths that are absolute or climb
/// out with `..` are refused.
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileSink for FsSink {
    fn write(&self, path: &str, contents: &[u8]) -> io::Result<()> {
        let relative = Path::new(path);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a path inside {}", path, self.root.display()),
            ));
        }
        let target = self.root.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(target, contents)
    }
}

/// Keeps every write in memory. Used by `check` and by tests.
#[derive(Default)]
pub struct MemorySink {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of written files, sorted by path.
    pub fn files(&self) -> BTreeMap<String, Vec<u8>> {
        self.files.lock().map(|f| f.clone()).unwrap_or_default()
    }

    /// Contents of one file as text.
    pub fn read(&self, path: &str) -> Option<String> {
        let files = self.files.lock().ok()?;
        files
            .get(path)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

impl FileSink for MemorySink {
    fn write(&self, path: &str, contents: &[u8]) -> io::Result<()> {
        let mut files = self
            .files
            .lock()
            .map_err(|_| io::Error::other("memory sink poisoned"))?;
        files.insert(path.to_string(), contents.to_vec());
        Ok(())
    }
}

/// Write once, and once more if the first attempt fails.
pub fn write_with_retry(sink: &dyn FileSink, path: &str, contents: &[u8]) -> Result<(), SinkError> {
    if let Err(first) = sink.write(path, contents) {
        warn!("retrying write of {}: {}", path, first);
        sink.write(path, contents).map_err(|source| SinkError {
            path: path.to_string(),
            source,
        })?;
    }
    Ok(())
}
