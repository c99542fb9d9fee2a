//! Shared test utilities for the forum-ssg test suite.
//!
//! Provides post and collection builders, a scripted [`Fetcher`], a copy of
//! the sample site in `fixtures/site/`, and lookup helpers that panic with a
//! clear message on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let sink = MemorySink::new();
//! let report = build_fixture(tmp.path(), &sink, BuildMode::Full).unwrap();
//!
//! let page = read_output(&sink, "vn.html");
//! assert!(page.contains("Clannad"));
//! ```

use crate::collection::Collection;
use crate::config::load_config;
use crate::fetch::{FetchError, Fetcher, SourceFetcher};
use crate::generate::{BuildContext, BuildMode, BuildReport, GenerateError, build};
use crate::render::Templates;
use crate::sink::MemorySink;
use crate::types::{NameRef, Post};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

// =========================================================================
// Builders
// =========================================================================

/// A post with the given title, link, tags and developers.
pub fn post(title: &str, link: &str, tags: &[&str], developers: &[&str]) -> Post {
    let names = |list: &[&str]| -> Vec<NameRef> {
        list.iter().map(|n| NameRef::Name(n.to_string())).collect()
    };
    Post {
        title: title.to_string(),
        link: link.to_string(),
        tags: names(tags),
        developers: names(developers),
        image: Default::default(),
        screenshots: Vec::new(),
        fields: Default::default(),
    }
}

/// A collection with no sources, keyed and titled `key`.
pub fn collection(key: &str, template: &str) -> Collection {
    let json = format!(r#"{{"title": "{key}", "template": "{template}"}}"#);
    Collection::from_json(key, &format!("{key}.json"), &json).unwrap()
}

// =========================================================================
// Scripted fetcher
// =========================================================================

enum Response {
    Body(String),
    Status(u16),
}

/// Answers fetches from a fixed table and records every request.
/// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: HashMap<String, Response>,
    pub requests: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, location: &str, body: &str) -> Self {
        self.responses
            .insert(location.to_string(), Response::Body(body.to_string()));
        self
    }

    pub fn status(mut self, location: &str, status: u16) -> Self {
        self.responses
            .insert(location.to_string(), Response::Status(status));
        self
    }
}

impl Fetcher for ScriptedFetcher {
    fn fetch(&self, location: &str) -> Result<String, FetchError> {
        self.requests.lock().unwrap().push(location.to_string());
        match self.responses.get(location) {
            Some(Response::Body(body)) => Ok(body.clone()),
            Some(Response::Status(status)) => Err(FetchError::Status {
                url: location.to_string(),
                status: *status,
            }),
            None => Err(FetchError::Io {
                path: location.into(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        }
    }
}

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

/// Build the project at `root` into `sink` with its own `config.toml` and
/// local sources, saving the snapshot like a real build.
pub fn build_fixture(
    root: &Path,
    sink: &MemorySink,
    mode: BuildMode,
) -> Result<BuildReport, GenerateError> {
    let config = load_config(root).unwrap();
    let paths = config.paths.resolve(root);
    let templates = Templates::builtin(&config.aliases.root);
    let fetcher = SourceFetcher::new(&paths.collections, Duration::from_secs(5)).unwrap();
    build(
        &BuildContext {
            config: &config,
            paths: &paths,
            templates: &templates,
            fetcher: &fetcher,
            sink,
            persist_snapshot: true,
        },
        mode,
    )
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Output lookups: panics with a clear message on miss
// =========================================================================

/// Text of a written file. Panics if it was not written.
pub fn read_output(sink: &MemorySink, path: &str) -> String {
    sink.read(path).unwrap_or_else(|| {
        let written: Vec<String> = sink.files().into_keys().collect();
        panic!("'{path}' was not written. Written: {written:?}")
    })
}

/// Find a collection by key. Panics if not found.
pub fn find_collection<'a>(collections: &'a [Collection], key: &str) -> &'a Collection {
    collections.iter().find(|c| c.key == key).unwrap_or_else(|| {
        let keys: Vec<&str> = collections.iter().map(|c| c.key.as_str()).collect();
        panic!("collection '{key}' not found. Available: {keys:?}")
    })
}
