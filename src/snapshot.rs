//! Source-file change detection for incremental builds.
//!
//! The snapshot maps each source file (relative to the collections
//! directory, `/`-separated) to its modification time, and each collection
//! key to the post links it was last rendered with:
//!
//! ```json
//! {
//!   "files": {
//!     "games.json": "2024-03-01T10:22:31.412Z",
//!     "data/vn-posts.json": "2024-03-02T08:00:00.000Z"
//!   },
//!   "links": {
//!     "games": ["/games/outer-wilds", "/games/hollow-knight"]
//!   }
//! }
//! ```
//!
//! A flat `{file: mtime}` object is still accepted and reads as a snapshot
//! with no links.
//!
//! Times are compared as strings; any difference counts as a change, even
//! a clock moving backwards. A file missing from the old snapshot is
//! changed, and a file that disappeared is reported as removed and dropped
//! from the new snapshot.
//!
//! Generated links draw from one slug sequence for the whole site, so an
//! edit in one collection can renumber the links of another. Comparing the
//! recorded links catches those collections too.
//!
//! The snapshot is written only after a build succeeds, so a failed build
//! is retried in full on the next incremental run.

use crate::collection::Collection;
use chrono::{DateTime, SecondsFormat, Utc};
use log::warn;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;
use walkdir::WalkDir;

/// Persisted source mtimes and post links from the last successful build.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChangeSnapshot {
    #[serde(rename = "files")]
    pub entries: BTreeMap<String, String>,
    #[serde(default)]
    pub links: BTreeMap<String, Vec<String>>,
}

impl ChangeSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a snapshot. Returns an empty snapshot if the file doesn't exist
    /// or can't be parsed, which makes every source count as changed.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        match serde_json::from_str(&content) {
            Ok(snapshot) => snapshot,
            Err(e) => match serde_json::from_str(&content) {
                Ok(entries) => Self {
                    entries,
                    links: BTreeMap::new(),
                },
                Err(_) => {
                    warn!("ignoring unreadable snapshot {}: {}", path.display(), e);
                    Self::empty()
                }
            },
        }
    }

    /// Save atomically: write a sibling temp file, then rename over the target.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record the post links of every collection, replacing earlier ones.
    pub fn record_links(&mut self, collections: &[Collection]) {
        self.links = collections
            .iter()
            .map(|c| {
                let links = c.posts.iter().map(|p| p.link.clone()).collect();
                (c.key.clone(), links)
            })
            .collect();
    }
}

/// Result of comparing the collections directory against a snapshot.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    /// Files that are new or whose mtime string differs.
    pub changed: Vec<String>,
    /// Files present in the old snapshot but gone now.
    pub removed: Vec<String>,
    /// Snapshot of the current state, to persist after a successful build.
    pub current: ChangeSnapshot,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }

    /// Keys of collections whose definition or local sources changed.
    ///
    /// Remote sources are not tracked and never mark a collection dirty.
    pub fn affected_collections(&self, collections: &[Collection]) -> BTreeSet<String> {
        let touched: BTreeSet<&str> = self
            .changed
            .iter()
            .chain(&self.removed)
            .map(String::as_str)
            .collect();
        collections
            .iter()
            .filter(|c| {
                touched.contains(c.source_file.as_str())
                    || c.local_sources().any(|s| touched.contains(s.as_str()))
            })
            .map(|c| c.key.clone())
            .collect()
    }

    /// Keys of collections whose recorded links in `current` differ from
    /// `previous`. A collection `previous` knows nothing about is skipped;
    /// it is new, so its files show up as changed anyway.
    pub fn relinked_collections(&self, previous: &ChangeSnapshot) -> BTreeSet<String> {
        self.current
            .links
            .iter()
            .filter(|(key, links)| previous.links.get(*key).is_some_and(|old| old != *links))
            .map(|(key, _)| key.clone())
            .collect()
    }
}

/// Format a modification time as ISO-8601 UTC with millisecond precision.
pub fn format_mtime(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Scan every `*.json` file under `dir` and record its mtime.
pub fn scan_mtimes(dir: &Path) -> io::Result<ChangeSnapshot> {
    let mut entries = BTreeMap::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(io::Error::other)?;
        if !entry.file_type().is_file()
            || entry.path().extension().is_none_or(|ext| ext != "json")
        {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let modified = entry.metadata().map_err(io::Error::other)?.modified()?;
        entries.insert(relative, format_mtime(modified));
    }
    Ok(ChangeSnapshot {
        entries,
        links: BTreeMap::new(),
    })
}

/// Compare the current state of `dir` with `previous`.
pub fn changed_sources(dir: &Path, previous: &ChangeSnapshot) -> io::Result<ChangeSet> {
    let current = scan_mtimes(dir)?;
    let changed = current
        .entries
        .iter()
        .filter(|(file, mtime)| previous.entries.get(*file) != Some(*mtime))
        .map(|(file, _)| file.clone())
        .collect();
    let removed = previous
        .entries
        .keys()
        .filter(|file| !current.entries.contains_key(*file))
        .cloned()
        .collect();
    Ok(ChangeSet {
        changed,
        removed,
        current,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::post;
    use std::sync::Arc;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    fn set_mtime(path: &Path, secs: u64) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(UNIX_EPOCH + Duration::from_secs(secs)).unwrap();
    }

    fn collection(key: &str, json: &str) -> Collection {
        Collection::from_json(key, &format!("{key}.json"), json).unwrap()
    }

    // =========================================================================
    // Formatting and scanning
    // =========================================================================

    #[test]
    fn format_mtime_is_iso_millis_utc() {
        let t = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        assert_eq!(format_mtime(t), "2023-11-14T22:13:20.123Z");
    }

    #[test]
    fn scan_finds_nested_json_only() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("data/deep")).unwrap();
        fs::write(tmp.path().join("games.json"), "{}").unwrap();
        fs::write(tmp.path().join("data/deep/posts.json"), "[]").unwrap();
        fs::write(tmp.path().join("readme.md"), "x").unwrap();

        let snapshot = scan_mtimes(tmp.path()).unwrap();
        let keys: Vec<&str> = snapshot.entries.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["data/deep/posts.json", "games.json"]);
    }

    // =========================================================================
    // Change detection
    // =========================================================================

    #[test]
    fn everything_changed_against_empty_snapshot() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.json"), "{}").unwrap();
        fs::write(tmp.path().join("b.json"), "{}").unwrap();

        let changes = changed_sources(tmp.path(), &ChangeSnapshot::empty()).unwrap();
        assert_eq!(changes.changed, vec!["a.json", "b.json"]);
        assert!(changes.removed.is_empty());
    }

    #[test]
    fn second_run_after_save_is_empty() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("subforums");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("a.json"), "{}").unwrap();
        let snap_path = tmp.path().join("mtime.json");

        let first = changed_sources(&src, &ChangeSnapshot::load(&snap_path)).unwrap();
        assert!(!first.is_empty());
        first.current.save(&snap_path).unwrap();

        let second = changed_sources(&src, &ChangeSnapshot::load(&snap_path)).unwrap();
        assert!(second.is_empty(), "{:?}", second.changed);
    }

    #[test]
    fn any_mtime_difference_is_a_change() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.json");
        fs::write(&file, "{}").unwrap();
        set_mtime(&file, 2_000_000);
        let before = scan_mtimes(tmp.path()).unwrap();

        // Moving the clock backwards still counts.
        set_mtime(&file, 1_000_000);
        let changes = changed_sources(tmp.path(), &before).unwrap();
        assert_eq!(changes.changed, vec!["a.json"]);
    }

    #[test]
    fn deleted_files_reported_and_dropped() {
        let tmp = TempDir::new().unwrap();
        let mut previous = ChangeSnapshot::empty();
        previous
            .entries
            .insert("gone.json".into(), "2020-01-01T00:00:00.000Z".into());

        let changes = changed_sources(tmp.path(), &previous).unwrap();
        assert_eq!(changes.removed, vec!["gone.json"]);
        assert!(changes.current.is_empty());
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    #[test]
    fn load_missing_or_corrupt_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(ChangeSnapshot::load(&tmp.path().join("none.json")).is_empty());

        let corrupt = tmp.path().join("bad.json");
        fs::write(&corrupt, "{{{").unwrap();
        assert!(ChangeSnapshot::load(&corrupt).is_empty());
    }

    #[test]
    fn save_writes_files_and_links_and_no_temp_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("mtime.json");
        let mut snapshot = ChangeSnapshot::empty();
        snapshot
            .entries
            .insert("a.json".into(), "2024-01-02T03:04:05.678Z".into());
        snapshot
            .links
            .insert("a".into(), vec!["/a/foo".into(), "/a/bar".into()]);
        snapshot.save(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["files"]["a.json"], "2024-01-02T03:04:05.678Z");
        assert_eq!(raw["links"]["a"][1], "/a/bar");
        assert!(!tmp.path().join("mtime.json.tmp").exists());
        assert_eq!(ChangeSnapshot::load(&path), snapshot);
    }

    #[test]
    fn flat_snapshot_still_loads() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("mtime.json");
        fs::write(&path, r#"{"a.json": "2024-01-02T03:04:05.678Z"}"#).unwrap();

        let snapshot = ChangeSnapshot::load(&path);
        assert_eq!(snapshot.entries["a.json"], "2024-01-02T03:04:05.678Z");
        assert!(snapshot.links.is_empty());
    }

    // =========================================================================
    // Collection selection
    // =========================================================================

    #[test]
    fn affected_by_definition_or_local_source() {
        let games = collection("games", r#"{"template":"t","data":"data/games.json"}"#);
        let vn = collection(
            "vn",
            r#"{"template":"t","data":"https://h/vn.json","metadata":{"m":"data/vn-meta.json"}}"#,
        );
        let other = collection("other", r#"{"template":"t"}"#);
        let all = vec![games, vn, other];

        let changes = ChangeSet {
            changed: vec!["data/vn-meta.json".into(), "games.json".into()],
            ..ChangeSet::default()
        };
        let affected: Vec<String> = changes.affected_collections(&all).into_iter().collect();
        assert_eq!(affected, vec!["games", "vn"]);
    }

    #[test]
    fn removed_source_marks_collection() {
        let games = collection("games", r#"{"template":"t","data":"./data/games.json"}"#);
        let changes = ChangeSet {
            removed: vec!["data/games.json".into()],
            ..ChangeSet::default()
        };
        assert!(changes.affected_collections(&[games]).contains("games"));
    }

    #[test]
    fn renumbered_links_mark_collection() {
        let mut previous = ChangeSnapshot::empty();
        previous.links.insert("alpha".into(), vec!["/alpha/other".into()]);
        previous.links.insert("beta".into(), vec!["/beta/hello".into()]);

        let mut changes = ChangeSet::default();
        changes
            .current
            .links
            .insert("alpha".into(), vec!["/alpha/other".into(), "/alpha/hello".into()]);
        changes.current.links.insert("beta".into(), vec!["/beta/hello-2".into()]);
        changes.current.links.insert("gamma".into(), vec!["/gamma/new".into()]);

        let relinked: Vec<String> = changes.relinked_collections(&previous).into_iter().collect();
        assert_eq!(relinked, vec!["alpha", "beta"]);
    }

    #[test]
    fn record_links_follows_post_order() {
        let mut games = collection("games", r#"{"template":"t"}"#);
        games.posts = vec![
            Arc::new(post("B", "/games/b", &[], &[])),
            Arc::new(post("A", "/games/a", &[], &[])),
        ];
        let mut snapshot = ChangeSnapshot::empty();
        snapshot.record_links(&[games]);
        assert_eq!(snapshot.links["games"], vec!["/games/b", "/games/a"]);
    }
}
