//! Collection definitions.
//!
//! A collection (a "subforum") is declared by one JSON file in the
//! collections directory. The file stem is the collection key:
//!
//! ```text
//! subforums/
//! ├── games.json           # key "games"
//! ├── vn.json              # key "vn"
//! └── data/
//!     ├── vn-posts.json    # referenced from vn.json "data"
//!     └── vn-extra.json    # referenced from vn.json "metadata"
//! ```
//!
//! ```json
//! {
//!   "title": "Visual Novels",
//!   "description": "Reviews and notes",
//!   "template": "vnTemplate",
//!   "data": ["data/vn-posts.json", "https://example.org/more.json"],
//!   "metadata": { "extra": "data/vn-extra.json" }
//! }
//! ```
//!
//! Only `template` is required. Data and metadata locations are either
//! `http(s)://` URLs or paths relative to the collections directory.

use crate::types::Post;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("cannot read collections directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot read collection definition {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed collection definition {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// One or many locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sources {
    One(String),
    Many(Vec<String>),
}

impl Default for Sources {
    fn default() -> Self {
        Sources::Many(Vec::new())
    }
}

impl Sources {
    pub fn as_slice(&self) -> &[String] {
        match self {
            Sources::One(location) => std::slice::from_ref(location),
            Sources::Many(locations) => locations,
        }
    }
}

/// A named metadata source: `"<type>": "<location>"`.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataSource {
    pub kind: String,
    pub location: String,
}

/// Ordered `metadata` map. JSON objects are order-preserving here so types
/// apply in the order the author wrote them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataSources(pub Vec<MetadataSource>);

impl<'de> Deserialize<'de> for MetadataSources {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = MetadataSources;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of metadata type to location")
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(MetadataSources::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut sources = Vec::new();
                while let Some((kind, location)) = map.next_entry::<String, String>()? {
                    sources.push(MetadataSource { kind, location });
                }
                Ok(MetadataSources(sources))
            }
        }

        deserializer.deserialize_any(OrderedVisitor)
    }
}

impl Serialize for MetadataSources {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for source in &self.0 {
            map.serialize_entry(&source.kind, &source.location)?;
        }
        map.end()
    }
}

/// A collection definition plus, once loaded, its posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    /// File stem of the definition, e.g. `"games"`.
    #[serde(skip)]
    pub key: String,
    /// Definition file relative to the collections directory, `/`-separated.
    #[serde(skip)]
    pub source_file: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Renderer name, e.g. `"vnTemplate"`.
    pub template: String,
    /// Base path for post links. Defaults to `/<key>`.
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub data: Sources,
    #[serde(default)]
    pub metadata: MetadataSources,
    /// Posts written directly into the definition file.
    #[serde(default, rename = "posts", skip_serializing)]
    pub inline_posts: Vec<Value>,
    /// Remaining fields (`banner`, `icon`, `created_at`, ...).
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    /// Loaded posts in declared order. Empty until the loader runs.
    #[serde(skip)]
    pub posts: Vec<Arc<Post>>,
}

impl Collection {
    /// Parse a definition, taking the key from the file stem.
    pub fn from_json(key: &str, source_file: &str, json: &str) -> Result<Self, serde_json::Error> {
        let mut collection: Collection = serde_json::from_str(json)?;
        collection.key = key.to_string();
        collection.source_file = source_file.to_string();
        Ok(collection)
    }

    /// Base path used to build post links.
    pub fn link(&self) -> String {
        match &self.link {
            Some(link) if !link.is_empty() => link.clone(),
            _ => format!("/{}", self.key),
        }
    }

    /// Free-form text field such as `banner` or `icon`.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Local (non-URL) data and metadata locations, `/`-normalized.
    pub fn local_sources(&self) -> impl Iterator<Item = String> + '_ {
        self.data
            .as_slice()
            .iter()
            .chain(self.metadata.0.iter().map(|m| &m.location))
            .filter(|location| !is_remote(location))
            .map(|location| normalize_relative(location))
    }
}

/// Whether a location is fetched over HTTP rather than read from disk.
pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Normalize a relative location to the form used in change snapshots:
/// `/`-separated with no leading `./` or `/`.
pub fn normalize_relative(location: &str) -> String {
    location
        .replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Load every `*.json` definition directly inside `dir`, sorted by key.
///
/// Data files live in subdirectories so they are not mistaken for
/// definitions. Any unreadable or malformed definition is fatal.
pub fn load_collections(dir: &Path) -> Result<Vec<Collection>, CollectionError> {
    let entries = fs::read_dir(dir).map_err(|source| CollectionError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| CollectionError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();

    files
        .into_iter()
        .map(|path| {
            let key = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let source_file = path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let json = fs::read_to_string(&path).map_err(|source| CollectionError::Read {
                path: path.clone(),
                source,
            })?;
            Collection::from_json(&key, &source_file, &json)
                .map_err(|source| CollectionError::Parse { path, source })
        })
        .collect()
}
