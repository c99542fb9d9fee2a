//! Shared types used across all pipeline stages.
//!
//! A [`Post`] keeps the handful of fields the generator relies on as typed
//! values and carries everything else (author, date, content, flair, ...)
//! in a free-form JSON map, so a record survives load, metadata merge and
//! JSON output without losing collection-specific fields.

use crate::naming::FALLBACK_TITLE;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Field used to join metadata records onto posts.
pub const MATCH_KEY: &str = "title";

/// A reference to a tag or developer: either a bare name or an object
/// carrying a `name` plus arbitrary extra fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NameRef {
    Name(String),
    Record {
        name: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl NameRef {
    pub fn name(&self) -> &str {
        match self {
            NameRef::Name(name) => name,
            NameRef::Record { name, .. } => name,
        }
    }
}

/// An image reference: a bare URL or an object with a `url` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Media {
    Url(String),
    Record {
        #[serde(default)]
        url: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl Media {
    pub fn url(&self) -> &str {
        match self {
            Media::Url(url) => url,
            Media::Record { url, .. } => url,
        }
    }
}

impl Default for Media {
    fn default() -> Self {
        Media::Record {
            url: String::new(),
            extra: Map::new(),
        }
    }
}

/// A single content item within a collection.
///
/// `null` in any typed field is read as the field's default, matching how
/// hand-written data files leave optional values empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Site-relative path, e.g. `/games/foo-bar`. Unique within a collection.
    #[serde(default, deserialize_with = "null_as_default")]
    pub link: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<NameRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub developers: Vec<NameRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image: Media,
    #[serde(default, deserialize_with = "null_as_default")]
    pub screenshots: Vec<Media>,
    /// Collection-specific fields such as `author`, `date` or `content`.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Post {
    /// Decode a raw record, applying field defaults.
    ///
    /// An empty or whitespace-only title becomes [`FALLBACK_TITLE`]. The
    /// link is left as given; the loader assigns one when it is empty.
    pub fn from_record(record: Map<String, Value>) -> Result<Self, serde_json::Error> {
        let mut post: Post = serde_json::from_value(Value::Object(record))?;
        if post.title.trim().is_empty() {
            post.title = FALLBACK_TITLE.to_string();
        }
        Ok(post)
    }

    /// Free-form text field. Numbers and booleans are rendered as text;
    /// empty strings count as absent.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Value of a field for matching purposes. Typed fields are exposed
    /// under their JSON names.
    pub fn field_value(&self, key: &str) -> Option<Value> {
        match key {
            "title" => Some(Value::String(self.title.clone())),
            "link" => Some(Value::String(self.link.clone())),
            _ => self.fields.get(key).cloned(),
        }
    }

    /// Shallow-merge `record` onto this post, record values winning.
    ///
    /// The `link` is the post's identity once loaded and is never replaced.
    /// If the merged result no longer decodes (say, `tags` overwritten with a
    /// number) the post is left untouched and the error returned.
    pub fn overlay(&mut self, record: &Map<String, Value>) -> Result<(), serde_json::Error> {
        let mut merged = match serde_json::to_value(&*self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in record {
            if key != "link" {
                merged.insert(key.clone(), value.clone());
            }
        }
        let mut next = Post::from_record(merged)?;
        next.link = self.link.clone();
        *self = next;
        Ok(())
    }

    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(NameRef::name)
    }

    pub fn developer_names(&self) -> impl Iterator<Item = &str> {
        self.developers.iter().map(NameRef::name)
    }
}
