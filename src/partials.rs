//! HTML partials and page assembly.
//!
//! Every `*.html` file in the partials directory is loaded by file stem:
//!
//! | Partial       | Role                                                  |
//! |---------------|-------------------------------------------------------|
//! | `base`        | Page skeleton. Required.                              |
//! | `head`        | `<head>` contents with per-page metadata placeholders |
//! | `header`      | Site header                                           |
//! | `footer`      | Site footer                                           |
//! | `aside`       | Sidebar                                               |
//! | `index`, `404`| Written verbatim as `index.html` and `404.html`       |
//!
//! `base` may contain `{{head}}`, `{{header}}`, `{{main}}`, `{{footer}}`,
//! `{{aside}}`, `{{canonicalUrl}}` and `{{title}}`; `head` may contain
//! `{{title}}`, `{{description}}`, `{{canonicalUrl}}` and `{{image}}`.
//! Substitution is a single pass over the template: text inserted for a
//! placeholder is never scanned again, so a post whose body happens to
//! contain `{{title}}` is written as-is. Unknown placeholders are left in
//! place. [`PageMeta`] values are HTML-escaped; `main` is inserted raw.

use log::debug;
use maud::html;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Partials written verbatim to the site root as `<name>.html`.
pub const SPECIAL_PAGES: &[&str] = &["index", "404"];

#[derive(Error, Debug)]
pub enum PartialsError {
    #[error("cannot read partials from {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("required partial \"{name}\" not found in {dir}")]
    Missing { name: String, dir: PathBuf },
}

/// Per-page values substituted into the `head` and `base` partials.
#[derive(Debug, Clone, Default)]
pub struct PageMeta {
    pub title: String,
    pub description: String,
    pub canonical_url: String,
    pub image: String,
}

#[derive(Debug, Clone, Default)]
pub struct PartialStore {
    partials: HashMap<String, String>,
}

impl PartialStore {
    /// Load every `*.html` file in `dir`. Fails if `base.html` is absent.
    pub fn load(dir: &Path) -> Result<Self, PartialsError> {
        let io_err = |source| PartialsError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut partials = HashMap::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != "html") {
                continue;
            }
            let Some(name) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            let content = fs::read_to_string(&path).map_err(|source| PartialsError::Io {
                path: path.clone(),
                source,
            })?;
            debug!("loaded partial {}", name);
            partials.insert(name, content);
        }
        if !partials.contains_key("base") {
            return Err(PartialsError::Missing {
                name: "base".into(),
                dir: dir.to_path_buf(),
            });
        }
        Ok(Self { partials })
    }

    /// Build a store from in-memory fragments.
    pub fn from_map(partials: HashMap<String, String>) -> Self {
        Self { partials }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.partials.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.partials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partials.is_empty()
    }

    /// Wrap `main` in the site skeleton.
    pub fn full_page(&self, main: &str, meta: &PageMeta) -> String {
        let title = escape(&meta.title);
        let canonical_url = escape(&meta.canonical_url);
        let head = substitute(
            self.get("head").unwrap_or(""),
            &[
                ("title", &title),
                ("description", &escape(&meta.description)),
                ("canonicalUrl", &canonical_url),
                ("image", &escape(&meta.image)),
            ],
        );
        substitute(
            self.get("base").unwrap_or("{{main}}"),
            &[
                ("head", &head),
                ("header", self.get("header").unwrap_or("")),
                ("main", main),
                ("footer", self.get("footer").unwrap_or("")),
                ("aside", self.get("aside").unwrap_or("")),
                ("canonicalUrl", &canonical_url),
                ("title", &title),
            ],
        )
    }
}

fn escape(text: &str) -> String {
    html! { (text) }.into_string()
}

/// Replace `{{name}}` placeholders in one pass.
pub fn substitute(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = after[..end].trim();
        match values.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}
