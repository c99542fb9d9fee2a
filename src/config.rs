//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. The file lives in
//! the project root next to the `partials/` and `subforums/` directories:
//!
//! ```text
//! site/
//! ├── config.toml              # Overrides stock defaults
//! ├── partials/                # base.html, head.html, header.html, ...
//! ├── subforums/               # one <key>.json per collection, plus data files
//! └── mtime.json               # change snapshot, written after each build
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! base_url = "https://yuushaexa.github.io/"
//!
//! [paths]
//! partials = "partials"
//! collections = "subforums"
//! output = "public"
//! snapshot = "mtime.json"
//!
//! [pagination]
//! page_size = 10
//!
//! [aliases]
//! root = "vn"
//! tags_label = "Visual Novels"
//! developers_label = "Company"
//! subject = "visual novels"
//!
//! [related]
//! limit = 5
//!
//! [fetch]
//! timeout_secs = 30
//!
//! [output]
//! json = false
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Config files are sparse: override just the values you want. Unknown keys
//! are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute URL prefix for canonical links, feeds and listings. Must end with `/`.
    pub base_url: String,
    /// Input and output locations, relative to the project root.
    pub paths: PathsConfig,
    /// Listing page size.
    pub pagination: PaginationConfig,
    /// Tag and developer alias pages.
    pub aliases: AliasConfig,
    /// Related-post discovery on post pages.
    pub related: RelatedConfig,
    /// Remote source fetching.
    pub fetch: FetchConfig,
    /// Optional extra artifacts.
    pub output: OutputConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://yuushaexa.github.io/".to_string(),
            paths: PathsConfig::default(),
            pagination: PaginationConfig::default(),
            aliases: AliasConfig::default(),
            related: RelatedConfig::default(),
            fetch: FetchConfig::default(),
            output: OutputConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_url.ends_with('/') {
            return Err(ConfigError::Validation(
                "base_url must end with '/'".into(),
            ));
        }
        if self.pagination.page_size == 0 {
            return Err(ConfigError::Validation(
                "pagination.page_size must be greater than 0".into(),
            ));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "fetch.timeout_secs must be greater than 0".into(),
            ));
        }
        if self.aliases.root.trim_matches('/').is_empty() {
            return Err(ConfigError::Validation(
                "aliases.root must not be empty".into(),
            ));
        }
        if self.aliases.tags_label.is_empty()
            || self.aliases.developers_label.is_empty()
            || self.aliases.subject.is_empty()
        {
            return Err(ConfigError::Validation(
                "aliases labels must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Input and output locations. Relative paths resolve against the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Directory of `*.html` partial fragments.
    pub partials: String,
    /// Directory of collection definitions (`<key>.json`) and local data files.
    pub collections: String,
    /// Directory the generated site is written to.
    pub output: String,
    /// File holding the mtime snapshot used by incremental builds.
    pub snapshot: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            partials: "partials".to_string(),
            collections: "subforums".to_string(),
            output: "public".to_string(),
            snapshot: "mtime.json".to_string(),
        }
    }
}

/// Fully-resolved filesystem locations for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePaths {
    pub partials: PathBuf,
    pub collections: PathBuf,
    pub output: PathBuf,
    pub snapshot: PathBuf,
}

impl PathsConfig {
    /// Join every configured path onto the project root.
    pub fn resolve(&self, root: &Path) -> SitePaths {
        SitePaths {
            partials: root.join(&self.partials),
            collections: root.join(&self.collections),
            output: root.join(&self.output),
            snapshot: root.join(&self.snapshot),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaginationConfig {
    /// Posts per listing page.
    pub page_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { page_size: 10 }
    }
}

/// Tag and developer alias pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AliasConfig {
    /// Output directory holding `tags/` and `developers/`.
    pub root: String,
    /// Title suffix for tag pages, e.g. `"Romance - Visual Novels"`.
    pub tags_label: String,
    /// Title suffix for developer pages, e.g. `"Key - Company"`.
    pub developers_label: String,
    /// What the pages list, used in descriptions: `"All visual novels related to Key"`.
    pub subject: String,
}

impl Default for AliasConfig {
    fn default() -> Self {
        Self {
            root: "vn".to_string(),
            tags_label: "Visual Novels".to_string(),
            developers_label: "Company".to_string(),
            subject: "visual novels".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelatedConfig {
    /// Maximum related posts shown on a post page. `0` disables the section.
    pub limit: usize,
}

impl Default for RelatedConfig {
    fn default() -> Self {
        Self { limit: 5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Per-request timeout for `http(s)://` sources.
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Also write `<link>.json` per post and `<key>.json` per collection.
    pub json: bool,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers for fetching and rendering.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# forum-ssg configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Absolute URL prefix used for canonical links, feeds and listings.
# Must end with a slash.
base_url = "https://yuushaexa.github.io/"

# ---------------------------------------------------------------------------
# Paths (relative to the directory holding this file)
# ---------------------------------------------------------------------------
[paths]
# HTML fragments: base.html is required; head, header, footer, aside,
# index and 404 are optional.
partials = "partials"

# Collection definitions (<key>.json) and their local data files.
collections = "subforums"

# Where the generated site is written.
output = "public"

# Source mtime snapshot used by `build --incremental`.
snapshot = "mtime.json"

# ---------------------------------------------------------------------------
# Pagination
# ---------------------------------------------------------------------------
[pagination]
# Posts per listing page (collections, tags and developers).
page_size = 10

# ---------------------------------------------------------------------------
# Tag and developer pages
# ---------------------------------------------------------------------------
[aliases]
# Output directory for tags/ and developers/.
root = "vn"

# Page title suffixes.
tags_label = "Visual Novels"
developers_label = "Company"

# Used in page descriptions: "All visual novels related to Key".
subject = "visual novels"

# ---------------------------------------------------------------------------
# Related posts
# ---------------------------------------------------------------------------
[related]
# Maximum related posts per post page. 0 disables the section.
limit = 5

# ---------------------------------------------------------------------------
# Remote sources
# ---------------------------------------------------------------------------
[fetch]
# Timeout for http(s) data and metadata sources.
timeout_secs = 30

# ---------------------------------------------------------------------------
# Extra artifacts
# ---------------------------------------------------------------------------
[output]
# Write <link>.json per post and <key>.json per collection.
json = false

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for fetching and rendering.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
