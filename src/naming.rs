//! URL slugs and title keys.
//!
//! Every generated page path goes through [`normalize`], so two titles that
//! differ only in case, spacing or punctuation map to the same base slug.
//!
//! ## Slug modes
//!
//! - [`SlugMode::Unique`] hands out each base slug once per build. Later
//!   requests for the same base get `-2`, `-3`, ... appended:
//!   `"Foo Bar"` → `foo-bar`, `"foo  bar!"` → `foo-bar-2`.
//! - [`SlugMode::Stable`] always returns the base slug. Tag and developer
//!   pages use it so that `"Romance"` and `"romance "` share one page.
//!
//! The counters live in a [`SlugGenerator`] owned by a single build, never in
//! process-wide state.

use std::collections::{HashMap, HashSet};

/// Title given to posts that have none.
pub const FALLBACK_TITLE: &str = "Default Title";

/// Maximum length of a base slug, in characters.
pub const MAX_SLUG_LEN: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugMode {
    Unique,
    Stable,
}

/// Normalize text into a base slug.
///
/// - `"Foo Bar"` → `"foo-bar"`
/// - `"  Hello,   World! "` → `"hello-world"`
/// - `"a--b"` → `"a-b"`
/// - `""` → `"default-title"`
pub fn normalize(text: &str) -> String {
    let slug = slugify(text);
    if slug.is_empty() {
        slugify(FALLBACK_TITLE)
    } else {
        slug
    }
}

fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        let c = if c.is_whitespace() { '-' } else { c };
        if !(c.is_alphanumeric() || c == '-' || c == '_') {
            continue;
        }
        if c == '-' && (out.is_empty() || out.ends_with('-')) {
            continue;
        }
        out.push(c);
    }
    let truncated: String = out.trim_matches('-').chars().take(MAX_SLUG_LEN).collect();
    truncated.trim_end_matches('-').to_string()
}

/// Per-build slug allocator.
#[derive(Debug, Default)]
pub struct SlugGenerator {
    counts: HashMap<String, usize>,
    issued: HashSet<String>,
}

impl SlugGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce a slug for `text`.
    ///
    /// In `Unique` mode the result is guaranteed distinct from every slug this
    /// generator has issued before, including ones that happen to look like
    /// suffixed variants (`"Foo 2"` followed by two `"Foo"`s yields `foo-2`,
    /// `foo`, `foo-3`).
    pub fn slug(&mut self, text: &str, mode: SlugMode) -> String {
        let base = normalize(text);
        if mode == SlugMode::Stable {
            return base;
        }
        let count = self.counts.entry(base.clone()).or_insert(0);
        loop {
            *count += 1;
            let candidate = if *count == 1 {
                base.clone()
            } else {
                format!("{}-{}", base, count)
            };
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    /// Forget every slug issued so far.
    pub fn reset(&mut self) {
        self.counts.clear();
        self.issued.clear();
    }
}

/// Reserved page name inside each alias directory.
pub const ALIAS_INDEX: &str = "index";

/// Slug of a tag or developer page.
///
/// Alias pages share a directory with its `index.html` and with the
/// numbered pages of every other name, so a slug equal to `index` or ending
/// in `-<digits>` gets a trailing `_`: `"Index"` → `index_`,
/// `"Foo 2"` → `foo-2_`. Everything else is the plain [`normalize`] result.
pub fn alias_slug(name: &str) -> String {
    let base = normalize(name);
    let numbered = base
        .rsplit_once('-')
        .is_some_and(|(_, tail)| !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()));
    if numbered || base == ALIAS_INDEX {
        format!("{}_", base)
    } else {
        base
    }
}

/// Grouping key for a title: its first word, lower-cased, with surrounding
/// punctuation removed. `"Foo: Part 2"` → `"foo"`.
pub fn first_word_key(title: &str) -> String {
    title
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .find(|w| !w.is_empty())
        .unwrap_or("")
        .to_lowercase()
}

/// Comparison key for deduplicating titles: lower-case words joined by a
/// single space. `"  Foo   BAR "` and `"foo bar"` compare equal.
pub fn title_key(title: &str) -> String {
    title
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a key into its non-digit prefix and trailing number.
///
/// - `"episode10"` → `("episode", Some(10))`
/// - `"episode"` → `("episode", None)`
/// - `"2024"` → `("", Some(2024))`
pub fn split_trailing_number(key: &str) -> (&str, Option<u64>) {
    let digits = key.len() - key.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return (key, None);
    }
    let (prefix, number) = key.split_at(key.len() - digits);
    (prefix, number.parse().ok())
}
