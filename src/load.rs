//! Loading posts for a collection.
//!
//! Loading runs in two phases so that network and disk reads can overlap
//! while everything order-sensitive stays deterministic:
//!
//! 1. [`fetch_sources`] reads the collection's data and metadata sources in
//!    parallel. A source that can't be read or parsed contributes nothing
//!    and logs a warning; it never fails the build.
//! 2. [`assemble`] decodes records into posts, fills defaults, assigns links
//!    through the build's [`SlugGenerator`], and merges metadata type by
//!    type. The orchestrator calls it for one collection at a time in key
//!    order, so slug suffixes don't depend on which fetch finished first.
//!
//! Record order is inline `posts` first, then each `data` source in the
//! order declared.

use crate::collection::Collection;
use crate::fetch::{FetchError, Fetcher};
use crate::metadata;
use crate::naming::{SlugGenerator, SlugMode};
use crate::render::Renderer;
use crate::types::{MATCH_KEY, Post};
use log::{debug, warn};
use rayon::prelude::*;
use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;

pub type Record = Map<String, Value>;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("{location} is not valid JSON: {source}")]
    Json {
        location: String,
        source: serde_json::Error,
    },
    #[error("{location} is not a JSON array")]
    NotArray { location: String },
}

/// Raw records of one collection, before decoding.
#[derive(Debug, Clone, Default)]
pub struct FetchedSources {
    pub records: Vec<Record>,
    /// `(metadata type, records)` in declared order.
    pub metadata: Vec<(String, Vec<Record>)>,
    /// Locations that were skipped.
    pub failed: Vec<String>,
}

/// Read one location as an array of records.
///
/// Array elements that are not objects are skipped with a warning.
pub fn read_source(fetcher: &dyn Fetcher, location: &str) -> Result<Vec<Record>, SourceError> {
    let text = fetcher.fetch(location)?;
    let value: Value = serde_json::from_str(&text).map_err(|source| SourceError::Json {
        location: location.to_string(),
        source,
    })?;
    let Value::Array(items) = value else {
        return Err(SourceError::NotArray {
            location: location.to_string(),
        });
    };
    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match item {
            Value::Object(record) => Some(record),
            other => {
                warn!("{}: skipping entry {} (not an object: {})", location, i, other);
                None
            }
        })
        .collect())
}

fn read_or_skip(
    fetcher: &dyn Fetcher,
    collection: &str,
    location: &str,
) -> Result<Vec<Record>, String> {
    read_source(fetcher, location).map_err(|e| {
        warn!("[{}] skipping source: {}", collection, e);
        location.to_string()
    })
}

/// Phase 1: read every data and metadata source of `collection`.
pub fn fetch_sources(collection: &Collection, fetcher: &dyn Fetcher) -> FetchedSources {
    let data: Vec<Result<Vec<Record>, String>> = collection
        .data
        .as_slice()
        .par_iter()
        .map(|location| read_or_skip(fetcher, &collection.key, location))
        .collect();
    let metadata: Vec<(String, Result<Vec<Record>, String>)> = collection
        .metadata
        .0
        .par_iter()
        .map(|source| {
            (
                source.kind.clone(),
                read_or_skip(fetcher, &collection.key, &source.location),
            )
        })
        .collect();

    let mut fetched = FetchedSources::default();
    for (i, item) in collection.inline_posts.iter().enumerate() {
        match item {
            Value::Object(record) => fetched.records.push(record.clone()),
            other => warn!("[{}] skipping inline post {} (not an object: {})", collection.key, i, other),
        }
    }
    for result in data {
        match result {
            Ok(records) => fetched.records.extend(records),
            Err(location) => fetched.failed.push(location),
        }
    }
    for (kind, result) in metadata {
        match result {
            Ok(records) => fetched.metadata.push((kind, records)),
            Err(location) => {
                fetched.failed.push(location);
                fetched.metadata.push((kind, Vec::new()));
            }
        }
    }
    fetched
}

/// Decode records into posts and assign links.
///
/// Posts without a link get `renderer.post_link(collection link, slug)`
/// where the slug comes from the title in `Unique` mode. Every link, given
/// or generated, is passed through [`clean_link`] so no page lands outside
/// the output directory. A link already
/// used in this collection (given explicitly or generated) is suffixed
/// `-2`, `-3`, ... so every post page has its own path.
pub fn build_posts(
    collection: &Collection,
    records: Vec<Record>,
    renderer: &dyn Renderer,
    slugs: &mut SlugGenerator,
) -> Vec<Post> {
    let collection_link = collection.link();
    let mut seen: HashSet<String> = HashSet::new();
    let mut posts = Vec::with_capacity(records.len());

    for (i, record) in records.into_iter().enumerate() {
        let mut post = match Post::from_record(record) {
            Ok(post) => post,
            Err(e) => {
                warn!("[{}] skipping post {}: {}", collection.key, i, e);
                continue;
            }
        };
        let explicit = match post.link.trim() {
            "" => None,
            link => clean_link(link).or_else(|| {
                warn!(
                    "[{}] ignoring link {} of \"{}\": not a path inside the site",
                    collection.key, link, post.title
                );
                None
            }),
        };
        post.link = match explicit {
            Some(link) => link,
            None => {
                let slug = slugs.slug(&post.title, SlugMode::Unique);
                let generated = renderer.post_link(&collection_link, &slug);
                clean_link(&generated).unwrap_or_else(|| {
                    warn!(
                        "[{}] collection link {} is not a path inside the site, using /{}",
                        collection.key, collection_link, collection.key
                    );
                    format!("/{}/{}", collection.key, slug)
                })
            }
        };
        if !seen.insert(post.link.clone()) {
            let original = post.link.clone();
            let mut n = 2;
            while !seen.insert(format!("{}-{}", original, n)) {
                n += 1;
            }
            post.link = format!("{}-{}", original, n);
            warn!(
                "[{}] duplicate link {} for \"{}\", using {}",
                collection.key, original, post.title, post.link
            );
        }
        posts.push(post);
    }
    posts
}

/// An explicit link as a `/`-rooted site path. Empty and `.` segments are
/// dropped; `..`, backslashes and drive or scheme prefixes give `None`.
///
/// - `"games/foo/"` → `"/games/foo"`
/// - `"/./games//foo"` → `"/games/foo"`
/// - `"/../escaped"` → `None`
pub fn clean_link(link: &str) -> Option<String> {
    let mut segments = Vec::new();
    for segment in link.trim().split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            s if s.contains('\\') || s.contains(':') => return None,
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        return None;
    }
    Some(format!("/{}", segments.join("/")))
}

/// Merge each metadata type onto `posts`, in order.
pub fn apply_metadata(collection: &Collection, posts: &mut [Post], metadata: &[(String, Vec<Record>)]) {
    for (kind, records) in metadata {
        let merged = metadata::merge(posts, records, MATCH_KEY);
        debug!(
            "[{}] metadata \"{}\": {} of {} posts matched",
            collection.key,
            kind,
            merged,
            posts.len()
        );
    }
}

/// Phase 2: posts for one collection from its fetched sources.
pub fn assemble(
    collection: &Collection,
    fetched: FetchedSources,
    renderer: &dyn Renderer,
    slugs: &mut SlugGenerator,
) -> Vec<Post> {
    let mut posts = build_posts(collection, fetched.records, renderer, slugs);
    apply_metadata(collection, &mut posts, &fetched.metadata);
    posts
}

/// Both phases for a single collection.
pub fn load(
    collection: &Collection,
    renderer: &dyn Renderer,
    fetcher: &dyn Fetcher,
    slugs: &mut SlugGenerator,
) -> Vec<Post> {
    let fetched = fetch_sources(collection, fetcher);
    assemble(collection, fetched, renderer, slugs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::GamesTemplate;
    use crate::test_helpers::ScriptedFetcher;

    fn games(json: &str) -> Collection {
        Collection::from_json("games", "games.json", json).unwrap()
    }

    // =========================================================================
    // read_source
    // =========================================================================

    #[test]
    fn read_source_skips_non_objects() {
        let fetcher = ScriptedFetcher::new().file("a.json", r#"[{"title":"A"}, 3, "x", {"title":"B"}]"#);
        let records = read_source(&fetcher, "a.json").unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn read_source_rejects_non_array() {
        let fetcher = ScriptedFetcher::new().file("a.json", r#"{"title":"A"}"#);
        assert!(matches!(
            read_source(&fetcher, "a.json"),
            Err(SourceError::NotArray { .. })
        ));
    }

    #[test]
    fn read_source_reports_bad_json_with_location() {
        let fetcher = ScriptedFetcher::new().file("a.json", "[{");
        let err = read_source(&fetcher, "a.json").unwrap_err();
        assert!(err.to_string().contains("a.json"));
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn inline_then_data_in_declared_order() {
        let c = games(r#"{"template":"gamesTemplate","posts":[{"title":"Inline"}],"data":["one.json","two.json"]}"#);
        let fetcher = ScriptedFetcher::new()
            .file("two.json", r#"[{"title":"Two"}]"#)
            .file("one.json", r#"[{"title":"One A"},{"title":"One B"}]"#);

        let posts = load(&c, &GamesTemplate, &fetcher, &mut SlugGenerator::new());
        let titles: Vec<&str> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Inline", "One A", "One B", "Two"]);
    }

    #[test]
    fn failing_source_is_skipped() {
        let c = games(r#"{"template":"gamesTemplate","data":["missing.json","ok.json"]}"#);
        let fetcher = ScriptedFetcher::new().file("ok.json", r#"[{"title":"Ok"}]"#);

        let fetched = fetch_sources(&c, &fetcher);
        assert_eq!(fetched.failed, vec!["missing.json"]);
        assert_eq!(fetched.records.len(), 1);
    }

    #[test]
    fn defaults_and_generated_links() {
        let c = games(r#"{"template":"gamesTemplate","posts":[{}, {"title":"Foo Bar"}, {"title":"foo bar"}]}"#);
        let posts = load(&c, &GamesTemplate, &ScriptedFetcher::new(), &mut SlugGenerator::new());
        let links: Vec<&str> = posts.iter().map(|p| p.link.as_str()).collect();
        assert_eq!(links, vec!["/games/default-title", "/games/foo-bar", "/games/foo-bar-2"]);
        assert_eq!(posts[0].title, "Default Title");
    }

    #[test]
    fn explicit_duplicate_links_are_suffixed() {
        let c = games(
            r#"{"template":"gamesTemplate","posts":[
                {"title":"A","link":"/games/x"},
                {"title":"B","link":"/games/x"},
                {"title":"x"}
            ]}"#,
        );
        let posts = load(&c, &GamesTemplate, &ScriptedFetcher::new(), &mut SlugGenerator::new());
        let links: Vec<&str> = posts.iter().map(|p| p.link.as_str()).collect();
        assert_eq!(links, vec!["/games/x", "/games/x-2", "/games/x-3"]);
    }

    #[test]
    fn clean_link_cases() {
        assert_eq!(clean_link("games/foo/").as_deref(), Some("/games/foo"));
        assert_eq!(clean_link("/./games//foo").as_deref(), Some("/games/foo"));
        assert_eq!(clean_link("/../../escaped"), None);
        assert_eq!(clean_link("/games/../../x"), None);
        assert_eq!(clean_link("https://example.org/x"), None);
        assert_eq!(clean_link("/a\\..\\b"), None);
        assert_eq!(clean_link("//"), None);
    }

    #[test]
    fn links_leaving_the_site_are_regenerated() {
        let c = games(
            r#"{"template":"gamesTemplate","posts":[
                {"title":"Escape","link":"/../../escaped"},
                {"title":"Tidy","link":"games//tidy/"}
            ]}"#,
        );
        let posts = load(&c, &GamesTemplate, &ScriptedFetcher::new(), &mut SlugGenerator::new());
        let links: Vec<&str> = posts.iter().map(|p| p.link.as_str()).collect();
        assert_eq!(links, vec!["/games/escape", "/games/tidy"]);
    }

    #[test]
    fn collection_link_leaving_the_site_falls_back_to_key() {
        let c = Collection::from_json(
            "games",
            "games.json",
            r#"{"template":"gamesTemplate","link":"/../up","posts":[{"title":"Foo"}]}"#,
        )
        .unwrap();
        let posts = load(&c, &GamesTemplate, &ScriptedFetcher::new(), &mut SlugGenerator::new());
        assert_eq!(posts[0].link, "/games/foo");
    }

    #[test]
    fn long_titles_sharing_a_prefix_get_numbered_links() {
        let c = games(
            r#"{"template":"gamesTemplate","posts":[
                {"title":"A Remarkably Long Visual Novel Title About Summer"},
                {"title":"A Remarkably Long Visual Novel Title About Winter"},
                {"title":"A Remarkably Long Visual Novel Title About Spring"}
            ]}"#,
        );
        let posts = build_posts(
            &c,
            fetch_sources(&c, &ScriptedFetcher::new()).records,
            &GamesTemplate,
            &mut SlugGenerator::new(),
        );
        let links: Vec<&str> = posts.iter().map(|p| p.link.as_str()).collect();
        assert_eq!(
            links,
            vec![
                "/games/a-remarkably-long-visual-novel-title-abo",
                "/games/a-remarkably-long-visual-novel-title-abo-2",
                "/games/a-remarkably-long-visual-novel-title-abo-3",
            ]
        );
    }

    #[test]
    fn undecodable_record_is_skipped() {
        let c = games(r#"{"template":"gamesTemplate","posts":[{"title":"A","tags":5},{"title":"B"}]}"#);
        let posts = load(&c, &GamesTemplate, &ScriptedFetcher::new(), &mut SlugGenerator::new());
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "B");
    }

    #[test]
    fn metadata_merged_and_missing_metadata_tolerated() {
        let c = games(
            r#"{"template":"gamesTemplate","data":"d.json",
                "metadata":{"remote":"https://h/meta.json","local":"m.json"}}"#,
        );
        let fetcher = ScriptedFetcher::new()
            .file("d.json", r#"[{"title":"Foo"},{"title":"Bar"}]"#)
            .file("m.json", r#"[{"title":"Foo","studio":"Key"}]"#)
            .status("https://h/meta.json", 404);

        let fetched = fetch_sources(&c, &fetcher);
        assert_eq!(fetched.failed, vec!["https://h/meta.json"]);
        let posts = assemble(&c, fetched, &GamesTemplate, &mut SlugGenerator::new());
        assert_eq!(posts[0].text("studio").as_deref(), Some("Key"));
        assert_eq!(posts[1].text("studio"), None);
    }

    #[test]
    fn slugs_shared_across_collections() {
        let a = Collection::from_json("a", "a.json", r#"{"template":"t","link":"/same","posts":[{"title":"Foo"}]}"#).unwrap();
        let b = Collection::from_json("b", "b.json", r#"{"template":"t","link":"/same","posts":[{"title":"Foo"}]}"#).unwrap();
        let mut slugs = SlugGenerator::new();
        let fetcher = ScriptedFetcher::new();
        let pa = load(&a, &GamesTemplate, &fetcher, &mut slugs);
        let pb = load(&b, &GamesTemplate, &fetcher, &mut slugs);
        assert_eq!(pa[0].link, "/same/foo");
        assert_eq!(pb[0].link, "/same/foo-2");
    }
}
