//! Page renderers.
//!
//! Each collection names a template (`"template": "vnTemplate"`), which is
//! resolved through [`Templates`] to a [`Renderer`]. A renderer produces the
//! `main` fragment of listing and post pages; the orchestrator wraps it in
//! the site partials, adds pagination links, and writes it out.
//!
//! Four renderers are built in:
//!
//! | Name                  | Listing / post page                                  |
//! |-----------------------|------------------------------------------------------|
//! | `gamesTemplate`       | cover image, author and date, markdown `content`     |
//! | `programmingTemplate` | flair badge, `content1` as summary in feed and JSON  |
//! | `testTemplate`        | bare title list                                      |
//! | `vnTemplate`          | developers, tags (linked to alias pages), screenshots |
//!
//! ## URL conventions
//!
//! A post with link `/vn/foo` is written to `vn/foo.html` and its canonical
//! URL is `<base_url>vn/foo.html`. Listings follow [`PageUrls`].

pub mod feed;
pub mod listing;
pub mod templates;

use crate::collection::Collection;
use crate::paginate::PageUrls;
use crate::types::Post;
use maud::Markup;
use pulldown_cmark::{Parser, html as md_html};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;

pub use templates::{GamesTemplate, ProgrammingTemplate, TestTemplate, VnTemplate};

/// Content-type specific page rendering.
///
/// Implementations must be `Send + Sync`: pages of one collection are
/// rendered in parallel.
pub trait Renderer: Send + Sync {
    /// Registry name, e.g. `"gamesTemplate"`.
    fn name(&self) -> &str;

    /// `main` content for one page of a collection listing.
    fn listing_page(&self, collection: &Collection, posts: &[Arc<Post>], base_url: &str) -> Markup;

    /// `main` content for a single post.
    fn post_page(
        &self,
        post: &Post,
        collection: &Collection,
        related: &[Arc<Post>],
        base_url: &str,
    ) -> Markup;

    /// Site-relative link for a post given its collection link and slug.
    fn post_link(&self, collection_link: &str, slug: &str) -> String {
        format!("{}/{}", collection_link.trim_end_matches('/'), slug)
    }

    /// Item description in the RSS feed.
    fn feed_description(&self, post: &Post) -> Option<String> {
        post.text("content")
    }

    /// Item categories in the RSS feed.
    fn feed_categories(&self, _post: &Post) -> Vec<String> {
        Vec::new()
    }

    /// RSS 2.0 document for a whole collection (unpaginated).
    fn rss_feed(&self, collection: &Collection, base_url: &str) -> String {
        feed::collection_feed(self, collection, base_url)
    }

    /// JSON API representation of a post.
    fn post_json(&self, post: &Post, collection: &Collection, base_url: &str) -> Value {
        let mut map = json_base(post, collection, base_url, post.text("content"));
        map.insert("author".into(), post.fields.get("author").cloned().unwrap_or(Value::Null));
        Value::Object(map)
    }
}

/// Renderers by name.
#[derive(Default)]
pub struct Templates {
    renderers: HashMap<String, Box<dyn Renderer>>,
}

impl Templates {
    pub fn new() -> Self {
        Self::default()
    }

    /// The four built-in renderers. `alias_root` is where tag and developer
    /// pages live, for renderers that link to them.
    pub fn builtin(alias_root: &str) -> Self {
        let mut templates = Self::new();
        templates.register(Box::new(GamesTemplate));
        templates.register(Box::new(ProgrammingTemplate));
        templates.register(Box::new(TestTemplate));
        templates.register(Box::new(VnTemplate::new(alias_root)));
        templates
    }

    /// Add a renderer, replacing any with the same name.
    pub fn register(&mut self, renderer: Box<dyn Renderer>) {
        self.renderers.insert(renderer.name().to_string(), renderer);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Renderer> {
        self.renderers.get(name).map(|r| r.as_ref())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.renderers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Output path of a post page: `/vn/foo` → `vn/foo.html`.
pub fn post_path(link: &str) -> String {
    format!("{}.html", link.trim_matches('/'))
}

/// Canonical URL of a post page.
pub fn post_url(base_url: &str, link: &str) -> String {
    format!("{}{}", base_url, post_path(link))
}

/// Output path of a post's JSON representation.
pub fn post_json_path(link: &str) -> String {
    format!("{}.json", link.trim_matches('/'))
}

/// Listing URLs for a collection: `<key>.html`, `<key>-2.html`, ...
pub fn collection_urls(collection: &Collection) -> PageUrls {
    PageUrls::new(&collection.key)
}

/// Render markdown (with inline HTML passed through) to HTML.
pub fn markdown(source: &str) -> String {
    let mut out = String::new();
    md_html::push_html(&mut out, Parser::new(source));
    out
}

/// Fields shared by every JSON representation.
pub(crate) fn json_base(
    post: &Post,
    collection: &Collection,
    base_url: &str,
    description: Option<String>,
) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("title".into(), json!(post.title));
    map.insert(
        "link".into(),
        json!(format!("{}{}", base_url, post_json_path(&post.link))),
    );
    map.insert("description".into(), json!(description.unwrap_or_default()));
    map.insert("date".into(), post.fields.get("date").cloned().unwrap_or(Value::Null));
    map.insert("image".into(), json!(post.image));
    map.insert(
        "subforum".into(),
        json!({
            "title": collection.title,
            "description": collection.description,
            "link": format!("{}{}", base_url, post_json_path(&collection.link())),
        }),
    );
    map
}
