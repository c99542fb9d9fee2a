//! Built-in renderers.

use super::{Renderer, json_base, markdown, post_url};
use crate::collection::Collection;
use crate::naming::alias_slug;
use crate::types::{NameRef, Post};
use maud::{Markup, PreEscaped, html};
use serde_json::{Value, json};
use std::sync::Arc;

// ============================================================================
// Shared components
// ============================================================================

fn collection_header(collection: &Collection) -> Markup {
    html! {
        header.subforum-header {
            @if let Some(banner) = collection.text("banner") {
                img.subforum-banner src=(banner) alt=(collection.title);
            }
            h1 { (collection.title) }
            @if !collection.description.is_empty() {
                p.subforum-description { (collection.description) }
            }
        }
    }
}

/// "by ann on 2024-01-02", either part optional.
fn byline(post: &Post) -> Markup {
    html! {
        @if let Some(author) = post.text("author") {
            " by " span.author { (author) }
        }
        @if let Some(date) = post.text("date") {
            " on " time datetime=(date) { (date) }
        }
    }
}

fn cover(post: &Post) -> Markup {
    let url = post.image.url();
    html! {
        @if !url.is_empty() {
            img.cover src=(url) alt=(post.title) loading="lazy";
        }
    }
}

fn body(post: &Post, key: &str) -> Markup {
    html! {
        @if let Some(content) = post.text(key) {
            div.post-content { (PreEscaped(markdown(&content))) }
        }
    }
}

fn related_section(related: &[Arc<Post>], base_url: &str) -> Markup {
    html! {
        @if !related.is_empty() {
            aside.related {
                h2 { "Related" }
                ul {
                    @for post in related {
                        li { a href=(post_url(base_url, &post.link)) { (post.title) } }
                    }
                }
            }
        }
    }
}

fn back_link(collection: &Collection, base_url: &str) -> Markup {
    html! {
        p.back { a href={ (base_url) (collection.key) ".html" } { "← " (collection.title) } }
    }
}

// ============================================================================
// gamesTemplate
// ============================================================================

pub struct GamesTemplate;

impl Renderer for GamesTemplate {
    fn name(&self) -> &str {
        "gamesTemplate"
    }

    fn listing_page(&self, collection: &Collection, posts: &[Arc<Post>], base_url: &str) -> Markup {
        html! {
            (collection_header(collection))
            div.post-grid {
                @for post in posts {
                    article.post-card {
                        a href=(post_url(base_url, &post.link)) {
                            (cover(post))
                            h2 { (post.title) }
                        }
                        p.meta { (byline(post)) }
                    }
                }
            }
        }
    }

    fn post_page(
        &self,
        post: &Post,
        collection: &Collection,
        related: &[Arc<Post>],
        base_url: &str,
    ) -> Markup {
        html! {
            article.post {
                h1 { (post.title) }
                p.meta { (byline(post)) }
                (cover(post))
                (body(post, "content"))
            }
            (related_section(related, base_url))
            (back_link(collection, base_url))
        }
    }
}

// ============================================================================
// programmingTemplate
// ============================================================================

pub struct ProgrammingTemplate;

impl Renderer for ProgrammingTemplate {
    fn name(&self) -> &str {
        "programmingTemplate"
    }

    fn listing_page(&self, collection: &Collection, posts: &[Arc<Post>], base_url: &str) -> Markup {
        html! {
            (collection_header(collection))
            ul.post-list {
                @for post in posts {
                    li {
                        @if let Some(flair) = post.text("flair") {
                            span.flair { (flair) } " "
                        }
                        a href=(post_url(base_url, &post.link)) { (post.title) }
                        span.meta { (byline(post)) }
                    }
                }
            }
        }
    }

    fn post_page(
        &self,
        post: &Post,
        collection: &Collection,
        related: &[Arc<Post>],
        base_url: &str,
    ) -> Markup {
        html! {
            article.post {
                @if let Some(flair) = post.text("flair") {
                    span.flair { (flair) }
                }
                h1 { (post.title) }
                p.meta { (byline(post)) }
                @if let Some(summary) = post.text("content1") {
                    p.summary { (summary) }
                }
                (body(post, "content"))
            }
            (related_section(related, base_url))
            (back_link(collection, base_url))
        }
    }

    fn feed_description(&self, post: &Post) -> Option<String> {
        post.text("content1")
    }

    fn feed_categories(&self, post: &Post) -> Vec<String> {
        post.text("flair").into_iter().collect()
    }

    fn post_json(&self, post: &Post, collection: &Collection, base_url: &str) -> Value {
        let mut map = json_base(post, collection, base_url, post.text("content1"));
        map.insert("author".into(), post.fields.get("author").cloned().unwrap_or(Value::Null));
        map.insert("flair".into(), post.fields.get("flair").cloned().unwrap_or(Value::Null));
        Value::Object(map)
    }
}

// ============================================================================
// testTemplate
// ============================================================================

pub struct TestTemplate;

impl Renderer for TestTemplate {
    fn name(&self) -> &str {
        "testTemplate"
    }

    fn listing_page(&self, collection: &Collection, posts: &[Arc<Post>], base_url: &str) -> Markup {
        html! {
            h1 { (collection.title) }
            ul {
                @for post in posts {
                    li { a href=(post_url(base_url, &post.link)) { (post.title) } }
                }
            }
        }
    }

    fn post_page(
        &self,
        post: &Post,
        _collection: &Collection,
        _related: &[Arc<Post>],
        _base_url: &str,
    ) -> Markup {
        html! {
            h1 { (post.title) }
            (body(post, "content"))
        }
    }
}

// ============================================================================
// vnTemplate
// ============================================================================

/// Visual novel entries. Tags and developers link to their alias pages.
pub struct VnTemplate {
    alias_root: String,
}

impl VnTemplate {
    pub fn new(alias_root: &str) -> Self {
        Self {
            alias_root: alias_root.trim_matches('/').to_string(),
        }
    }

    fn alias_links(&self, kind: &str, names: &[NameRef], base_url: &str) -> Markup {
        html! {
            @for (i, name) in names.iter().enumerate() {
                @if i > 0 { ", " }
                a href={
                    (base_url) (self.alias_root) "/" (kind) "/"
                    (alias_slug(name.name())) ".html"
                } { (name.name()) }
            }
        }
    }
}

impl Renderer for VnTemplate {
    fn name(&self) -> &str {
        "vnTemplate"
    }

    fn listing_page(&self, collection: &Collection, posts: &[Arc<Post>], base_url: &str) -> Markup {
        html! {
            (collection_header(collection))
            div.vn-grid {
                @for post in posts {
                    article.vn-card {
                        a href=(post_url(base_url, &post.link)) {
                            (cover(post))
                            h2 { (post.title) }
                        }
                        @if !post.developers.is_empty() {
                            p.developers { (self.alias_links("developers", &post.developers, base_url)) }
                        }
                    }
                }
            }
        }
    }

    fn post_page(
        &self,
        post: &Post,
        collection: &Collection,
        related: &[Arc<Post>],
        base_url: &str,
    ) -> Markup {
        html! {
            article.vn {
                h1 { (post.title) }
                @if let Some(aliases) = post.fields.get("aliases").and_then(Value::as_array) {
                    p.aliases {
                        @for (i, alias) in aliases.iter().filter_map(Value::as_str).enumerate() {
                            @if i > 0 { " / " }
                            (alias)
                        }
                    }
                }
                (cover(post))
                dl.vn-facts {
                    @if !post.developers.is_empty() {
                        dt { "Developers" }
                        dd { (self.alias_links("developers", &post.developers, base_url)) }
                    }
                    @if !post.tags.is_empty() {
                        dt { "Tags" }
                        dd { (self.alias_links("tags", &post.tags, base_url)) }
                    }
                    @if let Some(date) = post.text("date") {
                        dt { "Released" }
                        dd { (date) }
                    }
                }
                (body(post, "description"))
                @if !post.screenshots.is_empty() {
                    div.screenshots {
                        @for shot in &post.screenshots {
                            img src=(shot.url()) alt={ (post.title) " screenshot" } loading="lazy";
                        }
                    }
                }
            }
            (related_section(related, base_url))
            (back_link(collection, base_url))
        }
    }

    fn feed_description(&self, post: &Post) -> Option<String> {
        post.text("description")
    }

    fn feed_categories(&self, post: &Post) -> Vec<String> {
        post.tag_names().map(str::to_string).collect()
    }

    fn post_json(&self, post: &Post, collection: &Collection, base_url: &str) -> Value {
        let mut map = json_base(post, collection, base_url, post.text("description"));
        map.insert("developers".into(), json!(post.developers));
        map.insert(
            "aliases".into(),
            post.fields.get("aliases").cloned().unwrap_or(Value::Null),
        );
        map.insert("tags".into(), json!(post.tags));
        map.insert("screenshots".into(), json!(post.screenshots));
        Value::Object(map)
    }
}
