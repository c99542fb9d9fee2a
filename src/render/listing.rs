//! Markup shared by every listing: pagination links and the tag/developer
//! alias pages.

use super::post_url;
use crate::index::TitleGroup;
use crate::paginate::{Page, PageUrls};
use maud::{Markup, html};

/// Previous / numbered / Next links. Empty for single-page listings.
pub fn pagination_nav<T>(page: &Page<'_, T>, urls: &PageUrls, base_url: &str) -> Markup {
    html! {
        @if page.total_pages > 1 {
            nav.pagination {
                @if let Some(prev) = page.prev() {
                    a.prev href=(urls.url(base_url, prev)) { "Previous" }
                }
                @for n in page.numbers() {
                    a href=(urls.url(base_url, n)) class=[(n == page.number).then_some("active")] { (n) }
                }
                @if let Some(next) = page.next() {
                    a.next href=(urls.url(base_url, next)) { "Next" }
                }
            }
        }
    }
}

/// One page of a tag or developer listing, grouped by title prefix.
pub fn alias_page(name: &str, total: usize, groups: &[TitleGroup<'_>], base_url: &str) -> Markup {
    html! {
        h1 { (name) " (" (total) ")" }
        @for group in groups {
            section.title-group {
                h2 { (group.label) }
                ul {
                    @for post in &group.posts {
                        li {
                            a href=(post_url(base_url, &post.link)) { (post.title) }
                            @if let Some(author) = post.text("author") {
                                " by " (author)
                            }
                            @if let Some(date) = post.text("date") {
                                " on " (date)
                            }
                        }
                    }
                }
            }
        }
    }
}

/// One row of an alias index page.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasEntry {
    pub name: String,
    pub slug: String,
    pub count: usize,
}

/// `index.html` of a tag or developer directory: every name with its count.
pub fn alias_index(heading: &str, dir: &str, entries: &[AliasEntry], base_url: &str) -> Markup {
    html! {
        h1 { (heading) }
        ul.alias-index {
            @for entry in entries {
                li {
                    a href={ (base_url) (dir) "/" (entry.slug) ".html" } { (entry.name) }
                    " (" (entry.count) ")"
                }
            }
        }
    }
}
