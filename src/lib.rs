//! # forum-ssg
//!
//! A static site generator for forum-style sites: visual novels, games,
//! programming notes. Each collection (a "subforum") is a JSON definition
//! pointing at arrays of post records, locally or over HTTP. The generator
//! turns them into paginated listings, one page per post, an RSS feed per
//! collection, and cross-collection tag and developer pages.
//!
//! # Architecture: One Staged Build
//!
//! ```text
//! partials/  ──► PartialStore
//! subforums/ ──► Collections ──► fetch sources (parallel) ──► posts (ordered)
//!                                                     │
//!                                   metadata merge ◄──┘
//!                                                     │
//!                                         SiteIndex (tags, developers)
//!                                                     │
//!                          change filter (incremental builds only)
//!                                                     │
//!                                   plan pages ──► render + write (parallel)
//!                                                     │
//!                                          mtime snapshot saved
//! ```
//!
//! Anything order-sensitive (slug allocation, index insertion, link
//! deduplication) runs serially in collection key order, so output does not
//! depend on which fetch finished first. Fetching and rendering are the
//! parallel parts.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`generate`] | Build orchestration: stages, page planning, fatal vs. skipped errors |
//! | [`collection`] | Collection definitions and their source declarations |
//! | [`load`] | Fetching sources and turning records into posts |
//! | [`metadata`] | Overlaying metadata records onto posts by title |
//! | [`index`] | Tag and developer indexes, title grouping, related posts |
//! | [`snapshot`] | File modification snapshot for incremental builds |
//! | [`paginate`] | Fixed-size pages and their URLs |
//! | [`naming`] | Slugs and title keys |
//! | [`render`] | Template registry and the built-in renderers, feeds, listings |
//! | [`partials`] | HTML partials and page assembly |
//! | [`fetch`] | Reading a source location from disk or HTTP |
//! | [`sink`] | Writing output files to disk or memory |
//! | [`config`] | `config.toml` loading, validation and defaults |
//! | [`types`] | The post record |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Build Everything Indexed, Render What Changed
//!
//! Incremental builds still load every collection: tag and developer pages
//! aggregate across collections, so they must see all posts. Only the page
//! rendering is filtered by the change snapshot.
//!
//! ## Plan Before Writing
//!
//! Every output path is planned before anything is written. Two pages that
//! would land on one path stop the build with nothing written, rather than
//! one silently overwriting the other.
//!
//! ## Maud for Markup, Partials for Chrome
//!
//! Page bodies are produced with [Maud](https://maud.lambda.xyz/) so that
//! every interpolated value is escaped. The site chrome (head, header,
//! footer) stays as plain HTML partials the site owner can edit without a
//! rebuild of the tool.

pub mod collection;
pub mod config;
pub mod fetch;
pub mod generate;
pub mod index;
pub mod load;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod paginate;
pub mod partials;
pub mod render;
pub mod sink;
pub mod snapshot;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
