//! Site build orchestration.
//!
//! A build moves through a fixed sequence of stages. Each stage either
//! completes and hands its products to the next, or fails the whole build:
//!
//! ```text
//! Init → PartialsLoaded → CollectionsLoaded → Indexed → [ChangeFiltered] → Rendered → Persisted → Done
//!                                      (any stage) → Failed
//! ```
//!
//! `ChangeFiltered` only happens in [`BuildMode::Incremental`]. `Persisted`
//! is skipped when the context asks not to save the change snapshot (the
//! `check` command).
//!
//! What is fatal and what is not:
//!
//! | Problem                                  | Outcome                         |
//! |------------------------------------------|---------------------------------|
//! | missing `base` partial                   | build fails                     |
//! | unreadable or malformed collection file  | build fails                     |
//! | unknown template name                    | build fails                     |
//! | two pages planned for one output path    | build fails, nothing written    |
//! | data or metadata source can't be fetched | source skipped, warning         |
//! | a post record that doesn't decode        | record skipped, warning         |
//! | a write that fails twice                 | build fails after all writes    |
//!
//! Posts are always loaded and indexed for every collection, even in
//! incremental mode, so tag and developer pages stay complete.
//!
//! ## Output Structure
//!
//! ```text
//! public/
//! ├── index.html, 404.html          # special partials (full builds only)
//! ├── games.html, games-2.html      # collection listings
//! ├── games.rss                     # collection feed
//! ├── games/<slug>.html             # post pages
//! ├── games.json, games/<slug>.json # with [output] json = true
//! └── vn/
//!     ├── tags/index.html           # every tag with its post count
//!     ├── tags/<slug>.html          # posts with that tag, paginated
//!     └── developers/...
//! ```

use crate::collection::{Collection, CollectionError, load_collections};
use crate::config::{AliasConfig, SiteConfig, SitePaths};
use crate::fetch::{FetchError, Fetcher, SourceFetcher};
use crate::index::{AliasGroup, SiteIndex, alias_groups, group_for_display, related_posts};
use crate::load::{FetchedSources, assemble, fetch_sources};
use crate::naming::SlugGenerator;
use crate::paginate::{Page, PageUrls, paginate};
use crate::partials::{PageMeta, PartialStore, PartialsError, SPECIAL_PAGES};
use crate::render::listing::{AliasEntry, alias_index, alias_page, pagination_nav};
use crate::render::{Renderer, Templates, collection_urls, post_json_path, post_path, post_url};
use crate::sink::{FileSink, FsSink, MemorySink, SinkError, write_with_retry};
use crate::snapshot::{ChangeSnapshot, changed_sources};
use crate::types::Post;
use log::{debug, info};
use maud::html;
use rayon::prelude::*;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Partials(#[from] PartialsError),
    #[error(transparent)]
    Collections(#[from] CollectionError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("collection \"{collection}\" uses unknown template \"{template}\" (available: {available})")]
    UnknownTemplate {
        collection: String,
        template: String,
        available: String,
    },
    #[error("output path {path} is produced by both {first} and {second}")]
    DuplicateOutput {
        path: String,
        first: String,
        second: String,
    },
    #[error("cannot scan {path} for changes: {source}")]
    Scan { path: PathBuf, source: io::Error },
    #[error("{} file(s) failed to write: {}", .0.len(), join_failures(.0))]
    Write(Vec<SinkError>),
    #[error("cannot save snapshot {path}: {source}")]
    Snapshot { path: PathBuf, source: io::Error },
}

fn join_failures(failures: &[SinkError]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Render every collection and the special pages.
    Full,
    /// Render only collections whose local files changed since the last
    /// saved snapshot, plus the alias pages when any file changed.
    Incremental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    PartialsLoaded,
    CollectionsLoaded,
    Indexed,
    ChangeFiltered,
    Rendered,
    Persisted,
    Done,
    Failed,
}

/// Everything a build reads from and writes to.
pub struct BuildContext<'a> {
    pub config: &'a SiteConfig,
    pub paths: &'a SitePaths,
    pub templates: &'a Templates,
    pub fetcher: &'a dyn Fetcher,
    pub sink: &'a dyn FileSink,
    /// Save the change snapshot after a successful build.
    pub persist_snapshot: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSummary {
    pub key: String,
    pub title: String,
    pub template: String,
    pub posts: usize,
    pub pages: usize,
    /// Whether this collection's pages were rendered in this build.
    pub rendered: bool,
}

/// What a successful build did.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub mode: BuildMode,
    pub collections: Vec<CollectionSummary>,
    pub tags: usize,
    pub developers: usize,
    /// Collection files new or modified since the previous snapshot.
    pub changed: Vec<String>,
    /// Collection files gone since the previous snapshot.
    pub removed: Vec<String>,
    /// `<collection>: <location>` for every source that was skipped.
    pub skipped_sources: Vec<String>,
    /// Output paths written, sorted.
    pub written: Vec<String>,
    pub snapshot_saved: bool,
}

/// Build the site under `root` to disk, reading sources with a
/// [`SourceFetcher`] and saving the change snapshot.
pub fn build_site(
    root: &Path,
    config: &SiteConfig,
    mode: BuildMode,
) -> Result<BuildReport, GenerateError> {
    let paths = config.paths.resolve(root);
    let templates = Templates::builtin(&config.aliases.root);
    let fetcher = SourceFetcher::new(
        &paths.collections,
        Duration::from_secs(config.fetch.timeout_secs),
    )?;
    let sink = FsSink::new(&paths.output);
    build(
        &BuildContext {
            config,
            paths: &paths,
            templates: &templates,
            fetcher: &fetcher,
            sink: &sink,
            persist_snapshot: true,
        },
        mode,
    )
}

/// Render the whole site into memory. Nothing is written to disk and the
/// snapshot is left alone.
pub fn check_site(
    root: &Path,
    config: &SiteConfig,
) -> Result<(BuildReport, MemorySink), GenerateError> {
    let paths = config.paths.resolve(root);
    let templates = Templates::builtin(&config.aliases.root);
    let fetcher = SourceFetcher::new(
        &paths.collections,
        Duration::from_secs(config.fetch.timeout_secs),
    )?;
    let sink = MemorySink::new();
    let report = build(
        &BuildContext {
            config,
            paths: &paths,
            templates: &templates,
            fetcher: &fetcher,
            sink: &sink,
            persist_snapshot: false,
        },
        BuildMode::Full,
    )?;
    Ok((report, sink))
}

/// Run one build against `ctx`.
pub fn build(ctx: &BuildContext<'_>, mode: BuildMode) -> Result<BuildReport, GenerateError> {
    let mut pipeline = Pipeline {
        ctx,
        stage: Stage::Init,
    };
    match pipeline.run(mode) {
        Ok(report) => Ok(report),
        Err(e) => {
            debug!("build failed after {:?}", pipeline.stage);
            pipeline.advance(Stage::Failed);
            Err(e)
        }
    }
}

struct Pipeline<'c, 'a> {
    ctx: &'c BuildContext<'a>,
    stage: Stage,
}

impl Pipeline<'_, '_> {
    fn advance(&mut self, next: Stage) {
        debug!("stage {:?} -> {:?}", self.stage, next);
        self.stage = next;
    }

    fn run(&mut self, mode: BuildMode) -> Result<BuildReport, GenerateError> {
        let ctx = self.ctx;
        let config = ctx.config;

        let partials = PartialStore::load(&ctx.paths.partials)?;
        info!("loaded {} partials", partials.len());
        self.advance(Stage::PartialsLoaded);

        let mut collections = load_collections(&ctx.paths.collections)?;
        let renderers = resolve_renderers(&collections, ctx.templates)?;
        let fetched: Vec<FetchedSources> = collections
            .par_iter()
            .map(|collection| fetch_sources(collection, ctx.fetcher))
            .collect();
        let mut slugs = SlugGenerator::new();
        let mut skipped_sources = Vec::new();
        for ((collection, renderer), fetched) in collections.iter_mut().zip(&renderers).zip(fetched) {
            skipped_sources.extend(
                fetched
                    .failed
                    .iter()
                    .map(|location| format!("{}: {}", collection.key, location)),
            );
            let posts = assemble(collection, fetched, *renderer, &mut slugs);
            info!("[{}] {} posts", collection.key, posts.len());
            collection.posts = posts.into_iter().map(Arc::new).collect();
        }
        self.advance(Stage::CollectionsLoaded);

        let mut index = SiteIndex::new();
        for post in collections.iter().flat_map(|c| &c.posts) {
            index.add_post(post);
        }
        let tags = alias_groups(&index.tags);
        let developers = alias_groups(&index.developers);
        info!("indexed {} tags and {} developers", tags.len(), developers.len());
        self.advance(Stage::Indexed);

        let previous = ChangeSnapshot::load(&ctx.paths.snapshot);
        let mut changes = changed_sources(&ctx.paths.collections, &previous).map_err(|source| {
            GenerateError::Scan {
                path: ctx.paths.collections.clone(),
                source,
            }
        })?;
        changes.current.record_links(&collections);
        let selected: BTreeSet<String> = match mode {
            BuildMode::Full => collections.iter().map(|c| c.key.clone()).collect(),
            BuildMode::Incremental => {
                let mut affected = changes.affected_collections(&collections);
                let relinked = changes.relinked_collections(&previous);
                for key in &relinked {
                    if !affected.contains(key) {
                        info!("[{}] post links were renumbered", key);
                    }
                }
                affected.extend(relinked);
                info!(
                    "{} changed and {} removed files affect {} collections",
                    changes.changed.len(),
                    changes.removed.len(),
                    affected.len()
                );
                self.advance(Stage::ChangeFiltered);
                affected
            }
        };

        let aliases = AliasSet {
            root: config.aliases.root.trim_matches('/'),
            tags: &tags,
            developers: &developers,
        };
        let mut jobs = Vec::new();
        for (collection, renderer) in collections.iter().zip(&renderers) {
            if selected.contains(&collection.key) {
                plan_collection(&mut jobs, collection, *renderer, config);
            }
        }
        // A removed collection leaves no selected key behind, but its posts
        // are gone from the alias pages all the same.
        if !selected.is_empty() || !changes.is_empty() {
            for kind in [AliasKind::Tags, AliasKind::Developers] {
                plan_aliases(&mut jobs, kind, aliases.groups(kind), config.pagination.page_size);
            }
        }
        if mode == BuildMode::Full {
            for &name in SPECIAL_PAGES {
                if let Some(body) = partials.get(name) {
                    jobs.push(Job::Special { name, body });
                }
            }
        }
        let planned = assign_paths(jobs, aliases.root)?;

        let pages = PageBuilder {
            config,
            partials: &partials,
            index: &index,
            alias_root: aliases.root,
        };
        let failures: Vec<SinkError> = planned
            .par_iter()
            .filter_map(|(path, job)| {
                let contents = pages.render(job);
                write_with_retry(ctx.sink, path, contents.as_bytes()).err()
            })
            .collect();
        if !failures.is_empty() {
            return Err(GenerateError::Write(failures));
        }
        let mut written: Vec<String> = planned.into_iter().map(|(path, _)| path).collect();
        written.sort();
        info!("wrote {} files", written.len());
        self.advance(Stage::Rendered);

        if ctx.persist_snapshot {
            changes
                .current
                .save(&ctx.paths.snapshot)
                .map_err(|source| GenerateError::Snapshot {
                    path: ctx.paths.snapshot.clone(),
                    source,
                })?;
            self.advance(Stage::Persisted);
        }
        self.advance(Stage::Done);

        let page_size = config.pagination.page_size.max(1);
        Ok(BuildReport {
            mode,
            collections: collections
                .iter()
                .map(|c| CollectionSummary {
                    key: c.key.clone(),
                    title: c.title.clone(),
                    template: c.template.clone(),
                    posts: c.posts.len(),
                    pages: c.posts.len().div_ceil(page_size).max(1),
                    rendered: selected.contains(&c.key),
                })
                .collect(),
            tags: tags.len(),
            developers: developers.len(),
            changed: changes.changed,
            removed: changes.removed,
            skipped_sources,
            written,
            snapshot_saved: ctx.persist_snapshot,
        })
    }
}

fn resolve_renderers<'t>(
    collections: &[Collection],
    templates: &'t Templates,
) -> Result<Vec<&'t dyn Renderer>, GenerateError> {
    collections
        .iter()
        .map(|c| {
            templates
                .get(&c.template)
                .ok_or_else(|| GenerateError::UnknownTemplate {
                    collection: c.key.clone(),
                    template: c.template.clone(),
                    available: templates.names().join(", "),
                })
        })
        .collect()
}

// ============================================================================
// Planning
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasKind {
    Tags,
    Developers,
}

impl AliasKind {
    /// Directory name under the alias root.
    pub fn dir(self) -> &'static str {
        match self {
            AliasKind::Tags => "tags",
            AliasKind::Developers => "developers",
        }
    }

    fn label(self, aliases: &AliasConfig) -> &str {
        match self {
            AliasKind::Tags => &aliases.tags_label,
            AliasKind::Developers => &aliases.developers_label,
        }
    }
}

struct AliasSet<'a> {
    root: &'a str,
    tags: &'a [AliasGroup],
    developers: &'a [AliasGroup],
}

impl<'a> AliasSet<'a> {
    fn groups(&self, kind: AliasKind) -> &'a [AliasGroup] {
        match kind {
            AliasKind::Tags => self.tags,
            AliasKind::Developers => self.developers,
        }
    }
}

/// One output file to produce.
enum Job<'a> {
    Listing {
        collection: &'a Collection,
        renderer: &'a dyn Renderer,
        page: Page<'a, Arc<Post>>,
    },
    Feed {
        collection: &'a Collection,
        renderer: &'a dyn Renderer,
    },
    Post {
        collection: &'a Collection,
        renderer: &'a dyn Renderer,
        post: &'a Arc<Post>,
    },
    PostJson {
        collection: &'a Collection,
        renderer: &'a dyn Renderer,
        post: &'a Arc<Post>,
    },
    CollectionJson {
        collection: &'a Collection,
        renderer: &'a dyn Renderer,
    },
    Alias {
        kind: AliasKind,
        group: &'a AliasGroup,
        page: Page<'a, Arc<Post>>,
    },
    AliasIndex {
        kind: AliasKind,
        groups: &'a [AliasGroup],
    },
    Special {
        name: &'a str,
        body: &'a str,
    },
}

impl Job<'_> {
    fn path(&self, alias_root: &str) -> String {
        match self {
            Job::Listing {
                collection, page, ..
            } => collection_urls(collection).path(page.number),
            Job::Feed { collection, .. } => format!("{}.rss", collection.key),
            Job::Post { post, .. } => post_path(&post.link),
            Job::PostJson { post, .. } => post_json_path(&post.link),
            Job::CollectionJson { collection, .. } => format!("{}.json", collection.key),
            Job::Alias { kind, group, page } => {
                alias_urls(alias_root, *kind, &group.slug).path(page.number)
            }
            Job::AliasIndex { kind, .. } => format!("{}/index.html", alias_dir(alias_root, *kind)),
            Job::Special { name, .. } => format!("{}.html", name),
        }
    }

    fn describe(&self) -> String {
        match self {
            Job::Listing {
                collection, page, ..
            } => format!("page {} of collection {}", page.number, collection.key),
            Job::Feed { collection, .. } => format!("the feed of collection {}", collection.key),
            Job::Post {
                collection, post, ..
            } => format!("post \"{}\" in {}", post.title, collection.key),
            Job::PostJson {
                collection, post, ..
            } => format!("JSON of post \"{}\" in {}", post.title, collection.key),
            Job::CollectionJson { collection, .. } => {
                format!("JSON of collection {}", collection.key)
            }
            Job::Alias { kind, group, page } => {
                format!("{} page {} of \"{}\"", kind.dir(), page.number, group.name)
            }
            Job::AliasIndex { kind, .. } => format!("the {} index", kind.dir()),
            Job::Special { name, .. } => format!("special page {}", name),
        }
    }
}

fn plan_collection<'a>(
    jobs: &mut Vec<Job<'a>>,
    collection: &'a Collection,
    renderer: &'a dyn Renderer,
    config: &SiteConfig,
) {
    for page in paginate(&collection.posts, config.pagination.page_size) {
        jobs.push(Job::Listing {
            collection,
            renderer,
            page,
        });
    }
    jobs.push(Job::Feed {
        collection,
        renderer,
    });
    for post in &collection.posts {
        jobs.push(Job::Post {
            collection,
            renderer,
            post,
        });
        if config.output.json {
            jobs.push(Job::PostJson {
                collection,
                renderer,
                post,
            });
        }
    }
    if config.output.json {
        jobs.push(Job::CollectionJson {
            collection,
            renderer,
        });
    }
}

fn plan_aliases<'a>(
    jobs: &mut Vec<Job<'a>>,
    kind: AliasKind,
    groups: &'a [AliasGroup],
    page_size: usize,
) {
    for group in groups {
        for page in paginate(&group.posts, page_size) {
            jobs.push(Job::Alias { kind, group, page });
        }
    }
    jobs.push(Job::AliasIndex { kind, groups });
}

/// Pair every job with its output path, refusing any path planned twice.
fn assign_paths<'a>(
    jobs: Vec<Job<'a>>,
    alias_root: &str,
) -> Result<Vec<(String, Job<'a>)>, GenerateError> {
    let mut owners: HashMap<String, usize> = HashMap::new();
    let mut planned: Vec<(String, Job<'a>)> = Vec::with_capacity(jobs.len());
    for job in jobs {
        let path = job.path(alias_root);
        if let Some(&i) = owners.get(&path) {
            return Err(GenerateError::DuplicateOutput {
                first: planned[i].1.describe(),
                second: job.describe(),
                path,
            });
        }
        owners.insert(path.clone(), planned.len());
        planned.push((path, job));
    }
    Ok(planned)
}

fn alias_dir(alias_root: &str, kind: AliasKind) -> String {
    format!("{}/{}", alias_root, kind.dir())
}

fn alias_urls(alias_root: &str, kind: AliasKind, slug: &str) -> PageUrls {
    PageUrls::new(format!("{}/{}", alias_dir(alias_root, kind), slug))
}

// ============================================================================
// Rendering
// ============================================================================

struct PageBuilder<'a> {
    config: &'a SiteConfig,
    partials: &'a PartialStore,
    index: &'a SiteIndex,
    alias_root: &'a str,
}

impl PageBuilder<'_> {
    fn render(&self, job: &Job<'_>) -> String {
        let base = self.config.base_url.as_str();
        match job {
            Job::Listing {
                collection,
                renderer,
                page,
            } => {
                let urls = collection_urls(collection);
                let main = html! {
                    (renderer.listing_page(collection, page.items, base))
                    (pagination_nav(page, &urls, base))
                };
                self.partials.full_page(
                    &main.into_string(),
                    &PageMeta {
                        title: page_title(&collection.title, page.number),
                        description: collection.description.clone(),
                        canonical_url: urls.url(base, page.number),
                        image: collection.text("banner").unwrap_or_default().to_string(),
                    },
                )
            }
            Job::Feed {
                collection,
                renderer,
            } => renderer.rss_feed(collection, base),
            Job::Post {
                collection,
                renderer,
                post,
            } => {
                let related = related_posts(post, self.index, self.config.related.limit);
                let main = renderer.post_page(post, collection, &related, base);
                self.partials.full_page(
                    &main.into_string(),
                    &PageMeta {
                        title: post.title.clone(),
                        description: renderer
                            .feed_description(post)
                            .unwrap_or_else(|| collection.description.clone()),
                        canonical_url: post_url(base, &post.link),
                        image: post.image.url().to_string(),
                    },
                )
            }
            Job::PostJson {
                collection,
                renderer,
                post,
            } => format!("{:#}", renderer.post_json(post, collection, base)),
            Job::CollectionJson {
                collection,
                renderer,
            } => {
                let items: Vec<Value> = collection
                    .posts
                    .iter()
                    .map(|post| renderer.post_json(post, collection, base))
                    .collect();
                format!("{:#}", Value::Array(items))
            }
            Job::Alias { kind, group, page } => {
                let urls = alias_urls(self.alias_root, *kind, &group.slug);
                let groups = group_for_display(page.items);
                let main = html! {
                    (alias_page(&group.name, group.posts.len(), &groups, base))
                    (pagination_nav(page, &urls, base))
                };
                let title = format!("{} - {}", group.name, kind.label(&self.config.aliases));
                self.partials.full_page(
                    &main.into_string(),
                    &PageMeta {
                        title: page_title(&title, page.number),
                        description: format!(
                            "All {} related to {}",
                            self.config.aliases.subject, group.name
                        ),
                        canonical_url: urls.url(base, page.number),
                        image: String::new(),
                    },
                )
            }
            Job::AliasIndex { kind, groups } => {
                let dir = alias_dir(self.alias_root, *kind);
                let entries: Vec<AliasEntry> = groups
                    .iter()
                    .map(|g| AliasEntry {
                        name: g.name.clone(),
                        slug: g.slug.clone(),
                        count: g.posts.len(),
                    })
                    .collect();
                let heading = format!("All {}", kind.dir());
                let main = alias_index(&heading, &dir, &entries, base);
                self.partials.full_page(
                    &main.into_string(),
                    &PageMeta {
                        title: format!("{} - {}", heading, kind.label(&self.config.aliases)),
                        description: format!(
                            "List of all {} related to {}",
                            kind.dir(),
                            self.config.aliases.subject
                        ),
                        canonical_url: format!("{}{}/index.html", base, dir),
                        image: String::new(),
                    },
                )
            }
            Job::Special { body, .. } => body.to_string(),
        }
    }
}

fn page_title(title: &str, number: usize) -> String {
    if number > 1 {
        format!("{} - Page {}", title, number)
    } else {
        title.to_string()
    }
}
