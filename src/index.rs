//! Cross-collection tag and developer indexes.
//!
//! Indexes are rebuilt from scratch every run. Posts are appended in the
//! order they are fed in (collection key order, then post order), and a post
//! appears in a bucket once per occurrence of the name on that post; nothing
//! is deduplicated at index time.
//!
//! Deduplication and ordering for display happen later:
//! [`group_for_display`] buckets a listing by the first word of each title,
//! and [`related_posts`] removes repeated titles.

use crate::naming::{alias_slug, first_word_key, split_trailing_number, title_key};
use crate::types::Post;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Insertion-ordered map of name → posts.
#[derive(Debug, Default, Clone)]
pub struct NameIndex {
    order: Vec<String>,
    buckets: HashMap<String, Vec<Arc<Post>>>,
}

impl NameIndex {
    pub fn insert(&mut self, name: &str, post: &Arc<Post>) {
        match self.buckets.get_mut(name) {
            Some(bucket) => bucket.push(Arc::clone(post)),
            None => {
                self.order.push(name.to_string());
                self.buckets.insert(name.to_string(), vec![Arc::clone(post)]);
            }
        }
    }

    pub fn get(&self, name: &str) -> &[Arc<Post>] {
        self.buckets.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Names with their posts, in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Arc<Post>])> {
        self.order
            .iter()
            .map(|name| (name.as_str(), self.get(name)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Tag and developer indexes for one build.
#[derive(Debug, Default, Clone)]
pub struct SiteIndex {
    pub tags: NameIndex,
    pub developers: NameIndex,
}

impl SiteIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_post(&mut self, post: &Arc<Post>) {
        for tag in post.tag_names() {
            self.tags.insert(tag, post);
        }
        for developer in post.developer_names() {
            self.developers.insert(developer, post);
        }
    }
}

/// Posts shown on one tag or developer page.
///
/// Names whose alias slugs coincide (`"Romance"` and `"romance "`) share a
/// page: their posts are concatenated in index order under the first name.
#[derive(Debug, Clone)]
pub struct AliasGroup {
    pub name: String,
    pub slug: String,
    pub posts: Vec<Arc<Post>>,
}

/// One [`AliasGroup`] per distinct slug, in first-seen order.
pub fn alias_groups(index: &NameIndex) -> Vec<AliasGroup> {
    let mut groups: Vec<AliasGroup> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for (name, posts) in index.iter() {
        let slug = alias_slug(name);
        match positions.get(&slug) {
            Some(&i) => groups[i].posts.extend(posts.iter().cloned()),
            None => {
                positions.insert(slug.clone(), groups.len());
                groups.push(AliasGroup {
                    name: name.to_string(),
                    slug,
                    posts: posts.to_vec(),
                });
            }
        }
    }
    groups
}

/// Posts of one listing sharing a title prefix.
#[derive(Debug, Clone)]
pub struct TitleGroup<'a> {
    /// Normalized first word, e.g. `"foo"`.
    pub key: String,
    /// First word as written in the first post of the group, e.g. `"Foo"`.
    pub label: String,
    pub posts: Vec<&'a Arc<Post>>,
}

/// Group posts by the first word of their title.
///
/// The group containing the first post comes first. The rest are ordered
/// alphabetically by prefix, then numerically by trailing digits
/// (`episode2` before `episode10`), then by full key. Within a group posts
/// keep their input order.
pub fn group_for_display(posts: &[Arc<Post>]) -> Vec<TitleGroup<'_>> {
    let mut groups: Vec<TitleGroup<'_>> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for post in posts {
        let key = first_word_key(&post.title);
        match positions.get(&key) {
            Some(&i) => groups[i].posts.push(post),
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push(TitleGroup {
                    label: display_label(&post.title),
                    key,
                    posts: vec![post],
                });
            }
        }
    }

    if groups.len() > 1 {
        groups[1..].sort_by(|a, b| compare_group_keys(&a.key, &b.key));
    }
    groups
}

fn display_label(title: &str) -> String {
    title
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .find(|w| !w.is_empty())
        .unwrap_or("")
        .to_string()
}

fn compare_group_keys(a: &str, b: &str) -> Ordering {
    let (prefix_a, num_a) = split_trailing_number(a);
    let (prefix_b, num_b) = split_trailing_number(b);
    prefix_a
        .cmp(prefix_b)
        .then_with(|| num_a.cmp(&num_b))
        .then_with(|| a.cmp(b))
}

/// Posts sharing a tag or developer with `post`, for a "related" section.
///
/// Candidates come from the post's tags first, then its developers, in
/// index order. The post itself and repeated titles (compared
/// case-insensitively) are skipped. At most `limit` posts are returned.
pub fn related_posts(post: &Post, index: &SiteIndex, limit: usize) -> Vec<Arc<Post>> {
    let mut seen: HashSet<String> = HashSet::from([title_key(&post.title)]);
    let mut related = Vec::new();
    if limit == 0 {
        return related;
    }

    let candidates = post
        .tag_names()
        .flat_map(|tag| index.tags.get(tag))
        .chain(
            post.developer_names()
                .flat_map(|developer| index.developers.get(developer)),
        );

    for candidate in candidates {
        if candidate.link == post.link {
            continue;
        }
        if seen.insert(title_key(&candidate.title)) {
            related.push(Arc::clone(candidate));
            if related.len() == limit {
                break;
            }
        }
    }
    related
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::post;

    fn titles(group: &TitleGroup<'_>) -> Vec<String> {
        group.posts.iter().map(|p| p.title.clone()).collect()
    }

    // =========================================================================
    // Index population
    // =========================================================================

    #[test]
    fn each_tag_occurrence_adds_one_entry() {
        let mut index = SiteIndex::new();
        let p = Arc::new(post("A", "/a", &["x", "y"], &["dev"]));
        index.add_post(&p);

        assert_eq!(index.tags.get("x").len(), 1);
        assert_eq!(index.tags.get("y").len(), 1);
        assert_eq!(index.developers.get("dev").len(), 1);
        assert!(index.tags.get("z").is_empty());
    }

    #[test]
    fn no_dedup_at_index_time() {
        let mut index = SiteIndex::new();
        let p = Arc::new(post("A", "/a", &["x", "x"], &[]));
        index.add_post(&p);
        assert_eq!(index.tags.get("x").len(), 2);
    }

    #[test]
    fn names_keep_first_seen_order() {
        let mut index = SiteIndex::new();
        index.add_post(&Arc::new(post("A", "/a", &["zeta", "alpha"], &[])));
        index.add_post(&Arc::new(post("B", "/b", &["mid", "zeta"], &[])));

        let names: Vec<&str> = index.tags.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        let zeta: Vec<&str> = index.tags.get("zeta").iter().map(|p| p.link.as_str()).collect();
        assert_eq!(zeta, vec!["/a", "/b"]);
    }

    #[test]
    fn developers_index_symmetric_with_tags() {
        let mut index = SiteIndex::new();
        index.add_post(&Arc::new(post("A", "/a", &[], &["Key", "Key"])));
        assert_eq!(index.developers.len(), 1);
        assert_eq!(index.developers.get("Key").len(), 2);
        assert!(index.tags.is_empty());
    }

    #[test]
    fn colliding_names_share_an_alias_page() {
        let mut index = SiteIndex::new();
        index.add_post(&Arc::new(post("A", "/a", &["Romance"], &[])));
        index.add_post(&Arc::new(post("B", "/b", &["romance ", "Drama"], &[])));

        let groups = alias_groups(&index.tags);
        let slugs: Vec<&str> = groups.iter().map(|g| g.slug.as_str()).collect();
        assert_eq!(slugs, vec!["romance", "drama"]);
        assert_eq!(groups[0].name, "Romance");
        assert_eq!(groups[0].posts.len(), 2);
    }

    #[test]
    fn alias_slugs_stay_clear_of_index_and_numbered_pages() {
        let mut index = SiteIndex::new();
        index.add_post(&Arc::new(post("A", "/a", &["Index", "foo", "foo-2"], &[])));

        let groups = alias_groups(&index.tags);
        let slugs: Vec<&str> = groups.iter().map(|g| g.slug.as_str()).collect();
        assert_eq!(slugs, vec!["index_", "foo", "foo-2_"]);
    }

    // =========================================================================
    // Display grouping
    // =========================================================================

    #[test]
    fn groups_by_first_word() {
        let posts = vec![
            Arc::new(post("Foo Bar", "/1", &[], &[])),
            Arc::new(post("foo baz", "/2", &[], &[])),
            Arc::new(post("Qux", "/3", &[], &[])),
        ];
        let groups = group_for_display(&posts);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, "foo");
        assert_eq!(groups[0].label, "Foo");
        assert_eq!(titles(&groups[0]), vec!["Foo Bar", "foo baz"]);
    }

    #[test]
    fn first_posts_group_leads_then_alphanumeric() {
        let posts = vec![
            Arc::new(post("Zed", "/z", &[], &[])),
            Arc::new(post("episode10 x", "/e10", &[], &[])),
            Arc::new(post("Alpha", "/a", &[], &[])),
            Arc::new(post("episode2 y", "/e2", &[], &[])),
            Arc::new(post("episode z", "/e", &[], &[])),
        ];
        let keys: Vec<String> = group_for_display(&posts)
            .into_iter()
            .map(|g| g.key)
            .collect();
        assert_eq!(keys, vec!["zed", "alpha", "episode", "episode2", "episode10"]);
    }

    #[test]
    fn empty_listing_has_no_groups() {
        assert!(group_for_display(&[]).is_empty());
    }

    // =========================================================================
    // Related posts
    // =========================================================================

    #[test]
    fn related_excludes_self_and_duplicate_titles() {
        let subject = Arc::new(post("Main", "/main", &["x"], &["dev"]));
        let twin_a = Arc::new(post("Twin", "/twin-a", &["x"], &[]));
        let twin_b = Arc::new(post("twin", "/twin-b", &[], &["dev"]));
        let other = Arc::new(post("Other", "/other", &["x"], &["dev"]));

        let mut index = SiteIndex::new();
        for p in [&subject, &twin_a, &twin_b, &other] {
            index.add_post(p);
        }

        let related = related_posts(&subject, &index, 10);
        let links: Vec<&str> = related.iter().map(|p| p.link.as_str()).collect();
        assert_eq!(links, vec!["/twin-a", "/other"]);
    }

    #[test]
    fn related_respects_limit() {
        let subject = Arc::new(post("Main", "/main", &["x"], &[]));
        let mut index = SiteIndex::new();
        index.add_post(&subject);
        for i in 0..5 {
            index.add_post(&Arc::new(post(&format!("P{i}"), &format!("/p{i}"), &["x"], &[])));
        }
        assert_eq!(related_posts(&subject, &index, 2).len(), 2);
        assert!(related_posts(&subject, &index, 0).is_empty());
    }
}
