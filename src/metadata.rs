//! Joining side-channel metadata onto posts.
//!
//! A collection may declare metadata sources keyed by type:
//!
//! ```json
//! "metadata": { "vndb": "data/vndb.json", "covers": "https://example.org/covers.json" }
//! ```
//!
//! Each source is a JSON array of records. For every post, the first record
//! whose match field (the title) equals the post's is merged onto the post,
//! record fields winning. Types are applied one after the other in declared
//! order, so a later type sees the result of earlier ones.
//!
//! Merging is idempotent: applying the same records twice gives the same
//! posts as applying them once.

use crate::types::Post;
use log::warn;
use serde_json::{Map, Value};

/// Merge the first matching record onto each post.
///
/// Returns the number of posts that received a record. Posts without a
/// match, and posts whose merged result would not decode, are left as they
/// were.
pub fn merge(posts: &mut [Post], records: &[Map<String, Value>], match_key: &str) -> usize {
    let mut merged = 0;
    for post in posts.iter_mut() {
        let Some(value) = post.field_value(match_key) else {
            continue;
        };
        let Some(record) = records.iter().find(|r| r.get(match_key) == Some(&value)) else {
            continue;
        };
        match post.overlay(record) {
            Ok(()) => merged += 1,
            Err(e) => warn!("metadata for \"{}\" not applied: {}", post.title, e),
        }
    }
    merged
}
