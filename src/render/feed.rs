//! RSS 2.0 feeds, one per collection.

use super::{Renderer, post_url};
use crate::collection::Collection;
use chrono::{DateTime, NaiveDate, Utc};
use rss::{CategoryBuilder, ChannelBuilder, GuidBuilder, ItemBuilder};

/// Build the feed for every post of `collection`, using the renderer's
/// description and category choices.
pub fn collection_feed<R: Renderer + ?Sized>(
    renderer: &R,
    collection: &Collection,
    base_url: &str,
) -> String {
    let items = collection
        .posts
        .iter()
        .map(|post| {
            let link = post_url(base_url, &post.link);
            let categories = renderer
                .feed_categories(post)
                .into_iter()
                .map(|name| CategoryBuilder::default().name(name).build())
                .collect::<Vec<_>>();
            ItemBuilder::default()
                .title(Some(post.title.clone()))
                .link(Some(link.clone()))
                .guid(Some(GuidBuilder::default().permalink(true).value(link).build()))
                .description(renderer.feed_description(post))
                .pub_date(post.text("date").as_deref().and_then(rfc2822))
                .categories(categories)
                .build()
        })
        .collect::<Vec<_>>();

    ChannelBuilder::default()
        .title(collection.title.clone())
        .link(format!("{}{}.html", base_url, collection.key))
        .description(collection.description.clone())
        .last_build_date(Some(Utc::now().to_rfc2822()))
        .items(items)
        .build()
        .to_string()
}

/// Convert a post date to RFC 2822. Accepts RFC 3339 timestamps and plain
/// `YYYY-MM-DD` dates; anything else is dropped from the feed.
pub fn rfc2822(date: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Some(dt.to_rfc2822());
    }
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    Some(day.and_hms_opt(0, 0, 0)?.and_utc().to_rfc2822())
}
