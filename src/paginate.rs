//! Fixed-size pagination and page URLs.
//!
//! Page 1 of a listing lives at `<stem>.html`; page `n >= 2` at
//! `<stem>-<n>.html`. The same convention is used for collections, tags and
//! developers, so navigation links can be computed from the stem alone.

/// One page of a listing. `items` borrows from the paginated slice.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// 1-based page number.
    pub number: usize,
    pub total_pages: usize,
}

impl<'a, T> Page<'a, T> {
    pub fn prev(&self) -> Option<usize> {
        (self.number > 1).then(|| self.number - 1)
    }

    pub fn next(&self) -> Option<usize> {
        (self.number < self.total_pages).then(|| self.number + 1)
    }

    pub fn numbers(&self) -> std::ops::RangeInclusive<usize> {
        1..=self.total_pages
    }
}

/// Split `items` into pages of `page_size`.
///
/// Always yields at least one page; an empty input gives a single empty
/// page so every listing has a landing page. A `page_size` of zero is
/// treated as one.
pub fn paginate<T>(items: &[T], page_size: usize) -> Vec<Page<'_, T>> {
    let page_size = page_size.max(1);
    if items.is_empty() {
        return vec![Page {
            items,
            number: 1,
            total_pages: 1,
        }];
    }
    let total_pages = items.len().div_ceil(page_size);
    items
        .chunks(page_size)
        .enumerate()
        .map(|(i, chunk)| Page {
            items: chunk,
            number: i + 1,
            total_pages,
        })
        .collect()
}

/// URL scheme for a paginated listing rooted at `stem` (e.g. `"games"` or
/// `"vn/tags/romance"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageUrls {
    stem: String,
}

impl PageUrls {
    pub fn new(stem: impl Into<String>) -> Self {
        Self {
            stem: stem.into().trim_matches('/').to_string(),
        }
    }

    /// Output path relative to the site root.
    pub fn path(&self, number: usize) -> String {
        if number <= 1 {
            format!("{}.html", self.stem)
        } else {
            format!("{}-{}.html", self.stem, number)
        }
    }

    /// Absolute URL under `base_url` (which ends with `/`).
    pub fn url(&self, base_url: &str, number: usize) -> String {
        format!("{}{}", base_url, self.path(number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_yields_one_empty_page() {
        let items: Vec<u32> = vec![];
        let pages = paginate(&items, 10);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].items.is_empty());
        assert_eq!(pages[0].total_pages, 1);
        assert_eq!(pages[0].prev(), None);
        assert_eq!(pages[0].next(), None);
    }

    #[test]
    fn page_count_is_ceiling() {
        let items: Vec<u32> = (0..25).collect();
        for size in 1..=30 {
            let pages = paginate(&items, size);
            assert_eq!(pages.len(), 25usize.div_ceil(size).max(1), "size {size}");
            assert!(pages.iter().all(|p| p.items.len() <= size));
        }
    }

    #[test]
    fn concatenated_pages_rebuild_input() {
        let items: Vec<u32> = (0..23).collect();
        let pages = paginate(&items, 10);
        let rebuilt: Vec<u32> = pages.iter().flat_map(|p| p.items.iter().copied()).collect();
        assert_eq!(rebuilt, items);
        assert_eq!(pages[2].items, &[20, 21, 22]);
    }

    #[test]
    fn exact_multiple_has_no_trailing_empty_page() {
        let items: Vec<u32> = (0..20).collect();
        assert_eq!(paginate(&items, 10).len(), 2);
    }

    #[test]
    fn prev_next_topology() {
        let items: Vec<u32> = (0..30).collect();
        let pages = paginate(&items, 10);
        assert_eq!((pages[0].prev(), pages[0].next()), (None, Some(2)));
        assert_eq!((pages[1].prev(), pages[1].next()), (Some(1), Some(3)));
        assert_eq!((pages[2].prev(), pages[2].next()), (Some(2), None));
        assert_eq!(pages[1].numbers().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn zero_page_size_treated_as_one() {
        let items = [1, 2];
        assert_eq!(paginate(&items, 0).len(), 2);
    }

    #[test]
    fn urls_follow_suffix_convention() {
        let urls = PageUrls::new("vn/tags/romance");
        assert_eq!(urls.path(1), "vn/tags/romance.html");
        assert_eq!(urls.path(2), "vn/tags/romance-2.html");
        assert_eq!(
            urls.url("https://example.org/", 3),
            "https://example.org/vn/tags/romance-3.html"
        );
    }

    #[test]
    fn url_stem_is_trimmed() {
        assert_eq!(PageUrls::new("/games/").path(1), "games.html");
    }
}
