//! Search and pagination over saved embeds.

use crate::db::models::Embed;

/// Keep embeds whose title, url or description contains `term`,
/// ignoring case. A blank term keeps everything.
pub fn filter(embeds: Vec<Embed>, term: &str) -> Vec<Embed> {
    if term.trim().is_empty() {
        return embeds;
    }
    let needle = term.to_lowercase();
    embeds
        .into_iter()
        .filter(|embed| matches_term(embed, &needle))
        .collect()
}

fn matches_term(embed: &Embed, needle: &str) -> bool {
    let contains = |field: &str| field.to_lowercase().contains(needle);
    embed.title.as_deref().is_some_and(contains)
        || contains(&embed.url)
        || embed.description.as_deref().is_some_and(contains)
}

/// One page of results. Pages are numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

impl<T> PageView<T> {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Slice `items` into fixed-size pages and return page `page`.
///
/// Page 0, or a page past the end when there is at least one page,
/// resets to page 1.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> PageView<T> {
    let per_page = per_page.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(per_page);

    let page = if page == 0 || (page > total_pages && total_pages > 0) {
        1
    } else {
        page
    };

    let start = (page - 1).saturating_mul(per_page).min(total_items);
    let end = start.saturating_add(per_page).min(total_items);

    PageView {
        items: items[start..end].to_vec(),
        page,
        total_pages,
        total_items,
    }
}
