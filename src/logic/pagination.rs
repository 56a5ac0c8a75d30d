use serde::{Serialize, Serializer};

/// Maximum page numbers shown in the pager
pub const MAX_PAGE_LINKS: usize = 5;

/// One entry of the pager: a page number or a gap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLink {
    Page(usize),
    Ellipsis,
}

impl Serialize for PageLink {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PageLink::Page(page) => serializer.serialize_u64(*page as u64),
            PageLink::Ellipsis => serializer.serialize_str("..."),
        }
    }
}

/// `ceil(total / page_size)`; zero rows means zero pages
pub fn total_pages(total: u64, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    let page_size = page_size as u64;
    ((total + page_size - 1) / page_size) as usize
}

/// Pager entries around `current` (one-based). Empty when everything fits
/// on one page.
pub fn page_window(current: usize, total_pages: usize) -> Vec<PageLink> {
    use PageLink::{Ellipsis, Page};

    if total_pages <= 1 {
        return Vec::new();
    }
    let half = MAX_PAGE_LINKS / 2;

    if total_pages <= MAX_PAGE_LINKS {
        (1..=total_pages).map(Page).collect()
    } else if current <= half + 1 {
        let mut links: Vec<PageLink> = (1..MAX_PAGE_LINKS).map(Page).collect();
        links.extend([Ellipsis, Page(total_pages)]);
        links
    } else if current >= total_pages - half {
        let mut links = vec![Page(1), Ellipsis];
        links.extend((total_pages - (MAX_PAGE_LINKS - 2)..=total_pages).map(Page));
        links
    } else {
        let mut links = vec![Page(1), Ellipsis];
        links.extend((current - 1..=current + 1).map(Page));
        links.extend([Ellipsis, Page(total_pages)]);
        links
    }
}

/// Page to show after deleting a row from `current_page`.
///
/// Steps back one page when the deleted row was the only row of the final
/// page, never below page 1.
pub fn page_after_delete(current_page: usize, rows_on_page: usize, total_pages: usize) -> usize {
    if rows_on_page == 1 && current_page > 1 && current_page == total_pages {
        current_page - 1
    } else {
        current_page.max(1)
    }
}
