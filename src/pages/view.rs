use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::logic::{
    page_after_delete, page_window, total_pages, CollectionReader, CollectionWriter, Debouncer,
    ErrorKind, PageLink,
};
use crate::model::{QueryDescriptor, QueryResult, Record, SearchFilter};
use crate::pages::catalog::PageConfig;
use crate::pages::toast::Toast;
use crate::store::RemoteStore;

/// What a page shows: the current slice of rows flattened for display
/// plus everything the pager needs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageListing {
    pub slug: &'static str,
    pub title: &'static str,
    pub rows: Vec<Record>,
    pub total: u64,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub pages: Vec<PageLink>,
    pub search: String,
    pub loading: bool,
    pub error: Option<String>,
}

/// Result of the delete confirmation flow
#[derive(Debug, Clone, Serialize)]
pub struct DeleteOutcome {
    pub deleted: bool,
    #[serde(skip)]
    pub failure: Option<ErrorKind>,
    pub toast: Toast,
    pub listing: PageListing,
}

/// One list page: reader, writer, search debouncer and the current page
pub struct PageView {
    config: &'static PageConfig,
    page_size: usize,
    current_page: AtomicUsize,
    search: Debouncer<String>,
    reader: CollectionReader,
    writer: CollectionWriter,
}

impl PageView {
    /// Must be called inside a tokio runtime
    pub fn new(
        config: &'static PageConfig,
        store: Arc<dyn RemoteStore>,
        page_size: usize,
        search_delay: Duration,
    ) -> Self {
        let page_size = page_size.max(1);
        let descriptor = descriptor_for(config, page_size, 1, "");
        Self {
            config,
            page_size,
            current_page: AtomicUsize::new(1),
            search: Debouncer::new(String::new(), search_delay),
            reader: CollectionReader::new(store.clone(), descriptor),
            writer: CollectionWriter::new(store),
        }
    }

    pub fn config(&self) -> &'static PageConfig {
        self.config
    }

    pub fn current_page(&self) -> usize {
        self.current_page.load(Ordering::SeqCst)
    }

    pub fn reader(&self) -> &CollectionReader {
        &self.reader
    }

    pub fn writer(&self) -> &CollectionWriter {
        &self.writer
    }

    /// Search term the reader is currently filtering by
    pub fn search_term(&self) -> String {
        self.reader
            .descriptor()
            .filter
            .map(|filter| filter.term)
            .unwrap_or_default()
    }

    /// Fetch the current descriptor
    pub async fn load(&self) -> PageListing {
        self.reader.refetch().await;
        self.listing()
    }

    /// Show page `page` (one-based) of the current search
    pub async fn go_to_page(&self, page: usize) -> PageListing {
        self.open(page, &self.search_term()).await
    }

    /// Show page `page` of the rows matching `term`. Landing past the last
    /// page moves to the last page, or to page 1 when nothing matches.
    pub async fn open(&self, page: usize, term: &str) -> PageListing {
        let page = page.max(1);
        self.show(page, term).await;

        let snapshot = self.reader.snapshot();
        if let (true, None, Some(total)) =
            (snapshot.rows.is_empty(), &snapshot.error, snapshot.total_count)
        {
            let last = total_pages(total, self.page_size).max(1);
            if page > last {
                log::debug!("{}: page {} past the end, showing {}", self.config.slug, page, last);
                self.show(last, term).await;
            }
        }
        self.listing()
    }

    /// Feed raw search input; applied once it settles
    pub fn set_search(&self, term: &str) {
        self.search.push(term.to_string());
    }

    /// Wait for the debounced search term to differ from the applied one,
    /// then apply it from page 1
    pub async fn searched(&self) -> PageListing {
        let mut settled = self.search.subscribe();
        loop {
            let term = settled.borrow_and_update().clone();
            if term != self.search_term() {
                return self.apply_search(&term).await;
            }
            if settled.changed().await.is_err() {
                return self.listing();
            }
        }
    }

    /// Apply a search term right away, from page 1
    pub async fn apply_search(&self, term: &str) -> PageListing {
        self.show(1, term).await;
        self.listing()
    }

    /// Delete a row of the current page. On success the list is refetched,
    /// stepping back a page when the row was alone on the final page. On
    /// failure the list is left as it was.
    pub async fn confirm_delete(&self, id: &str) -> DeleteOutcome {
        let before = self.reader.snapshot();
        let current = self.current_page();
        let pages = total_pages(self.total_of(&before), self.page_size);

        match self.writer.remove(self.config.collection, id).await {
            Ok(()) => {
                let target = page_after_delete(current, before.rows.len(), pages);
                let listing = self.go_to_page(target).await;
                DeleteOutcome {
                    deleted: true,
                    failure: None,
                    toast: Toast::success(format!("Đã xóa {} thành công.", self.config.entity)),
                    listing,
                }
            }
            Err(err) => DeleteOutcome {
                deleted: false,
                failure: Some(err.kind),
                toast: Toast::error(err.message),
                listing: self.listing(),
            },
        }
    }

    /// Stop reacting to fetch completions
    pub fn close(&self) {
        self.reader.close();
    }

    pub fn listing(&self) -> PageListing {
        let snapshot = self.reader.snapshot();
        let total = self.total_of(&snapshot);
        let pages = total_pages(total, self.page_size);
        let page = self.current_page();

        let rows = snapshot
            .rows
            .iter()
            .map(|row| {
                self.config.row_kind.flatten(row).unwrap_or_else(|e| {
                    log::warn!("{}: row does not match its view: {}", self.config.slug, e);
                    row.clone()
                })
            })
            .collect();

        PageListing {
            slug: self.config.slug,
            title: self.config.title,
            rows,
            total,
            page,
            page_size: self.page_size,
            total_pages: pages,
            pages: page_window(page, pages),
            search: self.search_term(),
            loading: snapshot.loading,
            error: snapshot.error,
        }
    }

    async fn show(&self, page: usize, term: &str) {
        self.current_page.store(page, Ordering::SeqCst);
        let descriptor = descriptor_for(self.config, self.page_size, page, term);
        if !self.reader.set_descriptor(descriptor).await {
            self.reader.refetch().await;
        }
    }

    fn total_of(&self, result: &QueryResult) -> u64 {
        result.total_count.unwrap_or_else(|| {
            let offset = self.current_page().saturating_sub(1).saturating_mul(self.page_size);
            offset.saturating_add(result.rows.len()) as u64
        })
    }
}

fn descriptor_for(config: &PageConfig, page_size: usize, page: usize, term: &str) -> QueryDescriptor {
    QueryDescriptor::new(config.collection)
        .select(config.select)
        .order_by(config.sort())
        .paginate(page_size, (page.max(1) - 1).saturating_mul(page_size))
        .search(SearchFilter::new(
            term.trim(),
            config.search_columns.iter().copied(),
        ))
}
