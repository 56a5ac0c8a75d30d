use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::logic::normalize::normalize_error;
use crate::model::{QueryDescriptor, QueryResult};
use crate::store::RemoteStore;

/// Paginated, filtered view of one collection.
///
/// Holds the current descriptor and the latest result. Each fetch is tagged
/// with a sequence number; a completion that is no longer the latest is
/// dropped, so a slow response to an old descriptor never overwrites the
/// result of a newer one. After [`close`](Self::close) no completion
/// updates the state.
pub struct CollectionReader {
    store: Arc<dyn RemoteStore>,
    descriptor: Mutex<QueryDescriptor>,
    sequence: AtomicU64,
    closed: AtomicBool,
    state: watch::Sender<QueryResult>,
}

impl CollectionReader {
    /// Reader in the pending state; nothing is fetched until
    /// [`refetch`](Self::refetch) or a descriptor change
    pub fn new(store: Arc<dyn RemoteStore>, descriptor: QueryDescriptor) -> Self {
        let (state, _) = watch::channel(QueryResult::pending());
        Self {
            store,
            descriptor: Mutex::new(descriptor),
            sequence: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            state,
        }
    }

    pub fn descriptor(&self) -> QueryDescriptor {
        self.descriptor.lock().clone()
    }

    pub fn snapshot(&self) -> QueryResult {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryResult> {
        self.state.subscribe()
    }

    /// Replace the descriptor. Fetches once if it differs from the current
    /// one and returns whether a fetch happened.
    pub async fn set_descriptor(&self, descriptor: QueryDescriptor) -> bool {
        {
            let mut current = self.descriptor.lock();
            if *current == descriptor {
                return false;
            }
            *current = descriptor;
        }
        self.refetch().await;
        true
    }

    /// Re-run the current descriptor and return the resulting state
    pub async fn refetch(&self) -> QueryResult {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let descriptor = self.descriptor();

        self.publish(sequence, |state| state.loading = true);
        log::debug!(
            "fetch #{} {} offset={:?} limit={:?}",
            sequence,
            descriptor.collection,
            descriptor.offset,
            descriptor.limit
        );

        let outcome = self.store.select(&descriptor).await;

        let result = match outcome {
            Ok(selection) => QueryResult {
                rows: selection.rows,
                loading: false,
                error: None,
                total_count: selection.total_count,
            },
            Err(err) => {
                let normalized = normalize_error(&err);
                log::warn!(
                    "fetch #{} of {} failed: {} ({})",
                    sequence,
                    descriptor.collection,
                    err,
                    normalized.message
                );
                QueryResult::failed(normalized.message)
            }
        };

        if !self.publish(sequence, |state| *state = result) {
            log::debug!("fetch #{} of {} discarded", sequence, descriptor.collection);
        }
        self.snapshot()
    }

    /// Mute all later state updates
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Apply `update` if the reader is open and `sequence` is the latest
    fn publish(&self, sequence: u64, update: impl FnOnce(&mut QueryResult)) -> bool {
        if self.is_closed() || self.sequence.load(Ordering::SeqCst) != sequence {
            return false;
        }
        self.state.send_modify(update);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{record_from, Record, SearchFilter, SortSpec};
    use crate::store::{MemoryStore, Selection, StoreError};
    use serde_json::json;
    use std::time::Duration;

    async fn seeded(count: usize) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for i in 0..count {
            let name = if i % 3 == 0 {
                format!("Kho Ha Noi {}", i)
            } else {
                format!("Chi nhanh {}", i)
            };
            store
                .insert(
                    "organizations",
                    record_from(json!({
                        "org_code": format!("ORG{:02}", i),
                        "org_name": name,
                        "status": "Active"
                    })),
                )
                .await
                .unwrap();
        }
        store
    }

    fn organizations(page_size: usize, page: usize, term: &str) -> QueryDescriptor {
        QueryDescriptor::new("organizations")
            .order_by(SortSpec::asc("org_code"))
            .paginate(page_size, page * page_size)
            .search(SearchFilter::new(term, ["org_code", "org_name"]))
    }

    #[tokio::test]
    async fn test_filter_matches_case_insensitive_substring() {
        let store = seeded(12).await;
        let reader = CollectionReader::new(store, organizations(100, 0, "HA NOI"));

        let result = reader.refetch().await;
        assert_eq!(result.total_count, Some(4));
        for row in &result.rows {
            let name = row["org_name"].as_str().unwrap().to_lowercase();
            assert!(name.contains("ha noi"));
        }
    }

    #[tokio::test]
    async fn test_empty_term_returns_everything() {
        let store = seeded(7).await;
        let reader = CollectionReader::new(store, organizations(100, 0, ""));
        let result = reader.refetch().await;
        assert_eq!(result.rows.len(), 7);
        assert_eq!(result.total_count, Some(7));
    }

    #[tokio::test]
    async fn test_page_sizes_and_total_are_stable() {
        let store = seeded(23).await;
        let reader = CollectionReader::new(store, organizations(10, 0, ""));

        let mut seen = 0;
        for (page, expected) in [(0, 10), (1, 10), (2, 3)] {
            reader.set_descriptor(organizations(10, page, "")).await;
            let result = reader.snapshot();
            assert_eq!(result.rows.len(), expected);
            assert_eq!(result.total_count, Some(23));
            seen += result.rows.len();
        }
        assert_eq!(seen, 23);
    }

    #[tokio::test]
    async fn test_refetch_is_idempotent() {
        let store = seeded(5).await;
        let reader = CollectionReader::new(store, organizations(10, 0, ""));
        let first = reader.refetch().await;
        let second = reader.refetch().await;
        assert_eq!(first, second);
        assert!(!second.loading);
    }

    #[tokio::test]
    async fn test_equal_descriptor_does_not_fetch() {
        let store = seeded(2).await;
        let reader = CollectionReader::new(store, organizations(10, 0, ""));
        assert!(!reader.set_descriptor(organizations(10, 0, "")).await);
        assert!(reader.snapshot().loading);
        assert!(reader.set_descriptor(organizations(10, 0, "x")).await);
        assert!(!reader.snapshot().loading);
    }

    #[tokio::test]
    async fn test_failure_yields_message_and_no_rows() {
        let store = seeded(2).await;
        let query = QueryDescriptor::new("organizations").order_by(SortSpec::asc("missing"));
        let reader = CollectionReader::new(store, query);

        let result = reader.refetch().await;
        assert!(!result.loading);
        assert!(result.rows.is_empty());
        assert_eq!(result.error.as_deref(), Some("column organizations.missing does not exist"));
    }

    /// Answers slowly for short search terms and quickly for long ones
    struct LaggingStore;

    #[async_trait::async_trait]
    impl RemoteStore for LaggingStore {
        fn backend(&self) -> &'static str {
            "lagging"
        }

        async fn select(&self, query: &QueryDescriptor) -> Result<Selection, StoreError> {
            let term = query.filter.as_ref().map(|f| f.term.clone()).unwrap_or_default();
            let delay = if term.len() < 3 { 500 } else { 50 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(Selection {
                rows: vec![record_from(json!({ "term": term }))],
                total_count: Some(1),
            })
        }

        async fn insert(&self, _: &str, record: Record) -> Result<Record, StoreError> {
            Ok(record)
        }

        async fn update(&self, _: &str, _: &str, record: Record) -> Result<Record, StoreError> {
            Ok(record)
        }

        async fn delete(&self, _: &str, _: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn search(term: &str) -> QueryDescriptor {
        QueryDescriptor::new("organizations").search(SearchFilter::new(term, ["org_name"]))
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_is_discarded() {
        let reader = Arc::new(CollectionReader::new(Arc::new(LaggingStore), search("")));

        let slow = {
            let reader = reader.clone();
            tokio::spawn(async move { reader.set_descriptor(search("kh")).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        reader.set_descriptor(search("kho ha noi")).await;
        slow.await.unwrap();

        let result = reader.snapshot();
        assert_eq!(result.rows[0]["term"], json!("kho ha noi"));
        assert!(!result.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_reader_ignores_completions() {
        let reader = Arc::new(CollectionReader::new(Arc::new(LaggingStore), search("kho ha noi")));
        let pending = {
            let reader = reader.clone();
            tokio::spawn(async move { reader.refetch().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        reader.close();
        pending.await.unwrap();

        let result = reader.snapshot();
        assert!(result.rows.is_empty());
        assert!(result.loading);
    }
}
