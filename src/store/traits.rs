use crate::model::{QueryDescriptor, Record};
use crate::store::StoreError;

/// Rows returned by a select, with the exact count of rows matching the
/// filter before pagination when the store reports it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub rows: Vec<Record>,
    pub total_count: Option<u64>,
}

/// The remote relational store the console reads from and writes to.
///
/// One handle is built at startup and shared by every reader and writer.
/// Each call is a single round-trip; implementations never retry.
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// Short name used in logs
    fn backend(&self) -> &'static str;

    /// Filtered, sorted, optionally paginated rows plus the total count
    async fn select(&self, query: &QueryDescriptor) -> Result<Selection, StoreError>;

    /// Insert one row and return it as stored, generated fields included
    async fn insert(&self, collection: &str, record: Record) -> Result<Record, StoreError>;

    /// Apply a partial update to the row with the given id and return it
    async fn update(&self, collection: &str, id: &str, record: Record) -> Result<Record, StoreError>;

    /// Delete the row with the given id
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}
