use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

use crate::logic::normalize::{normalize_error, NormalizedError};
use crate::model::Record;
use crate::store::{RemoteStore, StoreError};

/// Progress of the writer's most recent operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MutationState {
    pub in_flight: bool,
    pub error: Option<String>,
}

/// Create, update and delete against the store.
///
/// The writer never touches a reader; callers refetch after a successful
/// write when they want the list to reflect it.
pub struct CollectionWriter {
    store: Arc<dyn RemoteStore>,
    state: Mutex<MutationState>,
}

impl CollectionWriter {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            state: Mutex::new(MutationState::default()),
        }
    }

    pub fn state(&self) -> MutationState {
        self.state.lock().clone()
    }

    pub async fn insert(&self, collection: &str, record: Record) -> Result<Record, NormalizedError> {
        self.begin();
        log::debug!("insert into {}", collection);
        let outcome = self.store.insert(collection, record).await;
        self.finish("insert", collection, outcome)
    }

    pub async fn update(
        &self,
        collection: &str,
        id: &str,
        record: Record,
    ) -> Result<Record, NormalizedError> {
        self.begin();
        log::debug!("update {} id={}", collection, id);
        let outcome = self.store.update(collection, id, record).await;
        self.finish("update", collection, outcome)
    }

    pub async fn remove(&self, collection: &str, id: &str) -> Result<(), NormalizedError> {
        self.begin();
        log::debug!("delete {} id={}", collection, id);
        let outcome = self.store.delete(collection, id).await;
        self.finish("delete", collection, outcome)
    }

    fn begin(&self) {
        *self.state.lock() = MutationState {
            in_flight: true,
            error: None,
        };
    }

    fn finish<T>(
        &self,
        operation: &str,
        collection: &str,
        outcome: Result<T, StoreError>,
    ) -> Result<T, NormalizedError> {
        let mut state = self.state.lock();
        state.in_flight = false;
        match outcome {
            Ok(value) => Ok(value),
            Err(err) => {
                let normalized = normalize_error(&err);
                log::warn!("{} on {} failed: {}", operation, collection, err);
                state.error = Some(normalized.message.clone());
                Err(normalized)
            }
        }
    }
}
