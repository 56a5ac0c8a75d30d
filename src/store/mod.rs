pub mod error;
pub mod memory;
pub mod postgres;
pub mod postgrest;
pub mod traits;

pub use error::*;
pub use memory::*;
pub use postgres::PostgresStore;
pub use postgrest::PostgrestStore;
pub use traits::*;

use std::sync::Arc;

use crate::config::{AppConfig, StoreBackend};

/// Build the store handle the whole console shares
pub async fn connect(config: &AppConfig) -> anyhow::Result<Arc<dyn RemoteStore>> {
    let store: Arc<dyn RemoteStore> = match config.store.backend {
        StoreBackend::Postgrest => {
            let (url, key) = config.rest_credentials()?;
            log::info!("Using PostgREST store at {}", url);
            Arc::new(PostgrestStore::new(&url, &key, config.store_timeout())?)
        }
        StoreBackend::Postgres => {
            log::info!("Connecting to PostgreSQL...");
            let database_url = config.database_url()?;
            Arc::new(PostgresStore::new(&database_url, config.store.max_connections).await?)
        }
        StoreBackend::Memory => {
            log::info!("Using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(store)
}
