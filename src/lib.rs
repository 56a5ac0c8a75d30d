pub mod api;
pub mod config;
pub mod logic;
pub mod model;
pub mod pages;
pub mod seed;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;

// Export the console core
pub use logic::{
    normalize_error, CollectionReader, CollectionWriter, Debouncer, ErrorKind, MutationState,
    NormalizedError,
};

// Export all model types
pub use model::*;

// Export store types
pub use store::{MemoryStore, PostgresStore, PostgrestStore, RemoteStore, StoreError};

/// Build the store from configuration, optionally seed it, and serve the
/// console API until the listener fails
pub async fn run_server(config: crate::config::AppConfig) -> anyhow::Result<()> {
    use axum::serve;
    use std::sync::Arc;
    use tokio::net::TcpListener;

    let store = crate::store::connect(&config).await?;

    if config.store.seed {
        crate::seed::load_seed_data(&*store).await?;
    }

    let state = Arc::new(crate::api::ConsoleState::new(store, config.console.clone()));
    let app = crate::api::routes::create_router().with_state(state);

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("Console API listening on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
