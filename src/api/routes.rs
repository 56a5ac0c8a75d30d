use axum::{
    routing::{get, patch},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use crate::api::handlers::{self, AppState};

pub fn create_router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Page catalog
        .route("/api/pages", get(handlers::list_pages))
        // One list page: rows, search and pager
        .route(
            "/api/pages/:page",
            get(handlers::get_page).post(handlers::create_row),
        )
        .route(
            "/api/pages/:page/:id",
            patch(handlers::update_row).delete(handlers::delete_row),
        )
        .layer(
            ServiceBuilder::new().layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
}
