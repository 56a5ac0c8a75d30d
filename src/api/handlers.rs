use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Json as RequestJson,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::ConsoleConfig;
use crate::logic::{ErrorKind, NormalizedError};
use crate::model::Record;
use crate::pages::{self, DeleteOutcome, PageConfig, PageListing, PageView, Toast};
use crate::store::RemoteStore;

/// Shared by every request: the store handle and console settings
pub struct ConsoleState {
    pub store: Arc<dyn RemoteStore>,
    pub settings: ConsoleConfig,
}

impl ConsoleState {
    pub fn new(store: Arc<dyn RemoteStore>, settings: ConsoleConfig) -> Self {
        Self { store, settings }
    }

    fn view(&self, config: &'static PageConfig) -> PageView {
        PageView::new(
            config,
            self.store.clone(),
            self.settings.page_size,
            std::time::Duration::from_millis(self.settings.search_debounce_ms),
        )
    }
}

pub type AppState = Arc<ConsoleState>;

type ApiResult<T> = Result<T, (StatusCode, Json<ErrorResponse>)>;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub backend: String,
    pub timestamp: String,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        backend: state.store.backend().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `?page=2&search=kho`
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<usize>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

/// A successful write with the stored row and the toast to show
#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub row: Record,
    pub toast: Toast,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::UniqueViolation | ErrorKind::ForeignKeyViolation => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Transport => StatusCode::BAD_GATEWAY,
        ErrorKind::InvalidQuery | ErrorKind::Rejected => StatusCode::BAD_REQUEST,
    }
}

fn failure(err: NormalizedError) -> (StatusCode, Json<ErrorResponse>) {
    (status_for(err.kind), Json(ErrorResponse::new(&err.message)))
}

fn find_page(slug: &str) -> ApiResult<&'static PageConfig> {
    pages::page(slug).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(&format!("Không tìm thấy trang '{}'.", slug))),
        )
    })
}

/// Catalog entry: the page's UI fields plus its delete confirmation text
#[derive(Debug, Serialize)]
pub struct PageSummary {
    #[serde(flatten)]
    pub page: &'static PageConfig,
    pub delete_prompt: String,
}

pub async fn list_pages() -> Json<ListResponse<PageSummary>> {
    let items: Vec<PageSummary> = pages::PAGES
        .iter()
        .map(|page| PageSummary {
            page,
            delete_prompt: page.delete_prompt(),
        })
        .collect();
    Json(ListResponse {
        total: items.len(),
        items,
    })
}

pub async fn get_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<PageListing>> {
    let config = find_page(&slug)?;
    let view = state.view(config);

    let listing = view
        .open(query.page.unwrap_or(1), query.search.as_deref().unwrap_or(""))
        .await;
    if let Some(error) = &listing.error {
        return Err((StatusCode::BAD_GATEWAY, Json(ErrorResponse::new(error))));
    }
    Ok(Json(listing))
}

pub async fn create_row(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    RequestJson(record): RequestJson<Record>,
) -> ApiResult<(StatusCode, Json<MutationResponse>)> {
    let config = find_page(&slug)?;
    let view = state.view(config);

    let row = view
        .writer()
        .insert(config.collection, record)
        .await
        .map_err(failure)?;
    Ok((
        StatusCode::CREATED,
        Json(MutationResponse {
            row,
            toast: Toast::success(format!("Đã thêm {} thành công.", config.entity)),
        }),
    ))
}

pub async fn update_row(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, String)>,
    RequestJson(record): RequestJson<Record>,
) -> ApiResult<Json<MutationResponse>> {
    let config = find_page(&slug)?;
    let view = state.view(config);

    let row = view
        .writer()
        .update(config.collection, &id, record)
        .await
        .map_err(failure)?;
    Ok(Json(MutationResponse {
        row,
        toast: Toast::success(format!("Đã cập nhật {} thành công.", config.entity)),
    }))
}

/// Delete confirmation flow: load the page the operator is on, delete, and
/// answer with the page to show next
pub async fn delete_row(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, String)>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<DeleteOutcome>> {
    let config = find_page(&slug)?;
    let view = state.view(config);

    let before = view
        .open(query.page.unwrap_or(1), query.search.as_deref().unwrap_or(""))
        .await;
    if let Some(error) = &before.error {
        return Err((StatusCode::BAD_GATEWAY, Json(ErrorResponse::new(error))));
    }

    let outcome = view.confirm_delete(&id).await;
    match outcome.failure {
        Some(kind) => Err((status_for(kind), Json(ErrorResponse::new(&outcome.toast.message)))),
        None => Ok(Json(outcome)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::UniqueViolation), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::ForeignKeyViolation), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(status_for(ErrorKind::Transport), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(ErrorKind::Rejected), StatusCode::BAD_REQUEST);
    }
}
