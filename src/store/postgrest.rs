use itertools::Itertools;
use reqwest::{header, Client, RequestBuilder, Response};
use std::time::Duration;

use crate::model::{is_identifier, parse_select, QueryDescriptor, Record, SearchFilter, SortSpec};
use crate::store::traits::{RemoteStore, Selection};
use crate::store::{Rejection, StoreError};

const REST_PATH: &str = "/rest/v1";
/// Ask for a single JSON object instead of an array
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Store backed by a PostgREST endpoint (Supabase style `/rest/v1`)
#[derive(Debug, Clone)]
pub struct PostgrestStore {
    http: Client,
    rest_url: String,
    access_key: String,
}

impl PostgrestStore {
    pub fn new(base_url: &str, access_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("wms-console/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            rest_url: rest_url(base_url),
            access_key: access_key.to_string(),
        })
    }

    fn collection_url(&self, collection: &str) -> Result<String, StoreError> {
        if !is_identifier(collection) {
            return Err(StoreError::InvalidQuery(format!(
                "invalid collection name '{}'",
                collection
            )));
        }
        Ok(format!("{}/{}", self.rest_url, collection))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.access_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.access_key))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }
        Err(rejection_from(response).await)
    }

    async fn single_row(&self, request: RequestBuilder) -> Result<Record, StoreError> {
        let response = self
            .send(
                request
                    .header("Prefer", "return=representation")
                    .header(header::ACCEPT, SINGLE_OBJECT),
            )
            .await?;
        response
            .json::<Record>()
            .await
            .map_err(|e| StoreError::Transport(format!("unreadable response: {}", e)))
    }
}

/// `https://x.supabase.co` and `https://x.supabase.co/rest/v1/` both map to
/// the REST root
fn rest_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with(REST_PATH) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, REST_PATH)
    }
}

/// Query-string parameters for a select
pub fn select_params(query: &QueryDescriptor) -> Result<Vec<(String, String)>, StoreError> {
    query.validate()?;
    parse_select(&query.select)?;

    let select: String = query.select.chars().filter(|c| !c.is_whitespace()).collect();
    let mut params = vec![("select".to_string(), select)];

    if let Some(filter) = query.active_filter() {
        params.push(("or".to_string(), or_filter(filter)));
    }
    if let Some(SortSpec { column, ascending }) = &query.sort {
        let direction = if *ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{}", column, direction)));
    }
    if let Some(range) = query.range() {
        params.push(("offset".to_string(), range.start.to_string()));
        params.push(("limit".to_string(), range.len().to_string()));
    }
    Ok(params)
}

/// `(col_a.ilike."*term*",col_b.ilike."*term*")`
fn or_filter(filter: &SearchFilter) -> String {
    let pattern = quote(&format!("*{}*", escape_like(&filter.term)));
    let conditions = filter
        .columns
        .iter()
        .map(|column| format!("{}.ilike.{}", column, pattern))
        .join(",");
    format!("({})", conditions)
}

/// Make `%`, `_` and `\` in user input match literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Double-quote a filter value so commas and parentheses stay literal
fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// Total from a `Content-Range` header such as `0-9/42` or `*/0`
pub fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit('/').next().and_then(|total| total.trim().parse().ok())
}

async fn rejection_from(response: Response) -> StoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<Rejection>(&body) {
        Ok(rejection) if rejection.code.is_some() || rejection.message.is_some() => {
            StoreError::Rejected(rejection)
        }
        _ => StoreError::Transport(format!("HTTP {}: {}", status.as_u16(), body.trim())),
    }
}

#[async_trait::async_trait]
impl RemoteStore for PostgrestStore {
    fn backend(&self) -> &'static str {
        "postgrest"
    }

    async fn select(&self, query: &QueryDescriptor) -> Result<Selection, StoreError> {
        let params = select_params(query)?;
        let url = self.collection_url(&query.collection)?;
        log::debug!("postgrest select {} {:?}", query.collection, params);

        let response = self
            .send(self.http.get(url).query(&params).header("Prefer", "count=exact"))
            .await?;

        let total_count = response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range);
        let rows = response
            .json::<Vec<Record>>()
            .await
            .map_err(|e| StoreError::Transport(format!("unreadable response: {}", e)))?;

        Ok(Selection { rows, total_count })
    }

    async fn insert(&self, collection: &str, record: Record) -> Result<Record, StoreError> {
        let url = self.collection_url(collection)?;
        log::debug!("postgrest insert into {}", collection);
        self.single_row(self.http.post(url).json(&record)).await
    }

    async fn update(&self, collection: &str, id: &str, record: Record) -> Result<Record, StoreError> {
        let url = self.collection_url(collection)?;
        log::debug!("postgrest update {} id={}", collection, id);
        let request = self
            .http
            .patch(url)
            .query(&[("id", format!("eq.{}", id))])
            .json(&record);
        self.single_row(request).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let url = self.collection_url(collection)?;
        log::debug!("postgrest delete {} id={}", collection, id);
        self.send(self.http.delete(url).query(&[("id", format!("eq.{}", id))]))
            .await?;
        Ok(())
    }
}
