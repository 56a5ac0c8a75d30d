use itertools::Itertools;
use serde_json::Value;
use sqlx::postgres::{PgDatabaseError, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::model::{
    collection, is_identifier, parse_select, CollectionSchema, EmbedJoin, QueryDescriptor, Record,
    SelectItem,
};
use crate::store::traits::{RemoteStore, Selection};
use crate::store::{Rejection, StoreError};

/// Store talking to PostgreSQL directly, for deployments without a REST
/// layer in front of the database
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        use anyhow::Context;

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// A bind parameter for generated SQL
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Int(i64),
    Json(Value),
}

/// Generated statement and its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

fn schema_for(name: &str) -> Result<&'static CollectionSchema, StoreError> {
    collection(name).ok_or_else(|| {
        StoreError::rejected("42P01", format!("relation \"{}\" does not exist", name))
    })
}

fn checked_column<'a>(schema: &CollectionSchema, column: &'a str) -> Result<&'a str, StoreError> {
    if !is_identifier(column) || !schema.has_column(column) {
        return Err(StoreError::rejected(
            "42703",
            format!("column {}.{} does not exist", schema.name, column),
        ));
    }
    Ok(column)
}

/// JSON expression producing one output row for `alias` at nesting `depth`
fn row_expression(
    schema: &'static CollectionSchema,
    items: &[SelectItem],
    depth: usize,
) -> Result<String, StoreError> {
    let alias = format!("t{}", depth);
    let mut whole_row = false;
    let mut pairs = Vec::new();

    for item in items {
        match item {
            SelectItem::Star => whole_row = true,
            SelectItem::Column { name, alias: key } => {
                let column = checked_column(schema, name)?;
                let key = key.as_deref().unwrap_or(column);
                pairs.push(format!("'{}', {}.\"{}\"", key, alias, column));
            }
            SelectItem::Embed(embed) => {
                let inner = format!("t{}", depth + 1);
                let value = match schema.resolve_embed(embed)? {
                    EmbedJoin::ToOne { column, target } => format!(
                        "(SELECT {} FROM \"{}\" {} WHERE {}.id = {}.\"{}\")",
                        row_expression(target, &embed.items, depth + 1)?,
                        target.name,
                        inner,
                        inner,
                        alias,
                        column
                    ),
                    EmbedJoin::ToMany { column, target } => format!(
                        "COALESCE((SELECT jsonb_agg({}) FROM \"{}\" {} WHERE {}.\"{}\" = {}.id), '[]'::jsonb)",
                        row_expression(target, &embed.items, depth + 1)?,
                        target.name,
                        inner,
                        inner,
                        column,
                        alias
                    ),
                };
                pairs.push(format!("'{}', {}", embed.output_key(), value));
            }
        }
    }

    let built = format!("jsonb_build_object({})", pairs.join(", "));
    Ok(match (whole_row, pairs.is_empty()) {
        (true, true) => format!("to_jsonb({})", alias),
        (true, false) => format!("to_jsonb({}) || {}", alias, built),
        (false, _) => built,
    })
}

/// One statement returning the exact filtered count and the requested page
/// as a JSON array, so a fetch stays a single round-trip
pub fn select_statement(query: &QueryDescriptor) -> Result<SqlStatement, StoreError> {
    query.validate()?;
    let schema = schema_for(&query.collection)?;
    let items = parse_select(&query.select)?;
    let mut params = Vec::new();

    let mut where_clause = String::new();
    if let Some(filter) = query.active_filter() {
        params.push(SqlParam::Text(format!("%{}%", escape_like(&filter.term))));
        let conditions: Vec<String> = filter
            .columns
            .iter()
            .map(|c| {
                checked_column(schema, c)
                    .map(|c| format!("t0.\"{}\"::text ILIKE $1 ESCAPE '\\'", c))
            })
            .try_collect()?;
        where_clause = format!(" WHERE ({})", conditions.join(" OR "));
    }

    let order = match &query.sort {
        Some(sort) => {
            let column = checked_column(schema, &sort.column)?;
            let direction = if sort.ascending { "ASC" } else { "DESC" };
            format!("ORDER BY t0.\"{}\" {}", column, direction)
        }
        None => String::new(),
    };

    let mut window = String::new();
    if let Some(range) = query.range() {
        let limit = i64::try_from(range.len()).map_err(|_| {
            StoreError::InvalidQuery(format!("page size {} out of range", range.len()))
        })?;
        // An offset past every row selects an empty page
        let offset = i64::try_from(range.start).unwrap_or(i64::MAX);
        params.push(SqlParam::Int(limit));
        params.push(SqlParam::Int(offset));
        window = format!(" LIMIT ${} OFFSET ${}", params.len() - 1, params.len());
    }

    let sql = format!(
        "WITH filtered AS (SELECT t0.* FROM \"{table}\" t0{where_clause}) \
         SELECT (SELECT count(*) FROM filtered) AS total, \
         COALESCE((SELECT jsonb_agg(page.doc ORDER BY page.ord) FROM \
         (SELECT {row} AS doc, row_number() OVER ({order}) AS ord FROM filtered t0 {order_by}{window}) page), \
         '[]'::jsonb) AS rows",
        table = schema.name,
        where_clause = where_clause,
        row = row_expression(schema, &items, 0)?,
        order = order,
        order_by = order,
        window = window,
    );

    Ok(SqlStatement { sql, params })
}

fn record_columns<'a>(schema: &CollectionSchema, record: &'a Record) -> Result<Vec<&'a str>, StoreError> {
    record
        .keys()
        .map(|key| checked_column(schema, key))
        .try_collect()
}

pub fn insert_statement(collection_name: &str, record: Record) -> Result<SqlStatement, StoreError> {
    let schema = schema_for(collection_name)?;
    let columns = record_columns(schema, &record)?;

    if columns.is_empty() {
        return Ok(SqlStatement {
            sql: format!(
                "INSERT INTO \"{}\" AS t DEFAULT VALUES RETURNING to_jsonb(t.*) AS doc",
                schema.name
            ),
            params: Vec::new(),
        });
    }

    let list = columns.iter().map(|c| format!("\"{}\"", c)).join(", ");
    let sql = format!(
        "INSERT INTO \"{table}\" AS t ({list}) SELECT {list} FROM jsonb_populate_record(NULL::\"{table}\", $1) \
         RETURNING to_jsonb(t.*) AS doc",
        table = schema.name,
        list = list,
    );
    Ok(SqlStatement {
        sql,
        params: vec![SqlParam::Json(Value::Object(record))],
    })
}

pub fn update_statement(collection_name: &str, id: &str, record: Record) -> Result<SqlStatement, StoreError> {
    let schema = schema_for(collection_name)?;
    let columns = record_columns(schema, &record)?;
    if columns.is_empty() {
        return Err(StoreError::InvalidQuery("update without any field".to_string()));
    }

    let assignments = columns
        .iter()
        .map(|c| format!("\"{}\" = r.\"{}\"", c, c))
        .join(", ");
    let sql = format!(
        "UPDATE \"{table}\" AS t SET {assignments} \
         FROM jsonb_populate_record(NULL::\"{table}\", $1) AS r \
         WHERE t.id = $2::uuid RETURNING to_jsonb(t.*) AS doc",
        table = schema.name,
        assignments = assignments,
    );
    Ok(SqlStatement {
        sql,
        params: vec![SqlParam::Json(Value::Object(record)), SqlParam::Text(id.to_string())],
    })
}

pub fn delete_statement(collection_name: &str, id: &str) -> Result<SqlStatement, StoreError> {
    let schema = schema_for(collection_name)?;
    Ok(SqlStatement {
        sql: format!("DELETE FROM \"{}\" WHERE id = $1::uuid", schema.name),
        params: vec![SqlParam::Text(id.to_string())],
    })
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) => {
            let details = db
                .try_downcast_ref::<PgDatabaseError>()
                .and_then(|pg| pg.detail())
                .map(str::to_string);
            StoreError::Rejected(Rejection {
                code: db.code().map(|code| code.into_owned()),
                message: Some(db.message().to_string()),
                details,
                hint: None,
            })
        }
        other => StoreError::Transport(other.to_string()),
    }
}

fn bound(statement: &SqlStatement) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
    let mut query = sqlx::query(&statement.sql);
    for param in &statement.params {
        query = match param {
            SqlParam::Text(text) => query.bind(text.clone()),
            SqlParam::Int(n) => query.bind(*n),
            SqlParam::Json(value) => query.bind(Json(value.clone())),
        };
    }
    query
}

fn row_record(row: &sqlx::postgres::PgRow) -> Result<Record, StoreError> {
    let Json(record) = row
        .try_get::<Json<Record>, _>("doc")
        .map_err(map_sqlx_error)?;
    Ok(record)
}

#[async_trait::async_trait]
impl RemoteStore for PostgresStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn select(&self, query: &QueryDescriptor) -> Result<Selection, StoreError> {
        let statement = select_statement(query)?;
        log::debug!("postgres select {}", query.collection);

        let row = bound(&statement)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let total: i64 = row.try_get("total").map_err(map_sqlx_error)?;
        let Json(rows) = row
            .try_get::<Json<Vec<Record>>, _>("rows")
            .map_err(map_sqlx_error)?;

        Ok(Selection {
            rows,
            total_count: Some(total.max(0) as u64),
        })
    }

    async fn insert(&self, collection: &str, record: Record) -> Result<Record, StoreError> {
        let statement = insert_statement(collection, record)?;
        log::debug!("postgres insert into {}", collection);

        let row = bound(&statement)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row_record(&row)
    }

    async fn update(&self, collection: &str, id: &str, record: Record) -> Result<Record, StoreError> {
        let statement = update_statement(collection, id, record)?;
        log::debug!("postgres update {} id={}", collection, id);

        let row = bound(&statement)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        match row {
            Some(row) => row_record(&row),
            None => Err(Rejection::no_rows().into()),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let statement = delete_statement(collection, id)?;
        log::debug!("postgres delete {} id={}", collection, id);

        bound(&statement)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{record_from, SearchFilter, SortSpec};
    use serde_json::json;

    #[test]
    fn test_select_statement_with_filter_sort_and_page() {
        let query = QueryDescriptor::new("organizations")
            .order_by(SortSpec::asc("org_name"))
            .paginate(10, 20)
            .search(SearchFilter::new("del_fi", ["org_code", "org_name"]));

        let statement = select_statement(&query).unwrap();
        assert!(statement.sql.contains("FROM \"organizations\" t0 WHERE"));
        assert!(statement
            .sql
            .contains("t0.\"org_code\"::text ILIKE $1 ESCAPE '\\' OR t0.\"org_name\"::text ILIKE $1"));
        assert!(statement.sql.contains("ORDER BY t0.\"org_name\" ASC LIMIT $2 OFFSET $3"));
        assert!(statement.sql.contains("to_jsonb(t0) AS doc"));
        assert_eq!(
            statement.params,
            vec![
                SqlParam::Text("%del\\_fi%".to_string()),
                SqlParam::Int(10),
                SqlParam::Int(20)
            ]
        );
    }

    #[test]
    fn test_select_statement_caps_huge_offset() {
        let query = QueryDescriptor::new("organizations").paginate(10, usize::MAX - 10);
        let statement = select_statement(&query).unwrap();
        assert_eq!(
            statement.params,
            vec![SqlParam::Int(10), SqlParam::Int(i64::MAX)]
        );

        let unbounded = QueryDescriptor::new("organizations").paginate(usize::MAX, 0);
        assert!(matches!(
            select_statement(&unbounded),
            Err(StoreError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_select_statement_embeds_relations() {
        let query = QueryDescriptor::new("goods_receipts")
            .select("*, partners ( partner_name ), warehouses ( wh_name )");

        let statement = select_statement(&query).unwrap();
        assert!(statement.sql.contains(
            "to_jsonb(t0) || jsonb_build_object('partners', (SELECT jsonb_build_object('partner_name', t1.\"partner_name\") FROM \"partners\" t1 WHERE t1.id = t0.\"partner_id\")"
        ));
        assert!(statement.sql.contains("'warehouses', (SELECT"));
        assert!(statement.params.is_empty());
    }

    #[test]
    fn test_select_statement_rejects_unknown_columns() {
        let query = QueryDescriptor::new("organizations").order_by(SortSpec::asc("nope"));
        assert_eq!(
            select_statement(&query).unwrap_err().code(),
            Some("42703")
        );

        let unknown = QueryDescriptor::new("ghosts");
        assert_eq!(select_statement(&unknown).unwrap_err().code(), Some("42P01"));
    }

    #[test]
    fn test_insert_statement_only_lists_given_columns() {
        let record = record_from(json!({"org_code": "DELFI", "org_name": "Delfi", "status": "Active"}));
        let statement = insert_statement("organizations", record).unwrap();
        assert!(statement.sql.contains("(\"org_code\", \"org_name\", \"status\")"));
        assert!(statement.sql.contains("jsonb_populate_record(NULL::\"organizations\", $1)"));
        assert_eq!(statement.params.len(), 1);
    }

    #[test]
    fn test_update_statement_targets_id() {
        let record = record_from(json!({"org_name": "Delfi VN"}));
        let statement = update_statement("organizations", "abc", record).unwrap();
        assert!(statement.sql.contains("SET \"org_name\" = r.\"org_name\""));
        assert!(statement.sql.contains("WHERE t.id = $2::uuid"));
        assert_eq!(statement.params[1], SqlParam::Text("abc".to_string()));

        assert!(update_statement("organizations", "abc", Record::new()).is_err());
    }
}
