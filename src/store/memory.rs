use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::model::{
    collection, generate_id, now_timestamp, parse_select, searchable_text, CollectionSchema,
    EmbedJoin, QueryDescriptor, Record, SearchFilter, SelectItem, SortSpec,
};
use crate::store::traits::{RemoteStore, Selection};
use crate::store::{codes, Rejection, StoreError};

type Tables = HashMap<String, Vec<Record>>;

/// Store kept entirely in process memory.
///
/// Enforces the catalog's unique, not-null and foreign key constraints with
/// the same error codes a PostgreSQL backend reports, and cascades deletes
/// to owned line rows. Rows keep insertion order until a query sorts them.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All rows of a collection in insertion order
    pub async fn rows(&self, collection: &str) -> Vec<Record> {
        let tables = self.tables.read().await;
        tables.get(collection).cloned().unwrap_or_default()
    }
}

fn schema_for(name: &str) -> Result<&'static CollectionSchema, StoreError> {
    collection(name).ok_or_else(|| {
        StoreError::rejected("42P01", format!("relation \"{}\" does not exist", name))
    })
}

fn missing_column(schema: &CollectionSchema, column: &str) -> StoreError {
    StoreError::rejected(
        "42703",
        format!("column {}.{} does not exist", schema.name, column),
    )
}

fn id_of(row: &Record) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

fn field<'a>(row: &'a Record, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&Value::Null)
}

fn matches_filter(row: &Record, filter: &SearchFilter) -> bool {
    let needle = filter.term.to_lowercase();
    filter.columns.iter().any(|column| {
        searchable_text(field(row, column))
            .map(|text| text.to_lowercase().contains(&needle))
            .unwrap_or(false)
    })
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => searchable_text(a).cmp(&searchable_text(b)),
    }
}

/// Ascending puts nulls last, descending puts them first
fn compare_rows(a: &Record, b: &Record, sort: &SortSpec) -> Ordering {
    let (a, b) = (field(a, &sort.column), field(b, &sort.column));
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) if sort.ascending => Ordering::Greater,
        (true, false) => Ordering::Less,
        (false, true) if sort.ascending => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) if sort.ascending => compare_values(a, b),
        (false, false) => compare_values(a, b).reverse(),
    }
}

fn project(
    tables: &Tables,
    schema: &'static CollectionSchema,
    row: &Record,
    items: &[SelectItem],
) -> Result<Record, StoreError> {
    let mut out = Record::new();
    for item in items {
        match item {
            SelectItem::Star => {
                out.extend(row.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            SelectItem::Column { name, alias } => {
                if !schema.has_column(name) {
                    return Err(missing_column(schema, name));
                }
                let key = alias.as_deref().unwrap_or(name);
                out.insert(key.to_string(), field(row, name).clone());
            }
            SelectItem::Embed(embed) => {
                let value = match schema.resolve_embed(embed)? {
                    EmbedJoin::ToOne { column, target } => {
                        let parent = field(row, column).as_str();
                        let related = tables
                            .get(target.name)
                            .and_then(|rows| rows.iter().find(|r| parent.is_some() && id_of(r) == parent));
                        match related {
                            Some(related) => {
                                Value::Object(project(tables, target, related, &embed.items)?)
                            }
                            None => Value::Null,
                        }
                    }
                    EmbedJoin::ToMany { column, target } => {
                        let parent = id_of(row);
                        let mut children = Vec::new();
                        for child in tables.get(target.name).into_iter().flatten() {
                            if parent.is_some() && field(child, column).as_str() == parent {
                                children.push(Value::Object(project(tables, target, child, &embed.items)?));
                            }
                        }
                        Value::Array(children)
                    }
                };
                out.insert(embed.output_key().to_string(), value);
            }
        }
    }
    Ok(out)
}

/// Check a candidate row against the collection's constraints.
/// `skip` is the index of the row being replaced, if any.
fn check_constraints(
    tables: &Tables,
    schema: &CollectionSchema,
    row: &Record,
    skip: Option<usize>,
) -> Result<(), StoreError> {
    for column in schema.required {
        if field(row, column).is_null() {
            return Err(StoreError::rejected(
                codes::NOT_NULL_VIOLATION,
                format!(
                    "null value in column \"{}\" of relation \"{}\" violates not-null constraint",
                    column, schema.name
                ),
            ));
        }
    }

    let existing = tables.get(schema.name).map(Vec::as_slice).unwrap_or(&[]);
    let others = || {
        existing
            .iter()
            .enumerate()
            .filter(move |(i, _)| Some(*i) != skip)
            .map(|(_, r)| r)
    };

    for column in std::iter::once(&"id").chain(schema.unique.iter()) {
        let value = field(row, column);
        if value.is_null() {
            continue;
        }
        if others().any(|other| field(other, column) == value) {
            let constraint = if *column == "id" {
                format!("{}_pkey", schema.name)
            } else {
                format!("{}_{}_key", schema.name, column)
            };
            return Err(Rejection::new(
                codes::UNIQUE_VIOLATION,
                format!("duplicate key value violates unique constraint \"{}\"", constraint),
            )
            .with_details(format!(
                "Key ({})=({}) already exists.",
                column,
                searchable_text(value).unwrap_or_default()
            ))
            .into());
        }
    }

    for fk in schema.foreign_keys {
        let Some(target_id) = field(row, fk.column).as_str() else {
            continue;
        };
        let present = tables
            .get(fk.references)
            .map_or(false, |rows| rows.iter().any(|r| id_of(r) == Some(target_id)));
        if !present {
            return Err(Rejection::new(
                codes::FOREIGN_KEY_VIOLATION,
                format!(
                    "insert or update on table \"{}\" violates foreign key constraint \"{}_{}_fkey\"",
                    schema.name, schema.name, fk.column
                ),
            )
            .with_details(format!(
                "Key ({})=({}) is not present in table \"{}\".",
                fk.column, target_id, fk.references
            ))
            .into());
        }
    }
    Ok(())
}

fn check_write_columns(schema: &CollectionSchema, record: &Record) -> Result<(), StoreError> {
    match record.keys().find(|key| !schema.has_column(key)) {
        Some(key) => Err(StoreError::rejected(
            "PGRST204",
            format!(
                "Could not find the '{}' column of '{}' in the schema cache",
                key, schema.name
            ),
        )),
        None => Ok(()),
    }
}

/// Rows removed by deleting `id` from `schema`, owned rows included
fn collect_deletion(
    tables: &Tables,
    schema: &'static CollectionSchema,
    id: &str,
    doomed: &mut Vec<(&'static str, String)>,
) -> Result<(), StoreError> {
    doomed.push((schema.name, id.to_string()));
    for (other, fk) in schema.referencing() {
        let children: Vec<String> = tables
            .get(other.name)
            .into_iter()
            .flatten()
            .filter(|row| field(row, fk.column).as_str() == Some(id))
            .filter_map(|row| id_of(row).map(str::to_string))
            .collect();
        if children.is_empty() {
            continue;
        }
        if !fk.cascade {
            return Err(Rejection::new(
                codes::FOREIGN_KEY_VIOLATION,
                format!(
                    "update or delete on table \"{}\" violates foreign key constraint \"{}_{}_fkey\" on table \"{}\"",
                    schema.name, other.name, fk.column, other.name
                ),
            )
            .with_details(format!(
                "Key (id)=({}) is still referenced from table \"{}\".",
                id, other.name
            ))
            .into());
        }
        for child in children {
            collect_deletion(tables, other, &child, doomed)?;
        }
    }
    Ok(())
}

#[async_trait::async_trait]
impl RemoteStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn select(&self, query: &QueryDescriptor) -> Result<Selection, StoreError> {
        query.validate()?;
        let schema = schema_for(&query.collection)?;
        let items = parse_select(&query.select)?;

        let filter = query.active_filter();
        if let Some(filter) = filter {
            if let Some(bad) = filter.columns.iter().find(|c| !schema.has_column(c)) {
                return Err(missing_column(schema, bad));
            }
        }
        if let Some(sort) = &query.sort {
            if !schema.has_column(&sort.column) {
                return Err(missing_column(schema, &sort.column));
            }
        }

        let tables = self.tables.read().await;
        let mut matched: Vec<&Record> = tables
            .get(schema.name)
            .into_iter()
            .flatten()
            .filter(|row| filter.map_or(true, |f| matches_filter(row, f)))
            .collect();

        if let Some(sort) = &query.sort {
            matched.sort_by(|a, b| compare_rows(a, b, sort));
        }

        let total = matched.len();
        let window = match query.range() {
            Some(range) => {
                let start = range.start.min(total);
                let end = range.end.min(total);
                &matched[start..end]
            }
            None => &matched[..],
        };

        let rows = window
            .iter()
            .map(|row| project(&tables, schema, row, &items))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Selection {
            rows,
            total_count: Some(total as u64),
        })
    }

    async fn insert(&self, collection: &str, record: Record) -> Result<Record, StoreError> {
        let schema = schema_for(collection)?;
        check_write_columns(schema, &record)?;

        let mut row = Record::new();
        for column in schema.columns {
            row.insert(column.to_string(), field(&record, column).clone());
        }
        if field(&row, "id").is_null() {
            row.insert("id".to_string(), Value::String(generate_id()));
        }
        let now = Value::String(now_timestamp());
        for column in ["created_at", "updated_at"] {
            if schema.has_column(column) && field(&row, column).is_null() {
                row.insert(column.to_string(), now.clone());
            }
        }

        let mut tables = self.tables.write().await;
        check_constraints(&tables, schema, &row, None)?;
        tables.entry(schema.name.to_string()).or_default().push(row.clone());
        log::debug!("memory insert into {}", collection);
        Ok(row)
    }

    async fn update(&self, collection: &str, id: &str, record: Record) -> Result<Record, StoreError> {
        let schema = schema_for(collection)?;
        if record.is_empty() {
            return Err(StoreError::InvalidQuery("update without any field".to_string()));
        }
        check_write_columns(schema, &record)?;

        let mut tables = self.tables.write().await;
        let index = tables
            .get(schema.name)
            .and_then(|rows| rows.iter().position(|r| id_of(r) == Some(id)))
            .ok_or_else(|| StoreError::from(Rejection::no_rows()))?;

        let mut row = tables[schema.name][index].clone();
        let touched = record.contains_key("updated_at");
        row.extend(record);
        if schema.tracks_updates() && !touched {
            row.insert("updated_at".to_string(), Value::String(now_timestamp()));
        }

        check_constraints(&tables, schema, &row, Some(index))?;
        if let Some(rows) = tables.get_mut(schema.name) {
            rows[index] = row.clone();
        }
        log::debug!("memory update {} id={}", collection, id);
        Ok(row)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let schema = schema_for(collection)?;
        let mut tables = self.tables.write().await;

        let exists = tables
            .get(schema.name)
            .map_or(false, |rows| rows.iter().any(|r| id_of(r) == Some(id)));
        if !exists {
            return Ok(());
        }

        let mut doomed = Vec::new();
        collect_deletion(&tables, schema, id, &mut doomed)?;
        for (name, doomed_id) in &doomed {
            if let Some(rows) = tables.get_mut(*name) {
                rows.retain(|r| id_of(r) != Some(doomed_id.as_str()));
            }
        }
        log::debug!("memory delete {} id={} ({} rows)", collection, id, doomed.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record_from;
    use serde_json::json;

    async fn insert(store: &MemoryStore, collection: &str, value: Value) -> Record {
        store.insert(collection, record_from(value)).await.unwrap()
    }

    async fn org(store: &MemoryStore, code: &str, name: &str) -> String {
        let row = insert(
            store,
            "organizations",
            json!({"org_code": code, "org_name": name, "status": "Active"}),
        )
        .await;
        id_of(&row).unwrap().to_string()
    }

    #[tokio::test]
    async fn test_insert_fills_generated_fields() {
        let store = MemoryStore::new();
        let row = insert(
            &store,
            "organizations",
            json!({"org_code": "DELFI", "org_name": "Delfi", "status": "Active"}),
        )
        .await;

        assert!(id_of(&row).is_some());
        assert!(row["created_at"].is_string());
        assert!(row["updated_at"].is_string());
        assert_eq!(row["address"], Value::Null);
    }

    #[tokio::test]
    async fn test_unique_violation_code() {
        let store = MemoryStore::new();
        org(&store, "DELFI", "Delfi").await;

        let err = store
            .insert(
                "organizations",
                record_from(json!({"org_code": "DELFI", "org_name": "Other", "status": "Active"})),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(codes::UNIQUE_VIOLATION));
        assert_eq!(store.rows("organizations").await.len(), 1);
    }

    #[tokio::test]
    async fn test_not_null_and_foreign_key_violations() {
        let store = MemoryStore::new();
        let err = store
            .insert("organizations", record_from(json!({"org_code": "X", "status": "Active"})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(codes::NOT_NULL_VIOLATION));

        let err = store
            .insert(
                "branches",
                record_from(json!({
                    "branch_code": "HN",
                    "branch_name": "Ha Noi",
                    "organization_id": "missing",
                    "status": "Active"
                })),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(codes::FOREIGN_KEY_VIOLATION));
    }

    #[tokio::test]
    async fn test_unknown_write_column_rejected() {
        let store = MemoryStore::new();
        let err = store
            .insert("organizations", record_from(json!({"nickname": "x"})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("PGRST204"));
    }

    #[tokio::test]
    async fn test_select_filters_sorts_and_paginates() {
        let store = MemoryStore::new();
        for (code, name) in [("C", "Gamma"), ("A", "alpha"), ("B", "Beta"), ("D", "Alpine")] {
            org(&store, code, name).await;
        }

        let query = QueryDescriptor::new("organizations")
            .order_by(SortSpec::asc("org_code"))
            .search(SearchFilter::new("AL", ["org_name"]))
            .paginate(1, 1);
        let selection = store.select(&query).await.unwrap();

        assert_eq!(selection.total_count, Some(2));
        assert_eq!(selection.rows.len(), 1);
        assert_eq!(selection.rows[0]["org_code"], json!("D"));
    }

    #[tokio::test]
    async fn test_offset_past_end_is_empty() {
        let store = MemoryStore::new();
        org(&store, "A", "Alpha").await;

        let query = QueryDescriptor::new("organizations").paginate(10, 10);
        let selection = store.select(&query).await.unwrap();
        assert!(selection.rows.is_empty());
        assert_eq!(selection.total_count, Some(1));
    }

    #[tokio::test]
    async fn test_descending_sort_puts_nulls_first() {
        let store = MemoryStore::new();
        let a = org(&store, "A", "Alpha").await;
        org(&store, "B", "Beta").await;
        store
            .update("organizations", &a, record_from(json!({"phone": "0901"})))
            .await
            .unwrap();

        let desc = QueryDescriptor::new("organizations").order_by(SortSpec::desc("phone"));
        let rows = store.select(&desc).await.unwrap().rows;
        assert_eq!(rows[0]["org_code"], json!("B"));

        let asc = QueryDescriptor::new("organizations").order_by(SortSpec::asc("phone"));
        let rows = store.select(&asc).await.unwrap().rows;
        assert_eq!(rows[0]["org_code"], json!("A"));
    }

    #[tokio::test]
    async fn test_embeds_resolve_both_directions() {
        let store = MemoryStore::new();
        let org_id = org(&store, "DELFI", "Delfi").await;
        insert(
            &store,
            "branches",
            json!({"branch_code": "HN", "branch_name": "Ha Noi", "organization_id": org_id, "status": "Active"}),
        )
        .await;

        let branches = store
            .select(&QueryDescriptor::new("branches").select("*, organizations ( org_name )"))
            .await
            .unwrap();
        assert_eq!(branches.rows[0]["organizations"], json!({"org_name": "Delfi"}));

        let orgs = store
            .select(&QueryDescriptor::new("organizations").select("org_code, branches ( branch_code )"))
            .await
            .unwrap();
        assert_eq!(
            orgs.rows[0],
            record_from(json!({"org_code": "DELFI", "branches": [{"branch_code": "HN"}]}))
        );
    }

    #[tokio::test]
    async fn test_update_missing_row_reports_no_rows() {
        let store = MemoryStore::new();
        let err = store
            .update("organizations", "nope", record_from(json!({"org_name": "x"})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(codes::NO_ROWS));
    }

    #[tokio::test]
    async fn test_delete_referenced_row_is_rejected() {
        let store = MemoryStore::new();
        let org_id = org(&store, "DELFI", "Delfi").await;
        insert(
            &store,
            "branches",
            json!({"branch_code": "HN", "branch_name": "Ha Noi", "organization_id": org_id, "status": "Active"}),
        )
        .await;

        let err = store.delete("organizations", &org_id).await.unwrap_err();
        assert_eq!(err.code(), Some(codes::FOREIGN_KEY_VIOLATION));
        assert_eq!(store.rows("organizations").await.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_owned_lines() {
        let store = MemoryStore::new();
        let org_id = org(&store, "DELFI", "Delfi").await;
        let branch = insert(
            &store,
            "branches",
            json!({"branch_code": "HN", "branch_name": "Ha Noi", "organization_id": org_id, "status": "Active"}),
        )
        .await;
        let warehouse = insert(
            &store,
            "warehouses",
            json!({"wh_code": "WH1", "wh_name": "Kho 1", "branch_id": id_of(&branch), "status": "Active"}),
        )
        .await;
        let ticket = insert(
            &store,
            "rearrangement_tickets",
            json!({"ticket_no": "RT-1", "status": "Draft", "warehouse_id": id_of(&warehouse)}),
        )
        .await;
        let ticket_id = id_of(&ticket).unwrap().to_string();

        let goods_type = insert(
            &store,
            "goods_types",
            json!({"goods_type_code": "EL", "goods_type_name": "Electronics", "status": "Active"}),
        )
        .await;
        let uom = insert(
            &store,
            "uoms",
            json!({"uom_code": "CAI", "uom_name": "Cai", "measurement_type": "Quantity", "uom_type": "Reference", "status": "Active"}),
        )
        .await;
        let goods = insert(
            &store,
            "model_goods",
            json!({
                "model_code": "IPHONE15",
                "model_name": "iPhone 15",
                "goods_type_id": id_of(&goods_type),
                "base_uom_id": id_of(&uom),
                "tracking_type": "Serial",
                "status": "Active"
            }),
        )
        .await;
        let loc = insert(
            &store,
            "locations",
            json!({"loc_code": "A1", "loc_name": "Ke A1", "warehouse_id": id_of(&warehouse), "status": "Active"}),
        )
        .await;
        insert(
            &store,
            "rearrangement_ticket_lines",
            json!({
                "ticket_id": ticket_id,
                "model_goods_id": id_of(&goods),
                "source_location_id": id_of(&loc),
                "destination_location_id": id_of(&loc),
                "quantity": 3
            }),
        )
        .await;

        store.delete("rearrangement_tickets", &ticket_id).await.unwrap();
        assert!(store.rows("rearrangement_tickets").await.is_empty());
        assert!(store.rows("rearrangement_ticket_lines").await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_row_succeeds() {
        let store = MemoryStore::new();
        assert!(store.delete("organizations", "nope").await.is_ok());
    }
}
