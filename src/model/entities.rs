//! Typed views of the joined rows the console pages fetch.
//!
//! Each row mirrors the page's select expression: the collection's own
//! columns plus optional nested records for embedded relations. Pages work
//! with flattened rows, where nested names are lifted to top-level fields.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::model::{CountType, DocStatus, Id, Record, Status};

/// Shown in place of a missing related record
pub const NOT_AVAILABLE: &str = "N/A";

/// A joined row that can be flattened for tabular display
pub trait DisplayRow: DeserializeOwned + Serialize {
    /// Top-level fields lifted out of the nested records
    fn lifted(&self) -> Vec<(&'static str, Option<String>)>;

    fn flatten(&self) -> Record {
        let mut record = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Record::new(),
        };
        for (key, value) in self.lifted() {
            let value = value.unwrap_or_else(|| NOT_AVAILABLE.to_string());
            record.insert(key.to_string(), Value::String(value));
        }
        record
    }
}

/// Deserialize a raw row into `T` and flatten it
pub fn flatten_as<T: DisplayRow>(row: &Record) -> Result<Record, serde_json::Error> {
    let typed: T = serde_json::from_value(Value::Object(row.clone()))?;
    Ok(typed.flatten())
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationRef {
    pub org_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BranchRef {
    pub branch_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseRef {
    pub wh_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartnerRef {
    pub partner_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoodsTypeRef {
    pub goods_type_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UomRef {
    pub uom_name: Option<String>,
}

fn name_of<R>(nested: &Option<R>, get: impl Fn(&R) -> &Option<String>) -> Option<String> {
    nested.as_ref().and_then(|r| get(r).clone())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationRow {
    pub id: Id,
    pub org_code: String,
    pub org_name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub status: Status,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl DisplayRow for OrganizationRow {
    fn lifted(&self) -> Vec<(&'static str, Option<String>)> {
        Vec::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchRow {
    pub id: Id,
    pub branch_code: String,
    pub branch_name: String,
    pub organization_id: Id,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub status: Status,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub organizations: Option<OrganizationRef>,
}

impl DisplayRow for BranchRow {
    fn lifted(&self) -> Vec<(&'static str, Option<String>)> {
        vec![("org_name", name_of(&self.organizations, |o| &o.org_name))]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseRow {
    pub id: Id,
    pub wh_code: String,
    pub wh_name: String,
    pub branch_id: Id,
    #[serde(default)]
    pub address: Option<String>,
    pub status: Status,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub branches: Option<BranchRef>,
}

impl DisplayRow for WarehouseRow {
    fn lifted(&self) -> Vec<(&'static str, Option<String>)> {
        vec![("branch_name", name_of(&self.branches, |b| &b.branch_name))]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationRow {
    pub id: Id,
    pub loc_code: String,
    pub loc_name: String,
    pub warehouse_id: Id,
    pub status: Status,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub warehouses: Option<WarehouseRef>,
}

impl DisplayRow for LocationRow {
    fn lifted(&self) -> Vec<(&'static str, Option<String>)> {
        vec![("wh_name", name_of(&self.warehouses, |w| &w.wh_name))]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerRow {
    pub id: Id,
    pub partner_code: String,
    pub partner_name: String,
    #[serde(default)]
    pub partner_type: Option<Vec<String>>,
    #[serde(default)]
    pub address: Option<String>,
    pub status: Status,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl DisplayRow for PartnerRow {
    fn lifted(&self) -> Vec<(&'static str, Option<String>)> {
        let types = self
            .partner_type
            .as_ref()
            .filter(|types| !types.is_empty())
            .map(|types| types.join(", "));
        vec![("partner_types", types)]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UomRow {
    pub id: Id,
    pub uom_code: String,
    pub uom_name: String,
    pub measurement_type: String,
    pub uom_type: String,
    #[serde(default)]
    pub base_uom_id: Option<Id>,
    #[serde(default)]
    pub conv_factor: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    pub status: Status,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl DisplayRow for UomRow {
    fn lifted(&self) -> Vec<(&'static str, Option<String>)> {
        Vec::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoodsTypeRow {
    pub id: Id,
    pub goods_type_code: String,
    pub goods_type_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: Status,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl DisplayRow for GoodsTypeRow {
    fn lifted(&self) -> Vec<(&'static str, Option<String>)> {
        Vec::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelGoodsRow {
    pub id: Id,
    pub model_code: String,
    pub model_name: String,
    pub goods_type_id: Id,
    pub base_uom_id: Id,
    pub tracking_type: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: Status,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub goods_types: Option<GoodsTypeRef>,
    #[serde(default, skip_serializing)]
    pub uoms: Option<UomRef>,
}

impl DisplayRow for ModelGoodsRow {
    fn lifted(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            (
                "goods_type_name",
                name_of(&self.goods_types, |g| &g.goods_type_name),
            ),
            ("uom_name", name_of(&self.uoms, |u| &u.uom_name)),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoodsReceiptRow {
    pub id: Id,
    pub gr_no: String,
    pub status: DocStatus,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub partner_id: Option<Id>,
    pub warehouse_id: Id,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub partners: Option<PartnerRef>,
    #[serde(default, skip_serializing)]
    pub warehouses: Option<WarehouseRef>,
}

impl DisplayRow for GoodsReceiptRow {
    fn lifted(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("partner_name", name_of(&self.partners, |p| &p.partner_name)),
            ("wh_name", name_of(&self.warehouses, |w| &w.wh_name)),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoodsIssueRow {
    pub id: Id,
    pub gi_no: String,
    pub status: DocStatus,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub partner_id: Option<Id>,
    pub warehouse_id: Id,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub partners: Option<PartnerRef>,
    #[serde(default, skip_serializing)]
    pub warehouses: Option<WarehouseRef>,
}

impl DisplayRow for GoodsIssueRow {
    fn lifted(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("partner_name", name_of(&self.partners, |p| &p.partner_name)),
            ("wh_name", name_of(&self.warehouses, |w| &w.wh_name)),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoodsTransferRow {
    pub id: Id,
    pub gt_no: String,
    pub status: DocStatus,
    #[serde(default)]
    pub note: Option<String>,
    pub source_warehouse_id: Id,
    pub destination_warehouse_id: Id,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub source: Option<WarehouseRef>,
    #[serde(default, skip_serializing)]
    pub destination: Option<WarehouseRef>,
}

impl DisplayRow for GoodsTransferRow {
    fn lifted(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("source_wh_name", name_of(&self.source, |w| &w.wh_name)),
            (
                "destination_wh_name",
                name_of(&self.destination, |w| &w.wh_name),
            ),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryCountRow {
    pub id: Id,
    pub ic_no: String,
    pub status: DocStatus,
    pub count_type: CountType,
    #[serde(default)]
    pub note: Option<String>,
    pub warehouse_id: Id,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub warehouses: Option<WarehouseRef>,
}

impl DisplayRow for InventoryCountRow {
    fn lifted(&self) -> Vec<(&'static str, Option<String>)> {
        vec![("wh_name", name_of(&self.warehouses, |w| &w.wh_name))]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RearrangementTicketRow {
    pub id: Id,
    pub ticket_no: String,
    pub status: DocStatus,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    pub warehouse_id: Id,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub warehouses: Option<WarehouseRef>,
}

impl DisplayRow for RearrangementTicketRow {
    fn lifted(&self) -> Vec<(&'static str, Option<String>)> {
        vec![("wh_name", name_of(&self.warehouses, |w| &w.wh_name))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record_from;
    use serde_json::json;

    #[test]
    fn test_flatten_lifts_nested_names() {
        let row = record_from(json!({
            "id": "gr-1",
            "gr_no": "GR-0001",
            "status": "Draft",
            "warehouse_id": "wh-1",
            "partner_id": "p-1",
            "partners": {"partner_name": "Delfi"},
            "warehouses": {"wh_name": "Kho Tổng"}
        }));

        let flat = flatten_as::<GoodsReceiptRow>(&row).unwrap();
        assert_eq!(flat["partner_name"], json!("Delfi"));
        assert_eq!(flat["wh_name"], json!("Kho Tổng"));
        assert!(!flat.contains_key("partners"));
        assert!(!flat.contains_key("warehouses"));
        assert_eq!(flat["gr_no"], json!("GR-0001"));
    }

    #[test]
    fn test_flatten_missing_relation_is_not_available() {
        let row = record_from(json!({
            "id": "gr-2",
            "gr_no": "GR-0002",
            "status": "New",
            "warehouse_id": "wh-1",
            "partner_id": null,
            "partners": null,
            "warehouses": {"wh_name": null}
        }));

        let flat = flatten_as::<GoodsReceiptRow>(&row).unwrap();
        assert_eq!(flat["partner_name"], json!(NOT_AVAILABLE));
        assert_eq!(flat["wh_name"], json!(NOT_AVAILABLE));
    }

    #[test]
    fn test_flatten_rejects_mismatched_row() {
        let row = record_from(json!({"id": "x", "status": "Unknown"}));
        assert!(flatten_as::<OrganizationRow>(&row).is_err());
    }

    #[test]
    fn test_partner_types_joined() {
        let row = record_from(json!({
            "id": "p-1",
            "partner_code": "DELFI",
            "partner_name": "Delfi",
            "partner_type": ["Supplier", "Customer"],
            "status": "Active"
        }));
        let flat = flatten_as::<PartnerRow>(&row).unwrap();
        assert_eq!(flat["partner_types"], json!("Supplier, Customer"));
    }
}
