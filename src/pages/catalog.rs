//! The console's list pages as configuration over the generic reader and
//! writer: one entry per route.

use serde::Serialize;

use crate::model::{
    flatten_as, BranchRow, GoodsIssueRow, GoodsReceiptRow, GoodsTransferRow, GoodsTypeRow,
    InventoryCountRow, LocationRow, ModelGoodsRow, OrganizationRow, PartnerRow, Record,
    RearrangementTicketRow, SortSpec, UomRow, WarehouseRow,
};

/// A table column: row field and its header
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ColumnDef {
    pub field: &'static str,
    pub label: &'static str,
}

const fn col(field: &'static str, label: &'static str) -> ColumnDef {
    ColumnDef { field, label }
}

/// Typed row a page's select expression produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Organization,
    Branch,
    Warehouse,
    Location,
    Partner,
    Uom,
    GoodsType,
    ModelGoods,
    GoodsReceipt,
    GoodsIssue,
    GoodsTransfer,
    InventoryCount,
    RearrangementTicket,
}

impl RowKind {
    /// Type-check a raw row and lift nested names to top-level fields
    pub fn flatten(self, row: &Record) -> Result<Record, serde_json::Error> {
        match self {
            RowKind::Organization => flatten_as::<OrganizationRow>(row),
            RowKind::Branch => flatten_as::<BranchRow>(row),
            RowKind::Warehouse => flatten_as::<WarehouseRow>(row),
            RowKind::Location => flatten_as::<LocationRow>(row),
            RowKind::Partner => flatten_as::<PartnerRow>(row),
            RowKind::Uom => flatten_as::<UomRow>(row),
            RowKind::GoodsType => flatten_as::<GoodsTypeRow>(row),
            RowKind::ModelGoods => flatten_as::<ModelGoodsRow>(row),
            RowKind::GoodsReceipt => flatten_as::<GoodsReceiptRow>(row),
            RowKind::GoodsIssue => flatten_as::<GoodsIssueRow>(row),
            RowKind::GoodsTransfer => flatten_as::<GoodsTransferRow>(row),
            RowKind::InventoryCount => flatten_as::<InventoryCountRow>(row),
            RowKind::RearrangementTicket => flatten_as::<RearrangementTicketRow>(row),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageConfig {
    pub slug: &'static str,
    pub title: &'static str,
    pub collection: &'static str,
    #[serde(skip)]
    pub select: &'static str,
    #[serde(skip)]
    pub sort_column: &'static str,
    #[serde(skip)]
    pub ascending: bool,
    #[serde(skip)]
    pub search_columns: &'static [&'static str],
    pub columns: &'static [ColumnDef],
    /// Noun used in confirmation and toast messages
    pub entity: &'static str,
    #[serde(skip)]
    pub row_kind: RowKind,
}

impl PageConfig {
    pub fn sort(&self) -> SortSpec {
        if self.ascending {
            SortSpec::asc(self.sort_column)
        } else {
            SortSpec::desc(self.sort_column)
        }
    }

    pub fn delete_prompt(&self) -> String {
        format!(
            "Bạn có chắc chắn muốn xóa {} này không? Hành động này sẽ không thể hoàn tác.",
            self.entity.to_lowercase()
        )
    }
}

const STATUS: ColumnDef = col("status", "Trạng thái");
const CREATED_AT: ColumnDef = col("created_at", "Ngày tạo");
const WAREHOUSE: ColumnDef = col("wh_name", "Kho");

pub static PAGES: &[PageConfig] = &[
    PageConfig {
        slug: "organizations",
        title: "Quản lý Tổ chức",
        collection: "organizations",
        select: "*",
        sort_column: "org_name",
        ascending: true,
        search_columns: &["org_code", "org_name", "email"],
        columns: &[
            col("org_code", "Mã Tổ chức"),
            col("org_name", "Tên Tổ chức"),
            col("email", "Email"),
            STATUS,
        ],
        entity: "Tổ chức",
        row_kind: RowKind::Organization,
    },
    PageConfig {
        slug: "branches",
        title: "Quản lý Chi nhánh",
        collection: "branches",
        select: "*, organizations ( org_name )",
        sort_column: "branch_name",
        ascending: true,
        search_columns: &["branch_code", "branch_name"],
        columns: &[
            col("branch_code", "Mã Chi nhánh"),
            col("branch_name", "Tên Chi nhánh"),
            col("org_name", "Tổ chức"),
            STATUS,
        ],
        entity: "Chi nhánh",
        row_kind: RowKind::Branch,
    },
    PageConfig {
        slug: "warehouses",
        title: "Quản lý Kho",
        collection: "warehouses",
        select: "*, branches ( branch_name )",
        sort_column: "wh_name",
        ascending: true,
        search_columns: &["wh_code", "wh_name"],
        columns: &[
            col("wh_code", "Mã Kho"),
            col("wh_name", "Tên Kho"),
            col("branch_name", "Chi nhánh"),
            STATUS,
        ],
        entity: "Kho",
        row_kind: RowKind::Warehouse,
    },
    PageConfig {
        slug: "locations",
        title: "Quản lý Vị trí",
        collection: "locations",
        select: "*, warehouses ( wh_name )",
        sort_column: "loc_code",
        ascending: true,
        search_columns: &["loc_code", "loc_name"],
        columns: &[
            col("loc_code", "Mã Vị trí"),
            col("loc_name", "Tên Vị trí"),
            WAREHOUSE,
            STATUS,
        ],
        entity: "Vị trí",
        row_kind: RowKind::Location,
    },
    PageConfig {
        slug: "partners",
        title: "Quản lý Đối tác",
        collection: "partners",
        select: "*",
        sort_column: "partner_name",
        ascending: true,
        search_columns: &["partner_code", "partner_name"],
        columns: &[
            col("partner_code", "Mã Đối tác"),
            col("partner_name", "Tên Đối tác"),
            col("partner_types", "Loại Đối tác"),
            STATUS,
        ],
        entity: "Đối tác",
        row_kind: RowKind::Partner,
    },
    PageConfig {
        slug: "uoms",
        title: "Quản lý Đơn vị tính",
        collection: "uoms",
        select: "*",
        sort_column: "uom_code",
        ascending: true,
        search_columns: &["uom_code", "uom_name"],
        columns: &[
            col("uom_code", "Mã ĐVT"),
            col("uom_name", "Tên ĐVT"),
            col("measurement_type", "Loại đo lường"),
            col("uom_type", "Loại ĐVT"),
            STATUS,
        ],
        entity: "Đơn vị tính",
        row_kind: RowKind::Uom,
    },
    PageConfig {
        slug: "goods-types",
        title: "Quản lý Loại hàng",
        collection: "goods_types",
        select: "*",
        sort_column: "goods_type_name",
        ascending: true,
        search_columns: &["goods_type_code", "goods_type_name"],
        columns: &[
            col("goods_type_code", "Mã Loại hàng"),
            col("goods_type_name", "Tên Loại hàng"),
            col("description", "Mô tả"),
            STATUS,
        ],
        entity: "Loại hàng",
        row_kind: RowKind::GoodsType,
    },
    PageConfig {
        slug: "model-goods",
        title: "Danh sách Mã Hàng",
        collection: "model_goods",
        select: "*, goods_types ( goods_type_name ), uoms ( uom_name )",
        sort_column: "model_code",
        ascending: true,
        search_columns: &["model_code", "model_name"],
        columns: &[
            col("model_code", "Model Code"),
            col("model_name", "Model Name"),
            col("goods_type_name", "Loại Hàng"),
            col("uom_name", "ĐV Tính"),
            col("tracking_type", "Tracking"),
            col("status", "Status"),
        ],
        entity: "Mã hàng",
        row_kind: RowKind::ModelGoods,
    },
    PageConfig {
        slug: "goods-receipts",
        title: "Danh sách Phiếu Nhập Kho",
        collection: "goods_receipts",
        select: "*, partners ( partner_name ), warehouses ( wh_name )",
        sort_column: "created_at",
        ascending: false,
        search_columns: &["gr_no", "note"],
        columns: &[
            col("gr_no", "Mã Phiếu (GRN)"),
            col("partner_name", "Nhà cung cấp"),
            WAREHOUSE,
            CREATED_AT,
            STATUS,
        ],
        entity: "Phiếu nhập kho",
        row_kind: RowKind::GoodsReceipt,
    },
    PageConfig {
        slug: "goods-issues",
        title: "Danh sách Phiếu Xuất Kho",
        collection: "goods_issues",
        select: "*, partners ( partner_name ), warehouses ( wh_name )",
        sort_column: "created_at",
        ascending: false,
        search_columns: &["gi_no", "note"],
        columns: &[
            col("gi_no", "Mã Phiếu (GIN)"),
            col("partner_name", "Khách hàng"),
            WAREHOUSE,
            CREATED_AT,
            STATUS,
        ],
        entity: "Phiếu xuất kho",
        row_kind: RowKind::GoodsIssue,
    },
    PageConfig {
        slug: "goods-transfers",
        title: "Danh sách Phiếu Chuyển Kho",
        collection: "goods_transfers",
        select: "*, source:warehouses!source_warehouse_id ( wh_name ), \
                 destination:warehouses!destination_warehouse_id ( wh_name )",
        sort_column: "created_at",
        ascending: false,
        search_columns: &["gt_no", "note"],
        columns: &[
            col("gt_no", "Mã Phiếu"),
            col("source_wh_name", "Kho nguồn"),
            col("destination_wh_name", "Kho đích"),
            CREATED_AT,
            STATUS,
        ],
        entity: "Phiếu chuyển kho",
        row_kind: RowKind::GoodsTransfer,
    },
    PageConfig {
        slug: "inventory-counts",
        title: "Danh sách Phiếu Kiểm Kê",
        collection: "inventory_counts",
        select: "*, warehouses ( wh_name )",
        sort_column: "created_at",
        ascending: false,
        search_columns: &["ic_no", "note"],
        columns: &[
            col("ic_no", "Mã Phiếu"),
            col("count_type", "Loại kiểm kê"),
            WAREHOUSE,
            CREATED_AT,
            STATUS,
        ],
        entity: "Phiếu kiểm kê",
        row_kind: RowKind::InventoryCount,
    },
    PageConfig {
        slug: "rearrangement",
        title: "Danh sách Phiếu Sắp Xếp Kho",
        collection: "rearrangement_tickets",
        select: "*, warehouses ( wh_name )",
        sort_column: "created_at",
        ascending: false,
        search_columns: &["ticket_no", "note", "created_by"],
        columns: &[
            col("ticket_no", "Mã Phiếu"),
            WAREHOUSE,
            col("created_by", "Người tạo"),
            CREATED_AT,
            STATUS,
        ],
        entity: "Phiếu sắp xếp",
        row_kind: RowKind::RearrangementTicket,
    },
];

pub fn page(slug: &str) -> Option<&'static PageConfig> {
    PAGES.iter().find(|page| page.slug == slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{collection, parse_select, SelectItem};

    #[test]
    fn test_every_page_matches_the_schema() {
        assert_eq!(PAGES.len(), 13);
        for page in PAGES {
            let schema = collection(page.collection)
                .unwrap_or_else(|| panic!("{} has no schema", page.slug));
            assert!(schema.has_column(page.sort_column), "{} sort", page.slug);
            for column in page.search_columns {
                assert!(schema.has_column(column), "{} search {}", page.slug, column);
            }
            for item in parse_select(page.select).unwrap() {
                if let SelectItem::Embed(embed) = item {
                    assert!(schema.resolve_embed(&embed).is_ok(), "{} embed", page.slug);
                }
            }
        }
    }

    #[test]
    fn test_lookup_by_slug() {
        assert_eq!(page("model-goods").map(|p| p.collection), Some("model_goods"));
        assert!(page("model_goods").is_none());
    }

    #[test]
    fn test_delete_prompt() {
        let orgs = page("organizations").unwrap();
        assert_eq!(
            orgs.delete_prompt(),
            "Bạn có chắc chắn muốn xóa tổ chức này không? Hành động này sẽ không thể hoàn tác."
        );
    }
}
