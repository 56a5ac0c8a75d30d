use anyhow::{Context, Result};
use serde_json::{json, Value};

use crate::model::{record_from, Id};
use crate::store::RemoteStore;

/// Insert one row and return its generated id
async fn insert(store: &dyn RemoteStore, collection: &str, row: Value) -> Result<Id> {
    let stored = store
        .insert(collection, record_from(row))
        .await
        .with_context(|| format!("Failed to seed {}", collection))?;

    stored
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .with_context(|| format!("Seeded {} row has no id", collection))
}

/// Load a small demonstration data set covering every console page.
///
/// Rows are inserted parents first so every foreign key resolves.
pub async fn load_seed_data(store: &dyn RemoteStore) -> Result<()> {
    log::info!("Seeding sample data into {} store", store.backend());

    // Organizations and branches
    let delfi = insert(store, "organizations", json!({
        "org_code": "DELFI",
        "org_name": "Delfi Technologies Vietnam",
        "address": "123 Main Street, Ho Chi Minh City, Vietnam",
        "phone": "0987654321",
        "email": "contact@delfi.com.vn",
        "status": "Active"
    }))
    .await?;
    let fashionista = insert(store, "organizations", json!({
        "org_code": "FASHIONISTA",
        "org_name": "Fashionista Boutique",
        "address": "456 Fashion Avenue, Hanoi, Vietnam",
        "phone": "0123456789",
        "email": "support@fashionista.vn",
        "status": "Active"
    }))
    .await?;

    let delfi_hcm = insert(store, "branches", json!({
        "branch_code": "DELFI-HCM",
        "branch_name": "Delfi Ho Chi Minh",
        "organization_id": delfi,
        "address": "123 Le Loi, District 1, HCMC",
        "phone": "02838123456",
        "email": "hcm@delfi.com.vn",
        "status": "Active"
    }))
    .await?;
    let delfi_hn = insert(store, "branches", json!({
        "branch_code": "DELFI-HN",
        "branch_name": "Delfi Ha Noi",
        "organization_id": delfi,
        "address": "456 Tran Hung Dao, Hoan Kiem, Hanoi",
        "phone": "02438765432",
        "email": "hn@delfi.com.vn",
        "status": "Active"
    }))
    .await?;
    insert(store, "branches", json!({
        "branch_code": "FASH-DN",
        "branch_name": "Fashionista Da Nang",
        "organization_id": fashionista,
        "address": "789 Bach Dang, Hai Chau, Da Nang",
        "phone": "02363987123",
        "email": "dn@fashionista.vn",
        "status": "Inactive"
    }))
    .await?;

    // Warehouses and locations
    let wh_hcm = insert(store, "warehouses", json!({
        "wh_code": "WH-HCM-01",
        "wh_name": "Kho Tổng Hồ Chí Minh",
        "branch_id": delfi_hcm,
        "address": "Khu công nghiệp Tân Bình, HCMC",
        "status": "Active"
    }))
    .await?;
    let wh_hn = insert(store, "warehouses", json!({
        "wh_code": "WH-HN-01",
        "wh_name": "Kho Hà Nội",
        "branch_id": delfi_hn,
        "address": "Khu công nghiệp Thăng Long, Hanoi",
        "status": "Active"
    }))
    .await?;

    let loc_a1 = insert(store, "locations", json!({
        "loc_code": "HCM-A-01", "loc_name": "Kệ A1", "warehouse_id": wh_hcm, "status": "Active"
    }))
    .await?;
    let loc_a2 = insert(store, "locations", json!({
        "loc_code": "HCM-A-02", "loc_name": "Kệ A2", "warehouse_id": wh_hcm, "status": "Active"
    }))
    .await?;
    let loc_hn = insert(store, "locations", json!({
        "loc_code": "HN-B-01", "loc_name": "Kệ B1", "warehouse_id": wh_hn, "status": "Active"
    }))
    .await?;

    // Partners
    let supplier = insert(store, "partners", json!({
        "partner_code": "SUP-APPLE",
        "partner_name": "Apple Vietnam Distribution",
        "partner_type": ["Supplier"],
        "status": "Active"
    }))
    .await?;
    let customer = insert(store, "partners", json!({
        "partner_code": "CUS-TGDD",
        "partner_name": "Thế Giới Di Động",
        "partner_type": ["Customer", "Supplier"],
        "status": "Active"
    }))
    .await?;

    // Units of measure and goods
    let cai = insert(store, "uoms", json!({
        "uom_code": "CAI", "uom_name": "Cái",
        "measurement_type": "Piece", "uom_type": "Base", "status": "Active"
    }))
    .await?;
    let thung = insert(store, "uoms", json!({
        "uom_code": "THUNG", "uom_name": "Thùng",
        "measurement_type": "Piece", "uom_type": "Base", "status": "Active"
    }))
    .await?;
    insert(store, "uoms", json!({
        "uom_code": "KG", "uom_name": "Kilogram",
        "measurement_type": "Weight", "uom_type": "Base", "status": "Active"
    }))
    .await?;
    insert(store, "uoms", json!({
        "uom_code": "LOC", "uom_name": "Lốc",
        "measurement_type": "Piece", "uom_type": "Alt",
        "base_uom_id": thung, "conv_factor": 4, "status": "Active"
    }))
    .await?;

    let electronics = insert(store, "goods_types", json!({
        "goods_type_code": "ELEC", "goods_type_name": "Điện tử",
        "description": "Thiết bị điện tử", "status": "Active"
    }))
    .await?;
    let beverages = insert(store, "goods_types", json!({
        "goods_type_code": "BEV", "goods_type_name": "Đồ uống", "status": "Active"
    }))
    .await?;

    let iphone = insert(store, "model_goods", json!({
        "model_code": "IPHONE15", "model_name": "iPhone 15 128GB",
        "goods_type_id": electronics, "base_uom_id": cai,
        "tracking_type": "Serial", "status": "Active"
    }))
    .await?;
    let cocacola = insert(store, "model_goods", json!({
        "model_code": "COCACOLA", "model_name": "Coca-Cola lon 330ml",
        "goods_type_id": beverages, "base_uom_id": thung,
        "tracking_type": "Lot", "status": "Active"
    }))
    .await?;
    insert(store, "model_goods", json!({
        "model_code": "SCREW-M5", "model_name": "Ốc vít M5",
        "goods_type_id": electronics, "base_uom_id": cai,
        "tracking_type": "None", "status": "Inactive"
    }))
    .await?;

    insert(store, "onhand_inventory", json!({
        "warehouse_id": wh_hcm, "location_id": loc_a1, "model_goods_id": iphone, "quantity": 40
    }))
    .await?;
    insert(store, "onhand_inventory", json!({
        "warehouse_id": wh_hn, "location_id": loc_hn, "model_goods_id": cocacola, "quantity": 120
    }))
    .await?;

    // Documents with their lines
    let receipt = insert(store, "goods_receipts", json!({
        "gr_no": "GRN-0001", "status": "Completed", "note": "Nhập hàng đầu kỳ",
        "partner_id": supplier, "warehouse_id": wh_hcm
    }))
    .await?;
    insert(store, "goods_receipt_lines", json!({
        "goods_receipt_id": receipt, "model_goods_id": iphone,
        "quantity_planned": 50, "quantity_received": 50
    }))
    .await?;

    let issue = insert(store, "goods_issues", json!({
        "gi_no": "GIN-0001", "status": "New", "note": "Xuất cho đại lý",
        "partner_id": customer, "warehouse_id": wh_hcm
    }))
    .await?;
    insert(store, "goods_issue_lines", json!({
        "goods_issue_id": issue, "model_goods_id": iphone, "quantity_planned": 10
    }))
    .await?;

    let transfer = insert(store, "goods_transfers", json!({
        "gt_no": "GT-0001", "status": "Draft", "note": "Điều chuyển ra Hà Nội",
        "source_warehouse_id": wh_hcm, "destination_warehouse_id": wh_hn
    }))
    .await?;
    insert(store, "goods_transfer_lines", json!({
        "goods_transfer_id": transfer, "model_goods_id": iphone, "quantity_transfer": 5
    }))
    .await?;

    let count = insert(store, "inventory_counts", json!({
        "ic_no": "IC-0001", "status": "Counting", "count_type": "By Location",
        "warehouse_id": wh_hcm
    }))
    .await?;
    insert(store, "inventory_count_lines", json!({
        "inventory_count_id": count, "model_goods_id": iphone, "location_id": loc_a1,
        "system_quantity": 40, "counted_quantity": 39
    }))
    .await?;

    let ticket = insert(store, "rearrangement_tickets", json!({
        "ticket_no": "RT-0001", "status": "Review", "created_by": "admin",
        "note": "Dồn kệ A", "warehouse_id": wh_hcm
    }))
    .await?;
    insert(store, "rearrangement_ticket_lines", json!({
        "ticket_id": ticket, "model_goods_id": iphone,
        "source_location_id": loc_a1, "destination_location_id": loc_a2, "quantity": 10
    }))
    .await?;

    log::info!("Sample data loaded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_seed_covers_every_page() {
        let store = MemoryStore::new();
        load_seed_data(&store).await.unwrap();

        for page in crate::pages::PAGES {
            assert!(
                !store.rows(page.collection).await.is_empty(),
                "{} has no sample rows",
                page.collection
            );
        }
        assert_eq!(store.rows("uoms").await.len(), 4);
    }

    #[tokio::test]
    async fn test_seeding_twice_hits_unique_codes() {
        let store = MemoryStore::new();
        load_seed_data(&store).await.unwrap();
        assert!(load_seed_data(&store).await.is_err());
    }
}
