use crate::model::EmbedSpec;
use crate::store::StoreError;

/// Foreign key from a column of one collection to the `id` of another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references: &'static str,
    /// Referencing rows are removed together with the referenced row
    pub cascade: bool,
}

/// Shape of one collection in the store.
///
/// Every collection has a uuid `id` primary key generated by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSchema {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub unique: &'static [&'static str],
    /// NOT NULL columns without a default
    pub required: &'static [&'static str],
    pub foreign_keys: &'static [ForeignKey],
}

/// How an embedded relation joins to its parent row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedJoin {
    /// `parent.column = target.id`, embedded as an object or null
    ToOne {
        column: &'static str,
        target: &'static CollectionSchema,
    },
    /// `target.column = parent.id`, embedded as an array
    ToMany {
        column: &'static str,
        target: &'static CollectionSchema,
    },
}

impl CollectionSchema {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }

    pub fn has_timestamps(&self) -> bool {
        self.has_column("created_at")
    }

    pub fn tracks_updates(&self) -> bool {
        self.has_column("updated_at")
    }

    /// Columns of other collections that reference this one
    pub fn referencing(&self) -> impl Iterator<Item = (&'static CollectionSchema, &'static ForeignKey)> + '_ {
        CATALOG.iter().flat_map(move |other| {
            other
                .foreign_keys
                .iter()
                .filter(move |fk| fk.references == self.name)
                .map(move |fk| (other, fk))
        })
    }

    pub fn resolve_embed(&self, embed: &EmbedSpec) -> Result<EmbedJoin, StoreError> {
        let target = collection(&embed.relation).ok_or_else(|| {
            StoreError::InvalidQuery(format!("unknown relation '{}'", embed.relation))
        })?;
        let hint_matches = |fk: &ForeignKey| embed.hint.as_deref().map_or(true, |h| fk.column == h);

        let to_one: Vec<&ForeignKey> = self
            .foreign_keys
            .iter()
            .filter(|fk| fk.references == target.name && hint_matches(*fk))
            .collect();
        match to_one.as_slice() {
            [fk] => {
                return Ok(EmbedJoin::ToOne {
                    column: fk.column,
                    target,
                })
            }
            [] => {}
            _ => return Err(ambiguous(self.name, &embed.relation)),
        }

        let to_many: Vec<&ForeignKey> = target
            .foreign_keys
            .iter()
            .filter(|fk| fk.references == self.name && hint_matches(*fk))
            .collect();
        match to_many.as_slice() {
            [fk] => Ok(EmbedJoin::ToMany {
                column: fk.column,
                target,
            }),
            [] => Err(StoreError::InvalidQuery(format!(
                "no relationship between '{}' and '{}'",
                self.name, embed.relation
            ))),
            _ => Err(ambiguous(self.name, &embed.relation)),
        }
    }
}

fn ambiguous(parent: &str, relation: &str) -> StoreError {
    StoreError::InvalidQuery(format!(
        "more than one relationship between '{}' and '{}', add a '!column' hint",
        parent, relation
    ))
}

pub fn collection(name: &str) -> Option<&'static CollectionSchema> {
    CATALOG.iter().find(|schema| schema.name == name)
}

const fn fk(column: &'static str, references: &'static str) -> ForeignKey {
    ForeignKey {
        column,
        references,
        cascade: false,
    }
}

const fn owned_by(column: &'static str, references: &'static str) -> ForeignKey {
    ForeignKey {
        column,
        references,
        cascade: true,
    }
}

pub static CATALOG: &[CollectionSchema] = &[
    CollectionSchema {
        name: "organizations",
        columns: &["id", "org_code", "org_name", "address", "phone", "email", "status", "created_at", "updated_at"],
        unique: &["org_code"],
        required: &["org_code", "org_name", "status"],
        foreign_keys: &[],
    },
    CollectionSchema {
        name: "branches",
        columns: &["id", "branch_code", "branch_name", "organization_id", "address", "phone", "email", "status", "created_at", "updated_at"],
        unique: &["branch_code"],
        required: &["branch_code", "branch_name", "organization_id", "status"],
        foreign_keys: &[fk("organization_id", "organizations")],
    },
    CollectionSchema {
        name: "warehouses",
        columns: &["id", "wh_code", "wh_name", "branch_id", "address", "status", "created_at", "updated_at"],
        unique: &["wh_code"],
        required: &["wh_code", "wh_name", "branch_id", "status"],
        foreign_keys: &[fk("branch_id", "branches")],
    },
    CollectionSchema {
        name: "locations",
        columns: &["id", "loc_code", "loc_name", "warehouse_id", "status", "created_at", "updated_at"],
        unique: &["loc_code"],
        required: &["loc_code", "loc_name", "warehouse_id", "status"],
        foreign_keys: &[fk("warehouse_id", "warehouses")],
    },
    CollectionSchema {
        name: "partners",
        columns: &["id", "partner_code", "partner_name", "partner_type", "address", "status", "created_at", "updated_at"],
        unique: &["partner_code"],
        required: &["partner_code", "partner_name", "status"],
        foreign_keys: &[],
    },
    CollectionSchema {
        name: "goods_types",
        columns: &["id", "goods_type_code", "goods_type_name", "description", "status", "created_at", "updated_at"],
        unique: &["goods_type_code"],
        required: &["goods_type_code", "goods_type_name", "status"],
        foreign_keys: &[],
    },
    CollectionSchema {
        name: "uoms",
        columns: &["id", "uom_code", "uom_name", "measurement_type", "uom_type", "base_uom_id", "conv_factor", "description", "status", "created_at", "updated_at"],
        unique: &["uom_code"],
        required: &["uom_code", "uom_name", "measurement_type", "uom_type", "status"],
        foreign_keys: &[fk("base_uom_id", "uoms")],
    },
    CollectionSchema {
        name: "model_goods",
        columns: &["id", "model_code", "model_name", "goods_type_id", "base_uom_id", "tracking_type", "description", "status", "created_at", "updated_at"],
        unique: &["model_code"],
        required: &["model_code", "model_name", "goods_type_id", "base_uom_id", "tracking_type", "status"],
        foreign_keys: &[fk("goods_type_id", "goods_types"), fk("base_uom_id", "uoms")],
    },
    CollectionSchema {
        name: "onhand_inventory",
        columns: &["id", "warehouse_id", "location_id", "model_goods_id", "quantity", "created_at", "updated_at"],
        unique: &[],
        required: &["warehouse_id", "location_id", "model_goods_id", "quantity"],
        foreign_keys: &[
            fk("warehouse_id", "warehouses"),
            fk("location_id", "locations"),
            fk("model_goods_id", "model_goods"),
        ],
    },
    CollectionSchema {
        name: "goods_receipts",
        columns: &["id", "gr_no", "status", "note", "partner_id", "warehouse_id", "created_at", "updated_at"],
        unique: &["gr_no"],
        required: &["gr_no", "status", "warehouse_id"],
        foreign_keys: &[fk("partner_id", "partners"), fk("warehouse_id", "warehouses")],
    },
    CollectionSchema {
        name: "goods_receipt_lines",
        columns: &["id", "goods_receipt_id", "model_goods_id", "quantity_planned", "quantity_received", "created_at", "updated_at"],
        unique: &[],
        required: &["goods_receipt_id", "model_goods_id", "quantity_planned"],
        foreign_keys: &[owned_by("goods_receipt_id", "goods_receipts"), fk("model_goods_id", "model_goods")],
    },
    CollectionSchema {
        name: "goods_issues",
        columns: &["id", "gi_no", "status", "note", "partner_id", "warehouse_id", "created_at", "updated_at"],
        unique: &["gi_no"],
        required: &["gi_no", "status", "warehouse_id"],
        foreign_keys: &[fk("partner_id", "partners"), fk("warehouse_id", "warehouses")],
    },
    CollectionSchema {
        name: "goods_issue_lines",
        columns: &["id", "goods_issue_id", "model_goods_id", "quantity_planned", "quantity_picked", "created_at", "updated_at"],
        unique: &[],
        required: &["goods_issue_id", "model_goods_id", "quantity_planned"],
        foreign_keys: &[owned_by("goods_issue_id", "goods_issues"), fk("model_goods_id", "model_goods")],
    },
    CollectionSchema {
        name: "goods_transfers",
        columns: &["id", "gt_no", "status", "note", "source_warehouse_id", "destination_warehouse_id", "created_at", "updated_at"],
        unique: &["gt_no"],
        required: &["gt_no", "status", "source_warehouse_id", "destination_warehouse_id"],
        foreign_keys: &[
            fk("source_warehouse_id", "warehouses"),
            fk("destination_warehouse_id", "warehouses"),
        ],
    },
    CollectionSchema {
        name: "goods_transfer_lines",
        columns: &["id", "goods_transfer_id", "model_goods_id", "quantity_transfer", "created_at", "updated_at"],
        unique: &[],
        required: &["goods_transfer_id", "model_goods_id", "quantity_transfer"],
        foreign_keys: &[owned_by("goods_transfer_id", "goods_transfers"), fk("model_goods_id", "model_goods")],
    },
    CollectionSchema {
        name: "inventory_counts",
        columns: &["id", "ic_no", "status", "count_type", "note", "warehouse_id", "created_at", "updated_at"],
        unique: &["ic_no"],
        required: &["ic_no", "status", "count_type", "warehouse_id"],
        foreign_keys: &[fk("warehouse_id", "warehouses")],
    },
    CollectionSchema {
        name: "inventory_count_lines",
        columns: &["id", "inventory_count_id", "model_goods_id", "location_id", "system_quantity", "counted_quantity", "created_at", "updated_at"],
        unique: &[],
        required: &["inventory_count_id", "model_goods_id", "location_id", "system_quantity"],
        foreign_keys: &[
            owned_by("inventory_count_id", "inventory_counts"),
            fk("model_goods_id", "model_goods"),
            fk("location_id", "locations"),
        ],
    },
    CollectionSchema {
        name: "rearrangement_tickets",
        columns: &["id", "ticket_no", "status", "created_by", "note", "warehouse_id", "created_at", "updated_at"],
        unique: &["ticket_no"],
        required: &["ticket_no", "status", "warehouse_id"],
        foreign_keys: &[fk("warehouse_id", "warehouses")],
    },
    CollectionSchema {
        name: "rearrangement_ticket_lines",
        columns: &["id", "ticket_id", "model_goods_id", "source_location_id", "destination_location_id", "quantity", "created_at"],
        unique: &[],
        required: &["ticket_id", "model_goods_id", "source_location_id", "destination_location_id", "quantity"],
        foreign_keys: &[
            owned_by("ticket_id", "rearrangement_tickets"),
            fk("model_goods_id", "model_goods"),
            fk("source_location_id", "locations"),
            fk("destination_location_id", "locations"),
        ],
    },
];
