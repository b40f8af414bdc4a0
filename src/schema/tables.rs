use super::types::{Column, ColumnType, ForeignKey, Index, TableKind, TableSchema};

// =============================================================================
// Master schema: base tables copied or reconciled from the legacy stores
// =============================================================================

pub static CATEGORIES: TableSchema = TableSchema {
    name: "categories",
    kind: TableKind::Regular,
    columns: &[
        Column::key("id"),
        Column::required("name", ColumnType::Text),
        Column::new("description", ColumnType::Text),
    ],
    foreign_keys: &[],
    indexes: &[],
};

pub static DIRECT_SALES: TableSchema = TableSchema {
    name: "direct_sales",
    kind: TableKind::Regular,
    columns: &[
        Column::auto_id(),
        Column::required("sku", ColumnType::Text).unique(),
        Column::new("name", ColumnType::Text),
        Column::new("description", ColumnType::Text),
        Column::new("base_price", ColumnType::Real),
        Column::new("category_id", ColumnType::Integer),
        Column::new("vendor", ColumnType::Text),
        Column::new("is_active", ColumnType::Boolean).default("1"),
        Column::new("stock_quantity", ColumnType::Integer).default("0"),
        Column::new("image_url", ColumnType::Text),
    ],
    foreign_keys: &[ForeignKey::new("category_id", "categories")],
    indexes: &[],
};

pub static CUSTOMERS: TableSchema = TableSchema {
    name: "customers",
    kind: TableKind::Regular,
    columns: &[
        Column::auto_id(),
        Column::required("CustomerNumber", ColumnType::Text).unique(),
        Column::new("AccountName", ColumnType::Text),
        Column::new("Address", ColumnType::Text),
        Column::new("City", ColumnType::Text),
        Column::new("State", ColumnType::Text),
        Column::new("ZipCode", ColumnType::Text),
        Column::new("RouteNumber", ColumnType::Text),
        Column::new("ServiceFrequency", ColumnType::Text),
        Column::new("ServiceDays", ColumnType::Text),
        Column::new("Email", ColumnType::Text),
        Column::new("Phone", ColumnType::Text),
        Column::new("CreatedAt", ColumnType::Text),
    ],
    foreign_keys: &[],
    indexes: &[Index::on(&["RouteNumber"])],
};

pub static ROUTES: TableSchema = TableSchema {
    name: "routes",
    kind: TableKind::Regular,
    columns: &[
        Column::auto_id(),
        Column::required("RouteNumber", ColumnType::Text).unique(),
        Column::new("RouteInt", ColumnType::Integer),
        Column::new("DriverName", ColumnType::Text),
        Column::new("PlantNumber", ColumnType::Integer),
        Column::new("ServiceDay", ColumnType::Text),
    ],
    foreign_keys: &[],
    indexes: &[],
};

pub static RENTAL_ITEMS_CATALOG: TableSchema = TableSchema {
    name: "rental_items_catalog",
    kind: TableKind::Regular,
    columns: &[
        Column::auto_id(),
        Column::required("item_id", ColumnType::Integer).unique(),
        Column::new("description", ColumnType::Text),
        Column::new("category", ColumnType::Text),
        Column::new("is_active", ColumnType::Boolean).default("1"),
        Column::new("standardization_score", ColumnType::Integer).default("0"),
    ],
    foreign_keys: &[],
    indexes: &[],
};

pub static CUSTOMER_RENTAL_ITEMS: TableSchema = TableSchema {
    name: "customer_rental_items",
    kind: TableKind::Regular,
    columns: &[
        Column::auto_id(),
        Column::required("CustomerNumber", ColumnType::Text),
        Column::new("item_id", ColumnType::Integer),
        Column::new("description", ColumnType::Text),
        Column::new("quantity_used", ColumnType::Integer),
        Column::new("delivery_frequency", ColumnType::Text),
        Column::new("delivery_day", ColumnType::Integer),
        Column::new("billing_frequency", ColumnType::Text),
        Column::new("customer_price", ColumnType::Real),
    ],
    foreign_keys: &[
        ForeignKey::to("CustomerNumber", "customers", "CustomerNumber"),
        ForeignKey::to("item_id", "rental_items_catalog", "item_id"),
    ],
    indexes: &[],
};

pub static DRIVERS: TableSchema = TableSchema {
    name: "drivers",
    kind: TableKind::Regular,
    columns: &[
        Column::auto_id(),
        Column::required("name", ColumnType::Text),
        Column::required("email", ColumnType::Text).unique(),
        Column::required("password_hash", ColumnType::Text),
        Column::new("route_number", ColumnType::Text),
        Column::new("role", ColumnType::Text),
        Column::new("created_at", ColumnType::Text),
    ],
    foreign_keys: &[],
    indexes: &[],
};

// =============================================================================
// Master schema: derived tables
// =============================================================================

pub static ROUTE_LOAD_SUMMARY: TableSchema = TableSchema {
    name: "route_load_summary",
    kind: TableKind::Regular,
    columns: &[
        Column::auto_id(),
        Column::required("RouteNumber", ColumnType::Text),
        Column::new("ServiceDay", ColumnType::Text),
        Column::new("item_id", ColumnType::Integer),
        Column::new("description", ColumnType::Text),
        Column::new("total_quantity", ColumnType::Integer),
    ],
    foreign_keys: &[],
    indexes: &[Index::unique(&["RouteNumber", "ServiceDay", "item_id"])],
};

pub static CUSTOMERS_FTS: TableSchema = TableSchema {
    name: "customers_fts",
    kind: TableKind::Fts5,
    columns: &[
        Column::new("CustomerNumber", ColumnType::Text),
        Column::new("AccountName", ColumnType::Text),
    ],
    foreign_keys: &[],
    indexes: &[],
};

// =============================================================================
// Legacy source tables (read-only; columns the readers select)
// =============================================================================

/// `items.db` rental records
pub static LEGACY_ITEMS: TableSchema = TableSchema {
    name: "items",
    kind: TableKind::Regular,
    columns: &[
        Column::new("item_id", ColumnType::Integer),
        Column::new("description", ColumnType::Text),
        Column::new("customer_num", ColumnType::Text),
        Column::new("quantity_used", ColumnType::Integer),
        Column::new("route", ColumnType::Integer),
    ],
    foreign_keys: &[],
    indexes: &[],
};

/// `routes.db` customer-per-route records
pub static LEGACY_ROUTES: TableSchema = TableSchema {
    name: "routes",
    kind: TableKind::Regular,
    columns: &[
        Column::new("CustomerNumber", ColumnType::Text),
        Column::new("AccountName", ColumnType::Text),
        Column::new("Address", ColumnType::Text),
        Column::new("City", ColumnType::Text),
        Column::new("State", ColumnType::Text),
        Column::new("ZipCode", ColumnType::Text),
        Column::new("RouteNumber", ColumnType::Text),
        Column::new("ServiceFrequency", ColumnType::Text),
        Column::new("ServiceDays", ColumnType::Text),
    ],
    foreign_keys: &[],
    indexes: &[],
};

/// `products.db` categories
pub static LEGACY_CATEGORIES: TableSchema = TableSchema {
    name: "categories",
    kind: TableKind::Regular,
    columns: &[
        Column::key("id"),
        Column::new("name", ColumnType::Text),
        Column::new("description", ColumnType::Text),
    ],
    foreign_keys: &[],
    indexes: &[],
};

/// `products.db` products
pub static LEGACY_PRODUCTS: TableSchema = TableSchema {
    name: "products",
    kind: TableKind::Regular,
    columns: &[
        Column::new("sku", ColumnType::Text),
        Column::new("name", ColumnType::Text),
        Column::new("description", ColumnType::Text),
        Column::new("base_price", ColumnType::Real),
        Column::new("category_id", ColumnType::Integer),
        Column::new("vendor", ColumnType::Text),
        Column::new("is_active", ColumnType::Boolean),
    ],
    foreign_keys: &[],
    indexes: &[],
};

// =============================================================================
// Schema Registry
// =============================================================================

/// All master tables in dependency order (parents before children)
pub static MASTER_TABLES: &[&TableSchema] = &[
    &CATEGORIES,
    &DIRECT_SALES,
    &CUSTOMERS,
    &ROUTES,
    &RENTAL_ITEMS_CATALOG,
    &CUSTOMER_RENTAL_ITEMS,
    &ROUTE_LOAD_SUMMARY,
    &DRIVERS,
    &CUSTOMERS_FTS,
];

/// Tables owned by downstream applications that share the master database.
/// Cleared with the rest when present; never created here.
pub static AUXILIARY_TABLES: &[&str] = &[
    "customer_product_list",
    "order_requests",
    "order_items",
    "sales",
    "customer_par_levels",
    "transactions",
    "delivery_status",
    "route_stop_order",
    "customer_notes",
];

/// Get master table schema by name
pub fn get_table(name: &str) -> Option<&'static TableSchema> {
    MASTER_TABLES.iter().find(|t| t.name == name).copied()
}
