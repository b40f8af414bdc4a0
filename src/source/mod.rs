//! Read-only access to the four legacy stores.
//!
//! Readers do no transformation: every value comes back exactly as the
//! legacy column held it, typed as [`rusqlite::types::Value`] wherever the
//! legacy schema was loose about types.

mod rows;

pub use rows::*;

use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use std::fmt;
use std::path::Path;

use crate::config::StoreConfig;
use crate::error::{MigrateError, Result};
use crate::schema::{TableSchema, LEGACY_CATEGORIES, LEGACY_ITEMS, LEGACY_PRODUCTS, LEGACY_ROUTES};

/// Identifies one of the databases taking part in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Store {
    Items,
    Routes,
    Mission,
    Products,
    Target,
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Store::Items => write!(f, "items"),
            Store::Routes => write!(f, "routes"),
            Store::Mission => write!(f, "mission data"),
            Store::Products => write!(f, "products"),
            Store::Target => write!(f, "master"),
        }
    }
}

static ITEMS_TABLES: &[&TableSchema] = &[&LEGACY_ITEMS];
static ROUTES_TABLES: &[&TableSchema] = &[&LEGACY_ROUTES];
static PRODUCTS_TABLES: &[&TableSchema] = &[&LEGACY_CATEGORIES, &LEGACY_PRODUCTS];

impl Store {
    /// Legacy tables (and the columns selected from them) this store must provide
    pub fn required_tables(&self) -> &'static [&'static TableSchema] {
        match self {
            Store::Items => ITEMS_TABLES,
            Store::Routes => ROUTES_TABLES,
            Store::Products => PRODUCTS_TABLES,
            Store::Mission | Store::Target => &[],
        }
    }
}

/// One read-only legacy database
pub struct SourceReader {
    store: Store,
    conn: Connection,
}

impl SourceReader {
    /// Open a legacy store read-only and verify the columns the readers select
    pub fn open(store: Store, path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .and_then(|conn| {
            // Force a real read so a non-database file fails here, not mid-run
            conn.query_row("SELECT count(*) FROM sqlite_master", [], |_| Ok(()))?;
            Ok(conn)
        })
        .map_err(|source| MigrateError::Connectivity {
            store,
            path: path.to_path_buf(),
            source,
        })?;

        let reader = Self { store, conn };
        for table in store.required_tables() {
            reader.verify_columns(table)?;
        }
        Ok(reader)
    }

    fn verify_columns(&self, table: &'static TableSchema) -> Result<()> {
        let present = self.column_names(table.name)?;
        let missing: Vec<String> = table
            .columns
            .iter()
            .filter(|col| !present.iter().any(|p| p.eq_ignore_ascii_case(col.name)))
            .map(|col| col.name.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(MigrateError::SourceSchema {
                store: self.store,
                table: table.name,
                missing,
            })
        }
    }

    fn column_names(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(&format!("PRAGMA table_info({})", table))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    /// User tables in this store, alphabetically
    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    fn select<T>(&self, sql: &str, map: impl FnMut(&rusqlite::Row) -> rusqlite::Result<T>) -> Result<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], map)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn count(&self, sql: &str) -> Result<u64> {
        let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as u64)
    }
}

/// The four legacy stores, opened once per run
pub struct Sources {
    pub items: SourceReader,
    pub routes: SourceReader,
    pub mission: SourceReader,
    pub products: SourceReader,
}

impl Sources {
    /// Open all legacy stores; the first failure aborts the run
    pub fn open(config: &StoreConfig) -> Result<Self> {
        Ok(Self {
            items: SourceReader::open(Store::Items, &config.items)?,
            routes: SourceReader::open(Store::Routes, &config.routes)?,
            mission: SourceReader::open(Store::Mission, &config.mission)?,
            products: SourceReader::open(Store::Products, &config.products)?,
        })
    }

    pub fn categories(&self) -> Result<Vec<CategoryRow>> {
        self.products.select(
            "SELECT id, name, description FROM categories",
            CategoryRow::from_row,
        )
    }

    pub fn products(&self) -> Result<Vec<ProductRow>> {
        self.products.select(
            "SELECT sku, name, description, base_price, category_id, vendor, is_active
             FROM products",
            ProductRow::from_row,
        )
    }

    pub fn customers(&self) -> Result<Vec<CustomerRow>> {
        self.routes.select(
            "SELECT CustomerNumber, AccountName, Address, City, State, ZipCode,
                    RouteNumber, ServiceFrequency, ServiceDays
             FROM routes",
            CustomerRow::from_row,
        )
    }

    /// Distinct `(item_id, description)` pairs across all rental records
    pub fn catalog_pairs(&self) -> Result<Vec<CatalogPair>> {
        self.items.select(
            "SELECT DISTINCT item_id, description FROM items ORDER BY item_id",
            CatalogPair::from_row,
        )
    }

    pub fn rental_records(&self) -> Result<Vec<ItemRow>> {
        self.items.select(
            "SELECT item_id, description, customer_num, quantity_used, route FROM items",
            ItemRow::from_row,
        )
    }

    /// Distinct non-null route identifiers as stored in the route source
    pub fn distinct_routes(&self) -> Result<Vec<Value>> {
        self.routes.select(
            "SELECT DISTINCT RouteNumber FROM routes
             WHERE RouteNumber IS NOT NULL
             ORDER BY RouteNumber",
            |row| row.get(0),
        )
    }

    /// `ServiceDays` of the first customer row on a route
    pub fn first_service_days(&self, route: &Value) -> Result<Option<String>> {
        let mut stmt = self
            .routes
            .conn
            .prepare_cached("SELECT ServiceDays FROM routes WHERE RouteNumber = ? LIMIT 1")?;
        let mut rows = stmt.query([route])?;
        match rows.next()? {
            Some(row) => Ok(value_text(&row.get::<_, Value>(0)?)),
            None => Ok(None),
        }
    }

    /// Candidate row counts per source query, for dry-run plans
    pub fn candidate_counts(&self) -> Result<SourceCounts> {
        Ok(SourceCounts {
            categories: self.products.count("SELECT count(*) FROM categories")?,
            products: self.products.count("SELECT count(*) FROM products")?,
            customers: self.routes.count("SELECT count(*) FROM routes")?,
            catalog_pairs: self
                .items
                .count("SELECT count(*) FROM (SELECT DISTINCT item_id, description FROM items)")?,
            rental_records: self.items.count("SELECT count(*) FROM items")?,
            routes: self.routes.count(
                "SELECT count(DISTINCT RouteNumber) FROM routes WHERE RouteNumber IS NOT NULL",
            )?,
        })
    }
}

/// Number of rows each extraction query would return
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceCounts {
    pub categories: u64,
    pub products: u64,
    pub customers: u64,
    pub catalog_pairs: u64,
    pub rental_records: u64,
    pub routes: u64,
}
