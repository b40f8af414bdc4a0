use rusqlite::{Connection, OpenFlags, Params, Transaction};
use serde::Serialize;
use std::fmt::Display;
use std::path::Path;

use super::schema_gen::{generate_create_table, generate_indexes};
use crate::error::{is_constraint_violation, MigrateError, Result};
use crate::schema::{TableSchema, AUXILIARY_TABLES, MASTER_TABLES};
use crate::source::Store;

/// Per-step row outcome counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RowTally {
    pub succeeded: u64,
    pub failed: u64,
}

impl RowTally {
    pub fn attempted(&self) -> u64 {
        self.succeeded + self.failed
    }
}

/// Row count of one master table at a checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCount {
    pub table: &'static str,
    pub rows: u64,
}

/// What a clear pass touched
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClearReport {
    pub cleared: Vec<&'static str>,
    /// Auxiliary tables not present in this master
    pub absent: Vec<&'static str>,
}

/// The master database; the only store a run writes to
pub struct TargetWriter {
    conn: Connection,
}

impl TargetWriter {
    /// Open (creating if needed) the master database
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path).map_err(|source| MigrateError::Connectivity {
            store: Store::Target,
            path: db_path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an existing master for inspection only. A missing master reads
    /// as empty and is not created.
    pub fn open_read_only(db_path: &Path) -> Result<Self> {
        let opened = if db_path.exists() {
            Connection::open_with_flags(
                db_path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
        } else {
            Connection::open_in_memory()
        };
        let conn = opened.map_err(|source| MigrateError::Connectivity {
            store: Store::Target,
            path: db_path.to_path_buf(),
            source,
        })?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        // Referential integrity is checked per INSERT, so violations surface
        // as row-level constraint failures
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;",
        )?;
        Ok(Self { conn })
    }

    /// Create any missing master tables and indexes
    pub fn ensure_schema(&self) -> Result<()> {
        for schema in MASTER_TABLES {
            create_table(&self.conn, schema)?;
        }
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn transaction(&mut self) -> Result<Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }

    pub fn table_counts(&self) -> Result<Vec<TableCount>> {
        table_counts(&self.conn)
    }

    /// Finalize the database
    pub fn finalize(self) -> Result<()> {
        self.conn.execute_batch("PRAGMA optimize;")?;
        Ok(())
    }
}

fn create_table(conn: &Connection, schema: &'static TableSchema) -> Result<()> {
    let wrap = |source: rusqlite::Error| MigrateError::TargetSchema {
        table: schema.name,
        source,
    };

    conn.execute(&generate_create_table(schema), []).map_err(wrap)?;
    for index_sql in generate_indexes(schema) {
        conn.execute(&index_sql, []).map_err(wrap)?;
    }
    Ok(())
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let found: i64 = conn.query_row(
        "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |row| row.get(0),
    )?;
    Ok(found > 0)
}

/// Row count of every master table, in schema order. Tables not yet
/// created count as empty.
pub fn table_counts(conn: &Connection) -> Result<Vec<TableCount>> {
    MASTER_TABLES
        .iter()
        .map(|schema| {
            let rows = if table_exists(conn, schema.name)? {
                count_rows(conn, schema.name)?
            } else {
                0
            };
            Ok(TableCount {
                table: schema.name,
                rows,
            })
        })
        .collect()
}

pub fn count_rows(conn: &Connection, table: &str) -> Result<u64> {
    let rows: i64 = conn.query_row(&format!("SELECT count(*) FROM {}", table), [], |row| {
        row.get(0)
    })?;
    Ok(rows as u64)
}

/// Empty every master table plus any downstream tables sharing the database.
///
/// Children are emptied before parents so foreign keys hold throughout.
pub fn clear_tables(conn: &Connection) -> Result<ClearReport> {
    let mut report = ClearReport::default();

    for table in AUXILIARY_TABLES {
        if table_exists(conn, table)? {
            conn.execute(&format!("DELETE FROM {}", table), [])?;
            report.cleared.push(*table);
        } else {
            tracing::warn!(table, "auxiliary table not present; skipped");
            report.absent.push(*table);
        }
    }

    for schema in MASTER_TABLES.iter().rev() {
        conn.execute(&format!("DELETE FROM {}", schema.name), [])?;
        report.cleared.push(schema.name);
    }

    if table_exists(conn, "sqlite_sequence")? {
        conn.execute("DELETE FROM sqlite_sequence", [])?;
    }

    Ok(report)
}

/// Insert one row, isolating constraint failures to that row.
///
/// A UNIQUE / NOT NULL / FOREIGN KEY violation is logged with `key` and
/// counted as a failure; SQLite has already undone the statement, so the
/// enclosing transaction stays usable. Any other error propagates.
pub fn insert_row<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    table: &'static str,
    key: &dyn Display,
    tally: &mut RowTally,
) -> Result<()> {
    let mut stmt = conn.prepare_cached(sql)?;
    match stmt.execute(params) {
        Ok(_) => {
            tally.succeeded += 1;
            Ok(())
        }
        Err(err) if is_constraint_violation(&err) => {
            tracing::warn!(table, key = %key, error = %err, "row rejected");
            tally.failed += 1;
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writer() -> TargetWriter {
        let writer = TargetWriter::from_connection(Connection::open_in_memory().unwrap()).unwrap();
        writer.ensure_schema().unwrap();
        writer
    }

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let writer = writer();
        writer.ensure_schema().unwrap();
        let counts = writer.table_counts().unwrap();
        assert_eq!(counts.len(), MASTER_TABLES.len());
        assert!(counts.iter().all(|c| c.rows == 0));
    }

    #[test]
    fn test_one_duplicate_fails_alone() {
        let writer = writer();
        let conn = writer.connection();
        let mut tally = RowTally::default();
        let sql = "INSERT INTO routes (RouteNumber) VALUES (?1)";

        for route in ["1", "2", "2", "3", "4"] {
            insert_row(conn, sql, [route], "routes", &route, &mut tally).unwrap();
        }

        assert_eq!(tally, RowTally { succeeded: 4, failed: 1 });
        assert_eq!(count_rows(conn, "routes").unwrap(), 4);
    }

    #[test]
    fn test_constraint_failure_keeps_transaction_usable() {
        let mut writer = writer();
        let mut tally = RowTally::default();
        {
            let tx = writer.transaction().unwrap();
            let sql = "INSERT INTO customer_rental_items (CustomerNumber, item_id) VALUES (?1, ?2)";
            // No such customer: foreign key violation
            insert_row(&tx, sql, rusqlite::params!["C9", 1], "customer_rental_items", &"C9", &mut tally)
                .unwrap();
            tx.execute("INSERT INTO routes (RouteNumber) VALUES ('5')", []).unwrap();
            tx.commit().unwrap();
        }
        assert_eq!(tally.failed, 1);
        assert_eq!(count_rows(writer.connection(), "routes").unwrap(), 1);
    }

    #[test]
    fn test_unexpected_errors_propagate() {
        let writer = writer();
        let mut tally = RowTally::default();
        let result = insert_row(
            writer.connection(),
            "INSERT INTO no_such_table (x) VALUES (?1)",
            [1],
            "no_such_table",
            &1,
            &mut tally,
        );
        assert!(result.is_err());
        assert_eq!(tally.attempted(), 0);
    }

    #[test]
    fn test_clear_tables_reports_absent_auxiliaries() {
        let writer = writer();
        let conn = writer.connection();
        conn.execute_batch(
            "CREATE TABLE customer_notes (id INTEGER PRIMARY KEY, note TEXT);
             INSERT INTO customer_notes (note) VALUES ('gate code 1234');
             INSERT INTO customers (CustomerNumber) VALUES ('C1');
             INSERT INTO routes (RouteNumber) VALUES ('10-5');",
        )
        .unwrap();

        let report = clear_tables(conn).unwrap();
        assert!(report.cleared.contains(&"customer_notes"));
        assert!(report.absent.contains(&"sales"));
        assert_eq!(count_rows(conn, "customer_notes").unwrap(), 0);
        assert!(table_counts(conn).unwrap().iter().all(|c| c.rows == 0));

        let next_id: i64 = {
            conn.execute("INSERT INTO customers (CustomerNumber) VALUES ('C2')", []).unwrap();
            conn.query_row("SELECT id FROM customers", [], |r| r.get(0)).unwrap()
        };
        assert_eq!(next_id, 1);
    }

    #[test]
    fn test_read_only_open_does_not_create_master() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("master.db");

        let writer = TargetWriter::open_read_only(&path).unwrap();
        let counts = writer.table_counts().unwrap();
        assert_eq!(counts.len(), MASTER_TABLES.len());
        assert!(counts.iter().all(|c| c.rows == 0));
        assert!(!path.exists());
    }

    #[test]
    fn test_table_counts_on_partial_schema() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE customers (CustomerNumber TEXT); INSERT INTO customers VALUES ('C1');")
            .unwrap();
        let counts = table_counts(&conn).unwrap();
        let rows = |table: &str| counts.iter().find(|c| c.table == table).unwrap().rows;
        assert_eq!(rows("customers"), 1);
        assert_eq!(rows("routes"), 0);
    }
}
