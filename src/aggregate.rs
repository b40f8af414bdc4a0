//! Derived master rows: route load summaries, standardization scores and
//! the customer search index. Each is a full recomputation from the base
//! tables, never a delta.

use rusqlite::Connection;

use crate::error::Result;
use crate::writer::count_rows;

/// Result of a recomputation guarded by base-table preconditions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recompute {
    /// Rows present in the derived table afterwards
    Done { rows: u64 },
    /// Base tables with no rows; nothing was touched
    Skipped { empty: Vec<&'static str> },
}

/// Base tables the route load summary joins through
const LOAD_SUMMARY_BASES: [&str; 3] = ["customer_rental_items", "customers", "routes"];

/// Rebuild `route_load_summary` from rental items joined through customers to
/// routes, one row per `(RouteNumber, ServiceDay, item_id)`.
///
/// Existing summary rows are deleted first, so repeated runs never
/// double-count.
pub fn recompute_route_load_summary(conn: &Connection) -> Result<Recompute> {
    let mut empty = Vec::new();
    for table in LOAD_SUMMARY_BASES {
        if count_rows(conn, table)? == 0 {
            empty.push(table);
        }
    }
    if !empty.is_empty() {
        tracing::warn!(?empty, "route load summary skipped: base tables empty");
        return Ok(Recompute::Skipped { empty });
    }

    conn.execute("DELETE FROM route_load_summary", [])?;
    let rows = conn.execute(
        "INSERT INTO route_load_summary (RouteNumber, ServiceDay, item_id, description, total_quantity)
         SELECT
             c.RouteNumber,
             r.ServiceDay,
             cri.item_id,
             MIN(cri.description),
             SUM(cri.quantity_used)
         FROM customer_rental_items cri
         JOIN customers c ON cri.CustomerNumber = c.CustomerNumber
         JOIN routes r ON c.RouteNumber = r.RouteNumber
         GROUP BY c.RouteNumber, r.ServiceDay, cri.item_id",
        [],
    )?;

    Ok(Recompute::Done { rows: rows as u64 })
}

/// Set every catalog row's `standardization_score` to the number of distinct
/// customers holding that `item_id`. Returns the number of catalog rows updated.
pub fn recompute_standardization_scores(conn: &Connection) -> Result<u64> {
    let updated = conn.execute(
        "UPDATE rental_items_catalog
         SET standardization_score = (
             SELECT COUNT(DISTINCT r.CustomerNumber)
             FROM customer_rental_items AS r
             WHERE r.item_id = rental_items_catalog.item_id
         )",
        [],
    )?;
    Ok(updated as u64)
}

/// Clear and repopulate the customer full-text index. Returns indexed rows.
pub fn rebuild_search_index(conn: &Connection) -> Result<u64> {
    conn.execute("DELETE FROM customers_fts", [])?;
    conn.execute(
        "INSERT INTO customers_fts (CustomerNumber, AccountName)
         SELECT CustomerNumber, AccountName FROM customers",
        [],
    )?;
    count_rows(conn, "customers_fts")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::TargetWriter;

    fn master() -> TargetWriter {
        let writer = TargetWriter::from_connection(Connection::open_in_memory().unwrap()).unwrap();
        writer.ensure_schema().unwrap();
        writer
    }

    fn seed(conn: &Connection) {
        conn.execute_batch(
            "INSERT INTO customers (CustomerNumber, AccountName, RouteNumber) VALUES
                ('101', 'Acme Diner', '10-5'),
                ('102', 'Bolt Garage', '10-5'),
                ('103', 'Corner Cafe', '7');
             INSERT INTO routes (RouteNumber, RouteInt, PlantNumber, ServiceDay) VALUES
                ('10-5', 5, 10, 'Wednesday'),
                ('7', 7, NULL, 'Monday');
             INSERT INTO rental_items_catalog (item_id, description) VALUES
                (7, 'Shop Towel'), (9, 'Floor Mat');
             INSERT INTO customer_rental_items (CustomerNumber, item_id, description, quantity_used) VALUES
                ('101', 7, 'Shop Towel', 50),
                ('102', 7, 'Shop Towel', 25),
                ('101', 7, 'Shop Towel', 10),
                ('103', 9, 'Floor Mat', 3);",
        )
        .unwrap();
    }

    fn summary(conn: &Connection) -> Vec<(String, String, i64, i64)> {
        let mut stmt = conn
            .prepare(
                "SELECT RouteNumber, ServiceDay, item_id, total_quantity
                 FROM route_load_summary ORDER BY RouteNumber, item_id",
            )
            .unwrap();
        stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap()
    }

    #[test]
    fn test_load_summary_sums_per_route_and_item() {
        let writer = master();
        let conn = writer.connection();
        seed(conn);

        assert_eq!(
            recompute_route_load_summary(conn).unwrap(),
            Recompute::Done { rows: 2 }
        );
        assert_eq!(
            summary(conn),
            vec![
                ("10-5".into(), "Wednesday".into(), 7, 85),
                ("7".into(), "Monday".into(), 9, 3),
            ]
        );
    }

    #[test]
    fn test_load_summary_recompute_is_idempotent() {
        let writer = master();
        let conn = writer.connection();
        seed(conn);

        recompute_route_load_summary(conn).unwrap();
        let first = summary(conn);
        recompute_route_load_summary(conn).unwrap();
        assert_eq!(summary(conn), first);
    }

    #[test]
    fn test_load_summary_skipped_without_routes() {
        let writer = master();
        let conn = writer.connection();
        conn.execute("INSERT INTO customers (CustomerNumber) VALUES ('101')", [])
            .unwrap();

        assert_eq!(
            recompute_route_load_summary(conn).unwrap(),
            Recompute::Skipped {
                empty: vec!["customer_rental_items", "routes"]
            }
        );
    }

    #[test]
    fn test_standardization_score_counts_distinct_customers_by_item_id() {
        let writer = master();
        let conn = writer.connection();
        seed(conn);
        // Same item id, different wording: still item 7
        conn.execute(
            "INSERT INTO customer_rental_items (CustomerNumber, item_id, description, quantity_used)
             VALUES ('103', 7, 'Towel, shop', 5)",
            [],
        )
        .unwrap();

        assert_eq!(recompute_standardization_scores(conn).unwrap(), 2);

        let score = |item: i64| -> i64 {
            conn.query_row(
                "SELECT standardization_score FROM rental_items_catalog WHERE item_id = ?1",
                [item],
                |r| r.get(0),
            )
            .unwrap()
        };
        assert_eq!(score(7), 3);
        assert_eq!(score(9), 1);
    }

    #[test]
    fn test_search_index_rebuild_replaces_rows() {
        let writer = master();
        let conn = writer.connection();
        seed(conn);

        assert_eq!(rebuild_search_index(conn).unwrap(), 3);
        assert_eq!(rebuild_search_index(conn).unwrap(), 3);

        let hit: String = conn
            .query_row(
                "SELECT CustomerNumber FROM customers_fts WHERE customers_fts MATCH 'garage'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(hit, "102");
        assert_eq!(count_rows(conn, "customers_fts").unwrap(), 3);
    }
}
