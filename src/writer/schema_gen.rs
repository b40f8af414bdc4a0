use crate::schema::{PrimaryKey, TableKind, TableSchema};

/// Generate CREATE TABLE SQL for a table schema
pub fn generate_create_table(schema: &TableSchema) -> String {
    if schema.kind == TableKind::Fts5 {
        // First column is the lookup key; only the rest are tokenized
        let columns: Vec<String> = schema
            .columns
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                if idx == 0 {
                    format!("{} UNINDEXED", col.name)
                } else {
                    col.name.to_string()
                }
            })
            .collect();
        return format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS {} USING fts5({})",
            schema.name,
            columns.join(", ")
        );
    }

    let mut sql = format!("CREATE TABLE IF NOT EXISTS {} (\n", schema.name);
    let mut columns = Vec::new();

    for col in schema.columns {
        let pk = match col.primary_key {
            Some(PrimaryKey::Auto) => " PRIMARY KEY AUTOINCREMENT",
            Some(PrimaryKey::Supplied) => " PRIMARY KEY",
            None => "",
        };
        let null_constraint = if !col.nullable { " NOT NULL" } else { "" };
        let unique = if col.unique { " UNIQUE" } else { "" };
        let default = col
            .default
            .map(|expr| format!(" DEFAULT {}", expr))
            .unwrap_or_default();

        columns.push(format!(
            "    {} {}{}{}{}{}",
            col.name,
            col.col_type.sql_type(),
            pk,
            null_constraint,
            unique,
            default
        ));
    }

    // Add foreign key constraints
    for fk in schema.foreign_keys {
        columns.push(format!(
            "    FOREIGN KEY ({}) REFERENCES {}({})",
            fk.column, fk.references_table, fk.references_column
        ));
    }

    sql.push_str(&columns.join(",\n"));
    sql.push_str("\n)");

    sql
}

/// Generate CREATE INDEX statements for foreign key columns and explicit indexes
pub fn generate_indexes(schema: &TableSchema) -> Vec<String> {
    if schema.kind == TableKind::Fts5 {
        return Vec::new();
    }

    let fk_indexes = schema.foreign_keys.iter().map(|fk| {
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{}_{} ON {}({})",
            schema.name, fk.column, schema.name, fk.column
        )
    });

    let explicit = schema.indexes.iter().map(|index| {
        format!(
            "CREATE {}INDEX IF NOT EXISTS idx_{}_{} ON {}({})",
            if index.unique { "UNIQUE " } else { "" },
            schema.name,
            index.columns.join("_"),
            schema.name,
            index.columns.join(", ")
        )
    });

    fk_indexes.chain(explicit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tables::{CUSTOMERS_FTS, CUSTOMER_RENTAL_ITEMS, ROUTE_LOAD_SUMMARY};

    #[test]
    fn test_generate_create_table() {
        let sql = generate_create_table(&CUSTOMER_RENTAL_ITEMS);
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS customer_rental_items"));
        assert!(sql.contains("id INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(sql.contains("CustomerNumber TEXT NOT NULL"));
        assert!(sql.contains(
            "FOREIGN KEY (CustomerNumber) REFERENCES customers(CustomerNumber)"
        ));
        assert!(sql.contains("FOREIGN KEY (item_id) REFERENCES rental_items_catalog(item_id)"));
    }

    #[test]
    fn test_generate_fts_table() {
        let sql = generate_create_table(&CUSTOMERS_FTS);
        assert_eq!(
            sql,
            "CREATE VIRTUAL TABLE IF NOT EXISTS customers_fts USING fts5(CustomerNumber UNINDEXED, AccountName)"
        );
        assert!(generate_indexes(&CUSTOMERS_FTS).is_empty());
    }

    #[test]
    fn test_generate_indexes() {
        let indexes = generate_indexes(&CUSTOMER_RENTAL_ITEMS);
        assert!(indexes
            .iter()
            .any(|i| i.contains("idx_customer_rental_items_CustomerNumber")));

        let summary = generate_indexes(&ROUTE_LOAD_SUMMARY);
        assert_eq!(
            summary,
            vec![
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_route_load_summary_RouteNumber_ServiceDay_item_id \
                 ON route_load_summary(RouteNumber, ServiceDay, item_id)"
                    .to_string()
            ]
        );
    }
}
