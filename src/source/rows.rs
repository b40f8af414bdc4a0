use rusqlite::types::Value;
use rusqlite::Row;

/// Render a loosely typed legacy value as text.
///
/// Integral reals render without a fractional part so `33.0` and `33` agree.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(r) if r.fract() == 0.0 && r.abs() < 9.0e15 => Some((*r as i64).to_string()),
        Value::Real(r) => Some(r.to_string()),
        Value::Text(s) => Some(s.clone()),
        Value::Blob(b) => Some(String::from_utf8_lossy(b).into_owned()),
    }
}

/// Text for log lines; absent values show as `NULL`
pub fn display_value(value: &Value) -> String {
    value_text(value).unwrap_or_else(|| "NULL".to_string())
}

/// `products.categories` row, copied verbatim
#[derive(Debug, Clone)]
pub struct CategoryRow {
    pub id: Value,
    pub name: Value,
    pub description: Value,
}

impl CategoryRow {
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
        })
    }
}

/// `products.products` row
#[derive(Debug, Clone)]
pub struct ProductRow {
    pub sku: Value,
    pub name: Value,
    pub description: Value,
    pub base_price: Value,
    pub category_id: Value,
    pub vendor: Value,
    pub is_active: Value,
}

impl ProductRow {
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            sku: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            base_price: row.get(3)?,
            category_id: row.get(4)?,
            vendor: row.get(5)?,
            is_active: row.get(6)?,
        })
    }
}

/// `routes.routes` row: one customer stop on a route
#[derive(Debug, Clone)]
pub struct CustomerRow {
    pub customer_number: Value,
    pub account_name: Value,
    pub address: Value,
    pub city: Value,
    pub state: Value,
    pub zip_code: Value,
    pub route_number: Value,
    pub service_frequency: Value,
    pub service_days: Value,
}

impl CustomerRow {
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            customer_number: row.get(0)?,
            account_name: row.get(1)?,
            address: row.get(2)?,
            city: row.get(3)?,
            state: row.get(4)?,
            zip_code: row.get(5)?,
            route_number: row.get(6)?,
            service_frequency: row.get(7)?,
            service_days: row.get(8)?,
        })
    }
}

/// Distinct `(item_id, description)` observed in `items.items`
#[derive(Debug, Clone)]
pub struct CatalogPair {
    pub item_id: Value,
    pub description: Value,
}

impl CatalogPair {
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            item_id: row.get(0)?,
            description: row.get(1)?,
        })
    }
}

/// `items.items` row: one rental item held by a customer
#[derive(Debug, Clone)]
pub struct ItemRow {
    pub item_id: Value,
    pub description: Value,
    pub customer_num: Value,
    pub quantity_used: Value,
    pub route: Value,
}

impl ItemRow {
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            item_id: row.get(0)?,
            description: row.get(1)?,
            customer_num: row.get(2)?,
            quantity_used: row.get(3)?,
            route: row.get(4)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_text() {
        assert_eq!(value_text(&Value::Null), None);
        assert_eq!(value_text(&Value::Integer(33)), Some("33".into()));
        assert_eq!(value_text(&Value::Real(33.0)), Some("33".into()));
        assert_eq!(value_text(&Value::Real(2.5)), Some("2.5".into()));
        assert_eq!(value_text(&Value::Text("2502-33".into())), Some("2502-33".into()));
        assert_eq!(display_value(&Value::Null), "NULL");
    }
}
