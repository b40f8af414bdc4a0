use rusqlite::types::Value;
use std::fmt;

use crate::source::value_text;

/// Canonical customer number shared by the route and item stores.
///
/// The route store keeps `CustomerNumber` as text, the item store keeps
/// `customer_num` as whatever the spreadsheet import produced (integer, real
/// or padded text). Both reduce to the same trimmed text form here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CustomerKey(String);

impl CustomerKey {
    /// `None` for NULL or blank values
    pub fn from_value(value: &Value) -> Option<Self> {
        let text = value_text(value)?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(CustomerKey(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Delivery day (1-5) for a rental record: `(route mod 5) + 1`.
///
/// Absent, zero or non-numeric routes deliver on day 1. Fractional routes
/// keep their fraction through the modulo and are truncated afterwards, so
/// `7.5` lands on day 3.
pub fn delivery_day(route: &Value) -> i64 {
    match route {
        Value::Integer(r) if *r != 0 => r.rem_euclid(5) + 1,
        Value::Real(r) if r.is_finite() && *r != 0.0 => (r.rem_euclid(5.0) + 1.0).trunc() as i64,
        Value::Text(s) => match s.trim().parse::<i64>() {
            Ok(r) if r != 0 => r.rem_euclid(5) + 1,
            _ => 1,
        },
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_keys_agree_across_stores() {
        let from_routes = CustomerKey::from_value(&Value::Text(" 101 ".into()));
        let from_items = CustomerKey::from_value(&Value::Integer(101));
        let from_real = CustomerKey::from_value(&Value::Real(101.0));
        assert_eq!(from_routes, from_items);
        assert_eq!(from_items, from_real);
        assert_eq!(from_items.unwrap().as_str(), "101");
    }

    #[test]
    fn test_missing_customer_key() {
        assert_eq!(CustomerKey::from_value(&Value::Null), None);
        assert_eq!(CustomerKey::from_value(&Value::Text("  ".into())), None);
    }

    #[test]
    fn test_delivery_day() {
        assert_eq!(delivery_day(&Value::Integer(5)), 1);
        assert_eq!(delivery_day(&Value::Integer(33)), 4);
        assert_eq!(delivery_day(&Value::Integer(-3)), 3);
        assert_eq!(delivery_day(&Value::Text("12".into())), 3);
        assert_eq!(delivery_day(&Value::Integer(0)), 1);
        assert_eq!(delivery_day(&Value::Null), 1);
        assert_eq!(delivery_day(&Value::Text("A".into())), 1);
    }

    #[test]
    fn test_delivery_day_for_real_routes() {
        assert_eq!(delivery_day(&Value::Real(5.0)), 1);
        assert_eq!(delivery_day(&Value::Real(7.5)), 3);
        assert_eq!(delivery_day(&Value::Real(4.9)), 5);
        assert_eq!(delivery_day(&Value::Real(-2.5)), 3);
        assert_eq!(delivery_day(&Value::Real(0.0)), 1);
        assert_eq!(delivery_day(&Value::Real(f64::NAN)), 1);
    }
}
