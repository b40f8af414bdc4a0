use rusqlite::types::Value;
use std::fmt;

use crate::source::value_text;

/// Separator between plant and route in composite identifiers (`"2502-33"`)
pub const ROUTE_SEPARATOR: char = '-';

/// A legacy route identifier, classified by shape.
///
/// `raw` is always the stringified source value; it is the join key between
/// `customers.RouteNumber` and `routes.RouteNumber` and is never rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteId {
    /// `"<plant>-<route>"` with both halves numeric
    Composite { raw: String, plant: i64, route: i64 },
    /// A bare route number
    Numeric { raw: String, route: i64 },
    /// Anything else, including malformed composites
    Opaque { raw: String },
}

impl RouteId {
    /// Classify a route value. Never fails: unparseable input is `Opaque`.
    pub fn parse(value: &Value) -> Self {
        match value {
            Value::Integer(i) => RouteId::Numeric {
                raw: i.to_string(),
                route: *i,
            },
            other => Self::parse_str(&value_text(other).unwrap_or_default()),
        }
    }

    pub fn parse_str(raw: &str) -> Self {
        let owned = raw.to_string();

        if raw.contains(ROUTE_SEPARATOR) {
            let parts: Vec<&str> = raw.split(ROUTE_SEPARATOR).collect();
            if let [plant, route] = parts.as_slice() {
                if let (Ok(plant), Ok(route)) =
                    (plant.trim().parse::<i64>(), route.trim().parse::<i64>())
                {
                    return RouteId::Composite {
                        raw: owned,
                        plant,
                        route,
                    };
                }
            }
            return RouteId::Opaque { raw: owned };
        }

        match raw.trim().parse::<i64>() {
            Ok(route) => RouteId::Numeric { raw: owned, route },
            Err(_) => RouteId::Opaque { raw: owned },
        }
    }

    pub fn route_number(&self) -> &str {
        match self {
            RouteId::Composite { raw, .. } | RouteId::Numeric { raw, .. } | RouteId::Opaque { raw } => {
                raw
            }
        }
    }

    pub fn route_int(&self) -> Option<i64> {
        match self {
            RouteId::Composite { route, .. } | RouteId::Numeric { route, .. } => Some(*route),
            RouteId::Opaque { .. } => None,
        }
    }

    pub fn plant_number(&self) -> Option<i64> {
        match self {
            RouteId::Composite { plant, .. } => Some(*plant),
            _ => None,
        }
    }

    /// Placeholder driver name recorded on the route
    pub fn driver_name(&self) -> String {
        match self {
            RouteId::Composite { route, .. } => format!("Driver for Route {}", route),
            RouteId::Numeric { raw, .. } | RouteId::Opaque { raw } => {
                format!("Driver for Route {}", raw)
            }
        }
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.route_number())
    }
}

/// Stringify a route value the same way for customers and routes
pub fn route_text(value: &Value) -> Option<String> {
    value_text(value)
}

/// Day a route is serviced, from the legacy day-code list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceDay {
    #[default]
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl ServiceDay {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "M" => Some(ServiceDay::Monday),
            "T" => Some(ServiceDay::Tuesday),
            "W" => Some(ServiceDay::Wednesday),
            "Th" => Some(ServiceDay::Thursday),
            "F" => Some(ServiceDay::Friday),
            _ => None,
        }
    }

    /// First entry of a comma-separated `ServiceDays` list (`"M, W, F"`).
    /// Missing or unknown codes fall back to Monday.
    pub fn from_service_days(days: Option<&str>) -> Self {
        days.and_then(|d| d.split(',').next())
            .map(str::trim)
            .and_then(Self::from_code)
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceDay::Monday => "Monday",
            ServiceDay::Tuesday => "Tuesday",
            ServiceDay::Wednesday => "Wednesday",
            ServiceDay::Thursday => "Thursday",
            ServiceDay::Friday => "Friday",
        }
    }
}

impl fmt::Display for ServiceDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
