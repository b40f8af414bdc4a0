//! Identity reconciliation across legacy stores that never shared keys.

mod customer;
mod route;

pub use customer::{delivery_day, CustomerKey};
pub use route::{route_text, RouteId, ServiceDay, ROUTE_SEPARATOR};
