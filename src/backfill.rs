//! Defaults for master columns that no legacy store carries.

use chrono::{DateTime, Local};

/// Timestamp format shared by `customers.CreatedAt` and `drivers.created_at`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const DEFAULT_STOCK_QUANTITY: i64 = 0;
pub const CATALOG_CATEGORY: &str = "General";
pub const CATALOG_ACTIVE: i64 = 1;
pub const INITIAL_STANDARDIZATION_SCORE: i64 = 0;
pub const DELIVERY_FREQUENCY: &str = "Weekly";
pub const BILLING_FREQUENCY: &str = "Monthly";

/// The seeded administrative driver account
#[derive(Debug, Clone, PartialEq)]
pub struct AdminSeed {
    pub name: &'static str,
    pub email: &'static str,
    /// bcrypt of the bootstrap password; rotated by operators after first login
    pub password_hash: &'static str,
    pub role: &'static str,
    /// Used when the master has no routes yet
    pub fallback_route: &'static str,
}

pub const ADMIN_SEED: AdminSeed = AdminSeed {
    name: "Admin User",
    email: "admin@example.com",
    password_hash: "$2b$10$XH0yWAP7WZYCQiEVJ7Cy5u1j.JbPl0kJqN75YDz.O4vszTyFdPJUm",
    role: "SuperAdmin",
    fallback_route: "33",
};

/// Backfill values fixed for the whole run
#[derive(Debug, Clone, PartialEq)]
pub struct BackfillPolicy {
    /// Every customer migrated in one run shares this creation time
    pub created_at: String,
    pub admin: AdminSeed,
}

impl BackfillPolicy {
    pub fn at(now: DateTime<Local>) -> Self {
        Self {
            created_at: now.format(TIMESTAMP_FORMAT).to_string(),
            admin: ADMIN_SEED,
        }
    }

    pub fn now() -> Self {
        Self::at(Local::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_created_at_format() {
        let when = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let policy = BackfillPolicy::at(when);
        assert_eq!(policy.created_at, "2024-03-09 07:05:01");
        assert_eq!(policy.admin.role, "SuperAdmin");
    }
}
