//! The fixed migration pipeline: step identities and the work each performs.
//!
//! Step functions take only the handles they need and never talk to the
//! operator; sequencing, transactions and reporting live in the orchestrator.

use rusqlite::{params, Connection};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::aggregate::{
    rebuild_search_index, recompute_route_load_summary, recompute_standardization_scores,
    Recompute,
};
use crate::backfill::{
    BackfillPolicy, BILLING_FREQUENCY, CATALOG_ACTIVE, CATALOG_CATEGORY, DEFAULT_STOCK_QUANTITY,
    DELIVERY_FREQUENCY, INITIAL_STANDARDIZATION_SCORE,
};
use crate::error::Result;
use crate::reconcile::{delivery_day, route_text, CustomerKey, RouteId, ServiceDay};
use crate::source::{display_value, SourceCounts, Sources};
use crate::writer::{insert_row, RowTally};

/// Pipeline steps in their required order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    Categories,
    Products,
    Customers,
    RentalCatalog,
    CustomerRentalItems,
    Routes,
    RouteLoadSummaries,
    AdminAccount,
    SearchIndex,
    StandardizationScores,
}

impl Step {
    pub const ALL: [Step; 10] = [
        Step::Categories,
        Step::Products,
        Step::Customers,
        Step::RentalCatalog,
        Step::CustomerRentalItems,
        Step::Routes,
        Step::RouteLoadSummaries,
        Step::AdminAccount,
        Step::SearchIndex,
        Step::StandardizationScores,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Step::Categories => "categories",
            Step::Products => "products",
            Step::Customers => "customers",
            Step::RentalCatalog => "rental-catalog",
            Step::CustomerRentalItems => "customer-rental-items",
            Step::Routes => "routes",
            Step::RouteLoadSummaries => "route-load-summaries",
            Step::AdminAccount => "admin-account",
            Step::SearchIndex => "search-index",
            Step::StandardizationScores => "standardization-scores",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Step::Categories => "Copy product categories",
            Step::Products => "Copy products into direct sales",
            Step::Customers => "Migrate customers from route records",
            Step::RentalCatalog => "Build rental item catalog",
            Step::CustomerRentalItems => "Attach rental items to customers",
            Step::Routes => "Create route records",
            Step::RouteLoadSummaries => "Compute route load summaries",
            Step::AdminAccount => "Seed SuperAdmin driver account",
            Step::SearchIndex => "Rebuild customer search index",
            Step::StandardizationScores => "Compute standardization scores",
        }
    }

    /// Steps whose rows this step reads or references
    pub fn requires(&self) -> &'static [Step] {
        match self {
            Step::Products => &[Step::Categories],
            Step::CustomerRentalItems => &[Step::Customers, Step::RentalCatalog],
            Step::RouteLoadSummaries => {
                &[Step::Customers, Step::CustomerRentalItems, Step::Routes]
            }
            Step::AdminAccount => &[Step::Routes],
            Step::SearchIndex => &[Step::Customers],
            Step::StandardizationScores => &[Step::RentalCatalog, Step::CustomerRentalItems],
            Step::Categories | Step::Customers | Step::RentalCatalog | Step::Routes => &[],
        }
    }

    /// Steps recomputed from master rows rather than copied from a source
    pub fn is_derived(&self) -> bool {
        matches!(
            self,
            Step::RouteLoadSummaries | Step::SearchIndex | Step::StandardizationScores
        )
    }

    /// Source rows the step would consider; `None` for derived steps
    pub fn candidates(&self, counts: &SourceCounts) -> Option<u64> {
        match self {
            Step::Categories => Some(counts.categories),
            Step::Products => Some(counts.products),
            Step::Customers => Some(counts.customers),
            Step::RentalCatalog => Some(counts.catalog_pairs),
            Step::CustomerRentalItems => Some(counts.rental_records),
            Step::Routes => Some(counts.routes),
            Step::AdminAccount => Some(1),
            Step::RouteLoadSummaries | Step::SearchIndex | Step::StandardizationScores => None,
        }
    }

    /// Run this step against `target`
    pub fn execute(&self, ctx: &StepContext<'_>) -> Result<StepOutcome> {
        let tally = match self {
            Step::Categories => migrate_categories(ctx.sources, ctx.target)?,
            Step::Products => migrate_products(ctx.sources, ctx.target)?,
            Step::Customers => migrate_customers(ctx.sources, ctx.target, ctx.policy)?,
            Step::RentalCatalog => migrate_rental_catalog(ctx.sources, ctx.target)?,
            Step::CustomerRentalItems => migrate_customer_rental_items(ctx.sources, ctx.target)?,
            Step::Routes => migrate_routes(ctx.sources, ctx.target)?,
            Step::RouteLoadSummaries => {
                return Ok(match recompute_route_load_summary(ctx.target)? {
                    Recompute::Done { rows } => StepOutcome::derived(rows),
                    Recompute::Skipped { empty } => StepOutcome::Skipped {
                        reason: format!("no rows in {}", empty.join(", ")),
                    },
                })
            }
            Step::AdminAccount => seed_admin_account(ctx.target, ctx.policy)?,
            Step::SearchIndex => return Ok(StepOutcome::derived(rebuild_search_index(ctx.target)?)),
            Step::StandardizationScores => {
                return Ok(StepOutcome::derived(recompute_standardization_scores(
                    ctx.target,
                )?))
            }
        };
        Ok(StepOutcome::Completed(tally))
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Step::ALL
            .iter()
            .copied()
            .find(|step| step.name() == wanted)
            .ok_or_else(|| format!("Unknown step: {}", s))
    }
}

/// How a step ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// Rows attempted; constraint failures counted, not fatal
    Completed(RowTally),
    /// Preconditions unmet; nothing written
    Skipped { reason: String },
    /// Unexpected error; the step's writes were rolled back
    Failed { error: String },
    /// Dry run: rows the step would consider
    Planned { candidates: Option<u64> },
    /// Not selected, or not reached because the run aborted
    NotRun,
}

impl StepOutcome {
    fn derived(rows: u64) -> Self {
        StepOutcome::Completed(RowTally {
            succeeded: rows,
            failed: 0,
        })
    }

    pub fn tally(&self) -> Option<RowTally> {
        match self {
            StepOutcome::Completed(tally) => Some(*tally),
            _ => None,
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Completed(t) => write!(f, "{} succeeded, {} failed", t.succeeded, t.failed),
            StepOutcome::Skipped { reason } => write!(f, "skipped ({})", reason),
            StepOutcome::Failed { error } => write!(f, "failed: {}", error),
            StepOutcome::Planned { candidates: Some(n) } => write!(f, "would process {} rows", n),
            StepOutcome::Planned { candidates: None } => write!(f, "would recompute"),
            StepOutcome::NotRun => write!(f, "not run"),
        }
    }
}

/// Handles a step may use: read-only sources, the target connection (or
/// open transaction) and the run's backfill values
pub struct StepContext<'a> {
    pub sources: &'a Sources,
    pub target: &'a Connection,
    pub policy: &'a BackfillPolicy,
}

// =============================================================================
// Base tables
// =============================================================================

pub fn migrate_categories(sources: &Sources, target: &Connection) -> Result<RowTally> {
    let mut tally = RowTally::default();
    for row in sources.categories()? {
        insert_row(
            target,
            "INSERT INTO categories (id, name, description) VALUES (?1, ?2, ?3)",
            params![row.id, row.name, row.description],
            "categories",
            &display_value(&row.id),
            &mut tally,
        )?;
    }
    Ok(tally)
}

/// Products become direct-sale items with an empty stock count and no image
pub fn migrate_products(sources: &Sources, target: &Connection) -> Result<RowTally> {
    let mut tally = RowTally::default();
    for row in sources.products()? {
        insert_row(
            target,
            "INSERT INTO direct_sales
                (sku, name, description, base_price, category_id, vendor, is_active,
                 stock_quantity, image_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL)",
            params![
                row.sku,
                row.name,
                row.description,
                row.base_price,
                row.category_id,
                row.vendor,
                row.is_active,
                DEFAULT_STOCK_QUANTITY,
            ],
            "direct_sales",
            &display_value(&row.sku),
            &mut tally,
        )?;
    }
    Ok(tally)
}

/// One customer per route-store row; repeated customer numbers are rejected
/// by the UNIQUE constraint and counted
pub fn migrate_customers(
    sources: &Sources,
    target: &Connection,
    policy: &BackfillPolicy,
) -> Result<RowTally> {
    let mut tally = RowTally::default();
    for row in sources.customers()? {
        let key = CustomerKey::from_value(&row.customer_number);
        insert_row(
            target,
            "INSERT INTO customers
                (CustomerNumber, AccountName, Address, City, State, ZipCode,
                 RouteNumber, ServiceFrequency, ServiceDays, Email, Phone, CreatedAt)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, NULL, ?10)",
            params![
                key.as_ref().map(CustomerKey::as_str),
                row.account_name,
                row.address,
                row.city,
                row.state,
                row.zip_code,
                route_text(&row.route_number),
                row.service_frequency,
                row.service_days,
                policy.created_at,
            ],
            "customers",
            &display_value(&row.customer_number),
            &mut tally,
        )?;
    }
    Ok(tally)
}

/// One catalog row per distinct `(item_id, description)`; a second wording
/// for an item id already cataloged is rejected by UNIQUE(item_id)
pub fn migrate_rental_catalog(sources: &Sources, target: &Connection) -> Result<RowTally> {
    let mut tally = RowTally::default();
    for pair in sources.catalog_pairs()? {
        insert_row(
            target,
            "INSERT INTO rental_items_catalog
                (item_id, description, category, is_active, standardization_score)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                pair.item_id,
                pair.description,
                CATALOG_CATEGORY,
                CATALOG_ACTIVE,
                INITIAL_STANDARDIZATION_SCORE,
            ],
            "rental_items_catalog",
            &display_value(&pair.item_id),
            &mut tally,
        )?;
    }
    Ok(tally)
}

/// Rental records tied to customers. Records naming an unknown customer or
/// item fail their foreign key and are counted
pub fn migrate_customer_rental_items(sources: &Sources, target: &Connection) -> Result<RowTally> {
    let mut tally = RowTally::default();
    for row in sources.rental_records()? {
        let customer = CustomerKey::from_value(&row.customer_num);
        let key = format!(
            "item {} for customer {}",
            display_value(&row.item_id),
            display_value(&row.customer_num)
        );
        insert_row(
            target,
            "INSERT INTO customer_rental_items
                (CustomerNumber, item_id, description, quantity_used,
                 delivery_frequency, delivery_day, billing_frequency)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                customer.as_ref().map(CustomerKey::as_str),
                row.item_id,
                row.description,
                row.quantity_used,
                DELIVERY_FREQUENCY,
                delivery_day(&row.route),
                BILLING_FREQUENCY,
            ],
            "customer_rental_items",
            &key,
            &mut tally,
        )?;
    }
    Ok(tally)
}

/// One route per distinct route identifier, reconciled into route/plant
/// numbers, serviced on the first day listed by its first customer
pub fn migrate_routes(sources: &Sources, target: &Connection) -> Result<RowTally> {
    let mut tally = RowTally::default();
    for value in sources.distinct_routes()? {
        let service_day = ServiceDay::from_service_days(sources.first_service_days(&value)?.as_deref());
        let route = RouteId::parse(&value);
        if let RouteId::Opaque { raw } = &route {
            tracing::debug!(route = %raw, "route id kept verbatim");
        }

        insert_row(
            target,
            "INSERT INTO routes (RouteNumber, RouteInt, DriverName, PlantNumber, ServiceDay)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                route.route_number(),
                route.route_int(),
                route.driver_name(),
                route.plant_number(),
                service_day.as_str(),
            ],
            "routes",
            &route,
            &mut tally,
        )?;
    }
    Ok(tally)
}

// =============================================================================
// Seeded rows
// =============================================================================

/// Seed the SuperAdmin driver on the first route, or the fallback route
pub fn seed_admin_account(target: &Connection, policy: &BackfillPolicy) -> Result<RowTally> {
    let admin = &policy.admin;
    let first_route: Option<String> = {
        let mut stmt = target.prepare("SELECT RouteNumber FROM routes ORDER BY id LIMIT 1")?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => Some(row.get(0)?),
            None => None,
        }
    };
    let route = first_route.unwrap_or_else(|| admin.fallback_route.to_string());

    let mut tally = RowTally::default();
    insert_row(
        target,
        "INSERT INTO drivers (name, email, password_hash, route_number, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            admin.name,
            admin.email,
            admin.password_hash,
            route,
            admin.role,
            policy.created_at,
        ],
        "drivers",
        &admin.email,
        &mut tally,
    )?;
    Ok(tally)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::TargetWriter;

    #[test]
    fn test_step_names_round_trip() {
        for step in Step::ALL {
            assert_eq!(step.name().parse::<Step>().unwrap(), step);
        }
        assert_eq!("Route_Load_Summaries".parse::<Step>().unwrap(), Step::RouteLoadSummaries);
        assert!("everything".parse::<Step>().is_err());
    }

    #[test]
    fn test_prerequisites_precede_dependents() {
        for step in Step::ALL {
            for req in step.requires() {
                assert!(req < &step, "{} must run before {}", req, step);
            }
        }
    }

    #[test]
    fn test_admin_seed_falls_back_without_routes() {
        let writer = TargetWriter::from_connection(Connection::open_in_memory().unwrap()).unwrap();
        writer.ensure_schema().unwrap();
        let policy = BackfillPolicy::now();

        let tally = seed_admin_account(writer.connection(), &policy).unwrap();
        assert_eq!(tally, RowTally { succeeded: 1, failed: 0 });

        let route: String = writer
            .connection()
            .query_row("SELECT route_number FROM drivers", [], |r| r.get(0))
            .unwrap();
        assert_eq!(route, "33");

        // Seeding twice hits UNIQUE(email) and is counted, not raised
        let again = seed_admin_account(writer.connection(), &policy).unwrap();
        assert_eq!(again, RowTally { succeeded: 0, failed: 1 });
    }

    #[test]
    fn test_admin_seed_uses_first_route() {
        let writer = TargetWriter::from_connection(Connection::open_in_memory().unwrap()).unwrap();
        writer.ensure_schema().unwrap();
        writer
            .connection()
            .execute_batch("INSERT INTO routes (RouteNumber) VALUES ('2502-33'), ('2502-40');")
            .unwrap();

        seed_admin_account(writer.connection(), &BackfillPolicy::now()).unwrap();
        let (route, role): (String, String) = writer
            .connection()
            .query_row("SELECT route_number, role FROM drivers", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(route, "2502-33");
        assert_eq!(role, "SuperAdmin");
    }
}
