pub mod aggregate;
pub mod backfill;
pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod orchestrator;
pub mod reconcile;
pub mod schema;
pub mod source;
pub mod steps;
pub mod ui;
pub mod writer;

pub use cli::{Cli, Commands};
pub use config::{StoreConfig, StoreOverrides};
pub use error::{MigrateError, Result};
pub use orchestrator::{Migration, MigrationSummary, RunMode, RunPlan, StepReport};
pub use steps::{Step, StepOutcome};
pub use ui::{ConsoleUi, Phase, SilentUi, Ui, UiApp};
