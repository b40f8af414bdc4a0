use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::StoreOverrides;
use crate::orchestrator::RunMode;

#[derive(Parser, Debug)]
#[command(name = "route-consolidator")]
#[command(version, about = "Consolidate legacy route stores into one master SQLite database")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Store locations; each flag overrides the config file entry
#[derive(Args, Debug, Clone, Default)]
pub struct StoreArgs {
    /// Config file with a [stores] table
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Legacy items database
    #[arg(long)]
    pub items: Option<PathBuf>,

    /// Legacy routes database
    #[arg(long)]
    pub routes: Option<PathBuf>,

    /// Mission data database
    #[arg(long)]
    pub mission: Option<PathBuf>,

    /// Legacy products database
    #[arg(long)]
    pub products: Option<PathBuf>,

    /// Master database to write
    #[arg(short, long)]
    pub target: Option<PathBuf>,
}

impl StoreArgs {
    pub fn overrides(&self) -> StoreOverrides {
        StoreOverrides {
            items: self.items.clone(),
            routes: self.routes.clone(),
            mission: self.mission.clone(),
            products: self.products.clone(),
            target: self.target.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the migration pipeline into the master database
    Migrate {
        #[command(flatten)]
        stores: StoreArgs,

        /// Transaction strategy
        #[arg(short, long, value_enum, default_value_t = RunMode::Stepwise)]
        mode: RunMode,

        /// Only run these steps (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        include: Option<Vec<String>>,

        /// Skip these steps (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        exclude: Option<Vec<String>>,

        /// Delete existing master rows before migrating
        #[arg(long)]
        clear: bool,

        /// Ask before each step (stepwise mode)
        #[arg(long)]
        step_confirm: bool,

        /// Report what would be migrated without writing
        #[arg(long)]
        dry_run: bool,

        /// Plain line output instead of the terminal UI
        #[arg(long)]
        headless: bool,

        /// Print the final summary as JSON (implies --headless)
        #[arg(long)]
        json: bool,

        /// Answer yes to every confirmation
        #[arg(short, long)]
        yes: bool,

        /// Write diagnostic logs to this file
        #[arg(long)]
        log_file: Option<PathBuf>,
    },

    /// Print the row count of every master table
    Status {
        #[command(flatten)]
        stores: StoreArgs,

        /// Print counts as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create the master schema (existing tables are left alone)
    InitSchema {
        #[command(flatten)]
        stores: StoreArgs,
    },

    /// List pipeline steps in execution order
    ListSteps,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_defaults() {
        let cli = Cli::try_parse_from(["route-consolidator", "migrate"]).unwrap();
        match cli.command {
            Commands::Migrate {
                mode,
                clear,
                dry_run,
                include,
                ..
            } => {
                assert_eq!(mode, RunMode::Stepwise);
                assert!(!clear);
                assert!(!dry_run);
                assert!(include.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_migrate_flags() {
        let cli = Cli::try_parse_from([
            "route-consolidator",
            "migrate",
            "--mode",
            "atomic",
            "--include",
            "customers,routes",
            "--target",
            "out.db",
            "--clear",
            "--yes",
        ])
        .unwrap();
        let Commands::Migrate {
            stores,
            mode,
            include,
            clear,
            yes,
            ..
        } = cli.command
        else {
            panic!("expected migrate");
        };
        assert_eq!(mode, RunMode::Atomic);
        assert_eq!(
            include,
            Some(vec!["customers".to_string(), "routes".to_string()])
        );
        assert!(clear && yes);
        assert_eq!(stores.overrides().target, Some(PathBuf::from("out.db")));
        assert!(stores.overrides().items.is_none());
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(Cli::try_parse_from(["route-consolidator", "migrate", "--mode", "fast"]).is_err());
    }
}
