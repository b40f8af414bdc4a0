use anyhow::{Context, Result};
use route_consolidator::{
    cli::{Cli, Commands, StoreArgs},
    config::StoreConfig,
    filter::resolve_steps,
    orchestrator::{Migration, MigrationSummary, RunPlan},
    steps::{Step, StepOutcome},
    ui::{ConsoleUi, Phase, SilentUi, Ui, UiApp},
    writer::TargetWriter,
};
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Log file used by the terminal UI when `--log-file` is not given
const DEFAULT_LOG_FILE: &str = "route-consolidator.log";

fn main() -> Result<ExitCode> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Migrate {
            stores,
            mode,
            include,
            exclude,
            clear,
            step_confirm,
            dry_run,
            headless,
            json,
            yes,
            log_file,
        } => {
            let headless = headless || json;
            let log_file = match (log_file, headless) {
                (Some(path), _) => Some(path),
                (None, false) => Some(DEFAULT_LOG_FILE.into()),
                (None, true) => None,
            };
            init_tracing(headless, log_file.as_deref())?;

            let config = load_config(&stores)?;
            let plan = RunPlan {
                mode,
                steps: resolve_steps(include, exclude)?,
                clear,
                confirm_steps: step_confirm,
                dry_run,
            };

            let start = Instant::now();
            let summary = if json {
                run_migration(&config, &plan, &mut SilentUi::answering(yes))?
            } else if headless {
                run_migration(&config, &plan, &mut ConsoleUi::new(yes))?
            } else {
                let mut ui = UiApp::new(yes)?;
                match run_migration(&config, &plan, &mut ui) {
                    Ok(summary) => {
                        ui.finish(&summary.to_string())?;
                        summary
                    }
                    Err(e) => {
                        ui.restore()?;
                        return Err(e);
                    }
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", summary);
                println!("Finished in {:.1}s", start.elapsed().as_secs_f64());
            }

            Ok(exit_code(&summary))
        }

        Commands::Status { stores, json } => {
            init_tracing(true, None)?;
            let config = load_config(&stores)?;
            let counts = TargetWriter::open_read_only(&config.target)?.table_counts()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&counts)?);
            } else {
                println!("Master database {:?}:\n", config.target);
                for count in counts {
                    println!("  {:<24} {}", count.table, count.rows);
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::InitSchema { stores } => {
            init_tracing(true, None)?;
            let config = load_config(&stores)?;
            let writer = TargetWriter::open(&config.target)?;
            writer.ensure_schema()?;
            writer.finalize()?;
            println!("Master schema ready in {:?}", config.target);
            Ok(ExitCode::SUCCESS)
        }

        Commands::ListSteps => {
            println!("Pipeline steps, in order:\n");
            for step in Step::ALL {
                println!("  {:<24} {}", step.name(), step.description());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Diagnostics go to stderr in headless mode; the terminal UI owns the
/// screen, so there they only go to the log file
fn init_tracing(headless: bool, log_file: Option<&Path>) -> Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Cannot open log file: {:?}", path))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::sync::Arc::new(file))
                    .with_ansi(false),
            )
        }
        None => None,
    };
    let stderr_layer = headless.then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(())
}

fn load_config(stores: &StoreArgs) -> Result<StoreConfig> {
    Ok(StoreConfig::load(stores.config.as_deref())?.with_overrides(stores.overrides()))
}

fn run_migration(config: &StoreConfig, plan: &RunPlan, ui: &mut impl Ui) -> Result<MigrationSummary> {
    ui.set_phase(Phase::Connecting);
    ui.set_info(format!("master: {}", config.target.display()));

    let mut migration = Migration::open_for(config, plan).context("Failed to open databases")?;
    let summary = migration.run(plan, ui).context("Migration aborted")?;
    if !plan.dry_run {
        migration.into_target().finalize()?;
    }
    Ok(summary)
}

/// Non-zero when anything was rolled back; row-level failures alone do not count
fn exit_code(summary: &MigrationSummary) -> ExitCode {
    let step_failed = summary
        .steps
        .iter()
        .any(|r| matches!(r.outcome, StepOutcome::Failed { .. }));
    if summary.rolled_back.is_some() || step_failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
