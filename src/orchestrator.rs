//! Sequences the pipeline steps against the master database.
//!
//! Two execution modes:
//! - `Atomic`: one transaction around the clear and every step. Constraint
//!   failures are still isolated per row; any other error rolls the whole run
//!   back and the master is left exactly as it was.
//! - `Stepwise`: the clear and each step commit on their own. An unexpected
//!   error rolls back only the current step; later steps still run. Table
//!   counts are captured after every step as a checkpoint.

use clap::ValueEnum;
use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;

use crate::backfill::BackfillPolicy;
use crate::config::StoreConfig;
use crate::error::Result;
use crate::source::Sources;
use crate::steps::{Step, StepContext, StepOutcome};
use crate::ui::{Phase, Ui};
use crate::writer::{clear_tables, table_counts, ClearReport, RowTally, TableCount, TargetWriter};

/// Transaction strategy for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// All steps in one transaction, committed at the end
    Atomic,
    /// Each step commits independently
    #[default]
    Stepwise,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Atomic => write!(f, "atomic"),
            RunMode::Stepwise => write!(f, "stepwise"),
        }
    }
}

/// What a run should do
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub mode: RunMode,
    /// Steps to run, in pipeline order
    pub steps: Vec<Step>,
    /// Empty the master tables first (asks for confirmation)
    pub clear: bool,
    /// Ask before each step (stepwise mode only)
    pub confirm_steps: bool,
    /// Report what would run; write nothing
    pub dry_run: bool,
}

impl RunPlan {
    /// Every step, no clear, no prompts
    pub fn all(mode: RunMode) -> Self {
        Self {
            mode,
            steps: Step::ALL.to_vec(),
            clear: false,
            confirm_steps: false,
            dry_run: false,
        }
    }
}

/// One step's line in the summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub step: Step,
    pub outcome: StepOutcome,
    /// Master row counts after the step committed (stepwise mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_counts: Option<Vec<TableCount>>,
}

/// Count-based outcome of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationSummary {
    pub mode: RunMode,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleared: Option<ClearReport>,
    pub steps: Vec<StepReport>,
    /// Set when atomic mode rolled everything back
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rolled_back: Option<String>,
    pub final_counts: Vec<TableCount>,
}

impl MigrationSummary {
    pub fn report(&self, step: Step) -> Option<&StepReport> {
        self.steps.iter().find(|r| r.step == step)
    }

    /// Rows succeeded and failed across all completed steps
    pub fn totals(&self) -> RowTally {
        self.steps
            .iter()
            .filter_map(|r| r.outcome.tally())
            .fold(RowTally::default(), |acc, t| RowTally {
                succeeded: acc.succeeded + t.succeeded,
                failed: acc.failed + t.failed,
            })
    }
}

impl fmt::Display for MigrationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let heading = if self.dry_run { "Dry run" } else { "Migration" };
        writeln!(f, "{} summary ({} mode)", heading, self.mode)?;
        for report in &self.steps {
            writeln!(f, "  {:<24} {}", report.step.name(), report.outcome)?;
        }
        if let Some(reason) = &self.rolled_back {
            writeln!(f, "  rolled back: {}", reason)?;
        }
        writeln!(f, "Master row counts:")?;
        for count in &self.final_counts {
            writeln!(f, "  {:<24} {}", count.table, count.rows)?;
        }
        Ok(())
    }
}

/// The four sources, the master and this run's backfill values
pub struct Migration {
    sources: Sources,
    target: TargetWriter,
    policy: BackfillPolicy,
}

impl Migration {
    /// Open every store; any failure aborts before a step runs
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let sources = Sources::open(config)?;
        let target = TargetWriter::open(&config.target)?;
        target.ensure_schema()?;
        Ok(Self::from_parts(sources, target, BackfillPolicy::now()))
    }

    /// Open the stores the way `plan` needs them. A dry run opens the master
    /// read-only and never creates it.
    pub fn open_for(config: &StoreConfig, plan: &RunPlan) -> Result<Self> {
        if !plan.dry_run {
            return Self::open(config);
        }
        let sources = Sources::open(config)?;
        let target = TargetWriter::open_read_only(&config.target)?;
        Ok(Self::from_parts(sources, target, BackfillPolicy::now()))
    }

    pub fn from_parts(sources: Sources, target: TargetWriter, policy: BackfillPolicy) -> Self {
        Self {
            sources,
            target,
            policy,
        }
    }

    pub fn target(&self) -> &TargetWriter {
        &self.target
    }

    pub fn into_target(self) -> TargetWriter {
        self.target
    }

    pub fn run(&mut self, plan: &RunPlan, ui: &mut impl Ui) -> Result<MigrationSummary> {
        if plan.dry_run {
            return self.plan_only(plan, ui);
        }

        tracing::info!(mode = %plan.mode, steps = plan.steps.len(), "migration started");
        let summary = match plan.mode {
            RunMode::Atomic => self.run_atomic(plan, ui)?,
            RunMode::Stepwise => self.run_stepwise(plan, ui)?,
        };

        let totals = summary.totals();
        tracing::info!(
            succeeded = totals.succeeded,
            failed = totals.failed,
            rolled_back = summary.rolled_back.is_some(),
            "migration finished"
        );
        ui.set_phase(Phase::Complete);
        ui.clear_progress();
        Ok(summary)
    }

    fn confirm_clear(&self, plan: &RunPlan, ui: &mut impl Ui) -> bool {
        plan.clear && ui.confirm("Delete existing master data before migration?")
    }

    fn run_atomic(&mut self, plan: &RunPlan, ui: &mut impl Ui) -> Result<MigrationSummary> {
        let clear = self.confirm_clear(plan, ui);
        let mut reports: Vec<StepReport> = plan
            .steps
            .iter()
            .map(|&step| StepReport {
                step,
                outcome: StepOutcome::NotRun,
                table_counts: None,
            })
            .collect();

        let tx = self.target.transaction()?;
        let mut cleared = None;
        let mut failure: Option<String> = None;

        if clear {
            ui.set_phase(Phase::Clearing);
            match clear_tables(&tx) {
                Ok(report) => {
                    ui.log(format!("Cleared {} tables", report.cleared.len()));
                    cleared = Some(report);
                }
                Err(err) => failure = Some(format!("clear: {}", error_chain(&err))),
            }
        }

        if failure.is_none() {
            let ctx = StepContext {
                sources: &self.sources,
                target: &tx,
                policy: &self.policy,
            };
            let total = plan.steps.len() as u64;

            for (idx, report) in reports.iter_mut().enumerate() {
                announce(ui, report.step, idx as u64 + 1, total);
                match report.step.execute(&ctx) {
                    Ok(outcome) => {
                        log_outcome(ui, report.step, &outcome);
                        report.outcome = outcome;
                    }
                    Err(err) => {
                        let err = err.in_step(report.step.name());
                        let message = error_chain(&err);
                        tracing::error!(step = report.step.name(), error = %message, "step aborted run");
                        report.outcome = StepOutcome::Failed {
                            error: message.clone(),
                        };
                        failure = Some(format!("{}: {}", report.step.name(), message));
                        break;
                    }
                }
            }
        }

        let rolled_back = match failure {
            Some(reason) => {
                tx.rollback()?;
                ui.log(format!("Transaction rolled back ({})", reason));
                cleared = None;
                Some(reason)
            }
            None => {
                tx.commit()?;
                None
            }
        };

        Ok(MigrationSummary {
            mode: RunMode::Atomic,
            dry_run: false,
            cleared,
            steps: reports,
            rolled_back,
            final_counts: self.target.table_counts()?,
        })
    }

    fn run_stepwise(&mut self, plan: &RunPlan, ui: &mut impl Ui) -> Result<MigrationSummary> {
        let mut cleared = None;
        if self.confirm_clear(plan, ui) {
            ui.set_phase(Phase::Clearing);
            let tx = self.target.transaction()?;
            let report = clear_tables(&tx)?;
            tx.commit()?;
            ui.log(format!("Cleared {} tables", report.cleared.len()));
            cleared = Some(report);
        }

        let total = plan.steps.len() as u64;
        let mut reports = Vec::with_capacity(plan.steps.len());

        for (idx, &step) in plan.steps.iter().enumerate() {
            let position = idx as u64 + 1;
            if plan.confirm_steps
                && !ui.confirm(&format!(
                    "Step {}/{}: {}. Run this step?",
                    position,
                    total,
                    step.description()
                ))
            {
                ui.log(format!("Skipped step {} ({})", position, step.name()));
                reports.push(StepReport {
                    step,
                    outcome: StepOutcome::Skipped {
                        reason: "declined by operator".to_string(),
                    },
                    table_counts: None,
                });
                continue;
            }

            announce(ui, step, position, total);
            let tx = self.target.transaction()?;
            let result = {
                let ctx = StepContext {
                    sources: &self.sources,
                    target: &tx,
                    policy: &self.policy,
                };
                step.execute(&ctx)
            };

            let outcome = match result {
                Ok(outcome) => {
                    tx.commit()?;
                    outcome
                }
                Err(err) => {
                    tx.rollback()?;
                    let err = err.in_step(step.name());
                    let message = error_chain(&err);
                    tracing::error!(step = step.name(), error = %message, "step rolled back");
                    StepOutcome::Failed { error: message }
                }
            };
            log_outcome(ui, step, &outcome);

            let counts = self.target.table_counts()?;
            ui.log(format_counts(&counts));
            reports.push(StepReport {
                step,
                outcome,
                table_counts: Some(counts),
            });
        }

        Ok(MigrationSummary {
            mode: RunMode::Stepwise,
            dry_run: false,
            cleared,
            steps: reports,
            rolled_back: None,
            final_counts: self.target.table_counts()?,
        })
    }

    /// Report what each step would consider without opening a transaction
    fn plan_only(&self, plan: &RunPlan, ui: &mut impl Ui) -> Result<MigrationSummary> {
        ui.set_phase(Phase::Connecting);
        let counts = self.sources.candidate_counts()?;
        let mission_tables = self.sources.mission.table_names()?;
        ui.log(format!(
            "Mission data store tables: {}",
            if mission_tables.is_empty() {
                "(none)".to_string()
            } else {
                mission_tables.join(", ")
            }
        ));
        if plan.clear {
            ui.log("Would clear all master tables");
        }

        let steps = plan
            .steps
            .iter()
            .map(|&step| {
                let outcome = StepOutcome::Planned {
                    candidates: step.candidates(&counts),
                };
                ui.log(format!("{}: {}", step.name(), outcome));
                StepReport {
                    step,
                    outcome,
                    table_counts: None,
                }
            })
            .collect();

        Ok(MigrationSummary {
            mode: plan.mode,
            dry_run: true,
            cleared: None,
            steps,
            rolled_back: None,
            final_counts: table_counts(self.target.connection())?,
        })
    }
}

fn announce(ui: &mut impl Ui, step: Step, position: u64, total: u64) {
    ui.set_phase(if step.is_derived() {
        Phase::Aggregating
    } else {
        Phase::Migrating
    });
    ui.set_progress(position, total, step.description());
    tracing::info!(step = step.name(), position, total, "step started");
}

fn log_outcome(ui: &mut impl Ui, step: Step, outcome: &StepOutcome) {
    match outcome {
        StepOutcome::Completed(t) => tracing::info!(
            step = step.name(),
            succeeded = t.succeeded,
            failed = t.failed,
            "step finished"
        ),
        other => tracing::info!(step = step.name(), outcome = %other, "step finished"),
    }
    ui.log(format!("{}: {}", step.name(), outcome));
}

fn format_counts(counts: &[TableCount]) -> String {
    counts
        .iter()
        .map(|c| format!("{}={}", c.table, c.rows))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `error: cause: cause` on one line
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
