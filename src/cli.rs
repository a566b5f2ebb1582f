//! Command-line interface.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use gapcheck_config::Config;
use gapcheck_engine::{Pipeline, ProgressSink};
use gapcheck_intake::{RawIntake, derive_context, parse_intake};
use gapcheck_registry::{Phase, RunId, applicable_runs, estimate_total_duration};
use gapcheck_sandbox::{ClaudeSandbox, SandboxExecutor, StubSandbox};
use gapcheck_utils::error::{GapcheckError, IntakeError};
use gapcheck_utils::status::RunStatus;

/// Exit codes: 0 success, 1 unexpected, 2 config/intake, 70 sandbox
/// precondition, 130 cancelled.
mod exit_codes {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 2;
    pub const SANDBOX: i32 = 70;
    pub const CANCELLED: i32 = 130;
}

#[derive(Parser)]
#[command(
    name = "gapcheck",
    version,
    about = "Estate-plan gap analysis driven by a sandboxed reasoning CLI"
)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full three-phase analysis for an intake document.
    Analyze {
        /// Path to the intake JSON document.
        intake: PathBuf,
        /// Use the scripted stub sandbox instead of the real CLI.
        #[arg(long)]
        dry_run: bool,
        /// Override the artifact output directory.
        #[arg(long)]
        output_dir: Option<String>,
    },
    /// Show which runs would execute for an intake document, with a
    /// duration estimate.
    Plan {
        /// Path to the intake JSON document.
        intake: PathBuf,
    },
    /// List the run registry.
    Runs,
}

/// CLI entry point. Handles all output; returns the process exit code on
/// failure.
pub fn run() -> Result<(), i32> {
    let cli = Cli::parse();

    if let Err(e) = gapcheck_utils::logging::init_tracing(cli.verbose) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    let result = match cli.command {
        Command::Analyze {
            intake,
            dry_run,
            output_dir,
        } => analyze(&intake, dry_run, output_dir),
        Command::Plan { intake } => plan(&intake),
        Command::Runs => {
            list_runs();
            Ok(())
        }
    };

    result.map_err(|error| {
        eprintln!("Error: {error}");
        exit_code_for(&error)
    })
}

fn exit_code_for(error: &GapcheckError) -> i32 {
    match error {
        GapcheckError::Config(_) | GapcheckError::Intake(_) => exit_codes::CONFIG,
        GapcheckError::Sandbox(_) => exit_codes::SANDBOX,
        GapcheckError::Cancelled => exit_codes::CANCELLED,
        _ => exit_codes::GENERAL,
    }
}

fn load_intake(path: &Path) -> Result<RawIntake, GapcheckError> {
    let content = std::fs::read_to_string(path).map_err(|e| IntakeError::Unreadable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let raw = serde_json::from_str(&content).map_err(|e| IntakeError::InvalidDocument {
        reason: e.to_string(),
    })?;
    Ok(raw)
}

/// Prints run transitions as they happen.
struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn on_run(&self, run: RunId, status: RunStatus) {
        println!(
            "  [phase {}] {:<28} {}",
            run.phase().number(),
            run.as_str(),
            status.as_str()
        );
    }

    fn on_progress(&self, percent: u8) {
        println!("  overall progress: {percent}%");
    }
}

fn analyze(
    intake_path: &Path,
    dry_run: bool,
    output_dir: Option<String>,
) -> Result<(), GapcheckError> {
    let raw = load_intake(intake_path)?;
    let mut config = Config::discover()?;
    if let Some(dir) = output_dir {
        config.sandbox.output_dir = Some(dir);
    }

    let sandbox: Arc<dyn SandboxExecutor> = if dry_run {
        println!("Dry run: using the scripted stub sandbox.");
        Arc::new(StubSandbox::succeeding())
    } else {
        Arc::new(ClaudeSandbox::new_from_config(&config.sandbox)?)
    };

    let output_dir = config.sandbox.output_dir().to_string();
    let pipeline = Pipeline::new(config, sandbox).with_progress(Arc::new(ConsoleProgress));
    let cancel = pipeline.cancellation_token();

    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(async {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Interrupt received; cancelling pipeline...");
                cancel.cancel();
            }
        });
        pipeline.run(&raw).await
    })?;

    println!();
    println!("Status:      {}", report.status.as_str());
    println!("Final score: {}/100", report.final_score);
    let failed = report.failed_runs();
    if failed.is_empty() {
        println!("All {} runs completed.", report.runs.len());
    } else {
        println!(
            "{} of {} runs fell back to placeholders:",
            failed.len(),
            report.runs.len()
        );
        for run in &failed {
            println!("  - {run}");
        }
    }

    let report_path = Path::new(&output_dir).join("report.json");
    let serialized = serde_json::to_string_pretty(&report).map_err(|e| {
        GapcheckError::ArtifactWrite {
            path: report_path.display().to_string(),
            reason: e.to_string(),
        }
    })?;
    std::fs::write(&report_path, serialized)?;
    println!("Report written to {}", report_path.display());

    Ok(())
}

fn plan(intake_path: &Path) -> Result<(), GapcheckError> {
    let raw = load_intake(intake_path)?;
    let intake = parse_intake(&raw);
    let context = derive_context(&intake);

    let phase1 = applicable_runs(Phase::Research, &context);
    let phase2 = applicable_runs(Phase::Analysis, &context);
    let phase3 = applicable_runs(Phase::Synthesis, &context);

    println!("State: {}", intake.state);
    for (phase, runs) in [
        (Phase::Research, &phase1),
        (Phase::Analysis, &phase2),
        (Phase::Synthesis, &phase3),
    ] {
        println!(
            "Phase {} ({}), {}:",
            phase.number(),
            phase.name(),
            if phase.is_sequential() {
                "sequential"
            } else {
                "parallel"
            }
        );
        for run in runs {
            println!("  - {run}");
        }
    }

    let skipped: Vec<RunId> = Phase::Analysis
        .runs()
        .iter()
        .copied()
        .filter(|r| !phase2.contains(r))
        .collect();
    if !skipped.is_empty() {
        println!("Skipped for this client:");
        for run in &skipped {
            println!("  - {run}");
        }
    }

    let estimate = estimate_total_duration(&phase1, &phase2, &phase3);
    println!("Estimated duration: ~{} minutes", estimate.as_secs() / 60);

    Ok(())
}

fn list_runs() {
    println!(
        "{:<28} {:>5} {:>6} {:>9} {:>10}  {}",
        "run", "phase", "steps", "critical", "est (min)", "artifact"
    );
    for run in RunId::all() {
        let spec = run.spec();
        println!(
            "{:<28} {:>5} {:>6} {:>9} {:>10}  {}",
            run.as_str(),
            spec.phase.number(),
            spec.step_budget,
            spec.critical,
            spec.estimated_duration().as_secs() / 60,
            spec.output_artifact
        );
    }
}
