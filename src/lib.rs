//! gapcheck: estate-plan gap-analysis pipeline.
//!
//! Drives a three-phase analysis in which each run invokes a sandboxed
//! reasoning CLI, retries transient failures with exponential backoff,
//! heuristically extracts structured JSON from noisy output, and degrades
//! permanently failed runs to schema-shaped fallbacks so every downstream
//! consumer sees well-typed data.
//!
//! The facade most callers want is [`Pipeline`]:
//!
//! ```no_run
//! use std::sync::Arc;
//! use gapcheck::{ClaudeSandbox, Config, Pipeline, RawIntake};
//!
//! # async fn example() -> Result<(), gapcheck::GapcheckError> {
//! let config = Config::discover()?;
//! let sandbox = Arc::new(ClaudeSandbox::new_from_config(&config.sandbox)?);
//! let pipeline = Pipeline::new(config, sandbox);
//! let report = pipeline.run(&RawIntake::default()).await?;
//! println!("score: {}", report.final_score);
//! # Ok(())
//! # }
//! ```

pub mod cli;

pub use gapcheck_aggregate::{AggregatedPhase2, Priority, aggregate_phase2, final_score};
pub use gapcheck_config::{Config, RetryConfig, SandboxConfig, TimeoutConfig};
pub use gapcheck_engine::{
    NullProgress, Pipeline, PipelineReport, ProgressSink, RunOutcome, RunReport,
    execute_run_with_retry,
};
pub use gapcheck_extraction::{extract, is_structurally_empty, repair_truncated};
pub use gapcheck_intake::{ClientContext, ParsedIntake, RawIntake, derive_context, parse_intake};
pub use gapcheck_prompts::{PromptError, PromptInputs, build as build_prompt};
pub use gapcheck_registry::{
    Phase, RunId, RunSpec, applicable_runs, estimate_total_duration, phase_progress,
};
pub use gapcheck_results::{Phase1Results, Phase2Results, PhaseResultSet, fallback_value};
pub use gapcheck_sandbox::{
    ClaudeSandbox, RunMetadata, SandboxExecutor, SandboxRequest, SandboxResponse, StubOutcome,
    StubSandbox,
};
pub use gapcheck_utils::error::GapcheckError;
pub use gapcheck_utils::status::{OverallStatus, RunStatus};
