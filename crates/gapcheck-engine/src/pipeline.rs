//! The pipeline facade.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use gapcheck_aggregate::{aggregate_phase2, final_score};
use gapcheck_config::Config;
use gapcheck_intake::{RawIntake, derive_context, parse_intake};
use gapcheck_registry::RunId;
use gapcheck_results::{Phase1Results, Phase2Results, fallback_value};
use gapcheck_sandbox::SandboxExecutor;
use gapcheck_utils::error::GapcheckError;
use gapcheck_utils::status::OverallStatus;

use crate::progress::{NullProgress, ProgressSink};
use crate::report::{PhaseMetadata, PipelineReport};

/// Orchestrates the three phases end to end.
///
/// Construction is cheap; all preconditions (credentials, binary discovery)
/// belong to the sandbox passed in. One `Pipeline` handles one orchestration
/// request at a time.
pub struct Pipeline {
    config: Config,
    sandbox: Arc<dyn SandboxExecutor>,
    progress: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
}

impl Pipeline {
    #[must_use]
    pub fn new(config: Config, sandbox: Arc<dyn SandboxExecutor>) -> Self {
        Self {
            config,
            sandbox,
            progress: Arc::new(NullProgress),
            cancel: CancellationToken::new(),
        }
    }

    /// Inject a progress observer.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// A handle callers can use to abort the pipeline early. Cancellation is
    /// observed inside the retry loop (before each attempt, during the
    /// sandbox call, and during backoff sleeps) and at the parallel join.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn sandbox(&self) -> &Arc<dyn SandboxExecutor> {
        &self.sandbox
    }

    pub(crate) fn progress(&self) -> &dyn ProgressSink {
        self.progress.as_ref()
    }

    pub(crate) fn cancel(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run the full three-phase analysis for one intake document.
    ///
    /// Individual run failures degrade to fallbacks and never abort the
    /// pipeline; the returned report's status is `Partial` when any run
    /// permanently failed.
    ///
    /// # Errors
    /// Returns `Cancelled` when the cancellation token fires; other errors
    /// only arise from preconditions (prompt misuse) before any run starts.
    pub async fn run(&self, raw: &RawIntake) -> Result<PipelineReport, GapcheckError> {
        let started_at = Utc::now();
        let intake = parse_intake(raw);
        let context = derive_context(&intake);

        tracing::info!(
            state = %intake.state,
            estimated_value = context.estimated_value,
            "Starting gap analysis pipeline"
        );

        self.progress.on_status(OverallStatus::Phase1Running);
        let phase1_output = self.run_phase1(&intake, &context).await?;
        let phase1 = Phase1Results::from_set(&phase1_output.set);
        self.progress.on_status(OverallStatus::Phase1Complete);

        self.progress.on_status(OverallStatus::Phase2Running);
        let phase2_output = self.run_phase2(&intake, &context, &phase1).await?;
        self.progress.on_status(OverallStatus::Phase2Complete);

        self.progress.on_status(OverallStatus::Phase3Running);
        let phase3_output = self
            .run_phase3(&intake, &context, &phase1, &phase2_output.set)
            .await?;

        let aggregated = aggregate_phase2(&phase2_output.set);
        let phase2 = Phase2Results::from_set(&phase2_output.set);
        let score = final_score(&phase1, Some(&aggregated));

        let take_phase3 = |run: RunId| {
            phase3_output
                .set
                .get(&run)
                .cloned()
                .unwrap_or_else(|| fallback_value(run))
        };

        let mut runs = phase1_output.reports;
        runs.extend(phase2_output.reports);
        runs.extend(phase3_output.reports);

        let status = if runs.iter().all(|r| r.success) {
            OverallStatus::Completed
        } else {
            OverallStatus::Partial
        };
        self.progress.on_status(status);

        let phase_metadata: [PhaseMetadata; 3] = [
            phase1_output.metadata,
            phase2_output.metadata,
            phase3_output.metadata,
        ];
        let total_cost_usd = phase_metadata.iter().map(|m| m.total_cost_usd).sum();

        tracing::info!(
            status = status.as_str(),
            final_score = score,
            failed_runs = runs.iter().filter(|r| !r.success).count(),
            "Pipeline finished"
        );

        Ok(PipelineReport {
            status,
            started_at,
            finished_at: Utc::now(),
            final_score: score,
            phase1,
            phase2,
            aggregated,
            scenario_modeling: take_phase3(RunId::ScenarioModeling),
            priority_matrix: take_phase3(RunId::PriorityMatrix),
            final_report: take_phase3(RunId::FinalReport),
            runs,
            phase_metadata,
            total_cost_usd,
        })
    }
}
