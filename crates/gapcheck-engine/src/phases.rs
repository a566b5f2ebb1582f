//! Phase orchestrators.
//!
//! Phase 1 and Phase 3 are sequential await-chains; Phase 2 fans out one
//! task per applicable run and joins through a settle-all barrier. In every
//! phase a run's permanent failure stores its fallback and the phase moves
//! on; no error crosses the phase boundary except cancellation.

use std::sync::Arc;
use std::time::Instant;

use camino::Utf8PathBuf;
use serde_json::Value;
use tokio::task::JoinSet;

use gapcheck_aggregate::aggregate_phase2;
use gapcheck_intake::{ClientContext, ParsedIntake};
use gapcheck_prompts::{PromptInputs, build};
use gapcheck_registry::{Phase, RunId, applicable_runs, phase_progress};
use gapcheck_results::{Phase1Results, Phase2Results, PhaseResultSet, fallback_value};
use gapcheck_utils::error::GapcheckError;
use gapcheck_utils::status::{PhaseStatus, RunStatus};

use crate::artifacts::store_artifact;
use crate::pipeline::Pipeline;
use crate::report::{PhaseMetadata, RunReport};
use crate::retry::{RunOutcome, execute_run_with_retry};

/// Output of one phase: the result set, per-run reports, and accounting.
pub(crate) struct PhaseOutput {
    pub set: PhaseResultSet,
    pub reports: Vec<RunReport>,
    pub metadata: PhaseMetadata,
}

impl Pipeline {
    /// Phase 1: research, sequential, prompts built from intake alone.
    pub(crate) async fn run_phase1(
        &self,
        intake: &ParsedIntake,
        context: &ClientContext,
    ) -> Result<PhaseOutput, GapcheckError> {
        let inputs = PromptInputs::phase1(intake, context);
        self.run_sequential_phase(Phase::Research, &inputs, None)
            .await
    }

    /// Phase 2: analysis, parallel with a settle-all barrier.
    ///
    /// Every applicable run is marked running up front and executes
    /// independently; no task's failure cancels or affects its siblings.
    /// Only this coordinating task writes the shared result set, one key per
    /// settled task. Duration is the max of task durations, cost the sum.
    pub(crate) async fn run_phase2(
        &self,
        intake: &ParsedIntake,
        context: &ClientContext,
        phase1: &Phase1Results,
    ) -> Result<PhaseOutput, GapcheckError> {
        let phase = Phase::Analysis;
        let runs = applicable_runs(phase, context);
        self.progress().on_phase(phase, PhaseStatus::Running);
        for run in &runs {
            self.progress().on_run(*run, RunStatus::Running);
        }

        let inputs = PromptInputs {
            phase1: Some(phase1),
            ..PromptInputs::phase1(intake, context)
        };

        let mut join_set = JoinSet::new();
        for run in &runs {
            let run = *run;
            let prompt = build(run, &inputs).map_err(|e| GapcheckError::Prompt {
                run: run.as_str().to_string(),
                needs: e.to_string(),
            })?;
            let sandbox = Arc::clone(self.sandbox());
            let retry = self.config().retry.clone();
            let timeout = self.config().timeouts.per_run();
            let cancel = self.cancel().clone();

            join_set.spawn(async move {
                execute_run_with_retry(
                    sandbox.as_ref(),
                    run,
                    &prompt,
                    &retry,
                    timeout,
                    &cancel,
                )
                .await
            });
        }

        let mut set = PhaseResultSet::new();
        let mut reports = Vec::new();
        let mut metadata = PhaseMetadata::default();
        let mut completed = 0usize;

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Ok(outcome)) => {
                    if let Some(run_metadata) = &outcome.metadata {
                        metadata.total_duration_ms = metadata
                            .total_duration_ms
                            .max(run_metadata.duration_ms.unwrap_or(0));
                        metadata.total_cost_usd += run_metadata.cost_usd.unwrap_or(0.0);
                    }
                    set.insert(outcome.run, outcome.value.clone());
                    reports.push(self.record(&outcome));
                    completed += 1;
                    self.progress()
                        .on_progress(phase_progress(phase, completed, runs.len()));
                }
                Ok(Err(error)) => {
                    // Cancellation (or a prompt misuse, impossible here);
                    // dropping the JoinSet aborts the remaining tasks.
                    return Err(error);
                }
                Err(join_error) => {
                    tracing::error!(error = %join_error, "Phase 2 task aborted unexpectedly");
                }
            }
        }

        // A task that panicked settled without a result; its run degrades to
        // the fallback like any other permanent failure.
        for run in &runs {
            if !set.contains_key(run) {
                let outcome = RunOutcome {
                    run: *run,
                    success: false,
                    value: fallback_value(*run),
                    error: Some("task aborted unexpectedly".to_string()),
                    metadata: None,
                    attempts: 0,
                };
                set.insert(*run, outcome.value.clone());
                reports.push(self.record(&outcome));
            }
        }

        self.progress().on_phase(phase, PhaseStatus::Completed);
        Ok(PhaseOutput {
            set,
            reports,
            metadata,
        })
    }

    /// Phase 3: synthesis, sequential, with the scenario-modeling output
    /// threaded into the later priority-matrix and final-report prompts.
    pub(crate) async fn run_phase3(
        &self,
        intake: &ParsedIntake,
        context: &ClientContext,
        phase1: &Phase1Results,
        phase2_set: &PhaseResultSet,
    ) -> Result<PhaseOutput, GapcheckError> {
        let aggregated = aggregate_phase2(phase2_set);
        let structured = Phase2Results::from_set(phase2_set);

        let inputs = PromptInputs {
            phase1: Some(phase1),
            phase2: Some(&structured),
            aggregated: Some(&aggregated),
            ..PromptInputs::phase1(intake, context)
        };

        self.run_sequential_phase(Phase::Synthesis, &inputs, Some(RunId::ScenarioModeling))
            .await
    }

    /// Shared sequential loop for phases 1 and 3.
    ///
    /// `thread_from` names a run whose literal output object is threaded
    /// into the prompts of the runs that follow it within the phase.
    async fn run_sequential_phase(
        &self,
        phase: Phase,
        inputs: &PromptInputs<'_>,
        thread_from: Option<RunId>,
    ) -> Result<PhaseOutput, GapcheckError> {
        let runs = applicable_runs(phase, inputs.context);
        self.progress().on_phase(phase, PhaseStatus::Running);

        let deadline = Instant::now() + self.config().timeouts.per_phase();
        let mut set = PhaseResultSet::new();
        let mut reports = Vec::new();
        let mut metadata = PhaseMetadata::default();
        let mut threaded: Option<Value> = None;

        for (index, run) in runs.iter().copied().enumerate() {
            self.progress().on_run(run, RunStatus::Running);

            let outcome = if Instant::now() >= deadline {
                tracing::warn!(
                    run = %run,
                    phase = phase.number(),
                    "Phase deadline exceeded; degrading run to fallback"
                );
                RunOutcome {
                    run,
                    success: false,
                    value: fallback_value(run),
                    error: Some(format!(
                        "phase deadline of {}s exceeded",
                        self.config().timeouts.per_phase_secs
                    )),
                    metadata: None,
                    attempts: 0,
                }
            } else {
                let run_inputs = PromptInputs {
                    scenario: threaded.as_ref(),
                    ..*inputs
                };
                let prompt = build(run, &run_inputs).map_err(|e| GapcheckError::Prompt {
                    run: run.as_str().to_string(),
                    needs: e.to_string(),
                })?;
                execute_run_with_retry(
                    self.sandbox().as_ref(),
                    run,
                    &prompt,
                    &self.config().retry,
                    self.config().timeouts.per_run(),
                    self.cancel(),
                )
                .await?
            };

            if let Some(run_metadata) = &outcome.metadata {
                metadata.total_duration_ms += run_metadata.duration_ms.unwrap_or(0);
                metadata.total_cost_usd += run_metadata.cost_usd.unwrap_or(0.0);
            }

            if outcome.success && thread_from == Some(run) {
                threaded = Some(outcome.value.clone());
            }

            set.insert(run, outcome.value.clone());
            reports.push(self.record(&outcome));
            self.progress()
                .on_progress(phase_progress(phase, index + 1, runs.len()));
        }

        self.progress().on_phase(phase, PhaseStatus::Completed);
        Ok(PhaseOutput {
            set,
            reports,
            metadata,
        })
    }

    /// Persist the outcome's value as the run artifact and notify progress.
    fn record(&self, outcome: &RunOutcome) -> RunReport {
        let status = if outcome.success {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
        self.progress().on_run(outcome.run, status);

        let output_dir = Utf8PathBuf::from(self.config().sandbox.output_dir());
        let (artifact_path, artifact_hash) =
            match store_artifact(&output_dir, outcome.run, &outcome.value) {
                Ok((path, hash)) => (Some(path.to_string()), Some(hash)),
                Err(error) => {
                    tracing::warn!(run = %outcome.run, error = %error, "Failed to store run artifact");
                    (None, None)
                }
            };

        RunReport {
            run: outcome.run,
            phase: outcome.run.phase().number(),
            status,
            success: outcome.success,
            attempts: outcome.attempts,
            error: outcome.error.clone(),
            artifact_path,
            artifact_hash,
            metadata: outcome.metadata.clone(),
            critical: outcome.run.spec().critical,
        }
    }
}
