//! The per-run execution-with-retry state machine.
//!
//! Pending → Running → {Success, RetryPending → Running, PermanentFailure}.
//! A call failure, a non-zero exit, and an empty extraction all consume one
//! attempt; exhausted retries degrade to the run's fallback placeholder.
//! Cancellation is the only outcome that escapes as an error.

use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use gapcheck_config::RetryConfig;
use gapcheck_extraction::{extract, is_structurally_empty};
use gapcheck_registry::RunId;
use gapcheck_results::fallback_value;
use gapcheck_sandbox::{RunMetadata, SandboxExecutor, SandboxRequest, SandboxResponse};
use gapcheck_utils::error::{GapcheckError, RunError};

/// Outcome of one run after retries settled.
///
/// `success == false` always carries the fallback placeholder in `value`,
/// never null, never an empty object.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run: RunId,
    pub success: bool,
    pub value: Value,
    pub error: Option<String>,
    pub metadata: Option<RunMetadata>,
    /// Invocations actually made (1 on first-try success).
    pub attempts: u32,
}

/// Execute one run with bounded retries and exponential backoff.
///
/// # Errors
/// Returns `GapcheckError::Cancelled` when the token fires; every other
/// failure is absorbed into a fallback `RunOutcome`.
pub async fn execute_run_with_retry(
    sandbox: &dyn SandboxExecutor,
    run: RunId,
    prompt: &str,
    retry: &RetryConfig,
    per_run_timeout: Duration,
    cancel: &CancellationToken,
) -> Result<RunOutcome, GapcheckError> {
    let mut last_error = String::from("unknown error");

    for attempt in 0..=retry.max_retries {
        if cancel.is_cancelled() {
            return Err(GapcheckError::Cancelled);
        }

        match attempt_once(sandbox, run, prompt, per_run_timeout, cancel).await {
            Ok((value, metadata)) => {
                tracing::info!(
                    run = %run,
                    phase = run.phase().number(),
                    attempt = attempt + 1,
                    "Run succeeded"
                );
                return Ok(RunOutcome {
                    run,
                    success: true,
                    value,
                    error: None,
                    metadata,
                    attempts: attempt + 1,
                });
            }
            Err(RunError::Cancelled) => return Err(GapcheckError::Cancelled),
            Err(error) => {
                last_error = error.to_string();
                tracing::warn!(
                    run = %run,
                    phase = run.phase().number(),
                    attempt = attempt + 1,
                    max_attempts = retry.max_retries + 1,
                    step_budget = run.spec().step_budget,
                    artifact = run.spec().output_artifact,
                    error = %last_error,
                    "Run attempt failed"
                );

                if attempt < retry.max_retries {
                    let delay = retry.delay_for(attempt);
                    tracing::debug!(run = %run, delay_ms = delay.as_millis() as u64, "Backing off before retry");
                    tokio::select! {
                        () = cancel.cancelled() => return Err(GapcheckError::Cancelled),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    tracing::error!(
        run = %run,
        phase = run.phase().number(),
        total_attempts = retry.max_retries + 1,
        error = %last_error,
        "Run failed after all retries; using fallback result"
    );

    Ok(RunOutcome {
        run,
        success: false,
        value: fallback_value(run),
        error: Some(last_error),
        metadata: None,
        attempts: retry.max_retries + 1,
    })
}

/// One invocation: sandbox call, failure classification, extraction.
async fn attempt_once(
    sandbox: &dyn SandboxExecutor,
    run: RunId,
    prompt: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<(Value, Option<RunMetadata>), RunError> {
    let spec = run.spec();
    let request = SandboxRequest {
        run,
        prompt: prompt.to_string(),
        output_artifact: spec.output_artifact.to_string(),
        timeout,
        step_budget: spec.step_budget,
        allow_web_search: spec.allow_web_search,
    };

    let response = tokio::select! {
        () = cancel.cancelled() => return Err(RunError::Cancelled),
        result = sandbox.execute(request) => result?,
    };

    if !response.success() {
        return Err(RunError::ExecutionFailed {
            exit_code: response.exit_code,
            stderr_tail: response.stderr.clone(),
        });
    }

    let value = parse_response(&response).ok_or(RunError::EmptyResult)?;
    if is_structurally_empty(&value) {
        return Err(RunError::EmptyResult);
    }

    Ok((value, response.metadata))
}

/// The artifact file is the primary extraction input; stdout is the
/// fallback scan target.
fn parse_response(response: &SandboxResponse) -> Option<Value> {
    if let Some(content) = &response.file_content {
        if let Ok(value) = serde_json::from_str(content) {
            return Some(value);
        }
    }
    extract(&response.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gapcheck_sandbox::{StubOutcome, StubSandbox};
    use serde_json::json;

    fn immediate() -> RetryConfig {
        RetryConfig::immediate(3)
    }

    async fn run_with(
        stub: &StubSandbox,
        run: RunId,
        retry: &RetryConfig,
    ) -> Result<RunOutcome, GapcheckError> {
        execute_run_with_retry(
            stub,
            run,
            "prompt",
            retry,
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await
    }

    #[tokio::test]
    async fn first_try_success_makes_one_call() {
        let stub = StubSandbox::succeeding();
        let outcome = run_with(&stub, RunId::StateLawResearch, &immediate())
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.error.is_none());
        assert!(outcome.metadata.is_some());
        assert_eq!(stub.call_count(RunId::StateLawResearch), 1);
    }

    #[tokio::test]
    async fn transient_failures_are_retried_then_succeed() {
        let stub = StubSandbox::succeeding()
            .script(
                RunId::TaxOptimization,
                StubOutcome::CallFailure("boom".to_string()),
            )
            .script(
                RunId::TaxOptimization,
                StubOutcome::NonZeroExit {
                    exit_code: 70,
                    stderr: "cli failure".to_string(),
                },
            )
            .script(
                RunId::TaxOptimization,
                StubOutcome::Artifact(json!({ "totalPotentialSavings": 1 })),
            );

        let outcome = run_with(&stub, RunId::TaxOptimization, &immediate())
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(stub.call_count(RunId::TaxOptimization), 3);
    }

    #[tokio::test]
    async fn empty_results_are_retried_like_failures() {
        let stub = StubSandbox::succeeding()
            .script(RunId::FamilyProtection, StubOutcome::Empty)
            .script(
                RunId::FamilyProtection,
                StubOutcome::Stdout(r#"empty object first: {} then none"#.to_string()),
            )
            .script(
                RunId::FamilyProtection,
                StubOutcome::Artifact(json!({ "gaps": ["g"] })),
            );

        let outcome = run_with(&stub, RunId::FamilyProtection, &immediate())
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn exhausted_retries_degrade_to_fallback() {
        let retry = RetryConfig::immediate(2);
        let stub = StubSandbox::succeeding().always_failing(RunId::MedicaidPlanning, 3);

        let outcome = run_with(&stub, RunId::MedicaidPlanning, &retry)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.value, fallback_value(RunId::MedicaidPlanning));
        assert!(outcome.error.as_deref().unwrap().contains("injected failure"));
        assert_eq!(stub.call_count(RunId::MedicaidPlanning), 3);
    }

    #[tokio::test]
    async fn success_never_carries_empty_value() {
        // Even a minimal stub artifact is a non-empty object; an Empty
        // outcome can never surface as success=true.
        let stub = StubSandbox::with_default(StubOutcome::Empty);
        let outcome = run_with(&stub, RunId::FinalReport, &RetryConfig::immediate(1))
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(!is_structurally_empty(&outcome.value));
    }

    #[tokio::test]
    async fn stdout_extraction_is_the_fallback_path() {
        let stub = StubSandbox::with_default(StubOutcome::Stdout(
            "analysis follows ```json\n{\"score\": 42}\n``` done".to_string(),
        ));
        let outcome = run_with(&stub, RunId::FinalReport, &immediate())
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.value, json!({ "score": 42 }));
    }

    #[tokio::test]
    async fn pre_cancelled_token_aborts_before_any_call() {
        let stub = StubSandbox::succeeding();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = execute_run_with_retry(
            &stub,
            RunId::StateLawResearch,
            "prompt",
            &immediate(),
            Duration::from_secs(5),
            &cancel,
        )
        .await;
        assert!(matches!(result, Err(GapcheckError::Cancelled)));
        assert_eq!(stub.call_count(RunId::StateLawResearch), 0);
    }

    #[tokio::test]
    async fn cancellation_during_backoff_aborts_promptly() {
        let retry = RetryConfig {
            max_retries: 3,
            base_delay_ms: 60_000,
            max_delay_ms: 60_000,
            backoff_multiplier: 1.0,
        };
        let stub = StubSandbox::succeeding().always_failing(RunId::TaxOptimization, 4);
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                cancel.cancel();
            })
        };

        let started = std::time::Instant::now();
        let result = execute_run_with_retry(
            &stub,
            RunId::TaxOptimization,
            "prompt",
            &retry,
            Duration::from_secs(5),
            &cancel,
        )
        .await;
        canceller.await.unwrap();

        assert!(matches!(result, Err(GapcheckError::Cancelled)));
        // Aborted from inside the 60s backoff sleep, not after it.
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(stub.call_count(RunId::TaxOptimization), 1);
    }
}
