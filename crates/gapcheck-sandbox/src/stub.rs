//! Scripted sandbox for tests and dry runs.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use gapcheck_registry::RunId;
use gapcheck_utils::error::SandboxError;

use crate::types::{RunMetadata, SandboxRequest, SandboxResponse};
use crate::SandboxExecutor;

/// One scripted outcome for a stubbed invocation.
#[derive(Debug, Clone)]
pub enum StubOutcome {
    /// Successful run whose artifact contains the given value.
    Artifact(Value),
    /// Successful process whose stdout carries the given raw text and no
    /// artifact file (exercises the extraction fallback path).
    Stdout(String),
    /// The call itself fails (spawn/timeout class).
    CallFailure(String),
    /// The collaborator runs but exits non-zero.
    NonZeroExit { exit_code: i32, stderr: String },
    /// The collaborator succeeds but produces nothing extractable.
    Empty,
}

/// A [`SandboxExecutor`] that replays scripted outcomes.
///
/// Per-run scripts are consumed front to back; when a run's script is
/// exhausted (or absent) the default outcome applies. An optional artificial
/// delay simulates slow runs for scheduling tests.
pub struct StubSandbox {
    scripts: Mutex<HashMap<RunId, Vec<StubOutcome>>>,
    default: StubOutcome,
    delay: Option<Duration>,
    calls: Mutex<Vec<RunId>>,
}

impl StubSandbox {
    /// Stub where every run succeeds with a minimal non-empty artifact.
    #[must_use]
    pub fn succeeding() -> Self {
        Self::with_default(StubOutcome::Artifact(
            serde_json::json!({ "stub": true }),
        ))
    }

    #[must_use]
    pub fn with_default(default: StubOutcome) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            default,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue an outcome for one run; earlier entries are consumed first.
    #[must_use]
    pub fn script(self, run: RunId, outcome: StubOutcome) -> Self {
        self.scripts
            .lock()
            .expect("stub scripts lock")
            .entry(run)
            .or_default()
            .push(outcome);
        self
    }

    /// Make every invocation of one run fail at the call level.
    #[must_use]
    pub fn always_failing(self, run: RunId, attempts: usize) -> Self {
        let mut stub = self;
        for _ in 0..attempts {
            stub = stub.script(run, StubOutcome::CallFailure("injected failure".to_string()));
        }
        stub
    }

    /// Add an artificial delay before each response.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of invocations observed for one run.
    #[must_use]
    pub fn call_count(&self, run: RunId) -> usize {
        self.calls
            .lock()
            .expect("stub calls lock")
            .iter()
            .filter(|r| **r == run)
            .count()
    }

    /// All invocations in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<RunId> {
        self.calls.lock().expect("stub calls lock").clone()
    }

    fn next_outcome(&self, run: RunId) -> StubOutcome {
        let mut scripts = self.scripts.lock().expect("stub scripts lock");
        match scripts.get_mut(&run) {
            Some(queue) if !queue.is_empty() => queue.remove(0),
            _ => self.default.clone(),
        }
    }
}

#[async_trait]
impl SandboxExecutor for StubSandbox {
    async fn execute(&self, request: SandboxRequest) -> Result<SandboxResponse, SandboxError> {
        self.calls
            .lock()
            .expect("stub calls lock")
            .push(request.run);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.next_outcome(request.run) {
            StubOutcome::Artifact(value) => Ok(SandboxResponse {
                stdout: format!("wrote {}", request.output_artifact),
                file_content: Some(value.to_string()),
                metadata: Some(RunMetadata {
                    steps: Some(1),
                    duration_ms: Some(5),
                    cost_usd: Some(0.001),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            StubOutcome::Stdout(text) => Ok(SandboxResponse {
                stdout: text,
                ..Default::default()
            }),
            StubOutcome::CallFailure(reason) => Err(SandboxError::Spawn { reason }),
            StubOutcome::NonZeroExit { exit_code, stderr } => Ok(SandboxResponse {
                exit_code,
                stderr,
                ..Default::default()
            }),
            StubOutcome::Empty => Ok(SandboxResponse {
                stdout: "no artifact produced".to_string(),
                ..Default::default()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(run: RunId) -> SandboxRequest {
        SandboxRequest {
            run,
            prompt: String::new(),
            output_artifact: run.spec().output_artifact.to_string(),
            timeout: Duration::from_secs(1),
            step_budget: 5,
            allow_web_search: false,
        }
    }

    #[tokio::test]
    async fn scripted_outcomes_are_consumed_in_order() {
        let stub = StubSandbox::succeeding()
            .script(
                RunId::TaxOptimization,
                StubOutcome::CallFailure("first".to_string()),
            )
            .script(
                RunId::TaxOptimization,
                StubOutcome::Artifact(serde_json::json!({ "ok": 1 })),
            );

        let first = stub.execute(request(RunId::TaxOptimization)).await;
        assert!(first.is_err());

        let second = stub.execute(request(RunId::TaxOptimization)).await.unwrap();
        assert!(second.file_content.unwrap().contains("ok"));

        // Script exhausted; the default applies.
        let third = stub.execute(request(RunId::TaxOptimization)).await.unwrap();
        assert!(third.file_content.unwrap().contains("stub"));

        assert_eq!(stub.call_count(RunId::TaxOptimization), 3);
    }

    #[tokio::test]
    async fn unscripted_runs_use_default() {
        let stub = StubSandbox::succeeding();
        let response = stub.execute(request(RunId::FinalReport)).await.unwrap();
        assert_eq!(response.exit_code, 0);
        assert!(response.metadata.is_some());
    }
}
