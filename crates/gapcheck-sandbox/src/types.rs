//! Wire types for the sandbox collaborator contract.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use gapcheck_registry::RunId;

/// One sandbox invocation.
#[derive(Debug, Clone)]
pub struct SandboxRequest {
    /// The run this invocation belongs to (for logging and stubs).
    pub run: RunId,
    pub prompt: String,
    /// Artifact the run is expected to write, relative to the work dir.
    pub output_artifact: String,
    pub timeout: Duration,
    /// Turn/step budget handed to the CLI.
    pub step_budget: u32,
    pub allow_web_search: bool,
}

/// Raw outcome of a sandbox invocation that completed (possibly with a
/// non-zero exit code).
#[derive(Debug, Clone, Default)]
pub struct SandboxResponse {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    /// Content of the expected output artifact, when one was found. This is
    /// the primary extraction input; `stdout` is the fallback.
    pub file_content: Option<String>,
    /// Best-effort execution metadata; absence never fails a run.
    pub metadata: Option<RunMetadata>,
}

impl SandboxResponse {
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Execution metadata reported by the collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunMetadata {
    pub steps: Option<u32>,
    pub duration_ms: Option<u64>,
    pub cost_usd: Option<f64>,
    pub session_id: Option<String>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

impl RunMetadata {
    /// Parse metadata from the CLI's JSON result envelope on stdout.
    ///
    /// Best-effort: returns `None` when no parseable envelope is present.
    #[must_use]
    pub fn from_stdout(stdout: &str) -> Option<Self> {
        let trimmed = stdout.trim();
        let value: serde_json::Value = serde_json::from_str(trimmed)
            .ok()
            .or_else(|| {
                // The envelope may be surrounded by log noise; take the
                // outermost object span.
                let start = trimmed.find('{')?;
                let end = trimmed.rfind('}')?;
                serde_json::from_str(&trimmed[start..=end]).ok()
            })?;

        value.get("num_turns")?;

        let usage = value.get("usage");
        Some(Self {
            steps: value.get("num_turns").and_then(|v| v.as_u64()).map(|v| v as u32),
            duration_ms: value.get("duration_ms").and_then(|v| v.as_u64()),
            cost_usd: value.get("total_cost_usd").and_then(|v| v.as_f64()),
            session_id: value
                .get("session_id")
                .and_then(|v| v.as_str())
                .map(ToString::to_string),
            input_tokens: usage
                .and_then(|u| u.get("input_tokens"))
                .and_then(|v| v.as_u64()),
            output_tokens: usage
                .and_then(|u| u.get("output_tokens"))
                .and_then(|v| v.as_u64()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_parses_from_result_envelope() {
        let stdout = r#"{"type":"result","is_error":false,"result":"done","num_turns":12,"duration_ms":48211,"total_cost_usd":0.31,"session_id":"abc-123","usage":{"input_tokens":9000,"output_tokens":2100}}"#;
        let metadata = RunMetadata::from_stdout(stdout).unwrap();
        assert_eq!(metadata.steps, Some(12));
        assert_eq!(metadata.duration_ms, Some(48_211));
        assert_eq!(metadata.cost_usd, Some(0.31));
        assert_eq!(metadata.session_id.as_deref(), Some("abc-123"));
        assert_eq!(metadata.input_tokens, Some(9000));
        assert_eq!(metadata.output_tokens, Some(2100));
    }

    #[test]
    fn metadata_parses_through_surrounding_log_noise() {
        let stdout = format!(
            "=== starting ===\n{}\n=== done ===",
            r#"{"num_turns":3,"duration_ms":1000}"#
        );
        let metadata = RunMetadata::from_stdout(&stdout).unwrap();
        assert_eq!(metadata.steps, Some(3));
        assert_eq!(metadata.cost_usd, None);
    }

    #[test]
    fn metadata_absent_when_no_envelope() {
        assert_eq!(RunMetadata::from_stdout("plain text output"), None);
        assert_eq!(RunMetadata::from_stdout(r#"{"no_turns_here":1}"#), None);
        assert_eq!(RunMetadata::from_stdout(""), None);
    }

    #[test]
    fn response_success_tracks_exit_code() {
        let response = SandboxResponse::default();
        assert!(response.success());
        let response = SandboxResponse {
            exit_code: 70,
            ..Default::default()
        };
        assert!(!response.success());
    }
}
