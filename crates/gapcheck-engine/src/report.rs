//! Pipeline and per-run reports.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use gapcheck_aggregate::AggregatedPhase2;
use gapcheck_registry::RunId;
use gapcheck_results::{Phase1Results, Phase2Results};
use gapcheck_sandbox::RunMetadata;
use gapcheck_utils::status::{OverallStatus, RunStatus};

/// What happened to one run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run: RunId,
    pub phase: u8,
    pub status: RunStatus,
    pub success: bool,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RunMetadata>,
    /// Whether a failure here is called out prominently in reporting.
    pub critical: bool,
}

/// Duration/cost accounting for one phase.
///
/// Sequential phases sum run durations; the parallel phase records the
/// maximum (true wall-clock parallelism). Cost is always the sum.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseMetadata {
    pub total_duration_ms: u64,
    pub total_cost_usd: f64,
}

/// The full pipeline result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub status: OverallStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub final_score: u32,
    pub phase1: Phase1Results,
    pub phase2: Phase2Results,
    pub aggregated: AggregatedPhase2,
    pub scenario_modeling: Value,
    pub priority_matrix: Value,
    pub final_report: Value,
    pub runs: Vec<RunReport>,
    pub phase_metadata: [PhaseMetadata; 3],
    pub total_cost_usd: f64,
}

impl PipelineReport {
    /// Runs that permanently failed (fallback substituted).
    #[must_use]
    pub fn failed_runs(&self) -> Vec<RunId> {
        self.runs
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.run)
            .collect()
    }
}
