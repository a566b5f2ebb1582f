//! Run, phase, and overall pipeline status.

use serde::{Deserialize, Serialize};

/// Status of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Status of a phase as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Overall pipeline status, walked in order as phases begin and complete.
///
/// `Partial` means every phase ran but at least one run exhausted its
/// retries and degraded to a fallback. `Failed` is reserved for precondition
/// aborts and cancellation; a run failure alone never fails the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Pending,
    Phase1Running,
    Phase1Complete,
    Phase2Running,
    Phase2Complete,
    Phase3Running,
    Completed,
    Partial,
    Failed,
}

impl OverallStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Phase1Running => "phase1_running",
            Self::Phase1Complete => "phase1_complete",
            Self::Phase2Running => "phase2_running",
            Self::Phase2Complete => "phase2_complete",
            Self::Phase3Running => "phase3_running",
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }

    /// Whether the pipeline has reached a terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Partial | Self::Failed)
    }
}
