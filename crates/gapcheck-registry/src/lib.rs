//! Static run registry and applicability rules.
//!
//! Thirteen runs across three phases. Declaration order within a phase is
//! execution order, and every identifier belongs to exactly one phase: the
//! registry is total and immutable.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use gapcheck_intake::ClientContext;

/// The three pipeline phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Research,
    Analysis,
    Synthesis,
}

impl Phase {
    /// 1-based phase number used in progress reporting.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Research => 1,
            Self::Analysis => 2,
            Self::Synthesis => 3,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Research => "Research & Context",
            Self::Analysis => "Deep Analysis",
            Self::Synthesis => "Synthesis",
        }
    }

    /// Whether runs in this phase execute one after another.
    #[must_use]
    pub const fn is_sequential(self) -> bool {
        !matches!(self, Self::Analysis)
    }

    /// Overall-progress range `[min, max]` covered by this phase.
    #[must_use]
    pub const fn progress_range(self) -> (u8, u8) {
        match self {
            Self::Research => (0, 30),
            Self::Analysis => (30, 70),
            Self::Synthesis => (70, 100),
        }
    }

    /// Declared runs for this phase, in execution order.
    #[must_use]
    pub const fn runs(self) -> &'static [RunId] {
        match self {
            Self::Research => &[
                RunId::StateLawResearch,
                RunId::ClientContextAnalysis,
                RunId::DocumentInventory,
            ],
            Self::Analysis => &[
                RunId::DocumentCompleteness,
                RunId::TaxOptimization,
                RunId::MedicaidPlanning,
                RunId::BeneficiaryCoordination,
                RunId::FamilyProtection,
                RunId::AssetProtection,
                RunId::ExistingDocumentReview,
            ],
            Self::Synthesis => &[
                RunId::ScenarioModeling,
                RunId::PriorityMatrix,
                RunId::FinalReport,
            ],
        }
    }

    pub const ALL: [Self; 3] = [Self::Research, Self::Analysis, Self::Synthesis];
}

/// Identifier of one bounded sandbox invocation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunId {
    // Phase 1 - Research (sequential)
    StateLawResearch,
    ClientContextAnalysis,
    DocumentInventory,
    // Phase 2 - Analysis (parallel)
    DocumentCompleteness,
    TaxOptimization,
    MedicaidPlanning,
    BeneficiaryCoordination,
    FamilyProtection,
    AssetProtection,
    ExistingDocumentReview,
    // Phase 3 - Synthesis (sequential)
    ScenarioModeling,
    PriorityMatrix,
    FinalReport,
}

impl RunId {
    /// Snake-case identifier, matching artifact and progress wire names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StateLawResearch => "state_law_research",
            Self::ClientContextAnalysis => "client_context_analysis",
            Self::DocumentInventory => "document_inventory",
            Self::DocumentCompleteness => "document_completeness",
            Self::TaxOptimization => "tax_optimization",
            Self::MedicaidPlanning => "medicaid_planning",
            Self::BeneficiaryCoordination => "beneficiary_coordination",
            Self::FamilyProtection => "family_protection",
            Self::AssetProtection => "asset_protection",
            Self::ExistingDocumentReview => "existing_document_review",
            Self::ScenarioModeling => "scenario_modeling",
            Self::PriorityMatrix => "priority_matrix",
            Self::FinalReport => "final_report",
        }
    }

    /// The phase this run belongs to.
    #[must_use]
    pub const fn phase(self) -> Phase {
        match self {
            Self::StateLawResearch | Self::ClientContextAnalysis | Self::DocumentInventory => {
                Phase::Research
            }
            Self::DocumentCompleteness
            | Self::TaxOptimization
            | Self::MedicaidPlanning
            | Self::BeneficiaryCoordination
            | Self::FamilyProtection
            | Self::AssetProtection
            | Self::ExistingDocumentReview => Phase::Analysis,
            Self::ScenarioModeling | Self::PriorityMatrix | Self::FinalReport => Phase::Synthesis,
        }
    }

    /// Static configuration for this run.
    #[must_use]
    pub const fn spec(self) -> RunSpec {
        // Step budgets are generous: each run must read its inputs, reason,
        // and write the output artifact before the budget runs out.
        match self {
            Self::StateLawResearch => RunSpec::new(self, 20, true, 300_000, "state_research.json"),
            Self::ClientContextAnalysis => {
                RunSpec::new(self, 20, true, 300_000, "client_context.json")
            }
            Self::DocumentInventory => {
                RunSpec::new(self, 20, true, 300_000, "document_inventory.json")
            }
            Self::DocumentCompleteness => {
                RunSpec::new(self, 25, true, 360_000, "document_completeness.json")
            }
            Self::TaxOptimization => RunSpec::new(self, 30, true, 420_000, "tax_optimization.json"),
            Self::MedicaidPlanning => {
                // Skipped for young clients with modest assets.
                RunSpec::new(self, 25, false, 360_000, "medicaid_planning.json")
            }
            Self::BeneficiaryCoordination => {
                RunSpec::new(self, 25, true, 360_000, "beneficiary_coordination.json")
            }
            Self::FamilyProtection => {
                RunSpec::new(self, 25, true, 360_000, "family_protection.json")
            }
            Self::AssetProtection => {
                RunSpec::new(self, 25, false, 360_000, "asset_protection.json")
            }
            Self::ExistingDocumentReview => {
                // Only when the client reports existing documents.
                RunSpec::new(self, 25, false, 360_000, "document_review.json")
            }
            Self::ScenarioModeling => {
                RunSpec::new(self, 35, true, 480_000, "scenario_modeling.json")
            }
            Self::PriorityMatrix => RunSpec::new(self, 30, true, 420_000, "priority_matrix.json"),
            Self::FinalReport => RunSpec::new(self, 40, true, 600_000, "final_analysis.json"),
        }
    }

    /// All run identifiers in registry order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }
}

/// Read-only configuration for one run, created once at process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSpec {
    pub id: RunId,
    pub phase: Phase,
    /// Turn/step budget handed to the sandbox collaborator.
    pub step_budget: u32,
    /// Web search is not available in the sandbox; kept for parity with the
    /// collaborator contract.
    pub allow_web_search: bool,
    /// Whether a permanent failure here should be called out in reporting.
    pub critical: bool,
    pub estimated_duration_ms: u64,
    /// Artifact the run is expected to write under the output directory.
    pub output_artifact: &'static str,
}

impl RunSpec {
    const fn new(
        id: RunId,
        step_budget: u32,
        critical: bool,
        estimated_duration_ms: u64,
        output_artifact: &'static str,
    ) -> Self {
        Self {
            id,
            phase: id.phase(),
            step_budget,
            allow_web_search: false,
            critical,
            estimated_duration_ms,
            output_artifact,
        }
    }

    #[must_use]
    pub const fn estimated_duration(&self) -> Duration {
        Duration::from_millis(self.estimated_duration_ms)
    }
}

/// The ordered subset of a phase's runs that should execute for this client.
///
/// Phases 1 and 3 always return the full declared list. Phase 2 applies
/// per-run predicates on the client context:
/// - `medicaid_planning` is skipped for clients under 50 with under $2M;
/// - `asset_protection` is skipped under $500k with no business interests;
/// - `existing_document_review` is skipped when no existing-document flag is
///   set.
///
/// Pure function of its inputs; order is declaration order.
#[must_use]
pub fn applicable_runs(phase: Phase, context: &ClientContext) -> Vec<RunId> {
    let runs = phase.runs();
    if phase != Phase::Analysis {
        return runs.to_vec();
    }

    runs.iter()
        .copied()
        .filter(|run| match run {
            RunId::MedicaidPlanning => {
                !(context.age < 50 && context.estimated_value < 2_000_000.0)
            }
            RunId::AssetProtection => {
                !(context.estimated_value < 500_000.0 && !context.has_business_interests)
            }
            RunId::ExistingDocumentReview => context.has_any_existing_document(),
            _ => true,
        })
        .collect()
}

/// Map completed-run count onto the phase's overall-progress range.
#[must_use]
pub fn phase_progress(phase: Phase, completed_runs: usize, total_runs: usize) -> u8 {
    let (min, max) = phase.progress_range();
    let fraction = if total_runs > 0 {
        completed_runs as f64 / total_runs as f64
    } else {
        0.0
    };
    (f64::from(min) + fraction * f64::from(max - min)).round() as u8
}

/// Estimate total pipeline duration for the given applicable runs.
///
/// Sequential phases contribute the sum of their estimates; the parallel
/// phase contributes the maximum. A 20% buffer covers orchestration
/// overhead.
#[must_use]
pub fn estimate_total_duration(
    phase1: &[RunId],
    phase2: &[RunId],
    phase3: &[RunId],
) -> Duration {
    let sum = |runs: &[RunId]| -> u64 {
        runs.iter().map(|r| r.spec().estimated_duration_ms).sum()
    };
    let phase2_max = phase2
        .iter()
        .map(|r| r.spec().estimated_duration_ms)
        .max()
        .unwrap_or(0);

    let total = sum(phase1) + phase2_max + sum(phase3);
    Duration::from_millis((total as f64 * 1.2).round() as u64)
}
