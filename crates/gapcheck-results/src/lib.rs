//! Run-result models and fallback placeholders.
//!
//! Raw run output is stored as `serde_json::Value` in a [`PhaseResultSet`];
//! the typed models here are *views* deserialized on demand. Every field
//! carries `#[serde(default)]` so a partial or fallback artifact always
//! deserializes to a well-typed value, so downstream code never sees a missing
//! field.

mod fallback;
mod phase1;
mod phase2;
mod phase3;
mod set;

pub use fallback::fallback_value;
pub use phase1::{
    ClientContextAnalysis, DocumentInventory, EstateTaxRules, InheritanceTaxRules, MedicaidRules,
    MissingEssential, Phase1Results, StateResearch, TaxBracket, WillRequirements,
    WorstCaseScenario,
};
pub use phase2::{
    AssetProtection, AssetRecommendation, AssetVulnerability, BeneficiaryConflict,
    BeneficiaryCoordination, ComplianceIssue, CostRange, DocumentCompleteness,
    DocumentRecommendation, ExistingDocumentReview, FamilyProtection, FamilyRecommendation,
    MedicaidPlanning, MedicaidRiskAssessment, MedicaidStrategy, MissingDesignation,
    MissingProvision, Phase2Results, RankedAction, TaxExposure, TaxOptimization, TaxStrategy,
};
pub use phase3::{
    ExecutiveSummary, FinalReport, OverallScore, PriorityEntry, PriorityMatrix, ReportExposure,
    Scenario, ScenarioModeling,
};
pub use set::{PhaseResultSet, view};
