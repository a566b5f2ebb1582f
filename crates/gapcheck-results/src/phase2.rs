//! Phase-2 (analysis) result models and the optional-field projection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use gapcheck_registry::RunId;

use crate::set::{PhaseResultSet, view};

/// A low/high dollar range.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CostRange {
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComplianceIssue {
    pub document: String,
    pub issue: String,
    /// critical / high / medium
    pub severity: String,
    pub fix: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MissingProvision {
    pub document: String,
    pub provision: String,
    /// required / recommended / optional
    pub importance: String,
    pub reason: String,
}

/// Output of the `document_completeness` run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentCompleteness {
    pub compliance_issues: Vec<ComplianceIssue>,
    pub execution_defects: Vec<String>,
    pub missing_provisions: Vec<MissingProvision>,
    pub state_specific_gaps: Vec<String>,
    pub estimated_compliance_cost: CostRange,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaxStrategy {
    pub name: String,
    /// conservative / moderate / advanced
    #[serde(rename = "type")]
    pub strategy_type: String,
    pub estimated_savings: CostRange,
    pub implementation_cost: CostRange,
    pub timeline: String,
    pub prerequisites: Vec<String>,
    pub risks: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaxExposure {
    pub federal: f64,
    pub state: f64,
    pub combined: f64,
}

/// Output of the `tax_optimization` run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaxOptimization {
    pub current_exposure: TaxExposure,
    pub strategies: Vec<TaxStrategy>,
    pub sunset_analysis: Value,
    pub total_potential_savings: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MedicaidStrategy {
    pub name: String,
    pub description: String,
    pub timeline: String,
    pub savings: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MedicaidRiskAssessment {
    pub likelihood: String,
    pub timeframe: String,
    pub factors: Vec<String>,
}

impl Default for MedicaidRiskAssessment {
    fn default() -> Self {
        Self {
            likelihood: "unknown".to_string(),
            timeframe: String::new(),
            factors: Vec::new(),
        }
    }
}

/// Output of the `medicaid_planning` run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MedicaidPlanning {
    pub risk_assessment: MedicaidRiskAssessment,
    pub current_exposure: f64,
    pub lookback_concerns: Vec<String>,
    pub strategies: Vec<MedicaidStrategy>,
    pub spousal_protection: Value,
    pub asset_protection_options: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BeneficiaryConflict {
    pub asset1: String,
    pub asset2: String,
    pub issue: String,
    pub resolution: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MissingDesignation {
    pub asset: String,
    pub current_status: String,
    pub risk: String,
    pub recommendation: String,
}

/// A recommendation ranked by numeric priority (1 is most urgent).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RankedAction {
    pub priority: u32,
    pub action: String,
    pub reason: String,
}

/// Output of the `beneficiary_coordination` run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BeneficiaryCoordination {
    pub conflicts: Vec<BeneficiaryConflict>,
    pub missing_designations: Vec<MissingDesignation>,
    pub outdated_designations: Vec<Value>,
    pub coordination_issues: Vec<String>,
    pub recommendations: Vec<RankedAction>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FamilyRecommendation {
    pub priority: u32,
    pub action: String,
    pub protects: Vec<String>,
    pub cost: CostRange,
}

/// Output of the `family_protection` run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FamilyProtection {
    pub minor_children_protection: Value,
    pub special_needs_planning: Value,
    pub blended_family_issues: Vec<String>,
    pub incapacity_protection: Value,
    pub gaps: Vec<String>,
    pub recommendations: Vec<FamilyRecommendation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssetVulnerability {
    pub asset: String,
    pub risk: String,
    pub exposure: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssetRecommendation {
    pub priority: u32,
    pub strategy: String,
    pub protects: f64,
    pub cost: CostRange,
}

/// Output of the `asset_protection` run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssetProtection {
    pub vulnerabilities: Vec<AssetVulnerability>,
    pub protection_strategies: Vec<Value>,
    pub trust_options: Vec<String>,
    pub business_succession: Value,
    pub recommendations: Vec<AssetRecommendation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentRecommendation {
    pub priority: u32,
    pub document: String,
    pub action: String,
    pub reason: String,
}

/// Output of the `existing_document_review` run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExistingDocumentReview {
    pub document_issues: Vec<Value>,
    pub outdated_provisions: Vec<String>,
    pub ambiguous_language: Vec<String>,
    pub missing_clauses: Vec<String>,
    pub recommendations: Vec<DocumentRecommendation>,
}

/// Projection of the Phase-2 set into an optional-field structure.
///
/// Optional fields are `None` when the applicability filter skipped the run;
/// consumers treat `None` as contributing nothing.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase2Results {
    pub document_completeness: Option<DocumentCompleteness>,
    pub tax_optimization: Option<TaxOptimization>,
    pub medicaid_planning: Option<MedicaidPlanning>,
    pub beneficiary_coordination: Option<BeneficiaryCoordination>,
    pub family_protection: Option<FamilyProtection>,
    pub asset_protection: Option<AssetProtection>,
    pub existing_document_review: Option<ExistingDocumentReview>,
}

impl Phase2Results {
    #[must_use]
    pub fn from_set(set: &PhaseResultSet) -> Self {
        Self {
            document_completeness: view(set, RunId::DocumentCompleteness),
            tax_optimization: view(set, RunId::TaxOptimization),
            medicaid_planning: view(set, RunId::MedicaidPlanning),
            beneficiary_coordination: view(set, RunId::BeneficiaryCoordination),
            family_protection: view(set, RunId::FamilyProtection),
            asset_protection: view(set, RunId::AssetProtection),
            existing_document_review: view(set, RunId::ExistingDocumentReview),
        }
    }
}
