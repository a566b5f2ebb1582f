//! Aggregation of Phase-2 results into unified views for Phase 3.
//!
//! All functions here are pure, stateless projections over a possibly
//! partial [`PhaseResultSet`]. An absent source (a run skipped by the
//! applicability filter, or one degraded to its fallback) contributes zero
//! items and zero penalty points; nothing here throws or produces
//! missing-field output.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use gapcheck_registry::RunId;
use gapcheck_results::{
    AssetProtection, BeneficiaryCoordination, DocumentCompleteness, ExistingDocumentReview,
    FamilyProtection, MedicaidPlanning, Phase1Results, PhaseResultSet, TaxOptimization,
    TaxStrategy, view,
};

/// Shared four-level priority vocabulary for merged entries.
///
/// Each source's own priority scheme (importance words, numeric ranks,
/// strategy tiers) is remapped onto this ordinal; `Ord` follows urgency, so
/// sorting ascending puts critical entries first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// A missing document surfaced by one of the Phase-2 analyses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingDocumentEntry {
    pub document: String,
    pub priority: Priority,
    pub source: RunId,
    pub reason: String,
}

/// A recommendation tagged with its originating source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationEntry {
    pub action: String,
    pub category: String,
    pub source: RunId,
    pub priority: Priority,
}

/// Summed financial exposure across analyses.
///
/// Probate exposure is always zero at this layer; it requires the estate
/// valuation computed elsewhere.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialExposure {
    pub probate: f64,
    pub estate_tax: f64,
    pub medicaid: f64,
    pub total: f64,
}

/// A cross-analysis conflict.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictEntry {
    pub source1: RunId,
    pub source2: RunId,
    pub issue: String,
    pub resolution: String,
}

/// The unified Phase-2 view consumed by Phase-3 prompt construction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedPhase2 {
    pub all_missing_documents: Vec<MissingDocumentEntry>,
    pub all_recommendations: Vec<RecommendationEntry>,
    pub tax_strategies: Vec<TaxStrategy>,
    pub financial_exposure: FinancialExposure,
    pub conflicts: Vec<ConflictEntry>,
    pub aggregate_score: u32,
}

/// Aggregate a (possibly partial) Phase-2 result set.
#[must_use]
pub fn aggregate_phase2(set: &PhaseResultSet) -> AggregatedPhase2 {
    let completeness: Option<DocumentCompleteness> = view(set, RunId::DocumentCompleteness);
    let tax: Option<TaxOptimization> = view(set, RunId::TaxOptimization);
    let medicaid: Option<MedicaidPlanning> = view(set, RunId::MedicaidPlanning);
    let beneficiary: Option<BeneficiaryCoordination> = view(set, RunId::BeneficiaryCoordination);
    let family: Option<FamilyProtection> = view(set, RunId::FamilyProtection);
    let assets: Option<AssetProtection> = view(set, RunId::AssetProtection);
    let review: Option<ExistingDocumentReview> = view(set, RunId::ExistingDocumentReview);

    AggregatedPhase2 {
        all_missing_documents: merge_missing_documents(
            completeness.as_ref(),
            family.as_ref(),
            beneficiary.as_ref(),
        ),
        all_recommendations: merge_recommendations(
            tax.as_ref(),
            medicaid.as_ref(),
            family.as_ref(),
            assets.as_ref(),
            beneficiary.as_ref(),
            review.as_ref(),
        ),
        tax_strategies: tax
            .as_ref()
            .map(|t| t.strategies.clone())
            .unwrap_or_default(),
        financial_exposure: financial_exposure(tax.as_ref(), medicaid.as_ref()),
        conflicts: conflicts(beneficiary.as_ref()),
        aggregate_score: aggregate_score(
            completeness.as_ref(),
            tax.as_ref(),
            family.as_ref(),
            assets.as_ref(),
        ),
    }
}

/// Merge missing-document candidates from three sources, deduplicated by a
/// source-qualified composite key and stably sorted by priority.
fn merge_missing_documents(
    completeness: Option<&DocumentCompleteness>,
    family: Option<&FamilyProtection>,
    beneficiary: Option<&BeneficiaryCoordination>,
) -> Vec<MissingDocumentEntry> {
    let mut documents = Vec::new();
    let mut seen = HashSet::new();

    if let Some(completeness) = completeness {
        for provision in &completeness.missing_provisions {
            let key = format!("provision:{}:{}", provision.document, provision.provision);
            if seen.insert(key) {
                documents.push(MissingDocumentEntry {
                    document: provision.provision.clone(),
                    priority: if provision.importance == "required" {
                        Priority::Critical
                    } else {
                        Priority::Medium
                    },
                    source: RunId::DocumentCompleteness,
                    reason: provision.reason.clone(),
                });
            }
        }
    }

    if let Some(family) = family {
        for gap in &family.gaps {
            let key = format!("family:{gap}");
            if seen.insert(key) {
                documents.push(MissingDocumentEntry {
                    document: gap.clone(),
                    priority: Priority::High,
                    source: RunId::FamilyProtection,
                    reason: "Family protection gap".to_string(),
                });
            }
        }
    }

    if let Some(beneficiary) = beneficiary {
        for missing in &beneficiary.missing_designations {
            let key = format!("beneficiary:{}", missing.asset);
            if seen.insert(key) {
                documents.push(MissingDocumentEntry {
                    document: format!("Beneficiary designation for {}", missing.asset),
                    priority: Priority::High,
                    source: RunId::BeneficiaryCoordination,
                    reason: missing.risk.clone(),
                });
            }
        }
    }

    documents.sort_by_key(|d| d.priority);
    documents
}

/// Concatenate recommendations from up to six sources, re-leveled and
/// source-tagged. No deduplication is applied.
fn merge_recommendations(
    tax: Option<&TaxOptimization>,
    medicaid: Option<&MedicaidPlanning>,
    family: Option<&FamilyProtection>,
    assets: Option<&AssetProtection>,
    beneficiary: Option<&BeneficiaryCoordination>,
    review: Option<&ExistingDocumentReview>,
) -> Vec<RecommendationEntry> {
    let mut recommendations = Vec::new();

    if let Some(tax) = tax {
        for strategy in &tax.strategies {
            recommendations.push(RecommendationEntry {
                action: strategy.name.clone(),
                category: "tax".to_string(),
                source: RunId::TaxOptimization,
                priority: if strategy.strategy_type == "conservative" {
                    Priority::High
                } else {
                    Priority::Medium
                },
            });
        }
    }

    if let Some(medicaid) = medicaid {
        for strategy in &medicaid.strategies {
            recommendations.push(RecommendationEntry {
                action: strategy.name.clone(),
                category: "medicaid".to_string(),
                source: RunId::MedicaidPlanning,
                priority: Priority::Medium,
            });
        }
    }

    if let Some(family) = family {
        for rec in &family.recommendations {
            recommendations.push(RecommendationEntry {
                action: rec.action.clone(),
                category: "family".to_string(),
                source: RunId::FamilyProtection,
                priority: if rec.priority <= 2 {
                    Priority::Critical
                } else {
                    Priority::High
                },
            });
        }
    }

    if let Some(assets) = assets {
        for rec in &assets.recommendations {
            recommendations.push(RecommendationEntry {
                action: rec.strategy.clone(),
                category: "asset".to_string(),
                source: RunId::AssetProtection,
                priority: if rec.priority <= 2 {
                    Priority::High
                } else {
                    Priority::Medium
                },
            });
        }
    }

    if let Some(beneficiary) = beneficiary {
        for rec in &beneficiary.recommendations {
            recommendations.push(RecommendationEntry {
                action: rec.action.clone(),
                category: "beneficiary".to_string(),
                source: RunId::BeneficiaryCoordination,
                priority: if rec.priority <= 2 {
                    Priority::Critical
                } else {
                    Priority::High
                },
            });
        }
    }

    if let Some(review) = review {
        for rec in &review.recommendations {
            recommendations.push(RecommendationEntry {
                action: rec.action.clone(),
                category: "document".to_string(),
                source: RunId::ExistingDocumentReview,
                priority: if rec.priority <= 2 {
                    Priority::High
                } else {
                    Priority::Medium
                },
            });
        }
    }

    recommendations
}

fn financial_exposure(
    tax: Option<&TaxOptimization>,
    medicaid: Option<&MedicaidPlanning>,
) -> FinancialExposure {
    let probate = 0.0;
    let estate_tax = tax.map(|t| t.current_exposure.combined).unwrap_or(0.0);
    let medicaid = medicaid.map(|m| m.current_exposure).unwrap_or(0.0);

    FinancialExposure {
        probate,
        estate_tax,
        medicaid,
        total: probate + estate_tax + medicaid,
    }
}

/// Conflicts come from the beneficiary-coordination source only.
fn conflicts(beneficiary: Option<&BeneficiaryCoordination>) -> Vec<ConflictEntry> {
    beneficiary
        .map(|b| {
            b.conflicts
                .iter()
                .map(|c| ConflictEntry {
                    source1: RunId::BeneficiaryCoordination,
                    source2: RunId::DocumentInventory,
                    issue: c.issue.clone(),
                    resolution: c.resolution.clone(),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Penalty-subtraction health score over the merged findings.
///
/// Start at 100; subtract 15/10/5 per compliance issue by severity, a
/// tiered penalty for tax-savings magnitude (10 over $500k, 5 over $100k),
/// 5 per family-protection gap capped at 20, and 3 per asset vulnerability
/// capped at 15. Clamped to [0, 100].
fn aggregate_score(
    completeness: Option<&DocumentCompleteness>,
    tax: Option<&TaxOptimization>,
    family: Option<&FamilyProtection>,
    assets: Option<&AssetProtection>,
) -> u32 {
    let mut score: i64 = 100;

    if let Some(completeness) = completeness {
        for issue in &completeness.compliance_issues {
            score -= match issue.severity.as_str() {
                "critical" => 15,
                "high" => 10,
                _ => 5,
            };
        }
    }

    if let Some(tax) = tax {
        let savings = tax.total_potential_savings;
        if savings > 500_000.0 {
            score -= 10;
        } else if savings > 100_000.0 {
            score -= 5;
        }
    }

    if let Some(family) = family {
        score -= (family.gaps.len() as i64 * 5).min(20);
    }

    if let Some(assets) = assets {
        score -= (assets.vulnerabilities.len() as i64 * 3).min(15);
    }

    score.clamp(0, 100) as u32
}

/// Final 0-100 score blending Phase-1 findings with the Phase-2 aggregate.
///
/// Risk profile deducts 20/15/10 for critical/high/moderate; each critical
/// missing-essential document deducts 10. When an aggregate score exists,
/// the result is `round(0.4 * phase1 + 0.6 * aggregate)`.
#[must_use]
pub fn final_score(phase1: &Phase1Results, aggregated: Option<&AggregatedPhase2>) -> u32 {
    let mut score: i64 = 100;

    let context = phase1.client_context_view();
    score -= match context.risk_profile.as_str() {
        "critical" => 20,
        "high" => 15,
        "moderate" => 10,
        _ => 0,
    };

    let inventory = phase1.document_inventory_view();
    let missing_critical = inventory
        .missing_essential
        .iter()
        .filter(|d| d.priority == "critical")
        .count() as i64;
    score -= missing_critical * 10;

    if let Some(aggregated) = aggregated {
        let blended =
            (score as f64).mul_add(0.4, f64::from(aggregated.aggregate_score) * 0.6);
        score = blended.round() as i64;
    }

    score.clamp(0, 100) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set_with(entries: &[(RunId, serde_json::Value)]) -> PhaseResultSet {
        entries.iter().cloned().collect()
    }

    #[test]
    fn empty_set_yields_empty_merges_and_perfect_score() {
        let aggregated = aggregate_phase2(&PhaseResultSet::new());
        assert!(aggregated.all_missing_documents.is_empty());
        assert!(aggregated.all_recommendations.is_empty());
        assert!(aggregated.tax_strategies.is_empty());
        assert!(aggregated.conflicts.is_empty());
        assert_eq!(aggregated.financial_exposure.total, 0.0);
        assert_eq!(aggregated.aggregate_score, 100);
    }

    #[test]
    fn missing_documents_deduplicate_and_sort_by_priority() {
        let set = set_with(&[
            (
                RunId::DocumentCompleteness,
                json!({
                    "missingProvisions": [
                        { "document": "will", "provision": "guardianship clause",
                          "importance": "required", "reason": "minor children" },
                        { "document": "will", "provision": "guardianship clause",
                          "importance": "required", "reason": "duplicate" },
                        { "document": "trust", "provision": "pour-over terms",
                          "importance": "recommended", "reason": "alignment" }
                    ]
                }),
            ),
            (
                RunId::FamilyProtection,
                json!({ "gaps": ["no healthcare directive"] }),
            ),
            (
                RunId::BeneficiaryCoordination,
                json!({
                    "missingDesignations": [
                        { "asset": "401k", "currentStatus": "none",
                          "risk": "probate exposure", "recommendation": "designate" }
                    ]
                }),
            ),
        ]);

        let merged = merge_missing_documents(
            view::<DocumentCompleteness>(&set, RunId::DocumentCompleteness).as_ref(),
            view::<FamilyProtection>(&set, RunId::FamilyProtection).as_ref(),
            view::<BeneficiaryCoordination>(&set, RunId::BeneficiaryCoordination).as_ref(),
        );

        // Duplicate provision collapsed: 2 provisions + 1 gap + 1 designation.
        assert_eq!(merged.len(), 4);
        assert_eq!(merged[0].priority, Priority::Critical);
        assert_eq!(merged[0].document, "guardianship clause");

        // Stable sort: both high-priority entries keep source order.
        assert_eq!(merged[1].source, RunId::FamilyProtection);
        assert_eq!(merged[2].source, RunId::BeneficiaryCoordination);
        assert_eq!(merged[2].document, "Beneficiary designation for 401k");
        assert_eq!(merged[3].priority, Priority::Medium);
    }

    #[test]
    fn recommendations_concatenate_without_dedup() {
        let set = set_with(&[
            (
                RunId::TaxOptimization,
                json!({
                    "strategies": [
                        { "name": "annual gifting", "type": "conservative" },
                        { "name": "GRAT", "type": "advanced" }
                    ]
                }),
            ),
            (
                RunId::FamilyProtection,
                json!({
                    "recommendations": [
                        { "priority": 1, "action": "name a guardian" },
                        { "priority": 4, "action": "update distributions" }
                    ]
                }),
            ),
            (
                RunId::ExistingDocumentReview,
                json!({
                    "recommendations": [
                        { "priority": 3, "document": "will", "action": "re-execute will" }
                    ]
                }),
            ),
        ]);

        let aggregated = aggregate_phase2(&set);
        let recs = &aggregated.all_recommendations;
        assert_eq!(recs.len(), 5);

        let gifting = recs.iter().find(|r| r.action == "annual gifting").unwrap();
        assert_eq!(gifting.priority, Priority::High);
        assert_eq!(gifting.category, "tax");

        let grat = recs.iter().find(|r| r.action == "GRAT").unwrap();
        assert_eq!(grat.priority, Priority::Medium);

        let guardian = recs.iter().find(|r| r.action == "name a guardian").unwrap();
        assert_eq!(guardian.priority, Priority::Critical);

        let reexecute = recs.iter().find(|r| r.action == "re-execute will").unwrap();
        assert_eq!(reexecute.priority, Priority::Medium);
        assert_eq!(reexecute.source, RunId::ExistingDocumentReview);
    }

    #[test]
    fn financial_exposure_sums_sources() {
        let set = set_with(&[
            (
                RunId::TaxOptimization,
                json!({ "currentExposure": { "federal": 100000, "state": 20000, "combined": 120000 } }),
            ),
            (
                RunId::MedicaidPlanning,
                json!({ "currentExposure": 80000 }),
            ),
        ]);
        let aggregated = aggregate_phase2(&set);
        assert_eq!(aggregated.financial_exposure.probate, 0.0);
        assert_eq!(aggregated.financial_exposure.estate_tax, 120_000.0);
        assert_eq!(aggregated.financial_exposure.medicaid, 80_000.0);
        assert_eq!(aggregated.financial_exposure.total, 200_000.0);
    }

    #[test]
    fn conflicts_pass_through_from_beneficiary_source_only() {
        let set = set_with(&[(
            RunId::BeneficiaryCoordination,
            json!({
                "conflicts": [
                    { "asset1": "IRA", "asset2": "will",
                      "issue": "beneficiary mismatch", "resolution": "align designations" }
                ]
            }),
        )]);
        let aggregated = aggregate_phase2(&set);
        assert_eq!(aggregated.conflicts.len(), 1);
        assert_eq!(aggregated.conflicts[0].source1, RunId::BeneficiaryCoordination);
        assert_eq!(aggregated.conflicts[0].source2, RunId::DocumentInventory);
        assert_eq!(aggregated.conflicts[0].issue, "beneficiary mismatch");
    }

    #[test]
    fn aggregate_score_applies_penalty_schedule() {
        let set = set_with(&[
            (
                RunId::DocumentCompleteness,
                json!({
                    "complianceIssues": [
                        { "severity": "critical" },
                        { "severity": "high" },
                        { "severity": "medium" }
                    ]
                }),
            ),
            (
                RunId::TaxOptimization,
                json!({ "totalPotentialSavings": 600000 }),
            ),
            (
                RunId::FamilyProtection,
                json!({ "gaps": ["a", "b", "c", "d", "e"] }),
            ),
            (
                RunId::AssetProtection,
                json!({ "vulnerabilities": [{}, {}, {}, {}, {}, {}] }),
            ),
        ]);

        // 100 - (15+10+5) - 10 - min(25,20) - min(18,15) = 25
        assert_eq!(aggregate_phase2(&set).aggregate_score, 25);
    }

    #[test]
    fn aggregate_score_tax_tiers() {
        let at = |savings: f64| {
            let set = set_with(&[(
                RunId::TaxOptimization,
                json!({ "totalPotentialSavings": savings }),
            )]);
            aggregate_phase2(&set).aggregate_score
        };
        assert_eq!(at(50_000.0), 100);
        assert_eq!(at(100_000.0), 100);
        assert_eq!(at(100_001.0), 95);
        assert_eq!(at(500_000.0), 95);
        assert_eq!(at(500_001.0), 90);
    }

    #[test]
    fn aggregate_score_clamps_at_zero() {
        let issues: Vec<serde_json::Value> =
            (0..10).map(|_| json!({ "severity": "critical" })).collect();
        let set = set_with(&[(
            RunId::DocumentCompleteness,
            json!({ "complianceIssues": issues }),
        )]);
        assert_eq!(aggregate_phase2(&set).aggregate_score, 0);
    }

    #[test]
    fn fallback_results_contribute_nothing() {
        // A permanently failed run stores its fallback; aggregation must
        // treat it as legitimately empty.
        let set = set_with(&[
            (
                RunId::DocumentCompleteness,
                gapcheck_results::fallback_value(RunId::DocumentCompleteness),
            ),
            (
                RunId::TaxOptimization,
                gapcheck_results::fallback_value(RunId::TaxOptimization),
            ),
        ]);
        let aggregated = aggregate_phase2(&set);
        assert!(aggregated.all_missing_documents.is_empty());
        assert!(aggregated.all_recommendations.is_empty());
        assert_eq!(aggregated.aggregate_score, 100);
    }

    #[test]
    fn final_score_blends_phase1_and_aggregate() {
        let mut set = PhaseResultSet::new();
        set.insert(
            RunId::ClientContextAnalysis,
            json!({ "riskProfile": "critical" }),
        );
        set.insert(
            RunId::DocumentInventory,
            json!({
                "missingEssential": [
                    { "document": "will", "priority": "critical", "reason": "none" },
                    { "document": "POA", "priority": "critical", "reason": "none" },
                    { "document": "directive", "priority": "high", "reason": "none" }
                ]
            }),
        );
        let phase1 = Phase1Results::from_set(&set);

        // Phase-1 only: 100 - 20 - 2*10 = 60.
        assert_eq!(final_score(&phase1, None), 60);

        // Blended with aggregate 50: round(0.4*60 + 0.6*50) = 54.
        let aggregated = AggregatedPhase2 {
            all_missing_documents: Vec::new(),
            all_recommendations: Vec::new(),
            tax_strategies: Vec::new(),
            financial_exposure: FinancialExposure::default(),
            conflicts: Vec::new(),
            aggregate_score: 50,
        };
        assert_eq!(final_score(&phase1, Some(&aggregated)), 54);
    }

    #[test]
    fn priority_orders_by_urgency() {
        let mut priorities = vec![
            Priority::Low,
            Priority::Critical,
            Priority::Medium,
            Priority::High,
        ];
        priorities.sort();
        assert_eq!(
            priorities,
            vec![
                Priority::Critical,
                Priority::High,
                Priority::Medium,
                Priority::Low
            ]
        );
        assert_eq!(Priority::Critical.as_str(), "critical");
    }
}
