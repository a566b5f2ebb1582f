//! Phase-3 (synthesis) result models.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Scenario {
    pub name: String,
    pub description: String,
    pub current_outcome: String,
    pub desired_outcome: String,
    pub gaps: Vec<String>,
    pub financial_impact: f64,
    /// low / medium / high
    pub likelihood: String,
    pub fixes: Vec<String>,
}

/// Output of the `scenario_modeling` run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScenarioModeling {
    pub scenarios: Vec<Scenario>,
    pub cross_scenario_insights: Vec<String>,
    pub most_critical_scenario: Value,
    pub overall_preparedness: OverallScore,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriorityEntry {
    pub rank: u32,
    pub action: String,
    pub category: String,
    /// critical / high / medium / low
    pub impact: String,
    /// immediate / 30-days / 90-days / 12-months
    pub urgency: String,
    pub estimated_cost: crate::CostRange,
    pub complexity: String,
    pub professional_needed: String,
    pub dependencies: Vec<String>,
    pub risk_of_delay: String,
}

/// Output of the `priority_matrix` run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriorityMatrix {
    pub priority_matrix: Vec<PriorityEntry>,
    pub quick_wins: Vec<String>,
    pub critical_path: Vec<String>,
}

/// A 0-100 score with a letter grade.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverallScore {
    pub score: f64,
    pub grade: String,
    pub summary: String,
}

impl Default for OverallScore {
    fn default() -> Self {
        Self {
            score: 0.0,
            grade: "F".to_string(),
            summary: "Analysis incomplete".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutiveSummary {
    pub one_line_insight: String,
    pub critical_issues: Vec<String>,
    pub immediate_actions: Vec<String>,
    pub opportunities: Vec<String>,
}

impl Default for ExecutiveSummary {
    fn default() -> Self {
        Self {
            one_line_insight: "Analysis failed".to_string(),
            critical_issues: Vec::new(),
            immediate_actions: Vec::new(),
            opportunities: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportExposure {
    pub probate: f64,
    pub estate_tax: f64,
    pub total: f64,
}

/// Output of the `final_report` run.
///
/// The report echoes upstream structures (scenario analysis, priority
/// matrix) as raw values; only the fields the pipeline itself reads are
/// typed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FinalReport {
    pub score: f64,
    pub overall_score: OverallScore,
    pub executive_summary: ExecutiveSummary,
    pub missing_documents: Vec<Value>,
    pub outdated_documents: Vec<Value>,
    pub inconsistencies: Vec<Value>,
    pub financial_exposure: ReportExposure,
    pub tax_strategies: Vec<Value>,
    pub state_specific_notes: Vec<Value>,
    pub recommendations: Vec<Value>,
    pub scenario_analysis: Value,
    pub priority_matrix: Value,
    pub uncertainty_log: Value,
    pub target_state_summary: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_report_is_graded_f() {
        let report = FinalReport::default();
        assert_eq!(report.overall_score.grade, "F");
        assert_eq!(report.executive_summary.one_line_insight, "Analysis failed");
        assert_eq!(report.score, 0.0);
    }

    #[test]
    fn partial_report_fills_defaults() {
        let report: FinalReport = serde_json::from_value(json!({
            "score": 81,
            "overallScore": { "score": 81, "grade": "B", "summary": "solid plan" }
        }))
        .unwrap();
        assert_eq!(report.overall_score.grade, "B");
        assert!(report.missing_documents.is_empty());
        assert_eq!(report.financial_exposure.total, 0.0);
    }
}
