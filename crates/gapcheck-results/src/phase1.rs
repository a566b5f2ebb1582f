//! Phase-1 (research) result models and the frozen phase-1 structure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use gapcheck_registry::RunId;

use crate::fallback::fallback_value;
use crate::set::PhaseResultSet;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaxBracket {
    pub bracket: String,
    pub rate: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EstateTaxRules {
    pub threshold: f64,
    pub rates: Vec<TaxBracket>,
    pub has_cliff_effect: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InheritanceTaxRules {
    pub exists: bool,
    pub rates: Vec<Value>,
    pub exemptions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MedicaidRules {
    pub asset_limit: f64,
    pub lookback_months: u32,
    pub csra: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WillRequirements {
    pub witnesses: u32,
    pub notarization: String,
    pub self_proving: bool,
}

/// Output of the `state_law_research` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StateResearch {
    pub state: String,
    pub estate_tax: EstateTaxRules,
    pub inheritance_tax: InheritanceTaxRules,
    pub medicaid: MedicaidRules,
    pub will_requirements: WillRequirements,
    pub trust_requirements: Value,
    pub poa_requirements: Value,
    pub recent_changes: Vec<Value>,
    pub sources: Vec<Value>,
}

impl Default for StateResearch {
    fn default() -> Self {
        Self {
            state: "Unknown".to_string(),
            estate_tax: EstateTaxRules::default(),
            inheritance_tax: InheritanceTaxRules::default(),
            medicaid: MedicaidRules::default(),
            will_requirements: WillRequirements::default(),
            trust_requirements: Value::Object(Default::default()),
            poa_requirements: Value::Object(Default::default()),
            recent_changes: Vec::new(),
            sources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorstCaseScenario {
    pub scenario: String,
    pub current_outcome: String,
    pub financial_impact: f64,
}

/// Output of the `client_context_analysis` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientContextAnalysis {
    pub unique_factors: Vec<String>,
    pub worst_case_scenarios: Vec<WorstCaseScenario>,
    pub immediate_red_flags: Vec<String>,
    pub deeper_insights: Vec<String>,
    pub key_insight: String,
    /// One of low / moderate / high / critical, or "unknown" when the run
    /// failed.
    pub risk_profile: String,
    pub complexity_score: f64,
}

impl Default for ClientContextAnalysis {
    fn default() -> Self {
        Self {
            unique_factors: Vec::new(),
            worst_case_scenarios: Vec::new(),
            immediate_red_flags: Vec::new(),
            deeper_insights: Vec::new(),
            key_insight: "Analysis incomplete".to_string(),
            risk_profile: "unknown".to_string(),
            complexity_score: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MissingEssential {
    pub document: String,
    pub priority: String,
    pub reason: String,
}

/// Output of the `document_inventory` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentInventory {
    pub existing_documents: Vec<Value>,
    pub missing_essential: Vec<MissingEssential>,
    pub outdated: Vec<Value>,
    pub goal_alignment: Value,
    pub coordination_issues: Vec<String>,
}

impl Default for DocumentInventory {
    fn default() -> Self {
        Self {
            existing_documents: Vec::new(),
            missing_essential: Vec::new(),
            outdated: Vec::new(),
            goal_alignment: Value::Object(Default::default()),
            coordination_issues: Vec::new(),
        }
    }
}

/// The frozen Phase-1 structure.
///
/// Built once when Phase 1 finishes and passed by reference into Phase-2 and
/// Phase-3 prompt construction; never mutated afterward. Values are kept raw
/// because the prompt builders re-serialize them; typed accessors
/// deserialize views on demand.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase1Results {
    pub state_research: Value,
    pub client_context: Value,
    pub document_inventory: Value,
}

impl Phase1Results {
    /// Freeze a completed Phase-1 set, substituting fallbacks for any
    /// missing key.
    #[must_use]
    pub fn from_set(set: &PhaseResultSet) -> Self {
        let take = |run: RunId| {
            set.get(&run)
                .cloned()
                .unwrap_or_else(|| fallback_value(run))
        };
        Self {
            state_research: take(RunId::StateLawResearch),
            client_context: take(RunId::ClientContextAnalysis),
            document_inventory: take(RunId::DocumentInventory),
        }
    }

    #[must_use]
    pub fn state_research_view(&self) -> StateResearch {
        serde_json::from_value(self.state_research.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn client_context_view(&self) -> ClientContextAnalysis {
        serde_json::from_value(self.client_context.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn document_inventory_view(&self) -> DocumentInventory {
        serde_json::from_value(self.document_inventory.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_set_substitutes_fallbacks_for_missing_runs() {
        let mut set = PhaseResultSet::new();
        set.insert(RunId::StateLawResearch, json!({ "state": "Oregon" }));

        let phase1 = Phase1Results::from_set(&set);
        assert_eq!(phase1.state_research_view().state, "Oregon");
        assert_eq!(phase1.client_context_view().risk_profile, "unknown");
        assert!(phase1.document_inventory_view().missing_essential.is_empty());
    }

    #[test]
    fn camel_case_artifacts_deserialize() {
        let value = json!({
            "riskProfile": "high",
            "keyInsight": "blended family",
            "worstCaseScenarios": [
                { "scenario": "intestacy", "currentOutcome": "probate", "financialImpact": 120000 }
            ]
        });
        let view: ClientContextAnalysis = serde_json::from_value(value).unwrap();
        assert_eq!(view.risk_profile, "high");
        assert_eq!(view.worst_case_scenarios.len(), 1);
        assert_eq!(view.worst_case_scenarios[0].financial_impact, 120_000.0);
    }
}
