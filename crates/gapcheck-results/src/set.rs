//! The per-phase result map.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use gapcheck_registry::RunId;

/// Mapping from run identifier to its parsed structured output (or
/// fallback).
///
/// A `BTreeMap` keyed by `RunId` iterates in registry declaration order,
/// which keeps reports and serialized output deterministic. Phase 1's set is
/// frozen into [`crate::Phase1Results`] once the phase completes; Phase 2's
/// set is written one key at a time by the coordinating task only.
pub type PhaseResultSet = BTreeMap<RunId, Value>;

/// Deserialize a typed view of one run's output.
///
/// Absent identifiers (e.g. runs skipped by the applicability filter) yield
/// `None`; present-but-partial values deserialize through serde defaults, so
/// a fallback placeholder or truncation-repaired artifact still produces a
/// fully populated struct.
#[must_use]
pub fn view<T>(set: &PhaseResultSet, run: RunId) -> Option<T>
where
    T: DeserializeOwned + Default,
{
    set.get(&run)
        .map(|value| serde_json::from_value(value.clone()).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TaxOptimization;
    use serde_json::json;

    #[test]
    fn view_of_absent_run_is_none() {
        let set = PhaseResultSet::new();
        assert!(view::<TaxOptimization>(&set, RunId::TaxOptimization).is_none());
    }

    #[test]
    fn view_of_partial_value_fills_defaults() {
        let mut set = PhaseResultSet::new();
        set.insert(
            RunId::TaxOptimization,
            json!({ "totalPotentialSavings": 250000 }),
        );
        let tax: TaxOptimization = view(&set, RunId::TaxOptimization).unwrap();
        assert_eq!(tax.total_potential_savings, 250_000.0);
        assert!(tax.strategies.is_empty());
    }

    #[test]
    fn view_of_malformed_value_degrades_to_default() {
        let mut set = PhaseResultSet::new();
        set.insert(RunId::TaxOptimization, json!("not an object"));
        let tax: TaxOptimization = view(&set, RunId::TaxOptimization).unwrap();
        assert_eq!(tax.total_potential_savings, 0.0);
    }

    #[test]
    fn iteration_follows_registry_order() {
        let mut set = PhaseResultSet::new();
        set.insert(RunId::FamilyProtection, json!({}));
        set.insert(RunId::DocumentCompleteness, json!({}));
        set.insert(RunId::TaxOptimization, json!({}));
        let keys: Vec<RunId> = set.keys().copied().collect();
        assert_eq!(
            keys,
            vec![
                RunId::DocumentCompleteness,
                RunId::TaxOptimization,
                RunId::FamilyProtection
            ]
        );
    }
}
