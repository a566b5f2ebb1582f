//! End-to-end pipeline tests against the scripted stub sandbox.

use std::sync::Arc;

use serde_json::json;

use gapcheck::{
    Config, OverallStatus, Phase, Pipeline, RawIntake, RunId, StubOutcome, StubSandbox,
    applicable_runs, derive_context, parse_intake,
};
use gapcheck_config::RetryConfig;
use gapcheck_intake::{EstatePlanSection, RawSection};

fn config_in(dir: &tempfile::TempDir) -> Config {
    let mut config = Config::default();
    config.retry = RetryConfig::immediate(1);
    config.sandbox.output_dir = Some(dir.path().join("generated").display().to_string());
    config
}

fn wealthy_intake() -> RawIntake {
    RawIntake {
        estate_plan: EstatePlanSection {
            state_of_residence: Some("Oregon".to_string()),
        },
        personal: Some(RawSection {
            data: json!({ "age": 58, "maritalStatus": "married", "spouseAge": 55 }).to_string(),
        }),
        family: Some(RawSection {
            data: json!({ "children": [{ "name": "M", "isMinor": true }] }).to_string(),
        }),
        assets: Some(RawSection {
            data: json!({
                "estimatedTotalValue": "5m_plus",
                "hasBusinessInterests": "yes",
                "retirementAccounts": [{ "kind": "401k" }]
            })
            .to_string(),
        }),
        existing_documents: Some(RawSection {
            data: json!({ "hasWill": "yes", "hasPOAFinancial": true }).to_string(),
        }),
        ..Default::default()
    }
}

#[tokio::test]
async fn full_pipeline_with_realistic_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let sandbox = Arc::new(
        StubSandbox::succeeding()
            .script(
                RunId::StateLawResearch,
                StubOutcome::Artifact(json!({
                    "state": "Oregon",
                    "estateTax": { "threshold": 1000000, "rates": [], "hasCliffEffect": false }
                })),
            )
            .script(
                RunId::ClientContextAnalysis,
                StubOutcome::Artifact(json!({
                    "riskProfile": "high",
                    "keyInsight": "minor child with no guardianship designation"
                })),
            )
            .script(
                RunId::TaxOptimization,
                StubOutcome::Artifact(json!({
                    "currentExposure": { "federal": 900000, "state": 150000, "combined": 1050000 },
                    "strategies": [
                        { "name": "credit shelter trust", "type": "conservative" }
                    ],
                    "totalPotentialSavings": 650000
                })),
            )
            .script(
                RunId::FamilyProtection,
                StubOutcome::Artifact(json!({
                    "gaps": ["no named guardian"],
                    "recommendations": [
                        { "priority": 1, "action": "name a guardian" }
                    ]
                })),
            ),
    );

    let pipeline = Pipeline::new(config_in(&dir), sandbox);
    let report = pipeline.run(&wealthy_intake()).await.unwrap();

    assert_eq!(report.status, OverallStatus::Completed);
    assert_eq!(report.runs.len(), 13);

    // Aggregation sees the scripted phase-2 content.
    assert_eq!(report.aggregated.tax_strategies.len(), 1);
    assert_eq!(report.aggregated.financial_exposure.estate_tax, 1_050_000.0);
    // 100 - 10 (savings > 500k) - 5 (one family gap) = 85.
    assert_eq!(report.aggregated.aggregate_score, 85);

    // Final score blends phase 1 (high risk: 100-15=85) with the aggregate:
    // round(0.4*85 + 0.6*85) = 85.
    assert_eq!(report.final_score, 85);

    // The frozen phase-1 structure carries the real artifact.
    assert_eq!(report.phase1.state_research_view().state, "Oregon");
}

#[tokio::test]
async fn partial_pipeline_still_yields_complete_downstream_views() {
    let dir = tempfile::tempdir().unwrap();
    // Phase-1 run fails permanently; phase 3 run fails permanently.
    let sandbox = Arc::new(
        StubSandbox::succeeding()
            .always_failing(RunId::ClientContextAnalysis, 2)
            .always_failing(RunId::FinalReport, 2),
    );

    let pipeline = Pipeline::new(config_in(&dir), sandbox);
    let report = pipeline.run(&wealthy_intake()).await.unwrap();

    assert_eq!(report.status, OverallStatus::Partial);
    assert_eq!(
        report.failed_runs(),
        vec![RunId::ClientContextAnalysis, RunId::FinalReport]
    );

    // The fallback context is shape-safe and flows into later phases.
    assert_eq!(report.phase1.client_context_view().risk_profile, "unknown");
    assert_eq!(report.final_report["overallScore"]["grade"], "F");

    // Unknown risk profile means no phase-1 deduction; aggregate is clean.
    assert_eq!(report.final_score, 100);
}

#[tokio::test]
async fn applicability_is_driven_by_derived_context() {
    let raw = wealthy_intake();
    let parsed = parse_intake(&raw);
    let context = derive_context(&parsed);

    assert_eq!(context.estimated_value, 7_500_000.0);
    assert!(context.has_minor_children);
    assert!(context.has_business_interests);

    let runs = applicable_runs(Phase::Analysis, &context);
    assert_eq!(runs.len(), 7, "wealthy client gets every analysis run");

    let dir = tempfile::tempdir().unwrap();
    let sandbox = Arc::new(StubSandbox::succeeding());
    let pipeline = Pipeline::new(config_in(&dir), sandbox.clone());
    pipeline.run(&raw).await.unwrap();

    // Phase 2 calls match the applicability filter exactly.
    for run in Phase::Analysis.runs() {
        assert_eq!(sandbox.call_count(*run), 1, "{run}");
    }
}

#[tokio::test]
async fn artifacts_land_in_the_configured_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(&dir);
    let output_dir = config.sandbox.output_dir().to_string();

    let sandbox = Arc::new(StubSandbox::succeeding());
    let pipeline = Pipeline::new(config, sandbox);
    pipeline.run(&wealthy_intake()).await.unwrap();

    for run in [
        RunId::StateLawResearch,
        RunId::TaxOptimization,
        RunId::FinalReport,
    ] {
        let path = std::path::Path::new(&output_dir).join(run.spec().output_artifact);
        assert!(path.is_file(), "missing artifact for {run}");
        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert!(value.is_object());
    }
}
