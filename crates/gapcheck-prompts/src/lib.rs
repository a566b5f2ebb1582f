//! Per-run prompt builders.
//!
//! Pure templating: each builder turns the run identifier plus accumulated
//! prior-phase results into an instruction string. Every prompt leads with
//! the artifact directive (the contract with the extractor's primary read
//! path), embeds its context as serialized JSON, and sketches the expected
//! top-level keys of the output object.

use serde_json::Value;
use thiserror::Error;

use gapcheck_aggregate::AggregatedPhase2;
use gapcheck_intake::{ClientContext, ParsedIntake};
use gapcheck_registry::{Phase, RunId};
use gapcheck_results::{Phase1Results, Phase2Results};

/// Prompt construction failure: a later-phase run was requested without its
/// prerequisite results. The engine supplies these by construction, so this
/// surfaces only on misuse.
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("run '{run}' requires {needs}")]
    MissingContext { run: RunId, needs: &'static str },
}

/// Everything a prompt builder may draw on.
///
/// Phase-1 builders use only intake and client context; Phase-2 builders
/// additionally require the frozen Phase-1 structure; Phase-3 builders
/// require the Phase-2 projection and aggregate, and the later two runs
/// receive the scenario-modeling output threaded through `scenario`.
#[derive(Clone, Copy)]
pub struct PromptInputs<'a> {
    pub intake: &'a ParsedIntake,
    pub context: &'a ClientContext,
    pub phase1: Option<&'a Phase1Results>,
    pub phase2: Option<&'a Phase2Results>,
    pub aggregated: Option<&'a AggregatedPhase2>,
    pub scenario: Option<&'a Value>,
}

impl<'a> PromptInputs<'a> {
    /// Inputs for a Phase-1 run.
    #[must_use]
    pub fn phase1(intake: &'a ParsedIntake, context: &'a ClientContext) -> Self {
        Self {
            intake,
            context,
            phase1: None,
            phase2: None,
            aggregated: None,
            scenario: None,
        }
    }

    fn require_phase1(&self, run: RunId) -> Result<&'a Phase1Results, PromptError> {
        self.phase1.ok_or(PromptError::MissingContext {
            run,
            needs: "phase 1 results",
        })
    }

    fn require_phase2(
        &self,
        run: RunId,
    ) -> Result<(&'a Phase2Results, &'a AggregatedPhase2), PromptError> {
        let phase2 = self.phase2.ok_or(PromptError::MissingContext {
            run,
            needs: "phase 2 results",
        })?;
        let aggregated = self.aggregated.ok_or(PromptError::MissingContext {
            run,
            needs: "aggregated phase 2 results",
        })?;
        Ok((phase2, aggregated))
    }
}

fn pretty(value: &impl serde::Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

fn artifact_directive(run: RunId) -> String {
    format!(
        "IMPORTANT: Your task is to create a JSON file. Use your Write tool to \
         create the file {} in the current directory.",
        run.spec().output_artifact
    )
}

/// Build the prompt for a run.
///
/// # Errors
/// Returns [`PromptError::MissingContext`] when a later-phase run is
/// requested without its prerequisite inputs.
pub fn build(run: RunId, inputs: &PromptInputs<'_>) -> Result<String, PromptError> {
    match run.phase() {
        Phase::Research => Ok(build_research(run, inputs)),
        Phase::Analysis => {
            let phase1 = inputs.require_phase1(run)?;
            Ok(build_analysis(run, inputs, phase1))
        }
        Phase::Synthesis => {
            let phase1 = inputs.require_phase1(run)?;
            let (phase2, aggregated) = inputs.require_phase2(run)?;
            Ok(build_synthesis(run, phase1, phase2, aggregated, inputs.scenario))
        }
    }
}

fn build_research(run: RunId, inputs: &PromptInputs<'_>) -> String {
    let directive = artifact_directive(run);
    match run {
        RunId::StateLawResearch => format!(
            "{directive}\n\n\
             You are an estate planning law researcher. Compile the estate, \
             inheritance, and Medicaid rules for the state of {state}, plus \
             execution requirements for wills, trusts, and powers of attorney.\n\n\
             Output object keys: state, estateTax, inheritanceTax, medicaid, \
             willRequirements, trustRequirements, poaRequirements, \
             recentChanges, sources.",
            state = inputs.intake.state,
        ),
        RunId::ClientContextAnalysis => format!(
            "{directive}\n\n\
             You are an estate planning strategist. Identify what makes this \
             client's situation unusual, the worst-case outcomes under the \
             current plan, and immediate red flags.\n\n\
             ## Intake\n{intake}\n\n## Derived Context\n{context}\n\n\
             Output object keys: uniqueFactors, worstCaseScenarios, \
             immediateRedFlags, deeperInsights, keyInsight, riskProfile, \
             complexityScore.",
            intake = pretty(inputs.intake),
            context = pretty(inputs.context),
        ),
        RunId::DocumentInventory => format!(
            "{directive}\n\n\
             You are an estate planning document specialist. Inventory the \
             client's existing documents, identify missing essentials with a \
             priority for each, and flag outdated or conflicting documents.\n\n\
             ## Existing Documents\n{docs}\n\n## Goals\n{goals}\n\n\
             ## Derived Context\n{context}\n\n\
             Output object keys: existingDocuments, missingEssential, \
             outdated, goalAlignment, coordinationIssues.",
            docs = pretty(&inputs.intake.existing_docs),
            goals = pretty(&inputs.intake.goals),
            context = pretty(inputs.context),
        ),
        _ => unreachable!("build_research called with non-research run"),
    }
}

fn build_analysis(run: RunId, inputs: &PromptInputs<'_>, phase1: &Phase1Results) -> String {
    let directive = artifact_directive(run);
    let research = pretty(&phase1.state_research);
    let inventory = pretty(&phase1.document_inventory);
    let client = pretty(&phase1.client_context);

    match run {
        RunId::DocumentCompleteness => format!(
            "{directive}\n\n\
             You are an estate planning compliance expert. Analyze document \
             completeness against state requirements: compliance issues, \
             execution defects, missing provisions, state-specific gaps.\n\n\
             ## State Research\n{research}\n\n## Document Inventory\n{inventory}\n\n\
             ## Client Context\n{client}\n\n\
             Output object keys: complianceIssues, executionDefects, \
             missingProvisions, stateSpecificGaps, estimatedComplianceCost.",
        ),
        RunId::TaxOptimization => format!(
            "{directive}\n\n\
             You are an estate tax strategist. Quantify current federal and \
             state exposure and propose strategies tiered conservative / \
             moderate / advanced, including sunset-provision analysis.\n\n\
             ## State Research\n{research}\n\n## Client Context\n{client}\n\n\
             ## Assets\n{assets}\n\n\
             Output object keys: currentExposure, strategies, sunsetAnalysis, \
             totalPotentialSavings.",
            assets = pretty(&inputs.intake.assets),
        ),
        RunId::MedicaidPlanning => format!(
            "{directive}\n\n\
             You are a Medicaid planning specialist. Assess long-term-care \
             exposure, lookback concerns, and protection strategies.\n\n\
             ## State Research\n{research}\n\n## Client Context\n{client}\n\n\
             Output object keys: riskAssessment, currentExposure, \
             lookbackConcerns, strategies, spousalProtection, \
             assetProtectionOptions.",
        ),
        RunId::BeneficiaryCoordination => format!(
            "{directive}\n\n\
             You are a beneficiary designation auditor. Detect conflicts \
             between designations and testamentary documents, missing and \
             outdated designations.\n\n\
             ## Document Inventory\n{inventory}\n\n## Designations\n{designations}\n\n\
             Output object keys: conflicts, missingDesignations, \
             outdatedDesignations, coordinationIssues, recommendations.",
            designations = pretty(&inputs.intake.beneficiaries),
        ),
        RunId::FamilyProtection => format!(
            "{directive}\n\n\
             You are a family protection analyst. Evaluate minor-children \
             protection, special-needs planning, blended-family issues, and \
             incapacity protection.\n\n\
             ## Client Context\n{client}\n\n## Family\n{family}\n\n\
             ## Document Inventory\n{inventory}\n\n\
             Output object keys: minorChildrenProtection, \
             specialNeedsPlanning, blendedFamilyIssues, incapacityProtection, \
             gaps, recommendations.",
            family = pretty(&inputs.intake.family),
        ),
        RunId::AssetProtection => format!(
            "{directive}\n\n\
             You are an asset protection advisor. Assess vulnerabilities, \
             protection strategies, trust options, and business succession.\n\n\
             ## Client Context\n{client}\n\n## Assets\n{assets}\n\n\
             ## State Research\n{research}\n\n\
             Output object keys: vulnerabilities, protectionStrategies, \
             trustOptions, businessSuccession, recommendations.",
            assets = pretty(&inputs.intake.assets),
        ),
        RunId::ExistingDocumentReview => format!(
            "{directive}\n\n\
             You are an estate document reviewer. Review the existing \
             documents for defects, outdated provisions, ambiguous language, \
             and missing clauses.\n\n\
             ## Document Inventory\n{inventory}\n\n## Client Context\n{client}\n\n\
             Output object keys: documentIssues, outdatedProvisions, \
             ambiguousLanguage, missingClauses, recommendations.",
        ),
        _ => unreachable!("build_analysis called with non-analysis run"),
    }
}

fn build_synthesis(
    run: RunId,
    phase1: &Phase1Results,
    phase2: &Phase2Results,
    aggregated: &AggregatedPhase2,
    scenario: Option<&Value>,
) -> String {
    let directive = artifact_directive(run);
    let phase1_json = pretty(phase1);
    let aggregated_json = pretty(aggregated);

    match run {
        RunId::ScenarioModeling => format!(
            "{directive}\n\n\
             You are an estate planning scenario modeler. Model the concrete \
             scenarios this plan must survive (death, incapacity, \
             simultaneous death, remarriage, creditor claims) with current \
             vs. desired outcomes and fixes.\n\n\
             ## Phase 1 Findings\n{phase1_json}\n\n\
             ## Aggregated Analysis\n{aggregated_json}\n\n\
             Output object keys: scenarios, crossScenarioInsights, \
             mostCriticalScenario, overallPreparedness.",
        ),
        RunId::PriorityMatrix => format!(
            "{directive}\n\n\
             You are an estate planning project manager. Rank every \
             recommended action into a priority matrix with impact, urgency, \
             cost, complexity, and dependencies.\n\n\
             ## Phase 1 Findings\n{phase1_json}\n\n\
             ## Aggregated Analysis\n{aggregated_json}\n\n\
             ## Scenario Modeling\n{scenario}\n\n\
             Output object keys: priorityMatrix, quickWins, criticalPath.",
            scenario = scenario.map(pretty).unwrap_or_else(|| "{}".to_string()),
        ),
        RunId::FinalReport => format!(
            "{directive}\n\n\
             You are the lead estate planning analyst. Synthesize every \
             analysis into the final gap-analysis report with an overall \
             score and grade, executive summary, missing and outdated \
             documents, financial exposure, and ranked recommendations.\n\n\
             ## Phase 1 Findings\n{phase1_json}\n\n\
             ## Phase 2 Analyses\n{phase2_json}\n\n\
             ## Aggregated Analysis\n{aggregated_json}\n\n\
             ## Scenario Modeling\n{scenario}\n\n\
             Output object keys: score, overallScore, executiveSummary, \
             missingDocuments, outdatedDocuments, inconsistencies, \
             financialExposure, taxStrategies, stateSpecificNotes, \
             recommendations, scenarioAnalysis, priorityMatrix, \
             uncertaintyLog, targetStateSummary.",
            phase2_json = pretty(phase2),
            scenario = scenario.map(pretty).unwrap_or_else(|| "{}".to_string()),
        ),
        _ => unreachable!("build_synthesis called with non-synthesis run"),
    }
}
