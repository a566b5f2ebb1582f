//! Intake parsing and client-context derivation.
//!
//! Intake documents arrive as a state of residence plus per-section JSON
//! blobs (personal, family, assets, existing documents, goals) and a list of
//! beneficiary designations. Sections are parsed tolerantly: a malformed
//! blob degrades to an empty object with a warning rather than failing the
//! whole orchestration.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One beneficiary designation row from intake.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BeneficiaryDesignation {
    pub asset_type: String,
    pub asset_name: String,
    pub institution: Option<String>,
    pub estimated_value: Option<String>,
    pub primary_beneficiary_name: String,
    pub primary_beneficiary_relationship: Option<String>,
    pub primary_beneficiary_percentage: Option<f64>,
    pub contingent_beneficiary_name: Option<String>,
    pub contingent_beneficiary_relationship: Option<String>,
    pub contingent_beneficiary_percentage: Option<f64>,
    pub last_reviewed_date: Option<String>,
    pub notes: Option<String>,
}

/// A raw intake section: the section payload serialized as a JSON string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSection {
    pub data: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EstatePlanSection {
    pub state_of_residence: Option<String>,
}

/// The intake document as submitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawIntake {
    pub estate_plan: EstatePlanSection,
    pub personal: Option<RawSection>,
    pub family: Option<RawSection>,
    pub assets: Option<RawSection>,
    pub existing_documents: Option<RawSection>,
    pub goals: Option<RawSection>,
    pub beneficiary_designations: Vec<BeneficiaryDesignation>,
}

/// Intake after tolerant per-section parsing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedIntake {
    pub state: String,
    pub personal: Value,
    pub family: Value,
    pub assets: Value,
    pub existing_docs: Value,
    pub goals: Value,
    pub beneficiaries: Vec<BeneficiaryDesignation>,
}

/// Scalar facts derived from intake, consumed by the applicability filter
/// and prompt builders. Computed once per orchestration and immutable after.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientContext {
    pub has_will: bool,
    pub has_trust: bool,
    pub has_poa_financial: bool,
    pub has_poa_healthcare: bool,
    pub has_healthcare_directive: bool,
    pub has_minor_children: bool,
    pub estimated_value: f64,
    pub is_married: bool,
    pub age: u32,
    pub spouse_age: u32,
    pub number_of_children: u32,
    pub has_business_interests: bool,
    pub has_real_estate: bool,
    pub has_retirement_accounts: bool,
}

impl ClientContext {
    /// True when any of the five existing-document flags is set.
    #[must_use]
    pub const fn has_any_existing_document(&self) -> bool {
        self.has_will
            || self.has_trust
            || self.has_poa_financial
            || self.has_poa_healthcare
            || self.has_healthcare_directive
    }
}

/// Parse one raw section, degrading to an empty object on malformed JSON.
fn parse_section(name: &str, section: Option<&RawSection>) -> Value {
    let Some(section) = section else {
        return Value::Object(Default::default());
    };
    if section.data.trim().is_empty() {
        return Value::Object(Default::default());
    }
    match serde_json::from_str(&section.data) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(section = %name, error = %e, "Malformed intake section; treating as empty");
            Value::Object(Default::default())
        }
    }
}

/// Parse the raw intake document into structured sections.
#[must_use]
pub fn parse_intake(raw: &RawIntake) -> ParsedIntake {
    ParsedIntake {
        state: raw
            .estate_plan
            .state_of_residence
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        personal: parse_section("personal", raw.personal.as_ref()),
        family: parse_section("family", raw.family.as_ref()),
        assets: parse_section("assets", raw.assets.as_ref()),
        existing_docs: parse_section("existing_documents", raw.existing_documents.as_ref()),
        goals: parse_section("goals", raw.goals.as_ref()),
        beneficiaries: raw.beneficiary_designations.clone(),
    }
}

/// Normalize yes/no/true/false/1-style values to a boolean.
fn to_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => {
            let lower = s.to_lowercase();
            lower == "yes" || lower == "true" || lower == "1"
        }
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

fn non_empty_array(value: Option<&Value>) -> bool {
    value.and_then(Value::as_array).is_some_and(|a| !a.is_empty())
}

/// Map the intake's estimated-value field to a number.
///
/// Accepts either a number, one of the fixed bracket codes, or a free-form
/// string from which digits are extracted.
fn estimated_value_of(assets: &Value) -> f64 {
    let raw = assets
        .get("estimatedTotalValue")
        .or_else(|| assets.get("totalEstateValue"));

    match raw {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => match s.as_str() {
            "under_100k" => 50_000.0,
            "100k_500k" => 300_000.0,
            "500k_1m" => 750_000.0,
            "1m_2m" => 1_500_000.0,
            "2m_5m" => 3_500_000.0,
            "5m_plus" => 7_500_000.0,
            other => {
                let digits: String = other.chars().filter(char::is_ascii_digit).collect();
                digits.parse().unwrap_or(0.0)
            }
        },
        _ => 0.0,
    }
}

/// Derive the client context from parsed intake.
#[must_use]
pub fn derive_context(parsed: &ParsedIntake) -> ClientContext {
    let docs = &parsed.existing_docs;
    let family = &parsed.family;
    let assets = &parsed.assets;
    let personal = &parsed.personal;

    let children: Vec<&Value> = family
        .get("children")
        .and_then(Value::as_array)
        .map(|a| a.iter().collect())
        .unwrap_or_default();
    let has_minor_children = children
        .iter()
        .any(|c| to_bool(c.get("isMinor")));

    let age = personal
        .get("age")
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;
    let spouse_age = personal
        .get("spouseAge")
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;
    let is_married = personal
        .get("maritalStatus")
        .and_then(Value::as_str)
        .is_some_and(|s| s == "married");

    ClientContext {
        has_will: to_bool(docs.get("hasWill")),
        has_trust: to_bool(docs.get("hasTrust")),
        has_poa_financial: to_bool(docs.get("hasPOAFinancial")),
        has_poa_healthcare: to_bool(docs.get("hasPOAHealthcare")),
        has_healthcare_directive: to_bool(docs.get("hasHealthcareDirective")),
        has_minor_children,
        estimated_value: estimated_value_of(assets),
        is_married,
        age,
        spouse_age,
        number_of_children: children.len() as u32,
        has_business_interests: to_bool(assets.get("hasBusinessInterests"))
            || to_bool(assets.get("ownsBusinessInterest")),
        has_real_estate: to_bool(assets.get("hasRealEstate"))
            || non_empty_array(assets.get("realEstateProperties")),
        has_retirement_accounts: to_bool(assets.get("hasRetirementAccounts"))
            || non_empty_array(assets.get("retirementAccounts")),
    }
}
