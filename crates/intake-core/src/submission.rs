use serde::Deserialize;
use serde::Serialize;

use super::state::Persona;
use super::state::WizardData;
use super::state::WizardSession;
use super::state::PERSONA_FIELD;

pub const PROGRESS_STAGES: [&str; 4] = [
    "Analyzing company profile",
    "Evaluating AI system risk",
    "Mapping regulatory obligations",
    "Preparing persona insights",
];

/// Keys owned by the request envelope; collected data never overrides them.
const RESERVED_KEYS: [&str; 3] = [PERSONA_FIELD, "use_demo", "demo_type"];

/// Body of `POST /api/analyze`: the collected fields flattened next to the
/// persona and demo flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    #[serde(flatten)]
    pub fields: WizardData,
    pub persona: Persona,
    pub use_demo: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demo_type: Option<Persona>,
}

impl AnalysisRequest {
    /// Returns `None` when no persona has been chosen yet.
    pub fn build(session: &WizardSession) -> Option<Self> {
        let persona = session.persona?;
        let use_demo = session.use_demo();
        let fields = session
            .data
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Some(Self {
            fields,
            persona,
            use_demo,
            demo_type: use_demo.then_some(persona),
        })
    }

    pub fn company_name(&self) -> Option<&str> {
        self.fields
            .get("company_name")
            .and_then(|value| value.as_scalar())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    #[serde(default)]
    pub risk_score: Option<f64>,
    #[serde(default)]
    pub compliance_score: Option<f64>,
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default)]
    pub status_color: Option<String>,
}

/// Body returned by `POST /api/analyze`. Every section is optional so a
/// partial response still renders with placeholders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    #[serde(default)]
    pub risk_assessment: Option<RiskAssessment>,
    #[serde(default)]
    pub persona_insights: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub executive_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demo_data: Option<serde_json::Value>,
}
