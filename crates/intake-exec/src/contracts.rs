use std::collections::BTreeMap;

use intake_core::AnalysisRequest;
use intake_core::AnalysisResponse;
use intake_core::DemoHandoff;
use intake_core::DemoScenario;
use intake_core::Persona;
use intake_core::WizardData;
use serde::Deserialize;
use serde::Serialize;

/// Body of `GET /api/demo-scenarios`: persona id to scenario records.
///
/// Keys are kept as raw strings so a catalog carrying personas this client
/// does not know still decodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioCatalog(pub BTreeMap<String, Vec<DemoScenario>>);

impl ScenarioCatalog {
    pub fn scenarios(&self, persona: Persona) -> &[DemoScenario] {
        self.0
            .get(persona.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Case-insensitive lookup by scenario name.
    pub fn find(&self, persona: Persona, name: &str) -> Option<&DemoScenario> {
        let wanted = name.trim();
        self.scenarios(persona).iter().find(|scenario| {
            scenario
                .name
                .as_deref()
                .is_some_and(|candidate| candidate.eq_ignore_ascii_case(wanted))
        })
    }

    pub fn handoff(&self, persona: Persona, name: &str) -> Option<DemoHandoff> {
        self.find(persona, name).map(|scenario| DemoHandoff {
            persona,
            scenario: scenario.clone(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }
}

/// Body of `POST /api/generate-report`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub analysis_data: AnalysisResponse,
    pub company_name: String,
    pub persona: Persona,
    pub wizard_data: WizardData,
}

impl ReportRequest {
    pub fn new(request: &AnalysisRequest, response: &AnalysisResponse) -> Self {
        Self {
            analysis_data: response.clone(),
            company_name: request.company_name().unwrap_or("Company").to_string(),
            persona: request.persona,
            wizard_data: request.fields.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn catalog() -> ScenarioCatalog {
        serde_json::from_value(json!({
            "entrepreneur": [
                { "name": "TechStart Pro", "type": "startup", "industry": "B2B SaaS",
                  "ai_system": "Lead scoring", "risk_score": 42 }
            ],
            "investor": [ { "name": "Unknown persona" } ]
        }))
        .expect("catalog")
    }

    #[test]
    fn lookup_ignores_case_and_unknown_personas() {
        let catalog = catalog();
        let scenario = catalog
            .find(Persona::Entrepreneur, "techstart pro")
            .expect("scenario");
        assert_eq!(scenario.industry.as_deref(), Some("B2B SaaS"));
        assert_eq!(scenario.highlights.get("risk_score"), Some(&json!(42)));
        assert!(catalog.scenarios(Persona::Seller).is_empty());
    }

    #[test]
    fn handoff_carries_the_picked_persona() {
        let handoff = catalog()
            .handoff(Persona::Entrepreneur, "TechStart Pro")
            .expect("handoff");
        assert_eq!(handoff.persona, Persona::Entrepreneur);
        assert_eq!(handoff.scenario.display_name(), "TechStart Pro");
    }
}
