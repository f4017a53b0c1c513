use serde_json::Value;

use super::state::Persona;
use super::submission::AnalysisResponse;

pub const PLACEHOLDER: &str = "--";
pub const UNKNOWN_RISK_LEVEL: &str = "Unknown";
pub const NEUTRAL_STATUS_COLOR: &str = "neutral";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersonaTemplate {
    pub persona: Persona,
    pub title: &'static str,
    pub insights_heading: &'static str,
    pub call_to_action: &'static str,
}

static PERSONA_TEMPLATES: [PersonaTemplate; 3] = [
    PersonaTemplate {
        persona: Persona::Entrepreneur,
        title: "Your AI Compliance Snapshot",
        insights_heading: "What this means for your startup",
        call_to_action: "Download the investor-ready report",
    },
    PersonaTemplate {
        persona: Persona::Consultant,
        title: "Client Compliance Assessment",
        insights_heading: "Advisory highlights",
        call_to_action: "Download the client report",
    },
    PersonaTemplate {
        persona: Persona::Seller,
        title: "Deal Readiness Assessment",
        insights_heading: "Talking points for your buyer",
        call_to_action: "Download the buyer-facing summary",
    },
];

pub fn persona_template(persona: Persona) -> &'static PersonaTemplate {
    match persona {
        Persona::Entrepreneur => &PERSONA_TEMPLATES[0],
        Persona::Consultant => &PERSONA_TEMPLATES[1],
        Persona::Seller => &PERSONA_TEMPLATES[2],
    }
}

/// Unrecognized or absent persona ids fall back to the entrepreneur template.
pub fn template_for_id(persona: Option<&str>) -> &'static PersonaTemplate {
    let persona = persona
        .and_then(Persona::parse)
        .unwrap_or(Persona::Entrepreneur);
    persona_template(persona)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightRow {
    pub label: String,
    pub value: String,
}

/// Display model for the results step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultView {
    pub template: PersonaTemplate,
    pub risk_score: String,
    pub compliance_score: String,
    pub risk_level: String,
    pub status_color: String,
    pub insights: Vec<InsightRow>,
    pub executive_summary: String,
}

pub fn present(response: &AnalysisResponse, persona: Option<&str>) -> ResultView {
    let risk = response.risk_assessment.clone().unwrap_or_default();
    ResultView {
        template: *template_for_id(persona),
        risk_score: format_score(risk.risk_score),
        compliance_score: format_score(risk.compliance_score),
        risk_level: non_blank(risk.risk_level).unwrap_or_else(|| UNKNOWN_RISK_LEVEL.to_string()),
        status_color: non_blank(risk.status_color)
            .unwrap_or_else(|| NEUTRAL_STATUS_COLOR.to_string()),
        insights: response
            .persona_insights
            .iter()
            .map(|(key, value)| InsightRow {
                label: humanize(key),
                value: display_value(value),
            })
            .collect(),
        executive_summary: response.executive_summary.clone().unwrap_or_default(),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn format_score(score: Option<f64>) -> String {
    match score {
        Some(score) if score.is_finite() => {
            if score.fract() == 0.0 {
                format!("{score:.0}")
            } else {
                format!("{score:.1}")
            }
        }
        _ => PLACEHOLDER.to_string(),
    }
}

fn humanize(key: &str) -> String {
    key.split(['_', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => PLACEHOLDER.to_string(),
        Value::String(text) => text.clone(),
        Value::Number(number) => number
            .as_f64()
            .map_or_else(|| number.to_string(), |value| format_score(Some(value))),
        Value::Bool(flag) => (if *flag { "Yes" } else { "No" }).to_string(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    }
}
