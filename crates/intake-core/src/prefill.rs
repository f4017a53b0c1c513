//! Seeds the wizard from a demo scenario.
//!
//! Scenario values are only ever written into empty fields. The pending
//! scenario is dropped once the last step it targets has been seeded, so a
//! later `apply` is a no-op.

use super::accumulator::merge_if_empty;
use super::error::PrefillError;
use super::schema::find_field;
use super::state::DemoScenario;
use super::state::FieldValue;
use super::state::WizardSession;
use super::state::WizardStep;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefillOutcome {
    pub applied: Vec<&'static str>,
    pub skipped: Vec<PrefillError>,
    /// The wizard sits on the persona step with a persona picked for it and
    /// should advance once on its own.
    pub auto_advance: bool,
}

struct Mapping {
    field: &'static str,
    source: &'static str,
    read: fn(&DemoScenario) -> Option<String>,
}

const COMPANY_MAPPINGS: [Mapping; 2] = [
    Mapping {
        field: "company_name",
        source: "name",
        read: scenario_name,
    },
    Mapping {
        field: "industry",
        source: "industry",
        read: scenario_industry,
    },
];

const AI_SYSTEM_MAPPINGS: [Mapping; 1] = [Mapping {
    field: "ai_description",
    source: "ai_system",
    read: scenario_ai_system,
}];

fn scenario_name(scenario: &DemoScenario) -> Option<String> {
    scenario.name.clone()
}

fn scenario_industry(scenario: &DemoScenario) -> Option<String> {
    scenario.industry.as_ref().map(|value| value.to_lowercase())
}

fn scenario_ai_system(scenario: &DemoScenario) -> Option<String> {
    scenario.ai_system.clone()
}

pub fn apply(session: &mut WizardSession) -> PrefillOutcome {
    let mut outcome = PrefillOutcome::default();
    let Some(scenario) = session.pending_prefill.clone() else {
        return outcome;
    };

    match session.current_step {
        WizardStep::Persona => {
            if session.persona.is_some() && !session.auto_advance_scheduled {
                session.auto_advance_scheduled = true;
                outcome.auto_advance = true;
            }
        }
        WizardStep::CompanyDetails => {
            seed(session, &scenario, &COMPANY_MAPPINGS, &mut outcome);
        }
        WizardStep::AiSystemDetails => {
            seed(session, &scenario, &AI_SYSTEM_MAPPINGS, &mut outcome);
            session.pending_prefill = None;
        }
        WizardStep::Results => {
            session.pending_prefill = None;
        }
    }

    if !outcome.applied.is_empty() || !outcome.skipped.is_empty() {
        tracing::debug!(
            step = session.current_step.number(),
            applied = ?outcome.applied,
            skipped = outcome.skipped.len(),
            "demo prefill applied"
        );
    }
    outcome
}

fn seed(
    session: &mut WizardSession,
    scenario: &DemoScenario,
    mappings: &[Mapping],
    outcome: &mut PrefillOutcome,
) {
    for mapping in mappings {
        let value = match (mapping.read)(scenario) {
            Some(value) if !value.trim().is_empty() => value,
            _ => {
                tracing::warn!(field = mapping.field, "scenario field missing, skipped");
                outcome.skipped.push(PrefillError::MissingField(mapping.source));
                continue;
            }
        };
        if let Some((_, spec)) = find_field(mapping.field) {
            if !spec.kind.accepts(&value) {
                tracing::warn!(field = mapping.field, %value, "scenario value not selectable, skipped");
                outcome.skipped.push(PrefillError::UnsupportedValue {
                    field: mapping.field,
                    value,
                });
                continue;
            }
        }
        if merge_if_empty(session, mapping.field, FieldValue::Scalar(value)) {
            outcome.applied.push(mapping.field);
        }
    }
}
