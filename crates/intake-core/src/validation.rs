use super::accumulator::coerce;
use super::schema::step_schema;
use super::state::WizardSession;
use super::state::WizardStep;
use super::state::PERSONA_FIELD;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub valid: bool,
    /// Required field ids left blank, in form order.
    pub missing_fields: Vec<String>,
}

impl ValidationReport {
    fn from_missing(missing_fields: Vec<String>) -> Self {
        Self {
            valid: missing_fields.is_empty(),
            missing_fields,
        }
    }
}

/// Completeness check for the inputs currently on screen for `step`.
pub fn check(session: &WizardSession, step: WizardStep) -> ValidationReport {
    match step {
        WizardStep::Persona => {
            let missing = if session.persona.is_some() {
                Vec::new()
            } else {
                vec![PERSONA_FIELD.to_string()]
            };
            ValidationReport::from_missing(missing)
        }
        WizardStep::CompanyDetails | WizardStep::AiSystemDetails => {
            let missing = step_schema(step)
                .required_fields()
                .filter(|field| {
                    session
                        .form
                        .get(field.name)
                        .map_or(true, |raw| coerce(field.kind, raw).is_blank())
                })
                .map(|field| field.name.to_string())
                .collect();
            ValidationReport::from_missing(missing)
        }
        WizardStep::Results => ValidationReport::from_missing(Vec::new()),
    }
}
