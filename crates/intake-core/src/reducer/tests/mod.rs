use pretty_assertions::assert_eq;

pub(super) use super::reduce;
pub(super) use super::WizardEffect;
pub(super) use crate::actions::RuntimeAction;
pub(super) use crate::actions::UserAction;
pub(super) use crate::actions::WizardAction;
pub(super) use crate::error::SubmissionError;
pub(super) use crate::persistence::PersistedWizard;
pub(super) use crate::state::DemoHandoff;
pub(super) use crate::state::DemoScenario;
pub(super) use crate::state::EntryParams;
pub(super) use crate::state::FieldValue;
pub(super) use crate::state::Persona;
pub(super) use crate::state::SubmissionState;
pub(super) use crate::state::WizardSession;
pub(super) use crate::state::WizardStep;
pub(super) use crate::submission::AnalysisResponse;

mod prefill_flow;

fn state() -> WizardSession {
    WizardSession::new()
}

fn run_user(state: &mut WizardSession, action: UserAction) -> Vec<WizardEffect> {
    reduce(state, WizardAction::User(action))
}

fn run_runtime(state: &mut WizardSession, action: RuntimeAction) -> Vec<WizardEffect> {
    reduce(state, WizardAction::Runtime(action))
}

fn set_field(state: &mut WizardSession, name: &str, value: &str) {
    run_user(
        state,
        UserAction::SetField {
            name: name.to_string(),
            value: FieldValue::scalar(value),
        },
    );
}

fn toggle(state: &mut WizardSession, name: &str, option: &str) {
    run_user(
        state,
        UserAction::ToggleOption {
            name: name.to_string(),
            option: option.to_string(),
        },
    );
}

fn fill_company(state: &mut WizardSession) {
    set_field(state, "company_name", "Acme Robotics");
    set_field(state, "industry", "manufacturing");
    set_field(state, "company_size", "51-200");
    toggle(state, "target_markets", "eu");
}

fn fill_ai_system(state: &mut WizardSession) {
    set_field(state, "ai_description", "Visual inspection of welds");
    toggle(state, "ai_use_cases", "content_generation");
    set_field(state, "deployment_stage", "pilot");
}

/// Drives a fresh session to the AI system step with every required field
/// filled.
fn ready_to_submit() -> WizardSession {
    let mut state = state();
    run_user(&mut state, UserAction::SelectPersona(Persona::Consultant));
    run_user(&mut state, UserAction::Next);
    fill_company(&mut state);
    run_user(&mut state, UserAction::Next);
    fill_ai_system(&mut state);
    assert_eq!(state.current_step, WizardStep::AiSystemDetails);
    state
}

fn submitted_request(effects: &[WizardEffect]) -> Option<(crate::submission::AnalysisRequest, u32)> {
    effects.iter().find_map(|effect| match effect {
        WizardEffect::SubmitAnalysis { request, attempt } => Some((request.clone(), *attempt)),
        _ => None,
    })
}

fn persisted(effects: &[WizardEffect]) -> Option<&PersistedWizard> {
    effects.iter().find_map(|effect| match effect {
        WizardEffect::Persist(snapshot) => Some(snapshot),
        _ => None,
    })
}

fn techstart_handoff() -> DemoHandoff {
    DemoHandoff {
        persona: Persona::Entrepreneur,
        scenario: DemoScenario {
            name: Some("TechStart Pro".to_string()),
            industry: Some("B2B SaaS".to_string()),
            ai_system: Some("Sales lead scoring with anonymized data".to_string()),
            ..DemoScenario::default()
        },
    }
}

fn demo_params() -> EntryParams {
    EntryParams::from_pairs([
        ("persona", "entrepreneur"),
        ("demo", "true"),
        ("scenario", "TechStart Pro"),
    ])
}
