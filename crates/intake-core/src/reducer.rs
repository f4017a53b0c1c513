use super::accumulator::apply_input;
use super::accumulator::collect;
use super::accumulator::seed_form_from_data;
use super::accumulator::toggle_option;
use super::actions::RuntimeAction;
use super::actions::UserAction;
use super::actions::WizardAction;
use super::error::SubmissionError;
use super::persistence::PersistedWizard;
use super::prefill;
use super::presenter::present;
use super::state::DemoHandoff;
use super::state::EntryParams;
use super::state::Persona;
use super::state::ProgressState;
use super::state::SubmissionState;
use super::state::WizardSession;
use super::state::WizardStep;
use super::state::PERSONA_FIELD;
use super::submission::AnalysisRequest;
use super::submission::AnalysisResponse;
use super::submission::PROGRESS_STAGES;
use super::validation::check;

/// Side work requested by a transition. The reducer itself never performs I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardEffect {
    RequestFrame,
    Persist(PersistedWizard),
    ClearPersisted,
    ScheduleAutoAdvance { epoch: u64 },
    CancelDeferred,
    SubmitAnalysis { request: AnalysisRequest, attempt: u32 },
}

pub fn reduce(state: &mut WizardSession, action: WizardAction) -> Vec<WizardEffect> {
    match action {
        WizardAction::User(user) => reduce_user(state, user),
        WizardAction::Runtime(runtime) => reduce_runtime(state, runtime),
    }
}

fn reduce_user(state: &mut WizardSession, action: UserAction) -> Vec<WizardEffect> {
    if state.is_submitting() && !matches!(action, UserAction::Restart) {
        tracing::debug!(?action, "ignored while analysis is in flight");
        return Vec::new();
    }

    match action {
        UserAction::SelectPersona(persona) => {
            if state.current_step != WizardStep::Persona {
                return Vec::new();
            }
            state.select_persona(persona);
            state.missing_fields.clear();
            vec![WizardEffect::RequestFrame]
        }
        UserAction::SetField { name, value } => {
            if state.is_complete() {
                return Vec::new();
            }
            if let Err(rejection) = apply_input(state, &name, value) {
                tracing::debug!(?rejection, "field input rejected");
                return Vec::new();
            }
            state.missing_fields.retain(|missing| missing != &name);
            vec![WizardEffect::RequestFrame]
        }
        UserAction::ToggleOption { name, option } => {
            if state.is_complete() {
                return Vec::new();
            }
            if let Err(rejection) = toggle_option(state, &name, &option) {
                tracing::debug!(?rejection, "option toggle rejected");
                return Vec::new();
            }
            state.missing_fields.retain(|missing| missing != &name);
            vec![WizardEffect::RequestFrame]
        }
        UserAction::Next => next_step(state),
        UserAction::Previous => previous_step(state),
        UserAction::GoTo(step) => go_to(state, step),
        UserAction::Submit => {
            if state.current_step != WizardStep::AiSystemDetails {
                return Vec::new();
            }
            begin_submission(state)
        }
        UserAction::Retry => retry_submission(state),
        UserAction::Restart => {
            tracing::info!(epoch = state.epoch, "wizard restarted");
            state.reset();
            vec![
                WizardEffect::CancelDeferred,
                WizardEffect::ClearPersisted,
                WizardEffect::RequestFrame,
            ]
        }
    }
}

fn reduce_runtime(state: &mut WizardSession, action: RuntimeAction) -> Vec<WizardEffect> {
    match action {
        RuntimeAction::Enter {
            params,
            resumed,
            handoff,
        } => enter(state, params, resumed, handoff),
        RuntimeAction::AutoAdvance { epoch } => {
            if epoch != state.epoch
                || state.current_step != WizardStep::Persona
                || !state.auto_advance_pending
            {
                tracing::debug!(epoch, current = state.epoch, "stale auto-advance dropped");
                return Vec::new();
            }
            state.auto_advance_pending = false;
            reduce_user(state, UserAction::Next)
        }
        RuntimeAction::AutoSaveTick => {
            if state.data.is_empty() || state.is_complete() {
                return Vec::new();
            }
            vec![WizardEffect::Persist(PersistedWizard::from_session(state))]
        }
        RuntimeAction::ProgressAdvanced { stage } => {
            if !state.is_submitting() {
                return Vec::new();
            }
            let Some(progress) = state.progress.as_mut() else {
                return Vec::new();
            };
            progress.stage = stage.min(progress.total);
            vec![WizardEffect::RequestFrame]
        }
        RuntimeAction::AnalysisCompleted { attempt, response } => {
            complete_submission(state, attempt, response)
        }
        RuntimeAction::AnalysisFailed { attempt, error } => fail_submission(state, attempt, error),
    }
}

fn enter(
    state: &mut WizardSession,
    params: EntryParams,
    resumed: PersistedWizard,
    handoff: Option<DemoHandoff>,
) -> Vec<WizardEffect> {
    if !resumed.is_empty() {
        state.persona = resumed.persona();
        state.current_step = resumed.resume_step();
        state.data = resumed.data;
        seed_form_from_data(state);
        tracing::info!(step = state.step_number(), "resumed saved wizard progress");
    }

    if state.persona.is_none() {
        if let Some(persona) = params.persona {
            state.select_persona(persona);
        }
    }

    match handoff {
        Some(handoff) if params.demo => {
            if state.persona.is_none() {
                state.select_persona(handoff.persona);
            }
            tracing::info!(
                scenario = handoff.scenario.display_name(),
                persona = handoff.persona.as_str(),
                "entered with demo scenario"
            );
            state.demo_scenario = Some(handoff.scenario.clone());
            state.pending_prefill = Some(handoff.scenario);
        }
        Some(_) => tracing::debug!("demo handoff ignored outside demo entry"),
        None if params.demo => tracing::warn!("demo entry without a scenario handoff"),
        None => {}
    }

    state.entry = params;
    let mut effects = prefill_effects(state);
    effects.push(WizardEffect::RequestFrame);
    effects
}

fn next_step(state: &mut WizardSession) -> Vec<WizardEffect> {
    let step = state.current_step;
    match step {
        WizardStep::Results => return Vec::new(),
        WizardStep::AiSystemDetails => return begin_submission(state),
        WizardStep::Persona | WizardStep::CompanyDetails => {}
    }

    let report = check(state, step);
    if !report.valid {
        tracing::debug!(step = step.number(), missing = ?report.missing_fields, "step incomplete");
        state.missing_fields = report.missing_fields;
        return vec![WizardEffect::RequestFrame];
    }

    collect(state, step);
    state.missing_fields.clear();
    state.current_step = step.next();

    let mut effects = Vec::new();
    if step == WizardStep::Persona && std::mem::take(&mut state.auto_advance_pending) {
        effects.push(WizardEffect::CancelDeferred);
    }
    effects.push(WizardEffect::Persist(PersistedWizard::from_session(state)));
    effects.extend(prefill_effects(state));
    effects.push(WizardEffect::RequestFrame);
    effects
}

fn previous_step(state: &mut WizardSession) -> Vec<WizardEffect> {
    match state.current_step {
        WizardStep::Persona | WizardStep::Results => Vec::new(),
        step => {
            state.current_step = step.prev();
            state.missing_fields.clear();
            vec![
                WizardEffect::Persist(PersistedWizard::from_session(state)),
                WizardEffect::RequestFrame,
            ]
        }
    }
}

fn go_to(state: &mut WizardSession, step: WizardStep) -> Vec<WizardEffect> {
    if step == WizardStep::Results || state.is_complete() {
        return Vec::new();
    }
    if step > WizardStep::Persona && state.persona.is_none() {
        tracing::debug!(step = step.number(), "go-to refused without a persona");
        return Vec::new();
    }
    state.current_step = step;
    state.missing_fields.clear();
    seed_form_from_data(state);
    vec![WizardEffect::RequestFrame]
}

fn begin_submission(state: &mut WizardSession) -> Vec<WizardEffect> {
    let step = WizardStep::AiSystemDetails;
    let report = check(state, step);
    if !report.valid {
        state.missing_fields = report.missing_fields;
        return vec![WizardEffect::RequestFrame];
    }

    collect(state, step);
    let Some(request) = AnalysisRequest::build(state) else {
        state.missing_fields = vec![PERSONA_FIELD.to_string()];
        return vec![WizardEffect::RequestFrame];
    };

    state.missing_fields.clear();
    let attempt = state.submission.attempts().saturating_add(1);
    tracing::info!(attempt, use_demo = request.use_demo, "submitting analysis");
    start_attempt(state, request, attempt)
}

fn retry_submission(state: &mut WizardSession) -> Vec<WizardEffect> {
    if state.current_step != WizardStep::AiSystemDetails {
        tracing::debug!(step = state.step_number(), "retry ignored away from the submission step");
        return Vec::new();
    }
    let SubmissionState::Failed { attempt, .. } = state.submission else {
        return Vec::new();
    };
    let Some(request) = state.last_request.clone() else {
        return Vec::new();
    };
    let attempt = attempt.saturating_add(1);
    tracing::info!(attempt, "retrying analysis");
    start_attempt(state, request, attempt)
}

fn start_attempt(
    state: &mut WizardSession,
    request: AnalysisRequest,
    attempt: u32,
) -> Vec<WizardEffect> {
    state.submission = SubmissionState::InFlight { attempt };
    state.last_request = Some(request.clone());
    state.progress = Some(ProgressState {
        stage: 0,
        total: PROGRESS_STAGES.len(),
    });
    state.result = None;
    vec![
        WizardEffect::Persist(PersistedWizard::from_session(state)),
        WizardEffect::SubmitAnalysis { request, attempt },
        WizardEffect::RequestFrame,
    ]
}

fn is_current_attempt(state: &WizardSession, attempt: u32) -> bool {
    matches!(state.submission, SubmissionState::InFlight { attempt: current } if current == attempt)
}

fn complete_submission(
    state: &mut WizardSession,
    attempt: u32,
    response: AnalysisResponse,
) -> Vec<WizardEffect> {
    if !is_current_attempt(state, attempt) {
        tracing::debug!(attempt, "stale analysis result dropped");
        return Vec::new();
    }
    let persona = state.persona.map(Persona::as_str);
    state.result = Some(present(&response, persona));
    state.submission = SubmissionState::Succeeded { attempt };
    state.progress = None;
    state.pending_prefill = None;
    state.current_step = WizardStep::Results;
    tracing::info!(attempt, "analysis completed");
    vec![WizardEffect::ClearPersisted, WizardEffect::RequestFrame]
}

fn fail_submission(
    state: &mut WizardSession,
    attempt: u32,
    error: SubmissionError,
) -> Vec<WizardEffect> {
    if !is_current_attempt(state, attempt) {
        tracing::debug!(attempt, "stale analysis failure dropped");
        return Vec::new();
    }
    tracing::warn!(attempt, kind = error.label(), %error, "analysis failed");
    state.submission = SubmissionState::Failed { attempt, error };
    state.progress = None;
    vec![WizardEffect::RequestFrame]
}

fn prefill_effects(state: &mut WizardSession) -> Vec<WizardEffect> {
    let outcome = prefill::apply(state);
    if outcome.auto_advance {
        state.auto_advance_pending = true;
        vec![WizardEffect::ScheduleAutoAdvance { epoch: state.epoch }]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests;
