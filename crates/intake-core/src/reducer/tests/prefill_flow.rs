use super::*;
use pretty_assertions::assert_eq;

fn enter_demo(state: &mut WizardSession, resumed: PersistedWizard) -> Vec<WizardEffect> {
    run_runtime(
        state,
        RuntimeAction::Enter {
            params: demo_params(),
            resumed,
            handoff: Some(techstart_handoff()),
        },
    )
}

#[test]
fn demo_entry_selects_persona_and_schedules_one_auto_advance() {
    let mut state = state();
    let effects = enter_demo(&mut state, PersistedWizard::empty());

    assert_eq!(state.persona, Some(Persona::Entrepreneur));
    assert_eq!(state.current_step, WizardStep::Persona);
    assert_eq!(
        effects,
        vec![
            WizardEffect::ScheduleAutoAdvance { epoch: 0 },
            WizardEffect::RequestFrame,
        ]
    );
    assert_eq!(
        state.demo_scenario.as_ref().and_then(|s| s.name.as_deref()),
        Some("TechStart Pro")
    );
}

#[test]
fn auto_advance_lands_on_company_step_with_prefilled_fields() {
    let mut state = state();
    enter_demo(&mut state, PersistedWizard::empty());

    let effects = run_runtime(&mut state, RuntimeAction::AutoAdvance { epoch: 0 });

    assert_eq!(state.current_step, WizardStep::CompanyDetails);
    assert!(!effects
        .iter()
        .any(|effect| matches!(effect, WizardEffect::ScheduleAutoAdvance { .. })));
    assert_eq!(
        state.form.get("company_name"),
        Some(&FieldValue::scalar("TechStart Pro"))
    );
    assert_eq!(
        state.form.get("industry"),
        Some(&FieldValue::scalar("b2b saas"))
    );

    // A duplicate firing is a no-op once the wizard has moved on.
    assert!(run_runtime(&mut state, RuntimeAction::AutoAdvance { epoch: 0 }).is_empty());
    assert_eq!(state.current_step, WizardStep::CompanyDetails);
}

#[test]
fn typed_values_survive_the_prefill() {
    let mut snapshot = PersistedWizard::empty();
    snapshot
        .data
        .insert("persona".to_string(), FieldValue::scalar("entrepreneur"));
    snapshot
        .data
        .insert("company_name".to_string(), FieldValue::scalar("Typed By Hand"));

    let mut state = state();
    enter_demo(&mut state, snapshot);
    run_runtime(&mut state, RuntimeAction::AutoAdvance { epoch: 0 });

    assert_eq!(state.current_step, WizardStep::CompanyDetails);
    assert_eq!(
        state.form.get("company_name"),
        Some(&FieldValue::scalar("Typed By Hand"))
    );
    assert_eq!(
        state.form.get("industry"),
        Some(&FieldValue::scalar("b2b saas"))
    );
}

#[test]
fn ai_description_prefills_when_reaching_step_three() {
    let mut state = state();
    enter_demo(&mut state, PersistedWizard::empty());
    run_runtime(&mut state, RuntimeAction::AutoAdvance { epoch: 0 });
    set_field(&mut state, "company_size", "11-50");
    toggle(&mut state, "target_markets", "us");
    run_user(&mut state, UserAction::Next);

    assert_eq!(state.current_step, WizardStep::AiSystemDetails);
    assert_eq!(
        state.form.get("ai_description"),
        Some(&FieldValue::scalar("Sales lead scoring with anonymized data"))
    );
    assert!(state.pending_prefill.is_none());
    assert!(state.demo_scenario.is_some());
}

#[test]
fn stepping_back_and_forth_does_not_reapply_over_edits() {
    let mut state = state();
    enter_demo(&mut state, PersistedWizard::empty());
    run_runtime(&mut state, RuntimeAction::AutoAdvance { epoch: 0 });
    set_field(&mut state, "company_name", "Renamed");

    run_user(&mut state, UserAction::Previous);
    run_user(&mut state, UserAction::Next);

    assert_eq!(
        state.form.get("company_name"),
        Some(&FieldValue::scalar("Renamed"))
    );
}

#[test]
fn handoff_without_demo_flag_is_ignored() {
    let mut state = state();
    let effects = run_runtime(
        &mut state,
        RuntimeAction::Enter {
            params: EntryParams::default(),
            resumed: PersistedWizard::empty(),
            handoff: Some(techstart_handoff()),
        },
    );

    assert_eq!(effects, vec![WizardEffect::RequestFrame]);
    assert_eq!(state.persona, None);
    assert!(state.demo_scenario.is_none());
}

#[test]
fn manual_advance_overtakes_the_pending_auto_advance() {
    let mut state = state();
    enter_demo(&mut state, PersistedWizard::empty());

    let effects = run_user(&mut state, UserAction::Next);
    assert_eq!(state.current_step, WizardStep::CompanyDetails);
    assert_eq!(effects.first(), Some(&WizardEffect::CancelDeferred));

    run_user(&mut state, UserAction::Previous);
    assert_eq!(state.current_step, WizardStep::Persona);

    assert!(run_runtime(&mut state, RuntimeAction::AutoAdvance { epoch: 0 }).is_empty());
    assert_eq!(state.current_step, WizardStep::Persona);
}

#[test]
fn mistyped_scenario_field_still_prefills_the_others() {
    let handoff: DemoHandoff = serde_json::from_value(serde_json::json!({
        "persona": "entrepreneur",
        "scenario": { "name": 42, "industry": "B2B SaaS", "ai_system": "Lead scoring" }
    }))
    .expect("handoff");
    let mut state = state();
    let effects = run_runtime(
        &mut state,
        RuntimeAction::Enter {
            params: demo_params(),
            resumed: PersistedWizard::empty(),
            handoff: Some(handoff),
        },
    );
    assert_eq!(effects.first(), Some(&WizardEffect::ScheduleAutoAdvance { epoch: 0 }));

    run_runtime(&mut state, RuntimeAction::AutoAdvance { epoch: 0 });

    assert_eq!(state.current_step, WizardStep::CompanyDetails);
    assert_eq!(state.form.get("company_name"), None);
    assert_eq!(
        state.form.get("industry"),
        Some(&FieldValue::scalar("b2b saas"))
    );
}
