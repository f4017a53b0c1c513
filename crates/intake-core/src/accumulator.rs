use super::schema::find_field;
use super::schema::step_schema;
use super::schema::FieldKind;
use super::state::is_blank_field;
use super::state::FieldValue;
use super::state::WizardData;
use super::state::WizardSession;
use super::state::WizardStep;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputRejection {
    UnknownField(String),
    NotAnOption { field: String, value: String },
}

/// Writes a user edit into the form. Choice fields only take their options;
/// a single value typed into a checkbox group is stored as a one-item list.
pub fn apply_input(
    session: &mut WizardSession,
    name: &str,
    value: FieldValue,
) -> Result<(), InputRejection> {
    let Some((_, spec)) = find_field(name) else {
        return Err(InputRejection::UnknownField(name.to_string()));
    };
    let value = match value {
        FieldValue::Scalar(text) if spec.kind.is_list() => {
            if text.trim().is_empty() {
                FieldValue::List(Vec::new())
            } else {
                FieldValue::List(vec![text])
            }
        }
        other => other,
    };
    let rejected = match &value {
        FieldValue::Scalar(text) if matches!(spec.kind, FieldKind::Select(_)) && !text.is_empty() => {
            (!spec.kind.accepts(text)).then(|| text.clone())
        }
        FieldValue::List(values) if spec.kind.is_list() => values
            .iter()
            .find(|value| !spec.kind.accepts(value))
            .cloned(),
        _ => None,
    };
    if let Some(value) = rejected {
        return Err(InputRejection::NotAnOption {
            field: name.to_string(),
            value,
        });
    }
    session.form.insert(name.to_string(), value);
    Ok(())
}

/// Flips one checkbox of a group in the form.
pub fn toggle_option(
    session: &mut WizardSession,
    name: &str,
    option: &str,
) -> Result<(), InputRejection> {
    let Some((_, spec)) = find_field(name) else {
        return Err(InputRejection::UnknownField(name.to_string()));
    };
    if !spec.kind.is_list() || !spec.kind.accepts(option) {
        return Err(InputRejection::NotAnOption {
            field: name.to_string(),
            value: option.to_string(),
        });
    }
    let mut selected = match session.form.remove(name) {
        Some(FieldValue::List(values)) => values,
        Some(FieldValue::Scalar(value)) if !value.trim().is_empty() => vec![value],
        _ => Vec::new(),
    };
    if let Some(idx) = selected.iter().position(|value| value == option) {
        selected.remove(idx);
    } else {
        selected.push(option.to_string());
    }
    session.form.insert(name.to_string(), FieldValue::List(selected));
    Ok(())
}

/// Merges the inputs rendered for `step` into the collected data.
///
/// Last write wins per key; keys belonging to other steps are untouched.
pub fn collect(session: &mut WizardSession, step: WizardStep) {
    for spec in step_schema(step).fields {
        let Some(raw) = session.form.get(spec.name) else {
            continue;
        };
        let value = coerce(spec.kind, raw);
        session.data.insert(spec.name.to_string(), value);
    }
}

/// Additive-only merge: writes `value` only when neither the form nor the
/// collected data already holds something for `name`.
pub fn merge_if_empty(session: &mut WizardSession, name: &str, value: FieldValue) -> bool {
    if !is_blank_field(&session.form, name) || !is_blank_field(&session.data, name) {
        return false;
    }
    session.form.insert(name.to_string(), value.clone());
    session.data.insert(name.to_string(), value);
    true
}

/// Repopulates the form from collected data, e.g. after a resume.
pub fn seed_form_from_data(session: &mut WizardSession) {
    for (name, value) in &session.data {
        session
            .form
            .entry(name.clone())
            .or_insert_with(|| value.clone());
    }
}

pub fn get_all(session: &WizardSession) -> WizardData {
    session.data.clone()
}

pub(crate) fn coerce(kind: FieldKind, raw: &FieldValue) -> FieldValue {
    match (kind, raw) {
        (FieldKind::CheckboxGroup(options), FieldValue::List(values)) => {
            FieldValue::List(in_option_order(options, values.iter().map(String::as_str)))
        }
        (FieldKind::CheckboxGroup(options), FieldValue::Scalar(value)) => {
            FieldValue::List(in_option_order(options, std::iter::once(value.as_str())))
        }
        (_, FieldValue::List(values)) => {
            FieldValue::Scalar(values.first().cloned().unwrap_or_default())
        }
        (_, FieldValue::Scalar(value)) => FieldValue::Scalar(value.clone()),
    }
}

fn in_option_order<'a>(
    options: &[&str],
    selected: impl Iterator<Item = &'a str> + Clone,
) -> Vec<String> {
    options
        .iter()
        .filter(|option| selected.clone().any(|value| value == **option))
        .map(|option| option.to_string())
        .collect()
}
