use intake_core::schema::FieldKind;
use intake_core::schema::FieldSpec;
use intake_core::FieldValue;
use intake_core::Persona;
use intake_core::ResultView;
use intake_core::SubmissionError;
use intake_core::WizardSession;
use intake_core::PROGRESS_STAGES;
use intake_exec::FrameObserver;
use intake_exec::ScenarioCatalog;

/// Line typed at a prompt, after the wizard-level commands are peeled off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Value(String),
    Keep,
    Back,
    Restart,
    Quit,
}

pub fn parse_answer(line: &str) -> Answer {
    match line.trim() {
        "" => Answer::Keep,
        ":back" | ":b" => Answer::Back,
        ":restart" => Answer::Restart,
        ":quit" | ":q" => Answer::Quit,
        other => Answer::Value(other.to_string()),
    }
}

pub fn print_header(session: &WizardSession) {
    println!();
    println!(
        "== Step {}/{}: {} ==",
        session.step_number(),
        session.total_steps(),
        session.current_step.label()
    );
    if let Some(scenario) = &session.demo_scenario {
        println!("(demo: {})", scenario.display_name());
    }
    if !session.missing_fields.is_empty() {
        println!("Please complete: {}", session.missing_fields.join(", "));
    }
}

pub fn persona_prompt() -> String {
    let choices = Persona::ALL
        .iter()
        .enumerate()
        .map(|(idx, persona)| format!("{}) {}", idx + 1, persona.label()))
        .collect::<Vec<_>>()
        .join("  ");
    format!("Who are you? {choices}")
}

pub fn parse_persona(raw: &str) -> Option<Persona> {
    match raw.trim().parse::<usize>() {
        Ok(idx) if (1..=Persona::ALL.len()).contains(&idx) => Some(Persona::ALL[idx - 1]),
        _ => Persona::parse(raw),
    }
}

pub fn field_prompt(spec: &FieldSpec, current: Option<&FieldValue>) -> String {
    let marker = if spec.required { "*" } else { "" };
    let mut prompt = format!("{}{marker}", spec.label);
    match spec.kind {
        FieldKind::Select(options) => {
            prompt.push_str(&format!(" [{}]", numbered(options)));
        }
        FieldKind::CheckboxGroup(options) => {
            prompt.push_str(&format!(" (comma separated) [{}]", numbered(options)));
        }
        FieldKind::Text | FieldKind::TextArea => {}
    }
    if let Some(current) = current.filter(|value| !value.is_blank()) {
        prompt.push_str(&format!(" <{}>", current.display()));
    }
    prompt
}

fn numbered(options: &[&str]) -> String {
    options
        .iter()
        .enumerate()
        .map(|(idx, option)| format!("{}={option}", idx + 1))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Accepts option names or their 1-based numbers. Unknown entries are kept
/// verbatim so the wizard can reject them.
pub fn field_value(spec: &FieldSpec, raw: &str) -> FieldValue {
    let resolve = |token: &str| -> String {
        let token = token.trim();
        match token.parse::<usize>() {
            Ok(idx) if idx >= 1 && idx <= spec.kind.options().len() => {
                spec.kind.options()[idx - 1].to_string()
            }
            _ => token.to_lowercase(),
        }
    };
    match spec.kind {
        FieldKind::Select(_) => FieldValue::scalar(resolve(raw)),
        FieldKind::CheckboxGroup(_) => FieldValue::List(
            raw.split(',')
                .filter(|token| !token.trim().is_empty())
                .map(resolve)
                .collect(),
        ),
        FieldKind::Text | FieldKind::TextArea => FieldValue::scalar(raw.trim()),
    }
}

pub fn print_failure(error: &SubmissionError) {
    println!();
    println!("Analysis failed: {error}");
    if error.is_transient() {
        println!("Your answers are saved. Check your connection and retry.");
    }
}

pub fn print_results(view: &ResultView) {
    println!();
    println!("== {} ==", view.template.title);
    println!("Risk level:       {} ({})", view.risk_level, view.status_color);
    println!("Risk score:       {}", view.risk_score);
    println!("Compliance score: {}", view.compliance_score);
    if !view.insights.is_empty() {
        println!();
        println!("{}", view.template.insights_heading);
        for row in &view.insights {
            println!("  {}: {}", row.label, row.value);
        }
    }
    if !view.executive_summary.is_empty() {
        println!();
        println!("{}", view.executive_summary);
    }
    println!();
    println!("{}", view.template.call_to_action);
}

pub fn print_catalog(catalog: &ScenarioCatalog, only: Option<Persona>) {
    for persona in Persona::ALL {
        if only.is_some_and(|wanted| wanted != persona) {
            continue;
        }
        let scenarios = catalog.scenarios(persona);
        if scenarios.is_empty() {
            continue;
        }
        println!("{}:", persona.label());
        for scenario in scenarios {
            println!(
                "  {:<20} {:<14} {}",
                scenario.display_name(),
                scenario.industry.as_deref().unwrap_or("-"),
                scenario.ai_system.as_deref().unwrap_or("-"),
            );
        }
    }
}

/// Prints each progress stage once as the analysis runs.
pub fn progress_observer() -> FrameObserver {
    let mut printed = 0;
    Box::new(move |session: &WizardSession| {
        let Some(progress) = session.progress else {
            printed = 0;
            return;
        };
        while printed < progress.stage {
            printed += 1;
            println!(
                "  [{printed}/{}] {}",
                progress.total,
                PROGRESS_STAGES[printed - 1]
            );
        }
    })
}
