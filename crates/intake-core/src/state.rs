use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;

use super::error::SubmissionError;
use super::presenter::ResultView;
use super::submission::AnalysisRequest;

pub const TOTAL_STEPS: u8 = 4;

/// Data key under which the chosen persona is collected.
pub const PERSONA_FIELD: &str = "persona";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    Entrepreneur,
    Consultant,
    Seller,
}

impl Persona {
    pub const ALL: [Persona; 3] = [Self::Entrepreneur, Self::Consultant, Self::Seller];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Entrepreneur => "entrepreneur",
            Self::Consultant => "consultant",
            Self::Seller => "seller",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Entrepreneur => "Entrepreneur",
            Self::Consultant => "Consultant",
            Self::Seller => "Seller",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "entrepreneur" => Some(Self::Entrepreneur),
            "consultant" => Some(Self::Consultant),
            "seller" => Some(Self::Seller),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WizardStep {
    Persona,
    CompanyDetails,
    AiSystemDetails,
    Results,
}

impl WizardStep {
    pub const ALL: [WizardStep; 4] = [
        Self::Persona,
        Self::CompanyDetails,
        Self::AiSystemDetails,
        Self::Results,
    ];

    pub fn number(self) -> u8 {
        match self {
            Self::Persona => 1,
            Self::CompanyDetails => 2,
            Self::AiSystemDetails => 3,
            Self::Results => 4,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Self::Persona),
            2 => Some(Self::CompanyDetails),
            3 => Some(Self::AiSystemDetails),
            4 => Some(Self::Results),
            _ => None,
        }
    }

    /// Capped at the terminal step.
    pub fn next(self) -> Self {
        match self {
            Self::Persona => Self::CompanyDetails,
            Self::CompanyDetails => Self::AiSystemDetails,
            Self::AiSystemDetails | Self::Results => Self::Results,
        }
    }

    /// Floored at the first step.
    pub fn prev(self) -> Self {
        match self {
            Self::Persona | Self::CompanyDetails => Self::Persona,
            Self::AiSystemDetails => Self::CompanyDetails,
            Self::Results => Self::AiSystemDetails,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Persona => "Choose your perspective",
            Self::CompanyDetails => "Company details",
            Self::AiSystemDetails => "AI system details",
            Self::Results => "Results",
        }
    }
}

/// A collected field: free text / single choice, or a checkbox group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn scalar(value: impl Into<String>) -> Self {
        Self::Scalar(value.into())
    }

    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(values.into_iter().map(Into::into).collect())
    }

    /// Empty after trimming, or a list with no selection.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Scalar(value) => value.trim().is_empty(),
            Self::List(values) => values.iter().all(|value| value.trim().is_empty()),
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(value) => Some(value.as_str()),
            Self::List(_) => None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Self::Scalar(value) => value.clone(),
            Self::List(values) => values.join(", "),
        }
    }
}

pub type WizardData = BTreeMap<String, FieldValue>;

pub fn is_blank_field(data: &WizardData, name: &str) -> bool {
    data.get(name).map_or(true, FieldValue::is_blank)
}

/// A pre-built example company used to prefill the wizard.
///
/// Every field is optional: an incomplete record still prefills what it has,
/// and a field of the wrong type reads as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemoScenario {
    #[serde(default, deserialize_with = "text_or_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "text_or_none")]
    pub industry: Option<String>,
    #[serde(default, deserialize_with = "text_or_none")]
    pub ai_system: Option<String>,
    /// Persona-specific highlight fields and catalog metadata.
    #[serde(flatten)]
    pub highlights: BTreeMap<String, serde_json::Value>,
}

fn text_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(text) => Ok(Some(text)),
        _ => Ok(None),
    }
}

impl DemoScenario {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Demo scenario")
    }
}

/// Typed message from the scenario picker to the wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoHandoff {
    pub persona: Persona,
    pub scenario: DemoScenario,
}

/// Parameters the wizard was entered with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryParams {
    pub persona: Option<Persona>,
    pub demo: bool,
    /// Display correlation only; never used to look anything up.
    pub scenario: Option<String>,
}

impl EntryParams {
    /// Builds params from `key=value` style pairs. Unknown keys and
    /// unparseable values are ignored.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            match key {
                "persona" => params.persona = Persona::parse(value),
                "demo" => params.demo = matches!(value.trim(), "true" | "1" | "yes"),
                "scenario" if !value.trim().is_empty() => {
                    params.scenario = Some(value.trim().to_string());
                }
                _ => {}
            }
        }
        params
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    InFlight { attempt: u32 },
    Failed { attempt: u32, error: SubmissionError },
    Succeeded { attempt: u32 },
}

impl SubmissionState {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Idle => 0,
            Self::InFlight { attempt }
            | Self::Failed { attempt, .. }
            | Self::Succeeded { attempt } => *attempt,
        }
    }

    pub fn error(&self) -> Option<&SubmissionError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Cosmetic staged progress shown while a submission is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressState {
    pub stage: usize,
    pub total: usize,
}

impl ProgressState {
    pub fn is_complete(self) -> bool {
        self.stage >= self.total
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WizardSession {
    pub current_step: WizardStep,
    pub persona: Option<Persona>,
    /// Collected values, merged across steps.
    pub data: WizardData,
    /// Values currently held by the rendered form, for every step.
    pub form: WizardData,
    /// Scenario the wizard was entered with, kept for display.
    pub demo_scenario: Option<DemoScenario>,
    /// Scenario still waiting to be applied to later steps.
    pub pending_prefill: Option<DemoScenario>,
    pub auto_advance_scheduled: bool,
    /// An auto-advance timer is armed and a manual advance has not overtaken it.
    pub auto_advance_pending: bool,
    pub missing_fields: Vec<String>,
    pub submission: SubmissionState,
    pub last_request: Option<AnalysisRequest>,
    pub progress: Option<ProgressState>,
    pub result: Option<ResultView>,
    pub entry: EntryParams,
    /// Bumped on restart; deferred work scheduled under an older epoch is stale.
    pub epoch: u64,
}

impl WizardSession {
    pub fn new() -> Self {
        Self {
            current_step: WizardStep::Persona,
            persona: None,
            data: WizardData::new(),
            form: WizardData::new(),
            demo_scenario: None,
            pending_prefill: None,
            auto_advance_scheduled: false,
            auto_advance_pending: false,
            missing_fields: Vec::new(),
            submission: SubmissionState::Idle,
            last_request: None,
            progress: None,
            result: None,
            entry: EntryParams::default(),
            epoch: 0,
        }
    }

    pub fn total_steps(&self) -> u8 {
        TOTAL_STEPS
    }

    pub fn step_number(&self) -> u8 {
        self.current_step.number()
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.submission, SubmissionState::InFlight { .. })
    }

    pub fn is_complete(&self) -> bool {
        self.current_step == WizardStep::Results
    }

    pub fn use_demo(&self) -> bool {
        self.demo_scenario.is_some()
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.data.get(name)
    }

    pub fn select_persona(&mut self, persona: Persona) {
        self.persona = Some(persona);
        let value = FieldValue::scalar(persona.as_str());
        self.form.insert(PERSONA_FIELD.to_string(), value.clone());
        self.data.insert(PERSONA_FIELD.to_string(), value);
    }

    /// Clears collected state back to an empty step 1. The epoch survives
    /// and is bumped so deferred work from before the reset is ignored.
    pub fn reset(&mut self) {
        let epoch = self.epoch.saturating_add(1);
        *self = Self::new();
        self.epoch = epoch;
    }
}

impl Default for WizardSession {
    fn default() -> Self {
        Self::new()
    }
}
