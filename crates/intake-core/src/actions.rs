use super::error::SubmissionError;
use super::persistence::PersistedWizard;
use super::state::DemoHandoff;
use super::state::EntryParams;
use super::state::FieldValue;
use super::state::Persona;
use super::state::WizardStep;
use super::submission::AnalysisResponse;

#[derive(Debug, Clone)]
pub enum WizardAction {
    User(UserAction),
    Runtime(RuntimeAction),
}

#[derive(Debug, Clone)]
pub enum UserAction {
    SelectPersona(Persona),
    SetField { name: String, value: FieldValue },
    ToggleOption { name: String, option: String },
    Next,
    Previous,
    /// Unconditional jump, only used when resuming trusted progress.
    GoTo(WizardStep),
    Submit,
    Retry,
    Restart,
}

#[derive(Debug, Clone)]
pub enum RuntimeAction {
    Enter {
        params: EntryParams,
        resumed: PersistedWizard,
        handoff: Option<DemoHandoff>,
    },
    AutoAdvance {
        epoch: u64,
    },
    AutoSaveTick,
    ProgressAdvanced {
        stage: usize,
    },
    AnalysisCompleted {
        attempt: u32,
        response: AnalysisResponse,
    },
    AnalysisFailed {
        attempt: u32,
        error: SubmissionError,
    },
}

impl From<UserAction> for WizardAction {
    fn from(action: UserAction) -> Self {
        Self::User(action)
    }
}

impl From<RuntimeAction> for WizardAction {
    fn from(action: RuntimeAction) -> Self {
        Self::Runtime(action)
    }
}
