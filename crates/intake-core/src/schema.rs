use super::state::WizardStep;
use super::state::PERSONA_FIELD;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    TextArea,
    Select(&'static [&'static str]),
    CheckboxGroup(&'static [&'static str]),
}

impl FieldKind {
    pub fn is_list(self) -> bool {
        matches!(self, Self::CheckboxGroup(_))
    }

    pub fn options(self) -> &'static [&'static str] {
        match self {
            Self::Select(options) | Self::CheckboxGroup(options) => options,
            Self::Text | Self::TextArea => &[],
        }
    }

    /// Free-text kinds accept anything; choice kinds only their options.
    pub fn accepts(self, value: &str) -> bool {
        match self {
            Self::Text | Self::TextArea => true,
            Self::Select(options) | Self::CheckboxGroup(options) => options.contains(&value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSchema {
    pub step: WizardStep,
    pub fields: &'static [FieldSpec],
}

impl StepSchema {
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields.iter().filter(|field| field.required)
    }
}

pub const INDUSTRY_OPTIONS: &[&str] = &[
    "fintech",
    "healthcare",
    "b2b saas",
    "e-commerce",
    "manufacturing",
    "education",
    "other",
];

pub const COMPANY_SIZE_OPTIONS: &[&str] = &["1-10", "11-50", "51-200", "201-1000", "1000+"];

pub const TARGET_MARKET_OPTIONS: &[&str] = &["eu", "us", "uk", "apac"];

pub const USE_CASE_OPTIONS: &[&str] = &[
    "hiring",
    "credit_scoring",
    "biometric_identification",
    "customer_service",
    "marketing",
    "lead_scoring",
    "medical_diagnosis",
    "content_generation",
];

pub const DATA_TYPE_OPTIONS: &[&str] = &["personal", "sensitive", "biometric", "anonymized", "public"];

pub const DEPLOYMENT_STAGE_OPTIONS: &[&str] = &["planning", "development", "pilot", "production"];

pub const HUMAN_OVERSIGHT_OPTIONS: &[&str] = &["none", "partial", "full"];

pub const PERSONA_OPTIONS: &[&str] = &["entrepreneur", "consultant", "seller"];

const PERSONA_FIELDS: [FieldSpec; 1] = [FieldSpec {
    name: PERSONA_FIELD,
    label: "Perspective",
    required: true,
    kind: FieldKind::Select(PERSONA_OPTIONS),
}];

const COMPANY_FIELDS: [FieldSpec; 5] = [
    FieldSpec {
        name: "company_name",
        label: "Company name",
        required: true,
        kind: FieldKind::Text,
    },
    FieldSpec {
        name: "industry",
        label: "Industry",
        required: true,
        kind: FieldKind::Select(INDUSTRY_OPTIONS),
    },
    FieldSpec {
        name: "company_size",
        label: "Company size",
        required: true,
        kind: FieldKind::Select(COMPANY_SIZE_OPTIONS),
    },
    FieldSpec {
        name: "country",
        label: "Headquarters country",
        required: false,
        kind: FieldKind::Text,
    },
    FieldSpec {
        name: "target_markets",
        label: "Target markets",
        required: true,
        kind: FieldKind::CheckboxGroup(TARGET_MARKET_OPTIONS),
    },
];

const AI_SYSTEM_FIELDS: [FieldSpec; 5] = [
    FieldSpec {
        name: "ai_description",
        label: "Describe your AI system",
        required: true,
        kind: FieldKind::TextArea,
    },
    FieldSpec {
        name: "ai_use_cases",
        label: "Use cases",
        required: true,
        kind: FieldKind::CheckboxGroup(USE_CASE_OPTIONS),
    },
    FieldSpec {
        name: "data_types",
        label: "Data processed",
        required: false,
        kind: FieldKind::CheckboxGroup(DATA_TYPE_OPTIONS),
    },
    FieldSpec {
        name: "deployment_stage",
        label: "Deployment stage",
        required: true,
        kind: FieldKind::Select(DEPLOYMENT_STAGE_OPTIONS),
    },
    FieldSpec {
        name: "human_oversight",
        label: "Human oversight",
        required: false,
        kind: FieldKind::Select(HUMAN_OVERSIGHT_OPTIONS),
    },
];

static STEP_SCHEMAS: [StepSchema; 4] = [
    StepSchema {
        step: WizardStep::Persona,
        fields: &PERSONA_FIELDS,
    },
    StepSchema {
        step: WizardStep::CompanyDetails,
        fields: &COMPANY_FIELDS,
    },
    StepSchema {
        step: WizardStep::AiSystemDetails,
        fields: &AI_SYSTEM_FIELDS,
    },
    StepSchema {
        step: WizardStep::Results,
        fields: &[],
    },
];

pub fn step_schema(step: WizardStep) -> &'static StepSchema {
    match step {
        WizardStep::Persona => &STEP_SCHEMAS[0],
        WizardStep::CompanyDetails => &STEP_SCHEMAS[1],
        WizardStep::AiSystemDetails => &STEP_SCHEMAS[2],
        WizardStep::Results => &STEP_SCHEMAS[3],
    }
}

/// Looks a field up across every step.
pub fn find_field(name: &str) -> Option<(WizardStep, &'static FieldSpec)> {
    STEP_SCHEMAS
        .iter()
        .find_map(|schema| schema.field(name).map(|field| (schema.step, field)))
}
