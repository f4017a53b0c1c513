use std::time::Duration;

use async_trait::async_trait;
use intake_core::schema;
use intake_core::submission::RiskAssessment;
use intake_core::AnalysisRequest;
use intake_core::AnalysisResponse;
use intake_core::DemoScenario;
use intake_core::FieldValue;
use intake_core::Persona;
use intake_core::ServiceConfig;
use intake_core::SubmissionError;
use reqwest::Client;
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde_json::json;
use serde_json::Value;

use crate::contracts::ReportRequest;
use crate::contracts::ScenarioCatalog;

/// Remote side of the wizard: scoring, the demo catalog and report rendering.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest)
        -> Result<AnalysisResponse, SubmissionError>;

    async fn demo_scenarios(&self) -> Result<ScenarioCatalog, SubmissionError>;

    async fn generate_report(&self, request: &ReportRequest) -> Result<Vec<u8>, SubmissionError>;
}

#[derive(Debug, Clone)]
pub struct HttpAnalysisService {
    client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl HttpAnalysisService {
    pub fn new(config: &ServiceConfig) -> Result<Self, SubmissionError> {
        let timeout_secs = config.request_timeout_secs.max(1);
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|err| SubmissionError::NetworkFailure(err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn transport_error(&self, err: reqwest::Error) -> SubmissionError {
        if err.is_timeout() {
            SubmissionError::Timeout {
                secs: self.timeout_secs,
            }
        } else if err.is_decode() {
            SubmissionError::MalformedResponse(err.to_string())
        } else {
            SubmissionError::NetworkFailure(err.to_string())
        }
    }

    async fn checked(&self, response: Response) -> Result<Response, SubmissionError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SubmissionError::ServiceError {
            status: status.as_u16(),
            message: error_message(&body)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_else(|| "request failed".to_string()),
        })
    }

    async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T, SubmissionError> {
        let response = self.checked(response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| self.transport_error(err))?;
        serde_json::from_slice(&bytes)
            .map_err(|err| SubmissionError::MalformedResponse(err.to_string()))
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisResponse, SubmissionError> {
        tracing::debug!(url = %self.url("/api/analyze"), "posting analysis");
        let response = self
            .client
            .post(self.url("/api/analyze"))
            .json(request)
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;
        self.decode(response).await
    }

    async fn demo_scenarios(&self) -> Result<ScenarioCatalog, SubmissionError> {
        let response = self
            .client
            .get(self.url("/api/demo-scenarios"))
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;
        self.decode(response).await
    }

    async fn generate_report(&self, request: &ReportRequest) -> Result<Vec<u8>, SubmissionError> {
        let response = self
            .client
            .post(self.url("/api/generate-report"))
            .json(request)
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;
        let response = self.checked(response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| self.transport_error(err))?;
        Ok(bytes.to_vec())
    }
}

/// Pulls `error` or `message` out of a JSON error body, else the raw text.
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        ["error", "message"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str).map(str::to_string))
    });
    Some(from_json.unwrap_or_else(|| body.to_string()))
}

/// Offline stand-in with fixed answers keyed by the selected use cases.
#[derive(Debug, Clone, Default)]
pub struct SimulatedAnalysisService {
    latency: Duration,
}

impl SimulatedAnalysisService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }

    async fn settle(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

const USE_CASE_RISK: [(&str, f64); 8] = [
    ("biometric_identification", 90.0),
    ("medical_diagnosis", 85.0),
    ("hiring", 80.0),
    ("credit_scoring", 75.0),
    ("lead_scoring", 40.0),
    ("customer_service", 35.0),
    ("marketing", 30.0),
    ("content_generation", 25.0),
];

const BASELINE_RISK: f64 = 20.0;

fn selected<'a>(request: &'a AnalysisRequest, field: &str) -> Vec<&'a str> {
    match request.fields.get(field) {
        Some(FieldValue::List(values)) => values.iter().map(String::as_str).collect(),
        Some(FieldValue::Scalar(value)) if !value.trim().is_empty() => vec![value.as_str()],
        _ => Vec::new(),
    }
}

fn simulated_risk(request: &AnalysisRequest) -> RiskAssessment {
    let use_cases = selected(request, "ai_use_cases");
    let mut score = USE_CASE_RISK
        .iter()
        .filter(|(name, _)| use_cases.contains(name))
        .map(|(_, risk)| *risk)
        .fold(BASELINE_RISK, f64::max);

    let data_types = selected(request, "data_types");
    if data_types.contains(&"sensitive") || data_types.contains(&"biometric") {
        score += 5.0;
    }
    if selected(request, "human_oversight") == ["full"] {
        score -= 10.0;
    }
    let score = score.clamp(0.0, 100.0);

    let (level, color) = if score >= 70.0 {
        ("High", "red")
    } else if score >= 40.0 {
        ("Limited", "yellow")
    } else {
        ("Minimal", "green")
    };

    RiskAssessment {
        risk_score: Some(score),
        compliance_score: Some(100.0 - score / 2.0),
        risk_level: Some(level.to_string()),
        status_color: Some(color.to_string()),
    }
}

fn simulated_insights(persona: Persona, risk: &RiskAssessment) -> serde_json::Map<String, Value> {
    let high = risk.risk_level.as_deref() == Some("High");
    let insights = match persona {
        Persona::Entrepreneur => {
            let readiness = if high {
                "Needs a compliance roadmap before fundraising"
            } else {
                "Investor ready"
            };
            json!({
                "funding_readiness": readiness,
                "next_step": "Document intended purpose and data sources",
            })
        }
        Persona::Consultant => {
            let hours = if high { 80 } else { 24 };
            json!({
                "client_billable_hours": hours,
                "key_gaps": ["technical documentation", "human oversight plan"],
            })
        }
        Persona::Seller => {
            let blockers = if high {
                "Conformity assessment outstanding"
            } else {
                "None expected"
            };
            json!({
                "deal_blockers": blockers,
                "buyer_questions": ["Where is data processed?", "Who reviews model output?"],
            })
        }
    };
    match insights {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}

fn scenario(name: &str, industry: &str, ai_system: &str, risk_level: &str) -> DemoScenario {
    let mut scenario = DemoScenario {
        name: Some(name.to_string()),
        industry: Some(industry.to_string()),
        ai_system: Some(ai_system.to_string()),
        ..DemoScenario::default()
    };
    scenario
        .highlights
        .insert("risk_level".to_string(), json!(risk_level));
    scenario
}

#[async_trait]
impl AnalysisService for SimulatedAnalysisService {
    async fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisResponse, SubmissionError> {
        self.settle().await;
        let risk = simulated_risk(request);
        let company = request.company_name().unwrap_or("Your company");
        let summary = format!(
            "{company} is assessed as {} risk with a compliance score of {:.0}.",
            risk.risk_level.as_deref().unwrap_or("unknown").to_lowercase(),
            risk.compliance_score.unwrap_or_default(),
        );
        Ok(AnalysisResponse {
            persona_insights: simulated_insights(request.persona, &risk),
            risk_assessment: Some(risk),
            executive_summary: Some(summary),
            demo_data: request
                .use_demo
                .then(|| json!({ "scenario": company, "simulated": true })),
        })
    }

    async fn demo_scenarios(&self) -> Result<ScenarioCatalog, SubmissionError> {
        self.settle().await;
        let mut catalog = ScenarioCatalog::default();
        catalog.0.insert(
            Persona::Entrepreneur.as_str().to_string(),
            vec![scenario(
                "TechStart Pro",
                "B2B SaaS",
                "Sales lead scoring with anonymized data",
                "Limited",
            )],
        );
        catalog.0.insert(
            Persona::Consultant.as_str().to_string(),
            vec![scenario(
                "MedAssist Clinic",
                "Healthcare",
                "Symptom triage assistant for patient intake",
                "High",
            )],
        );
        catalog.0.insert(
            Persona::Seller.as_str().to_string(),
            vec![scenario(
                "ShopFlow",
                "E-commerce",
                "Customer service chatbot",
                "Minimal",
            )],
        );
        Ok(catalog)
    }

    async fn generate_report(&self, request: &ReportRequest) -> Result<Vec<u8>, SubmissionError> {
        self.settle().await;
        let risk = request
            .analysis_data
            .risk_assessment
            .clone()
            .unwrap_or_default();
        let mut report = format!(
            "AI Compliance Report: {}\nPerspective: {}\nRisk level: {}\n",
            request.company_name,
            request.persona.label(),
            risk.risk_level.as_deref().unwrap_or("Unknown"),
        );
        for (name, value) in &request.wizard_data {
            let label = schema::find_field(name).map_or(name.as_str(), |(_, spec)| spec.label);
            report.push_str(&format!("{label}: {}\n", value.display()));
        }
        if let Some(summary) = &request.analysis_data.executive_summary {
            report.push_str(&format!("\n{summary}\n"));
        }
        Ok(report.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn request(use_cases: &[&str], oversight: Option<&str>) -> AnalysisRequest {
        let mut fields = intake_core::WizardData::new();
        fields.insert("company_name".to_string(), FieldValue::scalar("Acme"));
        fields.insert(
            "ai_use_cases".to_string(),
            FieldValue::list(use_cases.iter().copied()),
        );
        if let Some(oversight) = oversight {
            fields.insert("human_oversight".to_string(), FieldValue::scalar(oversight));
        }
        AnalysisRequest {
            fields,
            persona: Persona::Seller,
            use_demo: false,
            demo_type: None,
        }
    }

    #[tokio::test]
    async fn simulated_scoring_takes_the_riskiest_use_case() {
        let service = SimulatedAnalysisService::new();
        let response = service
            .analyze(&request(&["marketing", "hiring"], None))
            .await
            .expect("analysis");
        let risk = response.risk_assessment.expect("risk");
        assert_eq!(risk.risk_score, Some(80.0));
        assert_eq!(risk.risk_level.as_deref(), Some("High"));
        assert!(response.persona_insights.contains_key("deal_blockers"));
        assert_eq!(response.demo_data, None);
    }

    #[tokio::test]
    async fn full_oversight_lowers_the_simulated_score() {
        let service = SimulatedAnalysisService::new();
        let response = service
            .analyze(&request(&["lead_scoring"], Some("full")))
            .await
            .expect("analysis");
        let risk = response.risk_assessment.expect("risk");
        assert_eq!(risk.risk_score, Some(30.0));
        assert_eq!(risk.status_color.as_deref(), Some("green"));
    }

    #[tokio::test]
    async fn simulated_catalog_offers_one_scenario_per_persona() {
        let catalog = SimulatedAnalysisService::new()
            .demo_scenarios()
            .await
            .expect("catalog");
        for persona in Persona::ALL {
            assert_eq!(catalog.scenarios(persona).len(), 1);
        }
        assert!(catalog.find(Persona::Entrepreneur, "TechStart Pro").is_some());
    }

    #[tokio::test]
    async fn simulated_report_uses_field_labels() {
        let service = SimulatedAnalysisService::new();
        let request = request(&["marketing"], None);
        let response = service.analyze(&request).await.expect("analysis");
        let bytes = service
            .generate_report(&ReportRequest::new(&request, &response))
            .await
            .expect("report");
        let text = String::from_utf8(bytes).expect("utf8");
        assert!(text.starts_with("AI Compliance Report: Acme\n"));
        assert!(text.contains("Company name: Acme"));
    }

    #[test]
    fn error_body_prefers_json_message() {
        assert_eq!(
            error_message(r#"{"error":"persona is required"}"#),
            Some("persona is required".to_string())
        );
        assert_eq!(error_message("Bad Gateway"), Some("Bad Gateway".to_string()));
        assert_eq!(error_message("  "), None);
    }
}
