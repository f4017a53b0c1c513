use std::sync::Arc;

use intake_core::reduce;
use intake_core::AnalysisRequest;
use intake_core::AnalysisResponse;
use intake_core::DemoHandoff;
use intake_core::EntryParams;
use intake_core::IntakeConfig;
use intake_core::RuntimeAction;
use intake_core::SubmissionError;
use intake_core::WizardAction;
use intake_core::WizardEffect;
use intake_core::WizardSession;
use intake_core::WizardStore;
use intake_core::PROGRESS_STAGES;
use tokio::sync::mpsc;

use crate::contracts::ReportRequest;
use crate::scheduler::DeferredTasks;
use crate::service::AnalysisService;

pub type FrameObserver = Box<dyn FnMut(&WizardSession) + Send>;

/// Owns one wizard session and carries out the effects its reducer asks for.
pub struct WizardController<S: ?Sized, P> {
    session: WizardSession,
    store: P,
    service: Arc<S>,
    config: IntakeConfig,
    deferred: DeferredTasks,
    events: mpsc::UnboundedReceiver<RuntimeAction>,
    last_response: Option<AnalysisResponse>,
    observer: Option<FrameObserver>,
    autosave_started: bool,
}

impl<S, P> WizardController<S, P>
where
    S: AnalysisService + ?Sized,
    P: WizardStore,
{
    /// Must be called inside a tokio runtime; deferred work is spawned on it.
    pub fn new(service: Arc<S>, store: P, config: IntakeConfig) -> Self {
        let (sender, events) = mpsc::unbounded_channel();
        Self {
            session: WizardSession::new(),
            store,
            service,
            config,
            deferred: DeferredTasks::new(sender),
            events,
            last_response: None,
            observer: None,
            autosave_started: false,
        }
    }

    pub fn with_observer(mut self, observer: FrameObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn session(&self) -> &WizardSession {
        &self.session
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    /// Loads saved progress and, for demo entries, consumes the pending
    /// handoff from the store.
    pub async fn enter(&mut self, params: EntryParams) {
        let handoff = if params.demo {
            self.store.take_handoff()
        } else {
            None
        };
        self.enter_with(params, handoff).await;
    }

    /// Like [`Self::enter`] with a handoff supplied by the caller. A `None`
    /// handoff still falls back to the store for demo entries.
    pub async fn enter_with(&mut self, params: EntryParams, handoff: Option<DemoHandoff>) {
        let handoff = match handoff {
            Some(handoff) => {
                let _ = self.store.take_handoff();
                Some(handoff)
            }
            None if params.demo => self.store.take_handoff(),
            None => None,
        };
        let resumed = self.store.load();
        if !std::mem::replace(&mut self.autosave_started, true) {
            self.deferred.start_autosave(self.config.autosave_interval());
        }
        self.dispatch(RuntimeAction::Enter {
            params,
            resumed,
            handoff,
        })
        .await;
    }

    /// Runs an action to completion, including any submission it starts.
    pub async fn dispatch(&mut self, action: impl Into<WizardAction>) {
        let mut next = Some(action.into());
        while let Some(action) = next.take() {
            if let Some((request, attempt)) = self.apply(action) {
                next = Some(self.run_submission(request, attempt).await.into());
            }
        }
    }

    /// Waits for the next deferred action and applies it.
    pub async fn pump(&mut self) -> bool {
        match self.events.recv().await {
            Some(action) => {
                self.dispatch(action).await;
                true
            }
            None => false,
        }
    }

    /// Applies every deferred action that is already due without waiting.
    pub async fn pump_ready(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(action) = self.events.try_recv() {
            self.dispatch(action).await;
            applied += 1;
        }
        applied
    }

    pub async fn next_deferred(&mut self) -> Option<RuntimeAction> {
        self.events.recv().await
    }

    pub fn report_request(&self) -> Option<ReportRequest> {
        if !self.session.is_complete() {
            return None;
        }
        let request = self.session.last_request.as_ref()?;
        let response = self.last_response.as_ref()?;
        Some(ReportRequest::new(request, response))
    }

    pub async fn download_report(&self) -> Option<Result<Vec<u8>, SubmissionError>> {
        let request = self.report_request()?;
        Some(self.service.generate_report(&request).await)
    }

    pub fn shutdown(&self) {
        self.deferred.shutdown();
    }

    fn apply(&mut self, action: WizardAction) -> Option<(AnalysisRequest, u32)> {
        let effects = reduce(&mut self.session, action);
        let mut submission = None;
        for effect in effects {
            match effect {
                WizardEffect::RequestFrame => self.render(),
                WizardEffect::Persist(snapshot) => {
                    if let Err(err) = self.store.save(&snapshot) {
                        tracing::warn!(%err, "failed to save wizard progress");
                    }
                }
                WizardEffect::ClearPersisted => {
                    if let Err(err) = self.store.clear() {
                        tracing::warn!(%err, "failed to clear wizard progress");
                    }
                }
                WizardEffect::ScheduleAutoAdvance { epoch } => {
                    self.deferred.schedule_after(
                        self.config.auto_advance_delay(),
                        RuntimeAction::AutoAdvance { epoch },
                    );
                }
                WizardEffect::CancelDeferred => {
                    self.deferred.cancel_pending();
                    self.last_response = None;
                }
                WizardEffect::SubmitAnalysis { request, attempt } => {
                    submission = Some((request, attempt));
                }
            }
        }
        submission
    }

    fn render(&mut self) {
        if let Some(observer) = self.observer.as_mut() {
            observer(&self.session);
        }
    }

    /// Drives the request and the cosmetic progress stages side by side and
    /// resolves once both are done.
    async fn run_submission(&mut self, request: AnalysisRequest, attempt: u32) -> RuntimeAction {
        let service = Arc::clone(&self.service);
        let timeout_secs = self.config.service.request_timeout_secs;
        let call = tokio::time::timeout(self.config.request_timeout(), async move {
            service.analyze(&request).await
        });
        tokio::pin!(call);

        let stage_delay = self.config.progress_stage_delay();
        let mut ticker =
            tokio::time::interval_at(tokio::time::Instant::now() + stage_delay, stage_delay);
        let total = PROGRESS_STAGES.len();
        let mut stage = 0;
        let mut outcome: Option<RuntimeAction> = None;

        loop {
            if stage >= total {
                if let Some(outcome) = outcome.take() {
                    return outcome;
                }
            }
            tokio::select! {
                result = &mut call, if outcome.is_none() => {
                    outcome = Some(match result {
                        Ok(Ok(response)) => {
                            self.last_response = Some(response.clone());
                            RuntimeAction::AnalysisCompleted { attempt, response }
                        }
                        Ok(Err(error)) => RuntimeAction::AnalysisFailed { attempt, error },
                        Err(_) => RuntimeAction::AnalysisFailed {
                            attempt,
                            error: SubmissionError::Timeout { secs: timeout_secs },
                        },
                    });
                }
                _ = ticker.tick(), if stage < total => {
                    stage += 1;
                    tracing::debug!(stage, label = PROGRESS_STAGES[stage - 1], "analysis progress");
                    let _ = self.apply(RuntimeAction::ProgressAdvanced { stage }.into());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use intake_core::DemoScenario;
    use intake_core::FieldValue;
    use intake_core::MemoryWizardStore;
    use intake_core::Persona;
    use intake_core::SubmissionState;
    use intake_core::UserAction;
    use intake_core::WizardStep;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::contracts::ScenarioCatalog;

    enum Scripted {
        Reply(Result<AnalysisResponse, SubmissionError>),
        Hang,
    }

    #[derive(Default)]
    struct ScriptedService {
        replies: Mutex<VecDeque<Scripted>>,
        requests: Mutex<Vec<AnalysisRequest>>,
    }

    impl ScriptedService {
        fn new(replies: impl IntoIterator<Item = Scripted>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().collect()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<AnalysisRequest> {
            self.requests.lock().expect("requests").clone()
        }
    }

    #[async_trait]
    impl AnalysisService for ScriptedService {
        async fn analyze(
            &self,
            request: &AnalysisRequest,
        ) -> Result<AnalysisResponse, SubmissionError> {
            self.requests.lock().expect("requests").push(request.clone());
            let next = self.replies.lock().expect("replies").pop_front();
            match next {
                Some(Scripted::Reply(reply)) => reply,
                Some(Scripted::Hang) | None => std::future::pending().await,
            }
        }

        async fn demo_scenarios(&self) -> Result<ScenarioCatalog, SubmissionError> {
            Ok(ScenarioCatalog::default())
        }

        async fn generate_report(
            &self,
            request: &ReportRequest,
        ) -> Result<Vec<u8>, SubmissionError> {
            Ok(request.company_name.clone().into_bytes())
        }
    }

    fn success() -> Scripted {
        Scripted::Reply(Ok(serde_json::from_value(json!({
            "risk_assessment": {
                "risk_score": 42,
                "compliance_score": 79,
                "risk_level": "Limited",
                "status_color": "yellow"
            },
            "persona_insights": { "funding_readiness": "Investor ready" },
            "executive_summary": "Transparency obligations apply."
        }))
        .expect("response")))
    }

    fn network_failure() -> Scripted {
        Scripted::Reply(Err(SubmissionError::NetworkFailure(
            "connection refused".to_string(),
        )))
    }

    type Controller = WizardController<ScriptedService, MemoryWizardStore>;

    fn controller(service: &Arc<ScriptedService>, store: MemoryWizardStore) -> Controller {
        WizardController::new(Arc::clone(service), store, IntakeConfig::default())
    }

    async fn set(controller: &mut Controller, name: &str, value: &str) {
        controller
            .dispatch(UserAction::SetField {
                name: name.to_string(),
                value: FieldValue::scalar(value),
            })
            .await;
    }

    async fn toggle(controller: &mut Controller, name: &str, option: &str) {
        controller
            .dispatch(UserAction::ToggleOption {
                name: name.to_string(),
                option: option.to_string(),
            })
            .await;
    }

    async fn walk_to_ai_step(controller: &mut Controller) {
        controller.enter(EntryParams::default()).await;
        controller
            .dispatch(UserAction::SelectPersona(Persona::Entrepreneur))
            .await;
        controller.dispatch(UserAction::Next).await;
        set(controller, "company_name", "Northwind Labs").await;
        set(controller, "industry", "fintech").await;
        set(controller, "company_size", "11-50").await;
        toggle(controller, "target_markets", "eu").await;
        controller.dispatch(UserAction::Next).await;
        set(controller, "ai_description", "Credit limit recommendations").await;
        toggle(controller, "ai_use_cases", "credit_scoring").await;
        set(controller, "deployment_stage", "production").await;
    }

    fn techstart() -> DemoHandoff {
        DemoHandoff {
            persona: Persona::Entrepreneur,
            scenario: DemoScenario {
                name: Some("TechStart Pro".to_string()),
                industry: Some("B2B SaaS".to_string()),
                ai_system: Some("Lead scoring".to_string()),
                ..DemoScenario::default()
            },
        }
    }

    #[tokio::test(start_paused = true)]
    async fn demo_entry_auto_advances_and_prefills_company_details() {
        let service = ScriptedService::new([]);
        let mut store = MemoryWizardStore::new();
        store.put_handoff(&techstart()).expect("handoff");
        let mut controller = controller(&service, store);

        controller
            .enter(EntryParams::from_pairs([
                ("persona", "entrepreneur"),
                ("demo", "true"),
                ("scenario", "TechStart Pro"),
            ]))
            .await;
        assert_eq!(controller.session().current_step, WizardStep::Persona);
        assert_eq!(controller.store().handoff, None);

        assert!(controller.pump().await);

        let session = controller.session();
        assert_eq!(session.current_step, WizardStep::CompanyDetails);
        assert_eq!(
            session.form.get("company_name"),
            Some(&FieldValue::scalar("TechStart Pro"))
        );
        assert_eq!(
            session.form.get("industry"),
            Some(&FieldValue::scalar("b2b saas"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn network_failure_then_retry_sends_the_same_payload() {
        let service = ScriptedService::new([network_failure(), success()]);
        let mut controller = controller(&service, MemoryWizardStore::new());
        walk_to_ai_step(&mut controller).await;

        controller.dispatch(UserAction::Next).await;
        let session = controller.session();
        assert_eq!(session.current_step, WizardStep::AiSystemDetails);
        assert!(matches!(
            session.submission,
            SubmissionState::Failed {
                attempt: 1,
                error: SubmissionError::NetworkFailure(_)
            }
        ));
        assert!(controller.store().progress.is_some());

        controller.dispatch(UserAction::Retry).await;
        let requests = service.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0], requests[1]);
        assert_eq!(controller.session().current_step, WizardStep::Results);
        assert_eq!(controller.store().progress, None);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_stages_are_observed_before_results() {
        let service = ScriptedService::new([success()]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut controller = controller(&service, MemoryWizardStore::new()).with_observer(
            Box::new(move |session: &WizardSession| {
                if let Some(progress) = session.progress {
                    sink.lock().expect("sink").push(progress.stage);
                }
            }),
        );
        walk_to_ai_step(&mut controller).await;

        controller.dispatch(UserAction::Submit).await;

        assert_eq!(*seen.lock().expect("seen"), vec![0, 1, 2, 3, 4]);
        let view = controller.session().result.as_ref().expect("result view");
        assert_eq!(view.risk_level, "Limited");
    }

    #[tokio::test(start_paused = true)]
    async fn hung_service_times_out() {
        let service = ScriptedService::new([Scripted::Hang]);
        let mut controller = controller(&service, MemoryWizardStore::new());
        walk_to_ai_step(&mut controller).await;

        controller.dispatch(UserAction::Next).await;

        assert_eq!(
            controller.session().submission.error(),
            Some(&SubmissionError::Timeout { secs: 30 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn restart_cancels_a_pending_auto_advance() {
        let service = ScriptedService::new([]);
        let mut store = MemoryWizardStore::new();
        store.put_handoff(&techstart()).expect("handoff");
        let mut controller = controller(&service, store);
        controller
            .enter(EntryParams::from_pairs([("demo", "true")]))
            .await;

        controller.dispatch(UserAction::Restart).await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(controller.pump_ready().await, 0);
        assert_eq!(controller.session().current_step, WizardStep::Persona);
        assert_eq!(controller.session().persona, None);
    }

    #[tokio::test(start_paused = true)]
    async fn autosave_persists_live_progress() {
        let service = ScriptedService::new([]);
        let mut controller = controller(&service, MemoryWizardStore::new());
        controller.enter(EntryParams::default()).await;
        controller
            .dispatch(UserAction::SelectPersona(Persona::Seller))
            .await;
        assert_eq!(controller.store().saves, 0);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(controller.pump_ready().await, 1);
        assert_eq!(controller.store().saves, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn entering_again_keeps_a_single_autosave_loop() {
        let service = ScriptedService::new([]);
        let mut controller = controller(&service, MemoryWizardStore::new());
        controller.enter(EntryParams::default()).await;
        controller.enter(EntryParams::default()).await;
        controller
            .dispatch(UserAction::SelectPersona(Persona::Seller))
            .await;

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(controller.pump_ready().await, 1);
        assert_eq!(controller.store().saves, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn report_is_available_only_after_success() {
        let service = ScriptedService::new([success()]);
        let mut controller = controller(&service, MemoryWizardStore::new());
        walk_to_ai_step(&mut controller).await;
        assert!(controller.report_request().is_none());

        controller.dispatch(UserAction::Next).await;
        let bytes = controller
            .download_report()
            .await
            .expect("report available")
            .expect("report");
        assert_eq!(bytes, b"Northwind Labs".to_vec());
    }
}
