//! Analysis orchestrator
//!
//! Drives one analysis request through guidance lookup, ordered capability
//! execution, pricing and usage recording. The external capabilities are
//! reached only through the [`CapabilityRuntime`] collaborator.
//!
//! A run never returns an error: every fault ends the session in `failed`
//! and is reported in the [`AnalysisResult`]. Failed runs record no usage.
//! A caller can fail a run early through the abort signal of
//! [`AnalysisOrchestrator::run_until`].

pub mod capabilities;
pub mod checklist;
pub mod session;
pub mod types;

pub use capabilities::CapabilitySet;
pub use checklist::StepChecklist;
pub use session::{AnalysisSession, SessionState};
pub use types::{
    AnalysisRequest, AnalysisResult, AnalysisStatus, AnalysisTask, PlannedStep, StepOutput,
    UsageEvent,
};

use crate::billing::BillingCalculator;
use crate::guidance::{GuidanceCatalog, ANALYZE_FILE, FETCH_GUIDELINES, PATIENT_SUMMARY};
use crate::prompts::PromptStore;
use async_trait::async_trait;
use chrono::Utc;
use sdk::errors::EngineError;
use sdk::guidance::Capability;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Task kind for free-text queries; not in the catalog
pub const ANALYZE_QUERY: &str = "analyze_query";

/// External collaborator that actually touches files, the network and the
/// payment service
#[async_trait]
pub trait CapabilityRuntime: Send + Sync {
    /// Perform one guidance step
    async fn execute_step(
        &self,
        step: &PlannedStep,
        request: &AnalysisRequest,
    ) -> Result<StepOutput, EngineError>;

    /// Write the analysis from the gathered material
    async fn produce_analysis(&self, task: &AnalysisTask<'_>) -> Result<String, EngineError>;

    /// Record one billable usage event
    async fn record_usage(&self, event: UsageEvent) -> Result<(), EngineError>;
}

/// Pick the task kind for a request
///
/// Order: explicit `task`, then an http(s) `file_ref` (fetch), any other
/// `file_ref` (read a document), `patient_id`, and finally a bare `query`.
pub fn resolve_task_kind(request: &AnalysisRequest) -> Result<String, EngineError> {
    if let Some(task) = request.task.as_deref().filter(|t| !t.trim().is_empty()) {
        return Ok(task.to_string());
    }

    if let Some(file_ref) = request.file_ref.as_deref().filter(|f| !f.trim().is_empty()) {
        let lower = file_ref.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(FETCH_GUIDELINES.to_string());
        }
        return Ok(ANALYZE_FILE.to_string());
    }

    if request
        .patient_id
        .as_deref()
        .is_some_and(|p| !p.trim().is_empty())
    {
        return Ok(PATIENT_SUMMARY.to_string());
    }

    if request.query.as_deref().is_some_and(|q| !q.trim().is_empty()) {
        return Ok(ANALYZE_QUERY.to_string());
    }

    Err(EngineError::InvalidInput(
        "request needs a query, file reference, patient id or task".to_string(),
    ))
}

/// Orchestrator parameterized by the capabilities it may use
pub struct AnalysisOrchestrator {
    catalog: Arc<GuidanceCatalog>,
    prompts: Arc<PromptStore>,
    calculator: Arc<BillingCalculator>,
    capabilities: CapabilitySet,
    runtime: Arc<dyn CapabilityRuntime>,
}

impl AnalysisOrchestrator {
    pub fn new(
        catalog: Arc<GuidanceCatalog>,
        prompts: Arc<PromptStore>,
        calculator: Arc<BillingCalculator>,
        capabilities: CapabilitySet,
        runtime: Arc<dyn CapabilityRuntime>,
    ) -> Self {
        Self {
            catalog,
            prompts,
            calculator,
            capabilities,
            runtime,
        }
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn calculator(&self) -> &BillingCalculator {
        &self.calculator
    }

    /// Run one request to a terminal state
    pub async fn run(&self, request: AnalysisRequest) -> AnalysisResult {
        let (_abort, abort_rx) = watch::channel(false);
        self.run_until(request, abort_rx).await
    }

    /// Run one request, failing it as soon as `abort` turns true
    ///
    /// The signal is raced against every collaborator call.
    pub async fn run_until(
        &self,
        request: AnalysisRequest,
        mut abort: watch::Receiver<bool>,
    ) -> AnalysisResult {
        let mut session = AnalysisSession::new();

        match self.drive(&mut session, &request, &mut abort).await {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    state = %session.state(),
                    task = session.task_kind.as_deref().unwrap_or("-"),
                    "Analysis failed: {}",
                    e
                );
                if let Err(transition) = session.fail() {
                    debug!("Session already terminal: {}", transition);
                }
                AnalysisResult::failure(
                    e.to_string(),
                    session.task_kind.clone(),
                    session.completed_steps(),
                )
            }
        }
    }

    async fn drive(
        &self,
        session: &mut AnalysisSession,
        request: &AnalysisRequest,
        abort: &mut watch::Receiver<bool>,
    ) -> Result<AnalysisResult, EngineError> {
        // received -> guided
        self.validate(request)?;
        let task_kind = resolve_task_kind(request)?;
        session.task_kind = Some(task_kind.clone());

        let guidance = self.catalog.get_guidance(&task_kind);
        let missing = self.capabilities.missing(&guidance.required_capabilities);
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(Capability::as_str).collect();
            return Err(EngineError::CapabilityNotEnabled(names.join(", ")));
        }
        session.transition(SessionState::Guided)?;
        info!(task = %task_kind, customer = %request.customer_id, "Analysis guided");

        // guided -> executing
        session.transition(SessionState::Executing)?;
        session.checklist = StepChecklist::new(guidance.ordered_steps.clone());

        let mut materials = Vec::new();
        for step in PlannedStep::plan(&guidance) {
            debug!(index = step.index, capability = ?step.capability, "Executing step");
            let output = guarded(abort, self.runtime.execute_step(&step, request)).await?;
            session.checklist.complete(step.index)?;
            if let Some(material) = output.material {
                materials.push(material);
            }
        }

        if !session.checklist.is_complete() {
            return Err(EngineError::Internal(
                "guidance steps were not all completed".to_string(),
            ));
        }

        // executing -> priced
        let instructions = guidance
            .prompt_ref
            .as_deref()
            .map(|name| self.prompts.get(name, &prompt_context(request, &materials)));

        let task = AnalysisTask {
            request,
            task_kind: &task_kind,
            instructions,
            materials,
        };
        let analysis_text = guarded(abort, self.runtime.produce_analysis(&task)).await?;

        let billing = self.calculator.calculate(
            &request.analysis_type,
            request.document_count,
            &request.customer_class,
        )?;
        session.transition(SessionState::Priced)?;

        // priced -> done
        if self.capabilities.contains(Capability::Payment) {
            let event = UsageEvent {
                customer_id: request.customer_id.clone(),
                quantity: billing.document_count,
                amount_minor_units: billing.final_total_minor_units(),
                description: format!(
                    "{} analysis - {} document(s)",
                    billing.tier, billing.document_count
                ),
                timestamp: Utc::now(),
            };
            guarded(abort, self.runtime.record_usage(event)).await?;
        }
        session.transition(SessionState::Done)?;

        info!(
            task = %task_kind,
            tier = %billing.tier,
            total = %billing.final_total,
            "Analysis complete"
        );

        Ok(AnalysisResult::success(
            task_kind,
            analysis_text,
            billing,
            session.completed_steps(),
        ))
    }

    /// Reject requests that could never be priced before any capability runs
    fn validate(&self, request: &AnalysisRequest) -> Result<(), EngineError> {
        if request.customer_id.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "customer_id must not be empty".to_string(),
            ));
        }
        if request.document_count < 0 {
            return Err(EngineError::InvalidInput(format!(
                "document_count must not be negative, got {}",
                request.document_count
            )));
        }
        let registry = self.calculator.registry();
        if registry.get(&request.analysis_type).is_none() {
            return Err(EngineError::UnknownTier {
                tier: request.analysis_type.clone(),
                available: registry.names(),
            });
        }
        Ok(())
    }
}

/// Await `work` unless the abort signal fires first
async fn guarded<T, F>(abort: &mut watch::Receiver<bool>, work: F) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, EngineError>>,
{
    tokio::select! {
        biased;
        _ = aborted(abort) => Err(EngineError::Aborted("stopped by caller".to_string())),
        result = work => result,
    }
}

/// Resolves once `abort` holds true; never resolves if its sender is gone
async fn aborted(abort: &mut watch::Receiver<bool>) {
    loop {
        if *abort.borrow_and_update() {
            return;
        }
        if abort.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Values available to prompt templates
fn prompt_context(request: &AnalysisRequest, materials: &[String]) -> Map<String, Value> {
    let mut context = Map::new();
    context.insert(
        "analysis_type".to_string(),
        Value::String(request.analysis_type.clone()),
    );
    context.insert("document".to_string(), Value::String(materials.join("\n\n")));
    if let Some(query) = &request.query {
        context.insert("query".to_string(), Value::String(query.clone()));
    }
    if let Some(file_ref) = &request.file_ref {
        context.insert("file".to_string(), Value::String(file_ref.clone()));
    }
    if let Some(patient_id) = &request.patient_id {
        context.insert("patient_id".to_string(), Value::String(patient_id.clone()));
    }
    context
}
