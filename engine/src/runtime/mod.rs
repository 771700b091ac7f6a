//! Local capability runtime
//!
//! Default [`CapabilityRuntime`] used by the CLI and HTTP API:
//! - filesystem: workspace-confined document and patient record reads
//! - fetch: HTTP GET of external guidelines
//! - payment: in-memory [`UsageLedger`]
//!
//! Analysis text comes from a keyword analyzer, not a language model.

pub mod analyzer;
pub mod documents;
pub mod fetch;
pub mod ledger;

pub use analyzer::{DocumentFindings, KeywordAnalyzer};
pub use documents::{DocumentGuard, DocumentReader};
pub use fetch::Fetcher;
pub use ledger::UsageLedger;

use crate::config::OrchestratorConfig;
use crate::orchestrator::{
    AnalysisRequest, AnalysisTask, CapabilityRuntime, PlannedStep, StepOutput, UsageEvent,
};
use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::guidance::Capability;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct LocalRuntime {
    documents: DocumentReader,
    fetcher: Fetcher,
    analyzer: KeywordAnalyzer,
    ledger: Arc<UsageLedger>,
}

impl LocalRuntime {
    pub fn new(workspace: &Path, fetch_timeout: Duration) -> Result<Self, EngineError> {
        Ok(Self {
            documents: DocumentReader::new(workspace)?,
            fetcher: Fetcher::new(fetch_timeout)?,
            analyzer: KeywordAnalyzer::new()?,
            ledger: Arc::new(UsageLedger::new()),
        })
    }

    pub fn from_config(config: &OrchestratorConfig) -> Result<Self, EngineError> {
        Self::new(
            &config.workspace,
            Duration::from_secs(config.fetch_timeout_secs),
        )
    }

    pub fn ledger(&self) -> Arc<UsageLedger> {
        Arc::clone(&self.ledger)
    }

    pub fn workspace(&self) -> &Path {
        self.documents.workspace()
    }

    async fn read(&self, request: &AnalysisRequest) -> Result<StepOutput, EngineError> {
        if let Some(file_ref) = request.file_ref.as_deref().filter(|f| !f.trim().is_empty()) {
            return Ok(StepOutput::material(
                self.documents.read_document(file_ref).await?,
            ));
        }
        if let Some(patient_id) = request.patient_id.as_deref().filter(|p| !p.trim().is_empty()) {
            return Ok(StepOutput::material(
                self.documents.read_patient_record(patient_id).await?,
            ));
        }
        Err(EngineError::InvalidInput(
            "filesystem step needs a file reference or patient id".to_string(),
        ))
    }
}

#[async_trait]
impl CapabilityRuntime for LocalRuntime {
    async fn execute_step(
        &self,
        step: &PlannedStep,
        request: &AnalysisRequest,
    ) -> Result<StepOutput, EngineError> {
        match step.capability {
            Some(Capability::Filesystem) => self.read(request).await,
            Some(Capability::Fetch) => {
                let url = request.file_ref.as_deref().ok_or_else(|| {
                    EngineError::InvalidInput("fetch step needs a URL".to_string())
                })?;
                Ok(StepOutput::material(self.fetcher.fetch(url).await?))
            }
            // Charges are recorded once the analysis is priced
            Some(Capability::Payment) | None => {
                debug!("Step {} needs no local action: {}", step.index, step.instruction);
                Ok(StepOutput::empty())
            }
        }
    }

    async fn produce_analysis(&self, task: &AnalysisTask<'_>) -> Result<String, EngineError> {
        let mut sections: Vec<&str> = task.materials.iter().map(String::as_str).collect();
        if let Some(query) = task.request.query.as_deref() {
            sections.push(query);
        }
        let text = sections.join("\n\n");

        if text.trim().is_empty() {
            return Err(EngineError::InvalidInput(format!(
                "Nothing to analyze for task {}",
                task.task_kind
            )));
        }

        let document_count = u64::try_from(task.request.document_count).unwrap_or(0);
        let findings = self
            .analyzer
            .analyze(&text, &task.request.analysis_type, document_count);

        Ok(findings.render())
    }

    async fn record_usage(&self, event: UsageEvent) -> Result<(), EngineError> {
        self.ledger.record(event).await;
        Ok(())
    }
}
