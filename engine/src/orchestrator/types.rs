//! Orchestrator request, result and collaborator types

use chrono::{DateTime, Utc};
use sdk::billing::BillingResult;
use sdk::guidance::{Capability, GuidanceEntry};
use serde::{Deserialize, Serialize};

/// One analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub customer_id: String,

    /// Billing tier name
    #[serde(default = "default_analysis_type", alias = "type")]
    pub analysis_type: String,

    #[serde(default = "default_customer_class", alias = "customer_tier")]
    pub customer_class: String,

    #[serde(default)]
    pub query: Option<String>,

    /// Path inside the workspace, or an http(s) URL
    #[serde(default, alias = "file_path")]
    pub file_ref: Option<String>,

    #[serde(default)]
    pub patient_id: Option<String>,

    #[serde(default = "default_document_count")]
    pub document_count: i64,

    /// Explicit task kind, bypassing resolution from the other fields
    #[serde(default)]
    pub task: Option<String>,
}

fn default_analysis_type() -> String {
    "basic".to_string()
}

fn default_customer_class() -> String {
    "standard".to_string()
}

fn default_document_count() -> i64 {
    1
}

impl AnalysisRequest {
    pub fn new(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            analysis_type: default_analysis_type(),
            customer_class: default_customer_class(),
            query: None,
            file_ref: None,
            patient_id: None,
            document_count: default_document_count(),
            task: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_file(mut self, file_ref: impl Into<String>) -> Self {
        self.file_ref = Some(file_ref.into());
        self
    }

    pub fn with_patient(mut self, patient_id: impl Into<String>) -> Self {
        self.patient_id = Some(patient_id.into());
        self
    }

    pub fn with_tier(mut self, analysis_type: impl Into<String>) -> Self {
        self.analysis_type = analysis_type.into();
        self
    }

    pub fn with_customer_class(mut self, customer_class: impl Into<String>) -> Self {
        self.customer_class = customer_class.into();
        self
    }

    pub fn with_document_count(mut self, document_count: i64) -> Self {
        self.document_count = document_count;
        self
    }

    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }
}

/// Terminal status of an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Success,
    Error,
    Processing,
}

/// Outcome of one analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub status: AnalysisStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing: Option<BillingResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_kind: Option<String>,
    #[serde(default)]
    pub steps_completed: Vec<String>,
}

impl AnalysisResult {
    pub fn success(
        task_kind: String,
        analysis_text: String,
        billing: BillingResult,
        steps_completed: Vec<String>,
    ) -> Self {
        Self {
            status: AnalysisStatus::Success,
            analysis_text: Some(analysis_text),
            billing: Some(billing),
            error: None,
            job_id: None,
            task_kind: Some(task_kind),
            steps_completed,
        }
    }

    /// Failed analysis; never carries billing
    pub fn failure(
        error: impl Into<String>,
        task_kind: Option<String>,
        steps_completed: Vec<String>,
    ) -> Self {
        Self {
            status: AnalysisStatus::Error,
            analysis_text: None,
            billing: None,
            error: Some(error.into()),
            job_id: None,
            task_kind,
            steps_completed,
        }
    }

    /// Accepted for background processing
    pub fn processing(job_id: impl Into<String>) -> Self {
        Self {
            status: AnalysisStatus::Processing,
            analysis_text: None,
            billing: None,
            error: None,
            job_id: Some(job_id.into()),
            task_kind: None,
            steps_completed: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == AnalysisStatus::Success
    }
}

/// A guidance step bound to the capability it exercises
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub index: usize,
    pub instruction: String,
    /// Capability named by the instruction, if any
    pub capability: Option<Capability>,
}

impl PlannedStep {
    /// Expand a guidance entry into its ordered steps
    ///
    /// A step is bound to the first required capability whose name appears
    /// as a word in its instruction.
    pub fn plan(entry: &GuidanceEntry) -> Vec<PlannedStep> {
        entry
            .ordered_steps
            .iter()
            .enumerate()
            .map(|(index, instruction)| {
                let lower = instruction.to_lowercase();
                let capability = entry.required_capabilities.iter().copied().find(|cap| {
                    lower
                        .split(|c: char| !c.is_alphanumeric())
                        .any(|word| word == cap.as_str())
                });
                PlannedStep {
                    index,
                    instruction: instruction.clone(),
                    capability,
                }
            })
            .collect()
    }
}

/// What a collaborator returns for one executed step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutput {
    /// Content gathered by the step (document text, fetched page)
    pub material: Option<String>,
}

impl StepOutput {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn material(text: impl Into<String>) -> Self {
        Self {
            material: Some(text.into()),
        }
    }
}

/// Everything the collaborator needs to write the analysis
#[derive(Debug, Clone)]
pub struct AnalysisTask<'a> {
    pub request: &'a AnalysisRequest,
    pub task_kind: &'a str,
    /// Rendered prompt template, when the guidance names one
    pub instructions: Option<String>,
    /// Material gathered by the executed steps, in step order
    pub materials: Vec<String>,
}

/// Billable usage reported to the payment collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEvent {
    pub customer_id: String,
    pub quantity: u64,
    pub amount_minor_units: i64,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guidance::{get_tool_guidance, ANALYZE_FILE, BILLING};
    use serde_json::json;

    #[test]
    fn test_request_defaults_and_aliases() {
        let req: AnalysisRequest = serde_json::from_value(json!({
            "customer_id": "cus_1",
            "type": "comprehensive",
            "file_path": "notes/visit.txt"
        }))
        .unwrap();

        assert_eq!(req.analysis_type, "comprehensive");
        assert_eq!(req.customer_class, "standard");
        assert_eq!(req.file_ref.as_deref(), Some("notes/visit.txt"));
        assert_eq!(req.document_count, 1);
    }

    #[test]
    fn test_plan_binds_capabilities() {
        let steps = PlannedStep::plan(&get_tool_guidance(ANALYZE_FILE));

        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].capability, Some(Capability::Filesystem));
        assert_eq!(steps[1].capability, None);
        assert_eq!(steps[2].capability, None);
    }

    #[test]
    fn test_plan_billing_binds_payment() {
        let steps = PlannedStep::plan(&get_tool_guidance(BILLING));

        assert_eq!(steps[0].capability, None);
        assert_eq!(steps[1].capability, Some(Capability::Payment));
    }

    #[test]
    fn test_failure_result_shape() {
        let result = AnalysisResult::failure("boom", Some("analyze_file".into()), vec![]);
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], "boom");
        assert!(value.get("billing").is_none());
    }
}
