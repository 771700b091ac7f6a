//! Integration tests for the local capability runtime
//!
//! Runs full analyses through the orchestrator against a temporary
//! workspace and a mock guidelines server.

use medmeter_engine::billing::BillingCalculator;
use medmeter_engine::guidance::{GuidanceCatalog, FETCH_GUIDELINES};
use medmeter_engine::orchestrator::{AnalysisOrchestrator, AnalysisRequest, CapabilitySet};
use medmeter_engine::prompts::PromptStore;
use medmeter_engine::runtime::fetch::MAX_BODY_BYTES;
use medmeter_engine::runtime::{Fetcher, LocalRuntime, UsageLedger};
use sdk::errors::EngineError;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VISIT_NOTE: &str = "BP 150/95, HR 88. On lisinopril. History of hypertension.";

async fn workspace() -> TempDir {
    let temp = TempDir::new().unwrap();
    tokio::fs::write(temp.path().join("visit.txt"), VISIT_NOTE)
        .await
        .unwrap();
    tokio::fs::create_dir(temp.path().join("patients"))
        .await
        .unwrap();
    tokio::fs::write(
        temp.path().join("patients/patient_001.txt"),
        "Type 2 diabetes, on metformin. Temp 99.1F.",
    )
    .await
    .unwrap();
    temp
}

fn orchestrator(temp: &TempDir, timeout: Duration) -> (AnalysisOrchestrator, Arc<UsageLedger>) {
    let runtime = LocalRuntime::new(temp.path(), timeout).unwrap();
    let ledger = runtime.ledger();
    let orch = AnalysisOrchestrator::new(
        Arc::new(GuidanceCatalog::reference()),
        Arc::new(PromptStore::default()),
        Arc::new(BillingCalculator::default()),
        CapabilitySet::all(),
        Arc::new(runtime),
    );
    (orch, ledger)
}

#[tokio::test]
async fn test_analyze_workspace_document() {
    let temp = workspace().await;
    let (orch, ledger) = orchestrator(&temp, Duration::from_secs(5));

    let result = orch
        .run(
            AnalysisRequest::new("cus_1")
                .with_file("visit.txt")
                .with_tier("comprehensive"),
        )
        .await;

    assert!(result.is_success(), "{:?}", result.error);
    let text = result.analysis_text.unwrap();
    assert!(text.contains("Medications: Lisinopril"));
    assert!(text.contains("Risk factors: High blood pressure detected"));
    assert!(text.contains("Follow up with cardiologist"));

    assert_eq!(ledger.len().await, 1);
    assert_eq!(ledger.total_for("cus_1").await, 50);
}

#[tokio::test]
async fn test_patient_summary_from_record() {
    let temp = workspace().await;
    let (orch, ledger) = orchestrator(&temp, Duration::from_secs(5));

    let result = orch
        .run(AnalysisRequest::new("cus_1").with_patient("patient_001"))
        .await;

    assert!(result.is_success(), "{:?}", result.error);
    let text = result.analysis_text.unwrap();
    assert!(text.contains("Conditions: Diabetes"));
    assert!(text.contains("Medications: Metformin"));
    assert_eq!(ledger.total_for("cus_1").await, 10);
}

#[tokio::test]
async fn test_unknown_patient_records_no_usage() {
    let temp = workspace().await;
    let (orch, ledger) = orchestrator(&temp, Duration::from_secs(5));

    let result = orch
        .run(AnalysisRequest::new("cus_1").with_patient("patient_404"))
        .await;

    assert_eq!(result.error.as_deref(), Some("Patient patient_404 not found"));
    assert!(result.billing.is_none());
    assert!(ledger.is_empty().await);
}

#[tokio::test]
async fn test_document_outside_workspace_is_refused() {
    let temp = workspace().await;
    let (orch, ledger) = orchestrator(&temp, Duration::from_secs(5));

    let result = orch
        .run(AnalysisRequest::new("cus_1").with_file("/etc/hostname"))
        .await;

    assert!(!result.is_success());
    assert!(ledger.is_empty().await);
}

#[tokio::test]
async fn test_fetch_guidelines_from_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/guidelines/htn"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("Hypertension: start lisinopril when BP exceeds 140/90."),
        )
        .mount(&server)
        .await;

    let temp = workspace().await;
    let (orch, ledger) = orchestrator(&temp, Duration::from_secs(5));

    let result = orch
        .run(AnalysisRequest::new("cus_1").with_file(format!("{}/guidelines/htn", server.uri())))
        .await;

    assert!(result.is_success(), "{:?}", result.error);
    assert_eq!(result.task_kind.as_deref(), Some(FETCH_GUIDELINES));
    assert!(result.analysis_text.unwrap().contains("Conditions: Hypertension"));
    assert_eq!(ledger.len().await, 1);
}

#[tokio::test]
async fn test_fetch_error_status_fails_analysis() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let temp = workspace().await;
    let (orch, ledger) = orchestrator(&temp, Duration::from_secs(5));

    let result = orch
        .run(AnalysisRequest::new("cus_1").with_file(format!("{}/down", server.uri())))
        .await;

    assert!(result.error.unwrap().contains("503"));
    assert!(ledger.is_empty().await);
}

#[tokio::test]
async fn test_fetch_timeout_is_capability_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(Duration::from_millis(200)).unwrap();
    let err = fetcher.fetch(&format!("{}/slow", server.uri())).await.unwrap_err();

    assert!(matches!(err, EngineError::CapabilityFailure { .. }));
    assert!(err.to_string().contains("Timed out"));
}

#[tokio::test]
async fn test_oversized_body_is_refused() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'a'; MAX_BODY_BYTES + 1]))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(Duration::from_secs(5)).unwrap();
    let err = fetcher.fetch(&format!("{}/huge", server.uri())).await.unwrap_err();

    assert!(matches!(err, EngineError::CapabilityFailure { .. }));
    assert!(err.to_string().contains("exceeds"));
}

#[tokio::test]
async fn test_body_at_limit_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'a'; MAX_BODY_BYTES]))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(Duration::from_secs(5)).unwrap();
    let body = fetcher.fetch(&format!("{}/full", server.uri())).await.unwrap();

    assert_eq!(body.len(), MAX_BODY_BYTES);
}
