//! HTTP API
//!
//! # Endpoints
//!
//! - GET /health - Liveness check
//! - POST /api/analyze - Analyze inline, or queue a background job
//! - GET /api/job/:id - Background job result, handed out once
//! - GET /api/billing/tiers - Tier price list
//! - POST /api/billing/calculate - Price a request
//! - GET /api/services - Service catalog
//!
//! Malformed JSON bodies are answered with the endpoint's own error shape.

use crate::context::EngineContext;
use crate::orchestrator::{AnalysisRequest, AnalysisResult};
use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use sdk::billing::{BillingOutcome, BillingRequest, ErrorBody, CURRENCY};
use sdk::errors::EngineError;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use uuid::Uuid;

const SERVICE_NAME: &str = "medmeter";

/// State shared across handlers
#[derive(Clone)]
struct ApiState {
    ctx: EngineContext,
    /// Finished jobs, removed when fetched
    jobs: Arc<RwLock<HashMap<String, AnalysisResult>>>,
    sync_query_limit: usize,
}

/// Build the router; used directly by tests
pub fn router(ctx: EngineContext) -> Router {
    let state = ApiState {
        sync_query_limit: ctx.config.api.sync_query_limit,
        ctx,
        jobs: Arc::new(RwLock::new(HashMap::new())),
    };

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/analyze", post(analyze_handler))
        .route("/api/job/:id", get(job_handler))
        .route("/api/billing/tiers", get(tiers_handler))
        .route("/api/billing/calculate", post(calculate_handler))
        .route("/api/services", get(services_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until Ctrl-C
pub async fn serve(ctx: EngineContext) -> Result<()> {
    let addr = format!("{}:{}", ctx.config.api.host, ctx.config.api.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("API server listening on http://{}", addr);

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("API server shutting down gracefully");
        })
        .await
        .context("API server error")?;

    Ok(())
}

async fn health_handler() -> Json<Value> {
    Json(json!({"status": "healthy", "service": SERVICE_NAME}))
}

async fn analyze_handler(
    State(state): State<ApiState>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let err = EngineError::InvalidInput(rejection.body_text());
            let result = AnalysisResult::failure(err.to_string(), None, Vec::new());
            return (rejection.status(), Json(result)).into_response();
        }
    };

    let inline = request.file_ref.is_some()
        || request
            .query
            .as_deref()
            .is_some_and(|q| q.chars().count() < state.sync_query_limit);

    if inline {
        let result = state.ctx.orchestrator.run(request).await;
        return (StatusCode::OK, Json(result)).into_response();
    }

    let job_id = Uuid::new_v4().to_string();
    info!(job = %job_id, customer = %request.customer_id, "Queued background analysis");

    let orchestrator = Arc::clone(&state.ctx.orchestrator);
    let jobs = Arc::clone(&state.jobs);
    let id = job_id.clone();
    tokio::spawn(async move {
        let mut result = orchestrator.run(request).await;
        result.job_id = Some(id.clone());
        if !result.is_success() {
            error!(job = %id, "Background analysis failed");
        }
        jobs.write().await.insert(id, result);
    });

    (StatusCode::ACCEPTED, Json(AnalysisResult::processing(job_id))).into_response()
}

/// Finished results are removed once read
async fn job_handler(State(state): State<ApiState>, Path(job_id): Path<String>) -> Response {
    let finished = state.jobs.write().await.remove(&job_id);
    match finished {
        Some(result) => Json(result).into_response(),
        None => Json(json!({"status": "pending", "job_id": job_id})).into_response(),
    }
}

async fn tiers_handler(State(state): State<ApiState>) -> Json<Value> {
    Json(Value::Object(tier_table(&state.ctx)))
}

async fn calculate_handler(
    State(state): State<ApiState>,
    payload: Result<Json<BillingRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let err = EngineError::InvalidInput(rejection.body_text());
            let outcome = BillingOutcome::Rejected {
                error: ErrorBody::from(&err),
            };
            return (rejection.status(), Json(outcome)).into_response();
        }
    };

    let outcome = state.ctx.calculator.calculate_billing(
        &request.tier_name,
        request.document_count,
        &request.customer_class,
    );
    let status = match &outcome {
        BillingOutcome::Billed(_) => StatusCode::OK,
        BillingOutcome::Rejected { .. } => StatusCode::BAD_REQUEST,
    };
    (status, Json(outcome)).into_response()
}

async fn services_handler(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({
        "service_catalog": {
            "name": "Medical Document Analysis Service",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Medical document analysis with per-document billing",
            "currency": CURRENCY,
            "billing_tiers": tier_table(&state.ctx),
            "features": {
                "basic": [
                    "Vital signs extraction",
                    "Medication identification",
                    "Basic condition recognition"
                ],
                "comprehensive": [
                    "All basic features",
                    "Risk factor analysis",
                    "Follow-up recommendations"
                ],
                "batch": [
                    "Bulk document processing",
                    "Volume discounts"
                ]
            },
            "supported_document_types": [
                "SOAP notes",
                "Lab reports",
                "Prescription summaries",
                "Patient histories",
                "Discharge summaries"
            ],
            "task_kinds": state.ctx.catalog.task_kinds(),
        }
    }))
}

fn tier_table(ctx: &EngineContext) -> Map<String, Value> {
    ctx.calculator
        .registry()
        .tiers()
        .iter()
        .map(|tier| {
            (
                tier.name.clone(),
                json!({
                    "price_per_document": tier.unit_price,
                    "description": tier.description,
                }),
            )
        })
        .collect()
}
