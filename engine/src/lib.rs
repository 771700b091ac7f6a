//! MedMeter Engine Library
//!
//! This library provides the core functionality of the MedMeter engine.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Telemetry and Observability
pub mod telemetry;

/// Task kind guidance catalog
pub mod guidance;

/// Prompt template store
pub mod prompts;

/// Line-delimited JSON-RPC protocol handler
pub mod protocol;

/// Per-document billing
pub mod billing;

/// Guided analysis orchestration
pub mod orchestrator;

/// Local capability runtime (filesystem, fetch, usage ledger)
pub mod runtime;

/// Shared engine components
pub mod context;

/// HTTP API
pub mod api;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
