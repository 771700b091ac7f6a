//! Error types and handling
//!
//! This module provides the error types used throughout the MedMeter engine.
//! All errors implement the `ErrorExt` trait which provides user-friendly
//! hints, a stable machine-readable code, and whether the error is recoverable.
//!
//! # Recovery model
//!
//! No error on the request path is fatal to the process. Protocol errors are
//! rendered as error responses, billing and orchestration errors are rendered
//! as structured result objects. Only configuration errors stop startup.

use thiserror::Error;

/// Trait for MedMeter error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait ErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and never contains document
    /// content or patient identifiers.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors resolve to a structured result and the process keeps
    /// serving. Non-recoverable errors require fixing the configuration.
    fn is_recoverable(&self) -> bool;

    /// Stable snake_case identifier used when rendering the error to API clients
    fn code(&self) -> &'static str;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **Protocol**: Malformed messages, unknown methods
/// - **Billing**: Unknown tiers, invalid document counts
/// - **Prompts**: Missing templates (usually degraded to a sentinel string)
/// - **Capabilities**: Faults reported by the external runtime
/// - **Orchestration**: Illegal state machine transitions
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, ErrorExt};
///
/// let error = EngineError::UnknownTier {
///     tier: "platinum".to_string(),
///     available: vec!["basic".to_string()],
/// };
/// assert_eq!(error.code(), "unknown_tier");
/// assert!(error.is_recoverable());
///
/// let fatal_error = EngineError::Config("bad log level".to_string());
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Protocol errors
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    // Billing errors
    #[error("Invalid analysis type '{tier}'. Available types: {}", available.join(", "))]
    UnknownTier { tier: String, available: Vec<String> },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Prompt errors
    #[error("No prompt found for: {0}")]
    PromptNotFound(String),

    // Capability errors
    #[error("{message}")]
    CapabilityFailure { capability: String, message: String },

    #[error("Capability not enabled: {0}")]
    CapabilityNotEnabled(String),

    // Orchestration errors
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Analysis aborted: {0}")]
    Aborted(String),

    #[error("Internal error: {0}")]
    Internal(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),
}

impl EngineError {
    /// Shorthand for a collaborator-reported capability fault
    pub fn capability(capability: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CapabilityFailure {
            capability: capability.into(),
            message: message.into(),
        }
    }
}

impl ErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::Parse(_) => "Send one well-formed JSON object per line",
            Self::UnknownMethod(_) => "Use prompts/list, prompts/get, tools/guidance or tools/list",
            Self::UnknownTier { .. } => "Choose one of the listed analysis types",
            Self::InvalidInput(_) => "Check the request fields and try again",
            Self::PromptNotFound(_) => "List available prompts with prompts/list",
            Self::CapabilityFailure { .. } => "An external capability failed. Try again later",
            Self::CapabilityNotEnabled(_) => "Enable the capability in the orchestrator configuration",
            Self::InvalidTransition { .. } => "The analysis was already finished",
            Self::Aborted(_) => "The analysis was stopped before it finished. Submit it again",
            Self::Internal(_) => "Unexpected internal failure",
            Self::Network(_) => "Network operation failed. Check your connection",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_))
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Parse(_) => "parse_error",
            Self::UnknownMethod(_) => "unknown_method",
            Self::UnknownTier { .. } => "unknown_tier",
            Self::InvalidInput(_) => "invalid_input",
            Self::PromptNotFound(_) => "prompt_not_found",
            Self::CapabilityFailure { .. } => "capability_failure",
            Self::CapabilityNotEnabled(_) => "capability_not_enabled",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Aborted(_) => "aborted",
            Self::Internal(_) => "internal",
            Self::Network(_) => "network",
        }
    }
}
