//! MedMeter SDK
//!
//! Shared vocabulary for MedMeter components: the error taxonomy, protocol
//! wire types, billing value types and the guidance/capability model.
//! This crate performs no I/O.

/// Billing value types
pub mod billing;

/// Error types and handling
pub mod errors;

/// Guidance entries and capabilities
pub mod guidance;

/// Protocol wire types
pub mod types;

// Re-export commonly used types
pub use billing::{
    BillingOutcome, BillingRequest, BillingResult, CustomerClass, ErrorBody, Tier, CURRENCY,
};
pub use errors::{EngineError, ErrorExt};
pub use guidance::{Capability, GuidanceEntry, ToolDescriptor, NO_GUIDANCE_STEP};
pub use types::{ParamError, Params, RpcError, RpcRequest, RpcResponse};
