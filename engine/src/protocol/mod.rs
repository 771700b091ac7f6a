//! Orchestration protocol
//!
//! Line-delimited request/response dispatcher that tells a calling agent
//! which prompts exist and which capabilities to use, in which order, for a
//! given task. The handler never fails: every inbound line produces exactly
//! one outbound line.

pub mod server;

pub use server::{serve, serve_stdio};

use crate::guidance::GuidanceCatalog;
use crate::prompts::{describe, PromptStore};
use sdk::errors::EngineError;
use sdk::types::{ParamError, Params, RpcError, RpcRequest, RpcResponse, DEFAULT_RESPONSE_ID};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Methods understood by the protocol handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolMethod {
    PromptsList,
    PromptsGet,
    ToolsGuidance,
    ToolsList,
}

impl ProtocolMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PromptsList => "prompts/list",
            Self::PromptsGet => "prompts/get",
            Self::ToolsGuidance => "tools/guidance",
            Self::ToolsList => "tools/list",
        }
    }
}

impl fmt::Display for ProtocolMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolMethod {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prompts/list" => Ok(Self::PromptsList),
            "prompts/get" => Ok(Self::PromptsGet),
            "tools/guidance" => Ok(Self::ToolsGuidance),
            "tools/list" => Ok(Self::ToolsList),
            other => Err(EngineError::UnknownMethod(other.to_string())),
        }
    }
}

/// Dispatches protocol messages against the catalog and prompt store
#[derive(Debug, Clone)]
pub struct ProtocolHandler {
    catalog: Arc<GuidanceCatalog>,
    prompts: Arc<PromptStore>,
}

impl ProtocolHandler {
    pub fn new(catalog: Arc<GuidanceCatalog>, prompts: Arc<PromptStore>) -> Self {
        Self { catalog, prompts }
    }

    /// Handle one raw inbound line and return the serialized response line
    pub fn handle_line(&self, line: &str) -> String {
        self.handle_message(line).to_line()
    }

    /// Handle one inbound line that may not be valid UTF-8
    pub fn handle_bytes(&self, raw: &[u8]) -> String {
        match std::str::from_utf8(raw) {
            Ok(line) => self.handle_line(line),
            Err(e) => {
                warn!("Protocol message is not valid UTF-8: {}", e);
                RpcResponse::from_error(Value::Null, &EngineError::Parse(e.to_string())).to_line()
            }
        }
    }

    /// Handle one raw inbound line
    ///
    /// - unparseable JSON: parse error with a null id
    /// - parsed but malformed: internal error with the best-known id
    /// - unknown method: method-not-found error
    pub fn handle_message(&self, line: &str) -> RpcResponse {
        let message: Value = match serde_json::from_str(line.trim()) {
            Ok(value) => value,
            Err(e) => {
                warn!("Unparseable protocol message: {}", e);
                return RpcResponse::from_error(Value::Null, &EngineError::Parse(e.to_string()));
            }
        };

        if !message.is_object() {
            return RpcResponse::from_error(
                Value::from(DEFAULT_RESPONSE_ID),
                &EngineError::InvalidInput("message must be a JSON object".to_string()),
            );
        }

        let id = message
            .get("id")
            .cloned()
            .unwrap_or_else(|| Value::from(DEFAULT_RESPONSE_ID));

        let request: RpcRequest = match serde_json::from_value(message) {
            Ok(request) => request,
            Err(e) => return RpcResponse::from_error(id, &EngineError::InvalidInput(e.to_string())),
        };

        let method = match request.method.parse::<ProtocolMethod>() {
            Ok(method) => method,
            Err(e) => {
                debug!("{}", e);
                return RpcResponse::from_error(request.id, &e);
            }
        };

        debug!(%method, "Handling protocol request");

        match self.dispatch(method, &request.params) {
            Ok(result) => RpcResponse::success(request.id, result),
            Err(e) => RpcResponse::failure(request.id, RpcError::internal_error(e.to_string())),
        }
    }

    /// Run a known method against its parameters
    pub fn dispatch(
        &self,
        method: ProtocolMethod,
        params: &Params,
    ) -> Result<Map<String, Value>, ParamError> {
        let mut result = Map::new();

        match method {
            ProtocolMethod::PromptsList => {
                let prompts: Vec<Value> = self
                    .prompts
                    .list()
                    .into_iter()
                    .map(|name| json!({ "description": describe(&name), "name": name }))
                    .collect();
                result.insert("prompts".to_string(), Value::Array(prompts));
            }
            ProtocolMethod::PromptsGet => {
                let name = optional_str(params, "name")?;
                let context = params.param_object_opt("context")?;
                result.insert(
                    "prompt".to_string(),
                    Value::String(self.prompts.get(&name, &context)),
                );
            }
            ProtocolMethod::ToolsGuidance => {
                let task = optional_str(params, "task")?;
                let guidance = self.catalog.get_guidance(&task);
                result.insert("guidance".to_string(), to_value(&guidance)?);
            }
            ProtocolMethod::ToolsList => {
                result.insert("tools".to_string(), to_value(&self.catalog.tools())?);
            }
        }

        Ok(result)
    }
}

/// String parameter where absence means the empty string
fn optional_str(params: &Params, key: &str) -> Result<String, ParamError> {
    match params.param_str(key) {
        Ok(value) => Ok(value.to_string()),
        Err(ParamError::MissingParameter(_)) => Ok(String::new()),
        Err(e) => Err(e),
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, ParamError> {
    serde_json::to_value(value).map_err(|e| ParamError::InvalidParameter(e.to_string()))
}
