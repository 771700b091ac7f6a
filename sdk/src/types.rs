//! Protocol wire types
//!
//! One JSON object per line in each direction. Inbound messages carry
//! `{method, params, id}`; outbound responses carry `{jsonrpc, id}` plus either
//! the result fields flattened into the top level or an `error` object.

use crate::errors::EngineError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Protocol version stamped on every response
pub const JSONRPC_VERSION: &str = "2.0";

/// Line was not valid JSON
pub const PARSE_ERROR: i64 = -32700;

/// Method name not recognized
pub const METHOD_NOT_FOUND: i64 = -32601;

/// Message parsed but was malformed, or handling failed
pub const INTERNAL_ERROR: i64 = -32603;

/// Id assumed when an inbound message omits one
pub const DEFAULT_RESPONSE_ID: i64 = 1;

/// Parameters of an inbound message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(pub Map<String, Value>);

impl Params {
    /// Get a required string parameter
    pub fn param_str(&self, key: &str) -> Result<&str, ParamError> {
        match self.0.get(key) {
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(ParamError::InvalidParameter(format!(
                "'{}' must be a string",
                key
            ))),
            None => Err(ParamError::MissingParameter(key.to_string())),
        }
    }

    /// Get an optional object parameter; absent or null yields an empty map
    pub fn param_object_opt(&self, key: &str) -> Result<Map<String, Value>, ParamError> {
        match self.0.get(key) {
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(Value::Null) | None => Ok(Map::new()),
            Some(_) => Err(ParamError::InvalidParameter(format!(
                "'{}' must be an object",
                key
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Inbound protocol message
///
/// A missing method is the empty string, and missing or null params are an
/// empty object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub method: String,
    #[serde(default, deserialize_with = "params_or_empty")]
    pub params: Params,
    #[serde(default = "default_id")]
    pub id: Value,
}

fn default_id() -> Value {
    Value::from(DEFAULT_RESPONSE_ID)
}

fn params_or_empty<'de, D>(deserializer: D) -> Result<Params, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Params>::deserialize(deserializer)?.unwrap_or_default())
}

/// Error object of a failed response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn parse_error(detail: impl Into<String>) -> Self {
        Self {
            code: PARSE_ERROR,
            message: "Parse error".to_string(),
            data: Some(Value::String(detail.into())),
        }
    }

    pub fn internal_error(detail: impl Into<String>) -> Self {
        Self {
            code: INTERNAL_ERROR,
            message: "Internal error".to_string(),
            data: Some(Value::String(detail.into())),
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: METHOD_NOT_FOUND,
            message: format!("Unknown method: {}", method),
            data: None,
        }
    }
}

impl From<&EngineError> for RpcError {
    fn from(err: &EngineError) -> Self {
        match err {
            EngineError::Parse(detail) => Self::parse_error(detail.clone()),
            EngineError::UnknownMethod(method) => Self::method_not_found(method),
            other => Self::internal_error(other.to_string()),
        }
    }
}

/// Outbound protocol message
///
/// On success `result` holds the method's fields and is flattened into the
/// top-level object. On failure `result` is empty and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    #[serde(flatten)]
    pub result: Map<String, Value>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Map<String, Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            error: None,
            result,
        }
    }

    pub fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            error: Some(error),
            result: Map::new(),
        }
    }

    /// Failure response rendered from an engine error
    pub fn from_error(id: Value, err: &EngineError) -> Self {
        Self::failure(id, RpcError::from(err))
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Serialize to a single line without the trailing newline
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"jsonrpc":"{}","id":null,"error":{{"code":{},"message":"Internal error"}}}}"#,
                JSONRPC_VERSION, INTERNAL_ERROR
            )
        })
    }
}

/// Parameter extraction errors
#[derive(Debug, thiserror::Error)]
pub enum ParamError {
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
