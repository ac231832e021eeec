//! JSON-RPC 2.0 envelopes and error codes.

use crate::services::QueryError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const JSONRPC_VERSION: &str = "2.0";

/// Standard and proxy-specific error codes
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    /// A native call reported an I/O failure
    pub const NATIVE_TRANSPORT: i64 = -32000;
    /// A native call succeeded but one of its rows could not be read
    pub const DATA_RETRIEVAL: i64 = -32001;
    /// The native session is not running
    pub const SESSION_UNAVAILABLE: i64 = -32002;
}

fn default_version() -> String {
    JSONRPC_VERSION.to_string()
}

/// A request or, when `id` is absent, a notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default = "default_version")]
    pub jsonrpc: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    pub method: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: default_version(),
            id: Some(Value::from(id)),
            method: method.into(),
            params: Some(params),
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,

    pub id: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Turn the envelope into the call's outcome
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, RpcError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let result = self.result.unwrap_or(Value::Null);
        serde_json::from_value(result).map_err(|e| {
            RpcError::new(codes::INTERNAL_ERROR, format!("Malformed result: {}", e))
        })
    }
}

/// JSON-RPC error object
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("JSON-RPC error {code}: {message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn parse_error(error: impl std::fmt::Display) -> Self {
        Self::new(codes::PARSE_ERROR, format!("Parse error: {}", error))
    }

    pub fn invalid_request(reason: impl std::fmt::Display) -> Self {
        Self::new(codes::INVALID_REQUEST, format!("Invalid request: {}", reason))
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )
    }

    pub fn invalid_params(reason: impl std::fmt::Display) -> Self {
        Self::new(codes::INVALID_PARAMS, format!("Invalid params: {}", reason))
    }

    pub fn internal(reason: impl std::fmt::Display) -> Self {
        Self::new(codes::INTERNAL_ERROR, format!("Internal error: {}", reason))
    }
}

impl From<QueryError> for RpcError {
    fn from(error: QueryError) -> Self {
        let code = match &error {
            QueryError::Transport => codes::NATIVE_TRANSPORT,
            QueryError::DataRetrieval(_) => codes::DATA_RETRIEVAL,
            QueryError::SessionClosed => codes::SESSION_UNAVAILABLE,
            QueryError::UnexpectedCompletion { .. } => codes::INTERNAL_ERROR,
        };
        Self::new(code, error.to_string())
    }
}

/// Method parameters, given either positionally or by name
#[derive(Debug)]
pub struct Params {
    names: &'static [&'static str],
    values: Vec<Option<Value>>,
}

impl Params {
    pub fn parse(params: Option<Value>, names: &'static [&'static str]) -> Result<Self, RpcError> {
        let values = match params {
            None | Some(Value::Null) => vec![None; names.len()],
            Some(Value::Array(items)) => {
                if items.len() > names.len() {
                    return Err(RpcError::invalid_params(format!(
                        "expected at most {} parameters, got {}",
                        names.len(),
                        items.len()
                    )));
                }
                let mut values: Vec<Option<Value>> = items.into_iter().map(Some).collect();
                values.resize(names.len(), None);
                values
            }
            Some(Value::Object(mut map)) => names.iter().map(|name| map.remove(*name)).collect(),
            Some(other) => {
                return Err(RpcError::invalid_params(format!(
                    "params must be an array or an object, got {}",
                    other
                )));
            }
        };
        Ok(Self { names, values })
    }

    pub fn required<T: DeserializeOwned>(&mut self, index: usize) -> Result<T, RpcError> {
        match self.optional(index)? {
            Some(value) => Ok(value),
            None => Err(RpcError::invalid_params(format!(
                "missing parameter '{}'",
                self.names[index]
            ))),
        }
    }

    /// `None` when the parameter is absent or null
    pub fn optional<T: DeserializeOwned>(&mut self, index: usize) -> Result<Option<T>, RpcError> {
        match self.values.get_mut(index).and_then(Option::take) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                RpcError::invalid_params(format!("parameter '{}': {}", self.names[index], e))
            }),
        }
    }
}
