use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::DottedPath;

/// The `{ procedure, variables }` pair a client hands to its transport and a
/// router accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub procedure: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
}

impl Request {
    pub fn new(procedure: impl Into<String>, variables: Option<Value>) -> Self {
        Request {
            procedure: procedure.into(),
            variables,
        }
    }

    pub fn for_path(path: &DottedPath, variables: Option<Value>) -> Self {
        Self::new(path.as_str(), variables)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outcome {
    Success { value: Value },
    Error { error: crate::error::RpcError },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}
