//! The tool-call boundary.
//!
//! The orchestrator (an LLM supervisor that lives outside this workspace)
//! sees every data function as a named tool with a JSON schema. It sends a
//! [`ToolCall`] and gets back a [`ToolOutput`] or an [`AppError`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::AppError;

/// A deterministic data function the orchestrator can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the orchestrator calls the tool by
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the parameters object
    fn schema(&self) -> Value;

    /// Execute the tool with the given parameters
    async fn execute(&self, params: Value) -> Result<Value, AppError>;
}

/// One invocation from the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Conversation thread this call belongs to; only used for log correlation
    pub thread_id: String,
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    /// New call on a fresh thread
    pub fn new(tool: impl Into<String>, arguments: Value) -> Self {
        Self {
            thread_id: new_thread_id(),
            tool: tool.into(),
            arguments,
        }
    }

    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = thread_id.into();
        self
    }
}

/// Result of a successful invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutput {
    pub thread_id: String,
    pub specialist: String,
    pub tool: String,
    pub result: Value,
}

/// Catalog entry describing a registered tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub specialist: String,
    pub name: String,
    pub description: String,
    pub schema: Value,
}

/// Fresh conversation thread identifier (UUID v4, hex without dashes)
pub fn new_thread_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Decode a tool's parameters object into its typed arguments.
pub fn parse_args<T: DeserializeOwned>(tool: &str, params: Value) -> Result<T, AppError> {
    let params = if params.is_null() {
        Value::Object(Default::default())
    } else {
        params
    };

    serde_json::from_value(params)
        .map_err(|e| AppError::InvalidInput(format!("{tool}: {e}")))
}
