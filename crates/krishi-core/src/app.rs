use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

use crate::tool::{ToolCall, ToolDescriptor, ToolOutput};
use crate::{AppError, Config, Specialist, SpecialistContext, Tool};

struct RegisteredTool {
    specialist: String,
    tool: Arc<dyn Tool>,
}

/// Application state: configuration, registered specialists and the tool index
pub struct App {
    config: Arc<Config>,
    specialists: Vec<Box<dyn Specialist>>,
    tools: HashMap<String, RegisteredTool>,
    context: SpecialistContext,
}

impl App {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let context = SpecialistContext::new(config.clone());

        Self {
            config,
            specialists: Vec::new(),
            tools: HashMap::new(),
            context,
        }
    }

    /// Register a specialist and index its tools by name.
    ///
    /// Tool names are global across specialists; a duplicate is rejected.
    pub fn register_specialist(&mut self, specialist: Box<dyn Specialist>) -> Result<()> {
        tracing::info!("Registering specialist: {}", specialist.name());

        let tools = specialist.tools();
        if let Some(dup) = tools.iter().find(|t| self.tools.contains_key(t.name())) {
            anyhow::bail!(
                "Tool '{}' from specialist '{}' is already registered",
                dup.name(),
                specialist.id()
            );
        }

        for tool in tools {
            tracing::debug!("Registering tool {} -> {}", tool.name(), specialist.id());
            self.tools.insert(
                tool.name().to_string(),
                RegisteredTool {
                    specialist: specialist.id().to_string(),
                    tool,
                },
            );
        }

        self.specialists.push(specialist);
        Ok(())
    }

    pub fn initialize(&mut self) -> Result<()> {
        tracing::info!(
            "Initializing application with {} specialists",
            self.specialists.len()
        );

        for specialist in &mut self.specialists {
            tracing::debug!("Initializing specialist: {}", specialist.name());
            specialist.initialize(&self.context)?;
        }

        tracing::info!("Application initialized successfully");
        Ok(())
    }

    pub fn shutdown(&mut self) -> Result<()> {
        tracing::info!("Shutting down application");

        for specialist in &mut self.specialists {
            tracing::debug!("Shutting down specialist: {}", specialist.name());
            if let Err(e) = specialist.shutdown() {
                tracing::error!("Error shutting down specialist {}: {}", specialist.name(), e);
            }
        }

        Ok(())
    }

    /// Dispatch one tool call to the specialist that owns the tool
    pub async fn call(&self, call: ToolCall) -> Result<ToolOutput, AppError> {
        let registered = self
            .tools
            .get(&call.tool)
            .ok_or_else(|| AppError::NotFound(format!("tool '{}'", call.tool)))?;

        tracing::info!(
            thread_id = %call.thread_id,
            specialist = %registered.specialist,
            "Calling tool {}",
            call.tool
        );

        match registered.tool.execute(call.arguments).await {
            Ok(result) => Ok(ToolOutput {
                thread_id: call.thread_id,
                specialist: registered.specialist.clone(),
                tool: call.tool,
                result,
            }),
            Err(e) => {
                tracing::warn!(thread_id = %call.thread_id, "Tool {} failed: {}", call.tool, e);
                Err(e)
            }
        }
    }

    /// Every registered tool with its owning specialist, in registration order
    pub fn tool_catalog(&self) -> Vec<ToolDescriptor> {
        self.specialists
            .iter()
            .flat_map(|s| {
                s.tools().into_iter().map(move |tool| ToolDescriptor {
                    specialist: s.id().to_string(),
                    name: tool.name().to_string(),
                    description: tool.description().to_string(),
                    schema: tool.schema(),
                })
            })
            .collect()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn specialists(&self) -> &[Box<dyn Specialist>] {
        &self.specialists
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes back the input text"
        }

        fn schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"]
            })
        }

        async fn execute(&self, params: Value) -> Result<Value, AppError> {
            params
                .get("text")
                .cloned()
                .ok_or_else(|| AppError::InvalidInput("text is required".into()))
        }
    }

    struct EchoSpecialist {
        initialized: bool,
    }

    impl Specialist for EchoSpecialist {
        fn id(&self) -> &str {
            "echo_agent"
        }

        fn name(&self) -> &str {
            "Echo"
        }

        fn description(&self) -> &str {
            "Repeats things"
        }

        fn initialize(&mut self, _ctx: &SpecialistContext) -> Result<()> {
            self.initialized = true;
            Ok(())
        }

        fn shutdown(&mut self) -> Result<()> {
            Ok(())
        }

        fn tools(&self) -> Vec<Arc<dyn Tool>> {
            vec![Arc::new(EchoTool)]
        }
    }

    fn echo_app() -> App {
        let mut app = App::new(Config::default());
        app.register_specialist(Box::new(EchoSpecialist { initialized: false }))
            .unwrap();
        app
    }

    #[tokio::test]
    async fn test_call_dispatches_to_owning_specialist() {
        let app = echo_app();
        let call = ToolCall::new("echo", json!({"text": "namaste"})).with_thread("t1");

        let output = app.call(call).await.unwrap();
        assert_eq!(output.result, json!("namaste"));
        assert_eq!(output.specialist, "echo_agent");
        assert_eq!(output.thread_id, "t1");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_found() {
        let app = echo_app();
        let err = app.call(ToolCall::new("nope", json!({}))).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_tool_errors_propagate() {
        let app = echo_app();
        let err = app.call(ToolCall::new("echo", json!({}))).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_duplicate_tool_names_rejected() {
        let mut app = echo_app();
        let result = app.register_specialist(Box::new(EchoSpecialist { initialized: false }));
        assert!(result.is_err());
        assert_eq!(app.specialists().len(), 1);
    }

    #[test]
    fn test_catalog_lists_tools() {
        let mut app = echo_app();
        app.initialize().unwrap();
        let catalog = app.tool_catalog();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].name, "echo");
        assert_eq!(catalog[0].specialist, "echo_agent");
    }
}
