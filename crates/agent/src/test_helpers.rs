//! Shared test helpers for agent tests.

use std::sync::Mutex;
use steward_core::error::{ProviderError, ToolError};
use steward_core::message::{Message, Part, ToolCall};
use steward_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use steward_core::Tool;

/// A mock provider that returns a sequence of scripted outcomes.
///
/// Each call to `complete` returns the next entry in the queue.
/// Panics if more calls are made than entries provided.
pub struct SequentialMockProvider {
    outcomes: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    call_count: Mutex<usize>,
}

impl SequentialMockProvider {
    pub fn new(outcomes: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes),
            call_count: Mutex::new(0),
        }
    }

    /// A provider that returns a single text reply.
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![Ok(text_response(text))])
    }

    /// A provider that first requests operations, then answers.
    pub fn calls_then_answer(calls: Vec<ToolCall>, thought: &str, answer: &str) -> Self {
        Self::new(vec![
            Ok(call_response(calls, thought)),
            Ok(text_response(answer)),
        ])
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut count = self.call_count.lock().unwrap();
        let outcomes = self.outcomes.lock().unwrap();

        if *count >= outcomes.len() {
            panic!(
                "SequentialMockProvider: no more outcomes (call #{}, have {})",
                *count,
                outcomes.len()
            );
        }

        let outcome = outcomes[*count].clone();
        *count += 1;
        outcome
    }
}

/// A plain text reply.
pub fn text_response(text: &str) -> ProviderResponse {
    response_with(Message::model_text(text))
}

/// A reply requesting operations, with optional thought text.
pub fn call_response(calls: Vec<ToolCall>, thought: &str) -> ProviderResponse {
    let mut parts: Vec<Part> = Vec::new();
    if !thought.is_empty() {
        parts.push(Part::Text {
            text: thought.to_string(),
        });
    }
    parts.extend(calls.into_iter().map(Part::Call));
    response_with(Message::model(parts))
}

/// A reply with no content parts at all.
pub fn empty_response() -> ProviderResponse {
    response_with(Message::model(Vec::new()))
}

fn response_with(message: Message) -> ProviderResponse {
    ProviderResponse {
        message,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Build an operation request.
pub fn make_call(name: &str, args: serde_json::Value) -> ToolCall {
    let args = match args {
        serde_json::Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    ToolCall {
        name: name.to_string(),
        args,
    }
}

/// A tool that records every invocation, for asserting what ran.
pub struct RecordingTool {
    name: String,
    destructive: bool,
    pub executions: std::sync::Arc<Mutex<Vec<serde_json::Value>>>,
}

impl RecordingTool {
    pub fn new(name: &str, destructive: bool) -> Self {
        Self {
            name: name.to_string(),
            destructive,
            executions: std::sync::Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait::async_trait]
impl Tool for RecordingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Records invocations"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    fn destructive(&self) -> bool {
        self.destructive
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        self.executions.lock().unwrap().push(arguments);
        Ok(serde_json::json!({ "status": "ok" }))
    }
}

/// A tool that always fails.
pub struct FailingTool;

#[async_trait::async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "failing_tool"
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: "failing_tool".into(),
            reason: "simulated failure".into(),
        })
    }
}
