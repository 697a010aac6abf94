//! The agent loop: reason, act, observe, repeat.
//!
//! One run takes a user message plus optional prior history and drives
//! the full cycle: exchange the conversation with the reasoning
//! service, interpret the reply as final text or a batch of operation
//! requests, execute each request through the rate limiter and (for
//! destructive operations) the confirmation gate, feed the results
//! back, and go again. Bounded by the iteration cap and the cumulative
//! per-run tool-call cap.
//!
//! Events are produced lazily over a capacity-1 channel: the loop
//! suspends after each yield until the host has taken the event. A
//! host that drops the receiver aborts the run; no further provider or
//! tool calls are issued.

use crate::confirm::ConfirmationRequest;
use crate::events::{deliver, LoopEvent};
use crate::rate_limit::RateLimiter;
use crate::reasoning::{ExchangeError, ReasoningClient};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use steward_config::AppConfig;
use steward_core::error::ToolError;
use steward_core::event::{DomainEvent, EventBus};
use steward_core::message::{Conversation, Message, ToolCall, ToolResponse};
use steward_core::provider::Provider;
use steward_core::ToolRegistry;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Admin-assistant persona sent as the system instruction unless the
/// config overrides it.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are Steward, an autonomous server administration assistant. You act \
on behalf of the server's administrators using the tools available to you.

Guidelines:
- Gather the information you need with read-only tools before acting.
- Irreversible actions require admin approval; if an action is rejected, \
do not attempt it again in the same request.
- If a tool returns an error, adapt or report the problem instead of \
retrying blindly.
- Keep your final answers short and factual.";

const PLACEHOLDER_TEXT: &str = "Done.";
const EMPTY_REPLY_TEXT: &str = "Empty response from model.";
const REJECTED_TEXT: &str = "Action was rejected by admin.";
const LIMIT_REACHED_TEXT: &str = "Tool call limit reached for this request.";
const MAX_ITERATIONS_TEXT: &str =
    "Maximum reasoning steps reached. Please try a simpler request.";

/// The orchestrator. Cheap to clone; clones share the rate limiter,
/// registry, and event bus.
#[derive(Clone)]
pub struct AgentLoop {
    client: ReasoningClient,
    tools: Arc<ToolRegistry>,
    limiter: Arc<RateLimiter>,
    event_bus: Arc<EventBus>,
    system_prompt: String,
    max_iterations: u32,
    max_tool_calls: u32,
    confirmation_timeout: Duration,
}

/// Handle over one running agent loop.
///
/// Consume events with [`next_event`](AgentRun::next_event) until
/// `None` (the Final event is always the last), then collect the full
/// conversation with [`conversation`](AgentRun::conversation) for
/// persistence across turns.
pub struct AgentRun {
    events: mpsc::Receiver<LoopEvent>,
    conversation: oneshot::Receiver<Conversation>,
}

impl AgentRun {
    /// The next event, or `None` once the run has ended.
    pub async fn next_event(&mut self) -> Option<LoopEvent> {
        self.events.recv().await
    }

    /// Wait for the run to end and take the final conversation.
    ///
    /// Dropping the event receiver here aborts a run that is still
    /// producing; what was accumulated so far is returned.
    pub async fn conversation(self) -> Conversation {
        drop(self.events);
        self.conversation.await.unwrap_or_default()
    }
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        limiter: Arc<RateLimiter>,
        event_bus: Arc<EventBus>,
        config: &AppConfig,
    ) -> Self {
        let system_prompt = config
            .identity
            .system_prompt_override
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        Self {
            client: ReasoningClient::new(
                provider,
                config.model.clone(),
                config.temperature,
                &config.retry,
            ),
            tools,
            limiter,
            event_bus,
            system_prompt,
            max_iterations: config.limits.max_loop_iterations,
            max_tool_calls: config.limits.max_tool_calls_per_request,
            confirmation_timeout: config.confirmation.timeout(),
        }
    }

    /// Start a run. Returns immediately; the loop produces events as
    /// the handle consumes them.
    pub fn run(&self, user_message: impl Into<String>, history: Option<Conversation>) -> AgentRun {
        let this = self.clone();
        let user_message = user_message.into();
        // Capacity 1: the producer suspends per yield until the host
        // has taken the event.
        let (tx, rx) = mpsc::channel(1);
        let (done_tx, done_rx) = oneshot::channel();

        tokio::spawn(async move {
            let conversation = this.drive(user_message, history, tx).await;
            let _ = done_tx.send(conversation);
        });

        AgentRun {
            events: rx,
            conversation: done_rx,
        }
    }

    async fn drive(
        &self,
        user_message: String,
        history: Option<Conversation>,
        tx: mpsc::Sender<LoopEvent>,
    ) -> Conversation {
        let mut conversation = history.unwrap_or_default();
        conversation.push(Message::user(user_message));

        let tool_defs = self.tools.definitions();
        let mut tool_calls_used: u32 = 0;

        info!(
            conversation_id = %conversation.id,
            max_iterations = self.max_iterations,
            "Agent run starting"
        );

        for iteration in 1..=self.max_iterations {
            debug!(iteration, "Reasoning exchange");

            let response = match self
                .client
                .exchange(&self.system_prompt, &conversation.messages, &tool_defs, &tx)
                .await
            {
                Ok(response) => response,
                Err(ExchangeError::Aborted) => return conversation,
                Err(ExchangeError::Provider(e)) => {
                    warn!(error = %e, "Reasoning exchange failed, ending run");
                    self.event_bus.publish(DomainEvent::ErrorOccurred {
                        context: "reasoning_exchange".into(),
                        error_message: e.to_string(),
                        timestamp: Utc::now(),
                    });
                    let _ = tx
                        .send(LoopEvent::Final {
                            text: format!("Error: {e}"),
                        })
                        .await;
                    return conversation;
                }
            };

            if let Some(usage) = &response.usage {
                self.event_bus.publish(DomainEvent::ResponseGenerated {
                    conversation_id: conversation.id.to_string(),
                    model: response.model.clone(),
                    tokens_used: usage.total_tokens,
                    timestamp: Utc::now(),
                });
            }

            // A reply with no content parts at all is its own terminal
            // condition, distinct from empty text.
            if response.message.parts.is_empty() {
                let _ = tx
                    .send(LoopEvent::Final {
                        text: EMPTY_REPLY_TEXT.into(),
                    })
                    .await;
                return conversation;
            }

            let calls: Vec<ToolCall> = response
                .message
                .tool_calls()
                .into_iter()
                .cloned()
                .collect();
            let text = response.message.text();
            conversation.push(response.message);

            if calls.is_empty() {
                let text = if text.trim().is_empty() {
                    PLACEHOLDER_TEXT.to_string()
                } else {
                    text
                };
                info!(iterations = iteration, "Agent run completed");
                let _ = tx.send(LoopEvent::Final { text }).await;
                return conversation;
            }

            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                tool_calls_used += 1;

                // Cumulative across iterations. Once over the cap, the
                // limiter and the gate are not touched.
                if tool_calls_used > self.max_tool_calls {
                    warn!(tool = %call.name, used = tool_calls_used, "Tool call cap exceeded");
                    results.push(ToolResponse::error(&call.name, LIMIT_REACHED_TEXT));
                    continue;
                }

                self.limiter.acquire(&call.name).await;

                if self.tools.is_destructive(&call.name) {
                    let notice = LoopEvent::Status {
                        text: format!("`{}` needs admin approval...", call.name),
                    };
                    if deliver(&tx, notice).await.is_err() {
                        return conversation;
                    }

                    let request = ConfirmationRequest::new(&call.name, call.args.clone());
                    if deliver(&tx, LoopEvent::Confirmation(request.clone()))
                        .await
                        .is_err()
                    {
                        return conversation;
                    }

                    let approved = request.decision(self.confirmation_timeout).await;
                    self.event_bus.publish(DomainEvent::ConfirmationResolved {
                        tool_name: call.name.clone(),
                        approved,
                        timestamp: Utc::now(),
                    });

                    if !approved {
                        info!(tool = %call.name, "Destructive operation rejected");
                        results.push(ToolResponse::error(&call.name, REJECTED_TEXT));
                        continue;
                    }
                }

                let notice = LoopEvent::Status {
                    text: format!("Running `{}`...", call.name),
                };
                if deliver(&tx, notice).await.is_err() {
                    return conversation;
                }

                results.push(self.execute_call(call).await);
            }

            conversation.push(Message::tool_results(results));
        }

        warn!(max = self.max_iterations, "Iteration cap reached");
        let _ = tx
            .send(LoopEvent::Final {
                text: MAX_ITERATIONS_TEXT.into(),
            })
            .await;
        conversation
    }

    /// Execute one operation, converting every failure into an
    /// error-shaped result the model can react to.
    async fn execute_call(&self, call: &ToolCall) -> ToolResponse {
        let start = std::time::Instant::now();
        let outcome = self
            .tools
            .execute(&call.name, serde_json::Value::Object(call.args.clone()))
            .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(value) => {
                self.event_bus.publish(DomainEvent::ToolExecuted {
                    tool_name: call.name.clone(),
                    success: true,
                    duration_ms,
                    timestamp: Utc::now(),
                });
                ToolResponse::success(&call.name, value)
            }
            Err(ToolError::NotFound(name)) => {
                warn!(tool = %name, "Unknown tool requested");
                ToolResponse::error(&call.name, format!("Unknown tool: {name}"))
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                self.event_bus.publish(DomainEvent::ToolExecuted {
                    tool_name: call.name.clone(),
                    success: false,
                    duration_ms,
                    timestamp: Utc::now(),
                });
                ToolResponse::error(&call.name, e.to_string())
            }
        }
    }
}
