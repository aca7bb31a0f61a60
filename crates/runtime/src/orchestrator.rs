//! Two-phase conversation protocol: ask the model, run tools, ask again.
//!
//! Each query starts a fresh conversation. The model first sees the user's
//! query together with the merged tool catalog. If it answers with tool calls,
//! every call is decoded, routed to its owning server and executed; the
//! results are appended to the conversation and the model is asked for a
//! follow-up completion. Failures of individual tool calls are reported to
//! the model as tool results and never abort the turn.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use mcp::ToolServer;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::model::{Backend, Message, ModelRequest, ToolCall, ToolResult, ToolSpec};
use crate::registry::ToolRegistry;
use crate::tools::{ToolArguments, ToolError};
use crate::Result;

/// Default bound on a single tool invocation.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

// Extra time a server gets to report its own timeout before the call is abandoned.
const TIMEOUT_GRACE: Duration = Duration::from_secs(1);

/// Orchestration limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Maximum number of dispatch rounds per query.
    ///
    /// With the default of one, tool calls requested by the follow-up
    /// completion are not executed.
    pub max_rounds: usize,
    /// Bound on each tool invocation.
    pub tool_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_rounds: 1,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }
}

/// The outcome of one processed query.
#[derive(Debug, Clone)]
pub struct Exchange {
    /// Model text and tool trace lines, newline-separated.
    pub answer: String,
    /// Conversation state accumulated while answering the query.
    pub messages: Vec<Message>,
    /// Number of tool invocations sent to servers.
    pub invocations: usize,
}

/// Drives a model backend over the tools of a set of servers.
pub struct Orchestrator<B, S> {
    backend: B,
    servers: Vec<Arc<S>>,
    config: OrchestratorConfig,
}

struct Dispatched {
    result: ToolResult,
    // Present when the call reached a server.
    trace: Option<String>,
}

impl Dispatched {
    fn rejected(call: &ToolCall, error: ToolError) -> Self {
        warn!(tool = %call.name, call_id = %call.id, error = %error, "tool call rejected");
        Self {
            result: ToolResult::failure(&call.id, error),
            trace: None,
        }
    }
}

impl<B: Backend, S: ToolServer> Orchestrator<B, S> {
    pub fn new(backend: B, servers: Vec<Arc<S>>) -> Self {
        Self {
            backend,
            servers,
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Answer one query.
    ///
    /// Only a failing completion request returns an error; tool failures are
    /// folded into the conversation.
    pub async fn process_query(&self, query: &str) -> Result<Exchange> {
        let mut registry = ToolRegistry::new();
        registry.rebuild(&self.servers).await;
        let tools: Vec<ToolSpec> = registry.catalog().map(ToolSpec::from).collect();

        let mut messages = vec![Message::user(query)];
        let mut answer = Vec::new();
        let mut invocations = 0;
        let mut rounds = 0;

        let mut reply = self.complete(&messages, &tools).await?;
        loop {
            let text = reply.text();
            if !text.is_empty() {
                answer.push(text);
            }

            let calls: Vec<ToolCall> = reply.tool_calls().into_iter().cloned().collect();
            if calls.is_empty() {
                break;
            }
            if rounds == self.config.max_rounds {
                warn!(
                    ignored = calls.len(),
                    max_rounds = self.config.max_rounds,
                    "tool round limit reached, ignoring further tool calls"
                );
                break;
            }
            rounds += 1;

            // The assistant turn must precede its results.
            messages.push(reply);
            for dispatched in self.dispatch(&registry, &calls).await {
                if let Some(trace) = dispatched.trace {
                    answer.push(trace);
                    invocations += 1;
                }
                messages.push(Message::tool_result(dispatched.result));
            }

            reply = self.complete(&messages, &tools).await?;
        }
        messages.push(reply);

        info!(rounds, invocations, "query answered");
        Ok(Exchange {
            answer: answer.join("\n"),
            messages,
            invocations,
        })
    }

    async fn complete(&self, messages: &[Message], tools: &[ToolSpec]) -> Result<Message> {
        let response = self.backend.call(ModelRequest { messages, tools }).await?;
        debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            tool_calls = response.message.tool_calls().len(),
            "completion received"
        );
        Ok(response.message)
    }

    /// Execute one round of tool calls concurrently.
    ///
    /// Results come back in call order regardless of completion order.
    async fn dispatch(&self, registry: &ToolRegistry<S>, calls: &[ToolCall]) -> Vec<Dispatched> {
        join_all(calls.iter().map(|call| self.execute(registry, call))).await
    }

    async fn execute(&self, registry: &ToolRegistry<S>, call: &ToolCall) -> Dispatched {
        let arguments = match call.arguments.parse::<ToolArguments>() {
            Ok(arguments) => arguments,
            Err(reason) => {
                return Dispatched::rejected(
                    call,
                    ToolError::InvalidArguments {
                        tool: call.name.clone(),
                        reason,
                    },
                );
            }
        };

        let (Some(entry), Some(server)) = (registry.get(&call.name), registry.resolve(&call.name))
        else {
            return Dispatched::rejected(call, ToolError::NotFound(call.name.clone()));
        };

        if let Err(reason) = arguments.check_required(&entry.descriptor) {
            return Dispatched::rejected(
                call,
                ToolError::InvalidArguments {
                    tool: call.name.clone(),
                    reason,
                },
            );
        }

        let trace = format!("[Calling tool {} with args {arguments}]", call.name);
        debug!(tool = %call.name, server = %entry.server_name, call_id = %call.id, "dispatching tool call");

        let limit = self.config.tool_timeout;
        let call_tool = server.call_tool(&call.name, arguments.into_inner(), limit);
        let result = match timeout(limit + TIMEOUT_GRACE, call_tool).await {
            Ok(Ok(output)) => ToolResult::success(&call.id, output),
            Ok(Err(e)) => {
                let error = ToolError::from_server(&call.name, e);
                warn!(tool = %call.name, server = %entry.server_name, error = %error, "tool call failed");
                ToolResult::failure(&call.id, error)
            }
            Err(_) => {
                warn!(tool = %call.name, server = %entry.server_name, ?limit, "tool call abandoned");
                ToolResult::failure(&call.id, ToolError::timeout(&call.name, limit))
            }
        };

        Dispatched {
            result,
            trace: Some(trace),
        }
    }
}
