//! In-process fakes for the model backend and tool servers.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mcp::{JsonObject, ServerConfig, ToolDescriptor, ToolServer};
use runtime::{
    Backend, Launcher, Message, ModelError, ModelRequest, ModelResponse, Part, Role, ToolCall,
    Usage,
};
use serde_json::json;

/// Shared, ordered log of what the fakes observed.
pub type Events = Arc<Mutex<Vec<String>>>;

pub fn events() -> Events {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn snapshot(events: &Events) -> Vec<String> {
    events.lock().unwrap().clone()
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend
// ─────────────────────────────────────────────────────────────────────────────

/// What the backend was asked.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub messages: Vec<Message>,
    pub tools: Vec<String>,
}

/// Replays a fixed list of replies and records every request.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<Message, ModelError>>>,
    requests: Mutex<Vec<Recorded>>,
}

impl ScriptedBackend {
    pub fn new(replies: impl IntoIterator<Item = Message>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn then_fail(self, error: ModelError) -> Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

impl Backend for ScriptedBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        self.requests.lock().unwrap().push(Recorded {
            messages: request.messages.to_vec(),
            tools: request.tools.iter().map(|t| t.name.clone()).collect(),
        });

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::InvalidResponse("script exhausted".into())))?;

        Ok(ModelResponse {
            message: reply,
            usage: Usage::default(),
        })
    }
}

/// An assistant reply with optional text and `(id, name, arguments)` calls.
pub fn assistant(text: Option<&str>, calls: &[(&str, &str, &str)]) -> Message {
    let mut parts = Vec::new();
    if let Some(text) = text {
        parts.push(Part::Text(text.to_string()));
    }
    parts.extend(
        calls
            .iter()
            .map(|(id, name, args)| Part::ToolCall(ToolCall::new(*id, *name, *args))),
    );
    Message::from_parts(Role::Assistant, parts)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool servers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Behavior {
    Reply(&'static str),
    Fail(&'static str),
    /// Runs until the caller's timeout, then reports it.
    Hang,
    /// Never answers and ignores the caller's timeout.
    Stuck,
    Disconnect,
}

struct FakeTool {
    descriptor: ToolDescriptor,
    behavior: Behavior,
}

pub struct FakeServer {
    name: String,
    tools: Vec<FakeTool>,
    listable: bool,
    close_fails: bool,
    closed: AtomicBool,
    calls: Mutex<Vec<(String, JsonObject)>>,
    events: Events,
}

impl FakeServer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tools: Vec::new(),
            listable: true,
            close_fails: false,
            closed: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            events: events(),
        }
    }

    pub fn tool(self, name: &str, behavior: Behavior) -> Self {
        self.tool_requiring(name, &[], behavior)
    }

    pub fn tool_requiring(mut self, name: &str, required: &[&str], behavior: Behavior) -> Self {
        let schema = json!({"type": "object", "required": required});
        self.tools.push(FakeTool {
            descriptor: ToolDescriptor::new(name, format!("{name} from {}", self.name), schema),
            behavior,
        });
        self
    }

    pub fn unlistable(mut self) -> Self {
        self.listable = false;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.close_fails = true;
        self
    }

    pub fn with_events(mut self, events: Events) -> Self {
        self.events = events;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<(String, JsonObject)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl ToolServer for FakeServer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> mcp::Result<Vec<ToolDescriptor>> {
        self.record(format!("list:{}", self.name));
        if !self.listable {
            return Err(mcp::Error::Transport {
                server: self.name.clone(),
                reason: "transport closed".into(),
            });
        }
        Ok(self.tools.iter().map(|t| t.descriptor.clone()).collect())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: JsonObject,
        timeout: Duration,
    ) -> mcp::Result<String> {
        self.record(format!("call:{}:{name}", self.name));
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments));

        let Some(tool) = self.tools.iter().find(|t| t.descriptor.name == name) else {
            return Err(mcp::Error::ToolNotFound {
                server: self.name.clone(),
                tool: name.to_string(),
            });
        };

        match tool.behavior.clone() {
            Behavior::Reply(output) => Ok(output.to_string()),
            Behavior::Fail(message) => Err(mcp::Error::ToolExecution {
                tool: name.to_string(),
                message: message.to_string(),
            }),
            Behavior::Hang => {
                tokio::time::sleep(timeout).await;
                Err(mcp::Error::Timeout {
                    server: self.name.clone(),
                    timeout,
                })
            }
            Behavior::Stuck => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("too late".to_string())
            }
            Behavior::Disconnect => Err(mcp::Error::Transport {
                server: self.name.clone(),
                reason: "transport closed".into(),
            }),
        }
    }

    async fn close(&self) -> mcp::Result<()> {
        self.record(format!("close:{}", self.name));
        if self.close_fails {
            return Err(mcp::Error::Transport {
                server: self.name.clone(),
                reason: "process did not exit".into(),
            });
        }
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Launcher
// ─────────────────────────────────────────────────────────────────────────────

/// Launches fake servers, optionally failing for some names.
pub struct FakeLauncher {
    pub events: Events,
    fail_launch: HashSet<String>,
    fail_close: HashSet<String>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            events: events(),
            fail_launch: HashSet::new(),
            fail_close: HashSet::new(),
        }
    }

    pub fn failing_launch(mut self, name: &str) -> Self {
        self.fail_launch.insert(name.to_string());
        self
    }

    pub fn failing_close(mut self, name: &str) -> Self {
        self.fail_close.insert(name.to_string());
        self
    }
}

impl Launcher for FakeLauncher {
    type Server = FakeServer;

    async fn launch(&self, config: &ServerConfig) -> mcp::Result<FakeServer> {
        self.events
            .lock()
            .unwrap()
            .push(format!("launch:{}", config.name));

        if self.fail_launch.contains(&config.name) {
            return Err(mcp::Error::Handshake {
                server: config.name.clone(),
                reason: "protocol version mismatch".into(),
            });
        }

        let mut server = FakeServer::new(&config.name)
            .tool(&format!("{}_tool", config.name), Behavior::Reply("ok"))
            .with_events(self.events.clone());
        if self.fail_close.contains(&config.name) {
            server = server.failing_close();
        }
        Ok(server)
    }
}

pub fn configs(names: &[&str]) -> Vec<ServerConfig> {
    names
        .iter()
        .map(|name| ServerConfig::new(*name, format!("{name}-server")))
        .collect()
}
