//! Switchboard runtime: multi-server tool orchestration.
//!
//! This crate connects a conversational model to the tools exposed by any
//! number of MCP servers.
//!
//! # Overview
//!
//! - **ServerPool**: acquires every configured server in order and releases
//!   them in reverse, even when startup fails part-way.
//! - **ToolRegistry**: merges the servers' catalogs into one namespace and
//!   routes a tool name back to its owning server.
//! - **Orchestrator**: runs the ask-model, run-tools, ask-again exchange for
//!   one query.
//! - **Backend**: a trait abstracting model providers (OpenAI, Anthropic).
//!
//! # Example
//!
//! ```no_run
//! use mcp::ServerConfig;
//! use runtime::{OpenAiBackend, Orchestrator, ServerPool, StdioLauncher};
//!
//! # async fn example() -> runtime::Result<()> {
//! let configs = vec![ServerConfig::new("time", "uvx").arg("mcp-server-time")];
//! let pool = ServerPool::start(&StdioLauncher, &configs).await?;
//!
//! let backend = OpenAiBackend::builder("sk-...", "gpt-4o-mini").build();
//! let orchestrator = Orchestrator::new(backend, pool.servers().to_vec());
//!
//! let exchange = orchestrator.process_query("What time is it in Tokyo?").await?;
//! println!("{}", exchange.answer);
//!
//! pool.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod error;
pub mod lifecycle;
pub mod model;
pub mod orchestrator;
pub mod providers;
pub mod registry;
pub mod tools;

// Model types (provider-agnostic)
pub use model::{
    Backend, Message, ModelError, ModelRequest, ModelResponse, Part, Role, ToolCall, ToolOutcome,
    ToolResult, ToolSpec, Usage,
};

// Provider backends
pub use providers::{AnthropicBackend, OpenAiBackend};

// Error types
pub use error::{Error, Result};

pub use lifecycle::{Launcher, ServerPool, ShutdownReport, StdioLauncher};
pub use orchestrator::{Exchange, Orchestrator, OrchestratorConfig};
pub use registry::{RegisteredTool, ShadowedTool, ToolRegistry};
pub use tools::{ToolArguments, ToolError};
