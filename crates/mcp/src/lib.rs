//! MCP (Model Context Protocol) subordinate server connections.
//!
//! This crate owns the lifecycle of a single tool server reached over stdio:
//! launch, handshake, tool enumeration, tool invocation and teardown. It is
//! built on the official `rmcp` SDK.
//!
//! A connection moves through two types. [`McpConnection::connect`] spawns
//! the process and returns a [`PendingConnection`]; only after
//! [`PendingConnection::initialize`] completes the handshake do the tool
//! operations of [`ToolServer`] become available.
//!
//! # Example
//!
//! ```no_run
//! use mcp::{McpConnection, ServerConfig, ToolServer};
//! use std::time::Duration;
//!
//! # async fn example() -> mcp::Result<()> {
//! let config = ServerConfig::new("time", "uvx").arg("mcp-server-time");
//!
//! let server = McpConnection::connect(config)?.initialize().await?;
//!
//! for tool in server.list_tools().await? {
//!     println!("Tool: {}", tool.name);
//! }
//!
//! let mut args = serde_json::Map::new();
//! args.insert("timezone".into(), "Europe/Paris".into());
//! let output = server
//!     .call_tool("get_current_time", args, Duration::from_secs(10))
//!     .await?;
//! println!("{output}");
//!
//! server.close().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod connection;
mod error;
mod tool;

pub use config::{DEFAULT_TIMEOUT, ServerConfig};
pub use connection::{McpConnection, PendingConnection};
pub use error::{Error, Result};
pub use tool::{JsonObject, ToolDescriptor, ToolServer};
