//! MCP error types.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by a subordinate tool server connection.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The server process could not be started.
    #[error("failed to launch server {server}: {reason}")]
    Connect { server: String, reason: String },

    /// The protocol handshake failed or did not complete in time.
    #[error("handshake with server {server} failed: {reason}")]
    Handshake { server: String, reason: String },

    /// The server does not advertise a tool with this name.
    #[error("tool not found on server {server}: {tool}")]
    ToolNotFound { server: String, tool: String },

    /// The server ran the tool and reported a failure.
    #[error("tool {tool} failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// The server answered a request with a protocol-level error.
    #[error("server {server} rejected request: {reason}")]
    Protocol { server: String, reason: String },

    /// A request did not complete in time.
    #[error("request to server {server} timed out after {timeout:?}")]
    Timeout { server: String, timeout: Duration },

    /// The channel to the server broke or was closed.
    #[error("transport to server {server} failed: {reason}")]
    Transport { server: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
