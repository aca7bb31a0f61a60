use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while dispatching a single tool call.
///
/// These never abort a conversation turn; they are reported back to the
/// model as tool results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[non_exhaustive]
pub enum ToolError {
    #[error("tool {0} not found in any server")]
    NotFound(String),

    /// The model's argument text could not be decoded.
    #[error("invalid arguments for tool {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("tool {tool} timed out after {timeout_ms}ms")]
    Timeout { tool: String, timeout_ms: u64 },

    /// The server ran the tool and reported a failure.
    #[error("execution failed: {0}")]
    Execution(String),

    /// The connection to the owning server broke.
    #[error("transport failed: {0}")]
    Transport(String),
}

impl ToolError {
    pub fn timeout(tool: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            tool: tool.into(),
            timeout_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Classify a server-side failure for the tool `tool`.
    pub fn from_server(tool: &str, err: mcp::Error) -> Self {
        match err {
            mcp::Error::ToolNotFound { .. } => Self::NotFound(tool.to_string()),
            mcp::Error::ToolExecution { message, .. } => Self::Execution(message),
            mcp::Error::Timeout { timeout, .. } => Self::timeout(tool, timeout),
            transport @ mcp::Error::Transport { .. } => Self::Transport(transport.to_string()),
            other => Self::Execution(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_classified() {
        let not_found = mcp::Error::ToolNotFound {
            server: "time".into(),
            tool: "get_weather".into(),
        };
        assert_eq!(
            ToolError::from_server("get_weather", not_found),
            ToolError::NotFound("get_weather".into())
        );

        let broken = mcp::Error::Transport {
            server: "browser".into(),
            reason: "transport closed".into(),
        };
        assert!(matches!(
            ToolError::from_server("search_web_tool", broken),
            ToolError::Transport(_)
        ));

        let slow = mcp::Error::Timeout {
            server: "browser".into(),
            timeout: Duration::from_secs(2),
        };
        assert_eq!(
            ToolError::from_server("search_web_tool", slow),
            ToolError::Timeout {
                tool: "search_web_tool".into(),
                timeout_ms: 2000
            }
        );
    }

    #[test]
    fn execution_message_is_kept() {
        let failed = mcp::Error::ToolExecution {
            tool: "search_web_tool".into(),
            message: "quota exceeded".into(),
        };
        assert_eq!(
            ToolError::from_server("search_web_tool", failed).to_string(),
            "execution failed: quota exceeded"
        );
    }
}
