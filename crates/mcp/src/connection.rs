//! Tool server connection lifecycle (spawn, handshake, calls, teardown).

use std::collections::HashSet;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rmcp::{
    ServiceExt,
    model::{CallToolRequest, CallToolRequestParams, ClientRequest, Content, RawContent, ServerResult},
    service::{Peer, PeerRequestOptions, RoleClient, RunningService, ServiceError},
};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::tool::{JsonObject, ToolDescriptor, ToolServer};

/// Time a server gets to exit on its own after its input is closed.
const EXIT_GRACE: Duration = Duration::from_secs(2);

/// A spawned server process whose handshake has not run yet.
///
/// Dropping it kills the process.
pub struct PendingConnection {
    config: ServerConfig,
    child: Child,
    stdout: ChildStdout,
    stdin: ChildStdin,
}

impl PendingConnection {
    /// OS process id of the server, while it is running.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Perform the protocol handshake.
    ///
    /// Fails with [`Error::Handshake`] if the server rejects the handshake or
    /// does not answer within the configured timeout. The process is killed
    /// and reaped before the error is returned.
    pub async fn initialize(self) -> Result<McpConnection> {
        let Self {
            config,
            mut child,
            stdout,
            stdin,
        } = self;
        let limit = config.timeout();

        let service = match timeout(limit, ().serve((stdout, stdin))).await {
            Ok(Ok(service)) => service,
            Ok(Err(e)) => {
                terminate(&config.name, &mut child).await;
                return Err(Error::Handshake {
                    server: config.name,
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                terminate(&config.name, &mut child).await;
                return Err(Error::Handshake {
                    server: config.name,
                    reason: format!("no response within {limit:?}"),
                });
            }
        };

        if let Some(peer_info) = service.peer_info() {
            info!(
                server = %config.name,
                peer = %peer_info.server_info.name,
                version = %peer_info.server_info.version,
                "initialized MCP server"
            );
        }

        Ok(McpConnection {
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
            child: Mutex::new(Some(child)),
            known_tools: Mutex::new(None),
            usable: AtomicBool::new(true),
            config,
        })
    }
}

/// An initialized connection to an MCP server over stdio.
pub struct McpConnection {
    config: ServerConfig,
    peer: Peer<RoleClient>,
    service: Mutex<Option<RunningService<RoleClient, ()>>>,
    child: Mutex<Option<Child>>,
    // Names from the last catalog fetch; `None` until the first fetch.
    known_tools: Mutex<Option<HashSet<String>>>,
    usable: AtomicBool,
}

impl McpConnection {
    /// Spawn the server process described by `config`.
    ///
    /// Fails with [`Error::Connect`] if the process cannot be started.
    pub fn connect(config: ServerConfig) -> Result<PendingConnection> {
        let spawn_error = |reason: String| Error::Connect {
            server: config.name.clone(),
            reason: format!("{}: {reason}", config.command),
        };

        let mut child = Command::new(&config.command)
            .args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(e.to_string()))?;

        let (Some(stdout), Some(stdin)) = (child.stdout.take(), child.stdin.take()) else {
            return Err(spawn_error("stdio was not captured".into()));
        };

        debug!(server = %config.name, command = %config.command, pid = ?child.id(), "spawned MCP server");
        Ok(PendingConnection {
            config,
            child,
            stdout,
            stdin,
        })
    }

    /// Whether the connection can still serve requests.
    ///
    /// A connection becomes unusable once closed or after its transport breaks.
    pub fn is_usable(&self) -> bool {
        self.usable.load(Ordering::Acquire)
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.is_usable() {
            Ok(())
        } else {
            Err(Error::Transport {
                server: self.config.name.clone(),
                reason: "connection is closed or broken".into(),
            })
        }
    }

    fn request_error(&self, err: ServiceError, tool: Option<&str>) -> Error {
        let server = self.config.name.clone();
        match (err, tool) {
            (ServiceError::McpError(data), Some(tool)) => Error::ToolExecution {
                tool: tool.to_string(),
                message: data.message.into_owned(),
            },
            (ServiceError::McpError(data), None) => Error::Protocol {
                server,
                reason: data.message.into_owned(),
            },
            (ServiceError::Timeout { timeout }, _) => Error::Timeout { server, timeout },
            (
                broken @ (ServiceError::TransportClosed
                | ServiceError::TransportSend(_)
                | ServiceError::Cancelled { .. }),
                _,
            ) => {
                self.usable.store(false, Ordering::Release);
                warn!(server = %server, error = %broken, "transport lost, marking connection unusable");
                Error::Transport {
                    server,
                    reason: broken.to_string(),
                }
            }
            (other, _) => Error::Transport {
                server,
                reason: other.to_string(),
            },
        }
    }
}

impl ToolServer for McpConnection {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        self.ensure_usable()?;

        let limit = self.config.timeout();
        let tools = timeout(limit, self.peer.list_all_tools())
            .await
            .map_err(|_| Error::Timeout {
                server: self.config.name.clone(),
                timeout: limit,
            })?
            .map_err(|e| self.request_error(e, None))?;

        let tools: Vec<ToolDescriptor> = tools.into_iter().map(ToolDescriptor::from).collect();
        *self.known_tools.lock().await = Some(tools.iter().map(|t| t.name.clone()).collect());

        debug!(server = %self.config.name, count = tools.len(), "listed tools");
        Ok(tools)
    }

    async fn call_tool(&self, name: &str, arguments: JsonObject, limit: Duration) -> Result<String> {
        self.ensure_usable()?;

        let advertised = self
            .known_tools
            .lock()
            .await
            .as_ref()
            .is_none_or(|known| known.contains(name));
        if !advertised {
            return Err(Error::ToolNotFound {
                server: self.config.name.clone(),
                tool: name.to_string(),
            });
        }

        let request = ClientRequest::CallToolRequest(CallToolRequest {
            method: Default::default(),
            params: CallToolRequestParams {
                name: name.to_string().into(),
                arguments: Some(arguments),
                meta: None,
                task: None,
            },
            extensions: Default::default(),
        });
        // On timeout the server is sent a cancellation for the request.
        let options = PeerRequestOptions {
            timeout: Some(limit),
            meta: None,
        };

        let response = self
            .peer
            .send_request_with_option(request, options)
            .await
            .map_err(|e| self.request_error(e, Some(name)))?
            .await_response()
            .await
            .map_err(|e| self.request_error(e, Some(name)))?;

        let ServerResult::CallToolResult(result) = response else {
            return Err(Error::Protocol {
                server: self.config.name.clone(),
                reason: format!("unexpected response to call of tool {name}"),
            });
        };

        let output = render_content(&result.content);
        if result.is_error.unwrap_or(false) {
            return Err(Error::ToolExecution {
                tool: name.to_string(),
                message: output,
            });
        }

        Ok(output)
    }

    async fn close(&self) -> Result<()> {
        self.usable.store(false, Ordering::Release);

        let service = self.service.lock().await.take();
        let child = self.child.lock().await.take();
        if service.is_none() && child.is_none() {
            return Ok(());
        }

        // Cancelling the service drops the transport, closing the server's stdin.
        let cancelled = match service {
            Some(service) => service.cancel().await.map(drop),
            None => Ok(()),
        };

        if let Some(mut child) = child {
            match timeout(EXIT_GRACE, child.wait()).await {
                Ok(Ok(status)) => debug!(server = %self.config.name, %status, "server exited"),
                _ => terminate(&self.config.name, &mut child).await,
            }
        }

        cancelled.map_err(|e| Error::Transport {
            server: self.config.name.clone(),
            reason: format!("shutdown failed: {e}"),
        })?;

        info!(server = %self.config.name, "closed MCP server");
        Ok(())
    }
}

/// Kill the server process and reap it.
async fn terminate(server: &str, child: &mut Child) {
    match child.kill().await {
        Ok(()) => debug!(server, "killed server process"),
        Err(e) => warn!(server, error = %e, "failed to kill server process"),
    }
}

/// Render tool output as text for the model.
///
/// Text blocks are joined with newlines; output with no text block is
/// passed through as JSON.
fn render_content(content: &[Content]) -> String {
    let texts: Vec<&str> = content
        .iter()
        .filter_map(|block| match &block.raw {
            RawContent::Text(text) => Some(text.text.as_str()),
            _ => None,
        })
        .collect();

    if texts.is_empty() {
        serde_json::to_string(content).unwrap_or_default()
    } else {
        texts.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_joins_text_blocks() {
        let content = vec![Content::text("first"), Content::text("second")];
        assert_eq!(render_content(&content), "first\nsecond");
    }

    #[test]
    fn render_empty_content() {
        assert_eq!(render_content(&[]), "[]");
    }

    #[tokio::test]
    async fn connect_missing_command_fails() {
        let config = ServerConfig::new("ghost", "switchboard-nonexistent-command-xyz");
        let err = McpConnection::connect(config).err().expect("spawn must fail");
        assert!(
            matches!(&err, Error::Connect { server, .. } if server == "ghost"),
            "unexpected error: {err}"
        );
    }

    /// Requires `uvx` and network access to fetch `mcp-server-time`.
    #[tokio::test]
    #[ignore]
    async fn live_time_server_round_trip() {
        let config = ServerConfig::new("time", "uvx").arg("mcp-server-time");
        let server = McpConnection::connect(config)
            .unwrap()
            .initialize()
            .await
            .unwrap();

        let tools = server.list_tools().await.unwrap();
        assert!(tools.iter().any(|t| t.name == "get_current_time"));

        let mut args = JsonObject::new();
        args.insert("timezone".into(), "UTC".into());
        let output = server
            .call_tool("get_current_time", args, Duration::from_secs(10))
            .await
            .unwrap();
        assert!(output.contains("UTC"));

        server.close().await.unwrap();
    }
}
