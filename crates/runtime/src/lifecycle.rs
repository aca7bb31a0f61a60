//! Ordered acquisition and release of tool server connections.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use mcp::{McpConnection, ServerConfig, ToolServer};
use tracing::{error, info, warn};

use crate::{Error, Result};

/// Launches and initializes one tool server.
pub trait Launcher: Send + Sync {
    type Server: ToolServer;

    /// Connect to the server and complete its handshake.
    fn launch(&self, config: &ServerConfig) -> impl Future<Output = mcp::Result<Self::Server>> + Send;
}

/// Launches servers as child processes speaking MCP over stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdioLauncher;

impl Launcher for StdioLauncher {
    type Server = McpConnection;

    async fn launch(&self, config: &ServerConfig) -> mcp::Result<McpConnection> {
        McpConnection::connect(config.clone())?.initialize().await
    }
}

/// Outcome of [`ServerPool::shutdown`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Servers closed cleanly, in release order.
    pub closed: Vec<String>,
    /// Servers whose release failed, with the failure message.
    pub failed: Vec<(String, String)>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The set of initialized servers, owned for the life of the process.
///
/// Servers are acquired in configuration order and released in reverse.
pub struct ServerPool<S> {
    servers: Vec<Arc<S>>,
}

impl<S: ToolServer> ServerPool<S> {
    /// Launch every configured server.
    ///
    /// On the first failure, servers acquired so far are released and the
    /// failure is returned.
    pub async fn start<L>(launcher: &L, configs: &[ServerConfig]) -> Result<Self>
    where
        L: Launcher<Server = S>,
    {
        let mut seen = HashSet::new();
        if let Some(dup) = configs.iter().find(|c| !seen.insert(c.name.as_str())) {
            return Err(Error::DuplicateServer(dup.name.clone()));
        }

        let mut pool = Self {
            servers: Vec::with_capacity(configs.len()),
        };

        for config in configs {
            info!(server = %config.name, command = %config.command, "starting server");
            match launcher.launch(config).await {
                Ok(server) => pool.servers.push(Arc::new(server)),
                Err(source) => {
                    error!(server = %config.name, error = %source, "server failed to start");
                    pool.shutdown().await;
                    return Err(Error::Startup {
                        server: config.name.clone(),
                        source,
                    });
                }
            }
        }

        Ok(pool)
    }

    pub fn servers(&self) -> &[Arc<S>] {
        &self.servers
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Close every server in reverse acquisition order.
    ///
    /// A failing close is logged and recorded; the remaining servers are
    /// still closed.
    pub async fn shutdown(self) -> ShutdownReport {
        let mut report = ShutdownReport::default();

        for server in self.servers.iter().rev() {
            let name = server.name().to_string();
            match server.close().await {
                Ok(()) => report.closed.push(name),
                Err(e) => {
                    warn!(server = %name, error = %e, "failed to close server");
                    report.failed.push((name, e.to_string()));
                }
            }
        }

        report
    }
}
