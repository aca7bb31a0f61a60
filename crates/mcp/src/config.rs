//! Launch configuration for a tool server.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::num::NonZeroU64;
use std::time::Duration;

/// Default timeout for the handshake and catalog requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(DEFAULT_TIMEOUT_SECS.get());

const DEFAULT_TIMEOUT_SECS: NonZeroU64 = match NonZeroU64::new(30) {
    Some(secs) => secs,
    None => panic!("default timeout must be non-zero"),
};

/// How to launch one tool server.
///
/// Deserializes from a `[[servers]]` table:
///
/// ```toml
/// [[servers]]
/// name = "time"
/// command = "uvx"
/// args = ["mcp-server-time"]
/// env = { TZ = "UTC" }
/// timeout_secs = 10
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Logical server name, used in logs and tool ownership.
    pub name: String,
    /// Executable to spawn.
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment overrides for the child process.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Seconds allowed for the handshake and catalog requests; zero is rejected.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: NonZeroU64,
}

fn default_timeout_secs() -> NonZeroU64 {
    DEFAULT_TIMEOUT_SECS
}

impl ServerConfig {
    /// Create a config with no arguments and no environment overrides.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child process.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: NonZeroU64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Timeout applied to the handshake and catalog requests.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.get())
    }
}
