//! Configuration loading from switchboard.toml.

use std::io;
use std::num::NonZeroU64;
use std::path::Path;
use std::time::Duration;

use mcp::ServerConfig;
use runtime::OrchestratorConfig;
use runtime::providers::{anthropic, openai};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub orchestrator: OrchestratorSection,

    /// Servers to launch, in order.
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

/// Supported model providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAi,
    Anthropic,
}

impl Provider {
    pub fn name(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }

    /// Environment variable consulted when no key is configured.
    pub fn api_key_var(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => openai::DEFAULT_MODEL,
            Self::Anthropic => anthropic::DEFAULT_MODEL,
        }
    }
}

/// Backend provider configuration.
#[derive(Debug, Default, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub provider: Provider,

    /// Model to use; defaults per provider.
    pub model: Option<String>,

    pub max_tokens: Option<u32>,

    /// API key. Falls back to the provider's environment variable.
    pub api_key: Option<String>,

    /// Alternative OpenAI-compatible endpoint.
    pub base_url: Option<String>,
}

impl BackendConfig {
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Resolve the API key, consulting `env` for the provider's variable.
    pub fn api_key(&self, env: impl Fn(&str) -> Option<String>) -> Result<String> {
        self.api_key
            .clone()
            .or_else(|| env(self.provider.api_key_var()))
            .filter(|key| !key.trim().is_empty())
            .ok_or(Error::MissingApiKey {
                provider: self.provider.name(),
                var: self.provider.api_key_var(),
            })
    }
}

/// Limits for the query exchange.
#[derive(Debug, Deserialize)]
pub struct OrchestratorSection {
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// Seconds allowed for each tool call; zero is rejected.
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: NonZeroU64,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

impl From<&OrchestratorSection> for OrchestratorConfig {
    fn from(section: &OrchestratorSection) -> Self {
        Self {
            max_rounds: section.max_rounds,
            tool_timeout: Duration::from_secs(section.tool_timeout_secs.get()),
        }
    }
}

fn default_max_rounds() -> usize {
    1
}

fn default_tool_timeout_secs() -> NonZeroU64 {
    NonZeroU64::new(runtime::orchestrator::DEFAULT_TOOL_TIMEOUT.as_secs())
        .unwrap_or(NonZeroU64::MIN)
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> std::result::Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Configured servers followed by the given scripts.
    pub fn server_configs(&self, scripts: &[impl AsRef<Path>]) -> Result<Vec<ServerConfig>> {
        let mut servers = self.servers.clone();
        for script in scripts {
            servers.push(script_server(script.as_ref())?);
        }
        if servers.is_empty() {
            return Err(Error::NoServers);
        }
        Ok(servers)
    }
}

/// Launch configuration for a server script, named after its file stem.
///
/// `.py` scripts run under `python` and `.js` scripts under `node`; anything
/// else is executed directly.
pub fn script_server(path: &Path) -> Result<ServerConfig> {
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| Error::InvalidScript {
            path: path.to_path_buf(),
        })?;
    let script = path.to_string_lossy();

    let config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("py") => ServerConfig::new(name, "python").arg(script),
        Some("js") => ServerConfig::new(name, "node").arg(script),
        _ => ServerConfig::new(name, script),
    };
    Ok(config)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}
