//! Provider selection for the configured backend.

use std::fmt;

use runtime::{
    AnthropicBackend, Backend, ModelError, ModelRequest, ModelResponse, OpenAiBackend,
};

use crate::config::{BackendConfig, Provider};
use crate::error::Result;

/// The backend chosen by `[backend] provider`.
pub enum ModelBackend {
    OpenAi(OpenAiBackend),
    Anthropic(AnthropicBackend),
}

impl ModelBackend {
    /// Build the backend, reading the API key from the environment when the
    /// configuration has none.
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let api_key = config.api_key(|var| std::env::var(var).ok())?;

        let backend = match config.provider {
            Provider::OpenAi => {
                let mut builder = OpenAiBackend::builder(api_key, config.model());
                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }
                if let Some(base_url) = &config.base_url {
                    builder = builder.base_url(base_url);
                }
                Self::OpenAi(builder.build())
            }
            Provider::Anthropic => {
                let mut builder = AnthropicBackend::builder(api_key, config.model());
                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }
                Self::Anthropic(builder.build())
            }
        };
        Ok(backend)
    }
}

impl fmt::Display for ModelBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi(backend) => fmt::Display::fmt(backend, f),
            Self::Anthropic(backend) => fmt::Display::fmt(backend, f),
        }
    }
}

impl Backend for ModelBackend {
    async fn call(
        &self,
        request: ModelRequest<'_>,
    ) -> std::result::Result<ModelResponse, ModelError> {
        match self {
            Self::OpenAi(backend) => backend.call(request).await,
            Self::Anthropic(backend) => backend.call(request).await,
        }
    }
}
