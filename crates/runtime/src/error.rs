use crate::model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The model completion request failed.
    #[error("model backend error: {0}")]
    Backend(#[from] ModelError),

    /// A server could not be launched or initialized.
    #[error("failed to start server {server}: {source}")]
    Startup {
        server: String,
        #[source]
        source: mcp::Error,
    },

    #[error("duplicate server name: {0}")]
    DuplicateServer(String),
}

pub type Result<T> = std::result::Result<T, Error>;
