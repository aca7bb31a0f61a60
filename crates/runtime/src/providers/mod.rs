//! Model provider adapters.
//!
//! Each provider implements [`Backend`](crate::model::Backend) for its API.

pub mod anthropic;
pub mod openai;

pub use anthropic::{AnthropicBackend, AnthropicBackendBuilder};
pub use openai::{OpenAiBackend, OpenAiBackendBuilder};
