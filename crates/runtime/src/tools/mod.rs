//! Tool-call decoding and error types.

mod arguments;
pub mod errors;

pub use arguments::ToolArguments;
pub use errors::ToolError;
