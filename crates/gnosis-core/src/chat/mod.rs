//! OpenAI-compatible chat-completion wire types.
//!
//! Fields the gateway does not interpret are kept in flattened `extra` maps so
//! that requests and responses pass through without losing data.

pub mod request;
pub mod types;

pub use request::{ChatCompletionRequest, ChatCompletionResponse, Choice, Usage};
pub use types::{
    ContentPart, FunctionCall, FunctionSchema, Message, MessageContent, Role, ToolCall, ToolSchema,
};
