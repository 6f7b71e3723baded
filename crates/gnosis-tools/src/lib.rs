//! Locally executed tools and the registry the gateway advertises upstream.
//!
//! The registry is built once at startup (see [`register_builtin_tools`]) and
//! shared read-only behind an `Arc` afterwards.

mod builtin;
pub mod error;
pub mod registry;
pub mod tools;

pub use builtin::{register_builtin_tools, BUILTIN_TOOL_NAMES};
pub use error::{RegistryError, ToolError};
pub use registry::{
    RegistryEntry, SharedTool, Tool, ToolDefinition, ToolOutput, ToolRegistry, ToolScope,
};
pub use tools::{GetCurrentTimeTool, SearchDocumentationTool};
