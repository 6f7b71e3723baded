use crate::error::RegistryError;
use crate::registry::{ToolRegistry, ToolScope};
use crate::tools::{GetCurrentTimeTool, SearchDocumentationTool};

/// List of all built-in tool names
pub const BUILTIN_TOOL_NAMES: [&str; 2] = ["search_documentation", "get_current_time"];

/// Registers the built-in tools. `search_documentation` is only offered when a
/// retrieval backend is configured.
pub fn register_builtin_tools(
    registry: &mut ToolRegistry,
    search: Option<SearchDocumentationTool>,
) -> Result<(), RegistryError> {
    if let Some(search) = search {
        registry.register_tool(search, ToolScope::All)?;
    } else {
        log::info!("No retrieval backend configured, skipping search_documentation");
    }
    registry.register_tool(GetCurrentTimeTool::new(), ToolScope::All)?;
    Ok(())
}
