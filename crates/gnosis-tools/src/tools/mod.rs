mod current_time;
mod search_documentation;

pub use current_time::GetCurrentTimeTool;
pub use search_documentation::SearchDocumentationTool;
