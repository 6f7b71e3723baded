//! Request augmentation: advertise registry tools under the internal prefix.

use gnosis_core::ChatCompletionRequest;
use gnosis_tools::ToolDefinition;
use serde_json::Value;

/// Namespace of tools the gateway executes itself.
pub const INTERNAL_TOOL_PREFIX: &str = "gnosis_";

pub fn is_owned(tool_name: &str) -> bool {
    tool_name.starts_with(INTERNAL_TOOL_PREFIX)
}

/// Registry name behind an owned tool call name.
pub fn strip_prefix(tool_name: &str) -> &str {
    tool_name
        .strip_prefix(INTERNAL_TOOL_PREFIX)
        .unwrap_or(tool_name)
}

/// Copy of `request` whose tools are the caller's tools followed by the
/// prefixed registry tools. Applying it twice yields the same request.
///
/// A registry schema is skipped only when the exact same schema is already
/// present. A caller tool that merely shares a prefixed name does not hide
/// the registry tool.
pub fn augment_request(
    request: &ChatCompletionRequest,
    definitions: &[ToolDefinition],
) -> ChatCompletionRequest {
    let mut augmented = request.clone();
    let caller_tools = augmented.tools.take().unwrap_or_default();

    let registry_tools: Vec<_> = definitions
        .iter()
        .map(|definition| definition.to_schema(INTERNAL_TOOL_PREFIX))
        .filter(|schema| !caller_tools.contains(schema))
        .collect();
    let mut tools = caller_tools;
    tools.extend(registry_tools);

    if tools.is_empty() {
        augmented.tools = request.tools.clone();
        return augmented;
    }

    if augmented.tool_choice.is_none() {
        augmented.tool_choice = Some(Value::String("auto".to_string()));
    }
    augmented.tools = Some(tools);
    augmented
}

#[cfg(test)]
mod tests {
    use super::*;
    use gnosis_core::{Message, ToolSchema};
    use serde_json::json;

    fn definition(name: &str) -> ToolDefinition {
        ToolDefinition {
            name: name.to_string(),
            description: format!("{} tool", name),
            parameters: json!({"type": "object", "properties": {}}),
        }
    }

    fn caller_tool(name: &str) -> ToolSchema {
        ToolSchema::function(name, "caller tool", json!({"type": "object", "properties": {}}))
    }

    fn tool_names(request: &ChatCompletionRequest) -> Vec<String> {
        request
            .tools
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|tool| tool.name().to_string())
            .collect()
    }

    #[test]
    fn caller_tools_come_first_then_prefixed_registry_tools() {
        let mut request = ChatCompletionRequest::new("gpt-4o", vec![Message::user("hi")]);
        request.tools = Some(vec![caller_tool("get_weather"), caller_tool("book_flight")]);

        let augmented = augment_request(&request, &[definition("search_documentation")]);

        assert_eq!(
            tool_names(&augmented),
            vec!["get_weather", "book_flight", "gnosis_search_documentation"]
        );
        assert_eq!(augmented.tool_choice, Some(json!("auto")));
        assert_eq!(tool_names(&request), vec!["get_weather", "book_flight"]);
        assert!(request.tool_choice.is_none());
    }

    #[test]
    fn explicit_tool_choice_is_kept() {
        let mut request = ChatCompletionRequest::new("gpt-4o", vec![Message::user("hi")]);
        request.tool_choice = Some(json!("none"));

        let augmented = augment_request(&request, &[definition("a")]);

        assert_eq!(augmented.tool_choice, Some(json!("none")));
    }

    #[test]
    fn augmenting_twice_does_not_duplicate() {
        let mut request = ChatCompletionRequest::new("gpt-4o", vec![Message::user("hi")]);
        request.tools = Some(vec![caller_tool("get_weather")]);
        let definitions = [definition("a"), definition("b")];

        let once = augment_request(&request, &definitions);
        let twice = augment_request(&once, &definitions);

        assert_eq!(once, twice);
        assert_eq!(tool_names(&twice), vec!["get_weather", "gnosis_a", "gnosis_b"]);
    }

    #[test]
    fn caller_tool_sharing_a_prefixed_name_does_not_hide_registry_tool() {
        let mut request = ChatCompletionRequest::new("gpt-4o", vec![Message::user("hi")]);
        request.tools = Some(vec![ToolSchema::function(
            "gnosis_a",
            "caller",
            json!({"type": "object", "properties": {"city": {"type": "string"}}}),
        )]);

        let augmented = augment_request(&request, &[definition("a")]);
        let tools = augmented.tools.as_deref().unwrap_or_default();

        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].function.description.as_deref(), Some("caller"));
        assert_eq!(tools[1], definition("a").to_schema(INTERNAL_TOOL_PREFIX));
        assert_eq!(augment_request(&augmented, &[definition("a")]), augmented);
    }

    #[test]
    fn no_tools_anywhere_leaves_request_untouched() {
        let request = ChatCompletionRequest::new("gpt-4o", vec![Message::user("hi")]);

        let augmented = augment_request(&request, &[]);

        assert_eq!(augmented, request);
        assert!(augmented.tool_choice.is_none());
    }

    #[test]
    fn ownership_is_decided_by_prefix() {
        assert!(is_owned("gnosis_get_current_time"));
        assert!(!is_owned("get_weather"));
        assert_eq!(strip_prefix("gnosis_get_current_time"), "get_current_time");
        assert_eq!(strip_prefix("get_weather"), "get_weather");
    }
}
