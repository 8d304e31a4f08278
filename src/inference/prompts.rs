//! Prompt text for the two completion call shapes.

use crate::mcp_client::ToolDescriptor;

use super::types::NO_TOOL;

/// Prompt for the constrained tool-selection call.
pub fn planning_prompt(user_message: &str) -> String {
    format!(
        "Choose the single tool that fulfils the user's request and fill in its \
         arguments from the request. Use only the tools provided. If the request \
         does not need a tool, choose the \"{NO_TOOL}\" tool. Do not force a \
         request into a tool that does not fit it.\n\n\
         User request: {user_message}"
    )
}

/// Prompt for the free-form answer call.
pub fn response_prompt(user_message: &str, tool_result: Option<&str>) -> String {
    match tool_result {
        None => format!(
            "Given the user's request, write a clear, concise and helpful response.\n\n\
             User request: {user_message}"
        ),
        Some(result) => format!(
            "Given the user's request and the result of the tool that was run for \
             it, write a clear, concise and helpful response in a natural, \
             conversational tone.\n\n\
             User request: {user_message}\n\n\
             Tool result: {result}"
        ),
    }
}

/// The synthetic tool the planner picks when no real tool applies.
pub fn no_tool_descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: NO_TOOL.to_string(),
        description: "Select this when the request can be answered without any \
                      other tool."
            .to_string(),
        input_schema: serde_json::json!({ "type": "object", "properties": {} }),
    }
}
