//! Function-tool definitions in the assistant runtime's format.
//!
//! The definitions themselves live in the unified registry in
//! `crate::tools::registry`; this module provides the wire structs.

use serde::{Deserialize, Serialize};

use super::registry::{REGISTRY, ToolMetadata};

/// Tool definition sent when provisioning an assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl From<&ToolMetadata> for FunctionToolDefinition {
    fn from(tool: &ToolMetadata) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: tool.name.to_string(),
                description: tool.description.to_string(),
                parameters: (tool.parameters)(),
            },
        }
    }
}

/// All function-tool definitions, from the registry
pub fn function_tool_definitions() -> Vec<FunctionToolDefinition> {
    REGISTRY.function_definitions()
}
