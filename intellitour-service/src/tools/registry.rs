//! Registry of the travel capabilities exposed to the assistant.
//!
//! Tool names are derived from enum variants via strum, so the name the
//! assistant is provisioned with and the name the dispatcher matches on can
//! never drift apart.

use std::collections::HashMap;
use std::sync::LazyLock;

use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use super::FunctionToolDefinition;

/// All tool names as an exhaustive enum.
///
/// Adding a new tool requires:
/// 1. Add variant here
/// 2. Register metadata in `tool_defs`
/// 3. Add a `Capability` variant (compile error in the dispatcher otherwise)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, EnumIter, Display,
)]
#[strum(serialize_all = "snake_case")]
pub enum ToolName {
    // Travel providers
    GetWeather,
    GetFlightOffers,
    GetHotels,

    // Places
    SearchLocation,
    GetLocationDetails,
    GetPlacePhoto,
    GetStreetViewImage,
    SearchNearbyPlaces,
}

/// Metadata for a tool definition.
#[derive(Debug, Clone)]
pub struct ToolMetadata {
    /// Tool identifier - string representation derived via strum Display
    pub name: ToolName,

    /// Description shown to the model
    pub description: &'static str,

    /// JSON Schema for tool parameters (called lazily to avoid static initialization issues)
    pub parameters: fn() -> serde_json::Value,
}

/// Central registry of all tools.
pub struct ToolRegistry {
    tools: HashMap<ToolName, ToolMetadata>,
}

impl ToolRegistry {
    /// Build the registry from all registered tool definitions
    pub fn new() -> Self {
        let mut tools = HashMap::new();

        super::tool_defs::register_all_tools(&mut tools);

        Self { tools }
    }

    /// Function-tool definitions in declaration order
    pub fn function_definitions(&self) -> Vec<FunctionToolDefinition> {
        ToolName::iter()
            .filter_map(|name| self.tools.get(&name))
            .map(FunctionToolDefinition::from)
            .collect()
    }

    /// Get metadata by string name
    #[cfg(test)]
    pub fn get_by_str(&self, name: &str) -> Option<&ToolMetadata> {
        use std::str::FromStr;

        ToolName::from_str(name)
            .ok()
            .and_then(|n| self.tools.get(&n))
    }

    /// Number of registered tools
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global singleton registry instance
pub static REGISTRY: LazyLock<ToolRegistry> = LazyLock::new(ToolRegistry::new);
