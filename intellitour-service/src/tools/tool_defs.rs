//! Tool definitions organized by category.
//!
//! Each submodule defines tools for a specific category and provides
//! a registration function that adds them to the registry.

mod places;
mod travel;

use std::collections::HashMap;

use super::registry::{ToolMetadata, ToolName};

/// Register all tools from all categories into the registry.
pub fn register_all_tools(registry: &mut HashMap<ToolName, ToolMetadata>) {
    travel::register(registry);
    places::register(registry);
}
