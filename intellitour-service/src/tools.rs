//! Travel capabilities the assistant can call.
//!
//! This module contains:
//! - The tool registry (names, descriptions, parameter schemas)
//! - Function-tool definitions used when provisioning the assistant
//! - Typed capability arguments parsed from tool calls

mod capability;
pub mod definitions;
pub mod registry;
mod tool_defs;

pub use capability::{
    Capability, FlightOfferArgs, HotelArgs, LocationDetailsArgs, LocationSearchArgs,
    NearbySearchArgs, PlacePhotoArgs, StreetViewArgs, WeatherArgs,
};
pub use definitions::{FunctionToolDefinition, function_tool_definitions};
pub use registry::ToolName;
