//! Google Maps place tool definitions.

use std::collections::HashMap;

use crate::tools::registry::{ToolMetadata, ToolName};

pub fn register(registry: &mut HashMap<ToolName, ToolMetadata>) {
    let tools = [
        search_location(),
        get_location_details(),
        get_place_photo(),
        get_street_view_image(),
        search_nearby_places(),
    ];
    for tool in tools {
        registry.insert(tool.name, tool);
    }
}

fn search_location() -> ToolMetadata {
    ToolMetadata {
        name: ToolName::SearchLocation,
        description: "Search for a location using a text query. Returns the top match with name, address, place_id, and coordinates.",
        parameters: || {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Free text search query, e.g., 'Nairobi National Park'."
                    }
                },
                "required": ["query"]
            })
        },
    }
}

fn get_location_details() -> ToolMetadata {
    ToolMetadata {
        name: ToolName::GetLocationDetails,
        description: "Given a Google place_id, return detailed information including photos and coordinates.",
        parameters: || {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "place_id": {
                        "type": "string",
                        "description": "Google Place ID."
                    }
                },
                "required": ["place_id"]
            })
        },
    }
}

fn get_place_photo() -> ToolMetadata {
    ToolMetadata {
        name: ToolName::GetPlacePhoto,
        description: "Return a Google Maps Place Photo URL given a photo_reference.",
        parameters: || {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "photo_reference": {
                        "type": "string",
                        "description": "Google photo_reference returned by place details."
                    },
                    "max_width": {
                        "type": "integer",
                        "description": "Maximum width of the photo in pixels.",
                        "default": 800
                    }
                },
                "required": ["photo_reference"]
            })
        },
    }
}

fn get_street_view_image() -> ToolMetadata {
    ToolMetadata {
        name: ToolName::GetStreetViewImage,
        description: "Return a Google Street View image URL for given coordinates.",
        parameters: || {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "lat": { "type": "number" },
                    "lng": { "type": "number" },
                    "width": {
                        "type": "integer",
                        "description": "Image width in px",
                        "default": 600
                    },
                    "height": {
                        "type": "integer",
                        "description": "Image height in px",
                        "default": 400
                    }
                },
                "required": ["lat", "lng"]
            })
        },
    }
}

fn search_nearby_places() -> ToolMetadata {
    ToolMetadata {
        name: ToolName::SearchNearbyPlaces,
        description: "Search for nearby points of interest using coordinates, keyword or place type. Useful for queries like 'find 5-star hotels near Nairobi'.",
        parameters: || {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "lat": {
                        "type": "number",
                        "description": "Latitude of the center location"
                    },
                    "lng": {
                        "type": "number",
                        "description": "Longitude of the center location"
                    },
                    "radius": {
                        "type": "integer",
                        "description": "Search radius in meters",
                        "default": 3000
                    },
                    "keyword": {
                        "type": "string",
                        "description": "Search keyword filter",
                        "nullable": true
                    },
                    "place_type": {
                        "type": "string",
                        "description": "Google Maps place type filter (e.g. 'restaurant', 'hotel')",
                        "nullable": true
                    }
                },
                "required": ["lat", "lng"]
            })
        },
    }
}
