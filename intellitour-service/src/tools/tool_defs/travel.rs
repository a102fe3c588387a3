//! Weather, flight and hotel tool definitions.

use std::collections::HashMap;

use crate::tools::registry::{ToolMetadata, ToolName};

pub fn register(registry: &mut HashMap<ToolName, ToolMetadata>) {
    let tools = [get_weather(), get_flight_offers(), get_hotels()];
    for tool in tools {
        registry.insert(tool.name, tool);
    }
}

fn get_weather() -> ToolMetadata {
    ToolMetadata {
        name: ToolName::GetWeather,
        description: "Fetch the current weather for a given city using the OpenWeatherMap API. Use this ONLY when the user asks about weather, temperature, climate, or conditions.",
        parameters: || {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "city": {
                        "type": "string",
                        "description": "The name of the city (e.g., 'Nairobi')."
                    }
                },
                "required": ["city"]
            })
        },
    }
}

fn get_flight_offers() -> ToolMetadata {
    ToolMetadata {
        name: ToolName::GetFlightOffers,
        description: "Search for flight offers between two cities using the Amadeus API. Use this when the user asks about flights, airfares, or ticket prices.",
        parameters: || {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "origin": {
                        "type": "string",
                        "description": "Origin airport/city (IATA code or name, e.g., 'NBO' or 'Nairobi')."
                    },
                    "destination": {
                        "type": "string",
                        "description": "Destination airport/city (IATA code or name, e.g., 'DXB' or 'Dubai')."
                    },
                    "departure_date": {
                        "type": "string",
                        "description": "Departure date in YYYY-MM-DD format."
                    },
                    "return_date": {
                        "type": "string",
                        "description": "Optional return date in YYYY-MM-DD format."
                    },
                    "adults": {
                        "type": "integer",
                        "description": "Number of adult passengers.",
                        "default": 1
                    }
                },
                "required": ["origin", "destination", "departure_date"]
            })
        },
    }
}

fn get_hotels() -> ToolMetadata {
    ToolMetadata {
        name: ToolName::GetHotels,
        description: "Find available hotels in a destination city using the Amadeus API. Use this when the user asks about hotels, accommodation, or places to stay. Prices are only available when both check-in and check-out dates are given.",
        parameters: || {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "city_code": {
                        "type": "string",
                        "description": "IATA city code or city name (e.g., 'NBO' or 'Nairobi')."
                    },
                    "check_in_date": {
                        "type": "string",
                        "description": "Optional check-in date in YYYY-MM-DD format."
                    },
                    "check_out_date": {
                        "type": "string",
                        "description": "Optional check-out date in YYYY-MM-DD format."
                    },
                    "adults": {
                        "type": "integer",
                        "description": "Number of adult guests.",
                        "default": 1
                    }
                },
                "required": ["city_code"]
            })
        },
    }
}
