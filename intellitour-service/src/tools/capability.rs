//! Typed capability invocations parsed from assistant tool calls.

use std::str::FromStr;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::registry::ToolName;
use crate::error::ToolCallError;

fn default_adults() -> u32 {
    1
}

fn default_max_width() -> u32 {
    800
}

fn default_width() -> u32 {
    600
}

fn default_height() -> u32 {
    400
}

fn default_radius() -> u32 {
    3000
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WeatherArgs {
    #[serde(alias = "city_name")]
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlightOfferArgs {
    pub origin: String,
    pub destination: String,
    pub departure_date: String,
    #[serde(default)]
    pub return_date: Option<String>,
    #[serde(default = "default_adults")]
    pub adults: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HotelArgs {
    pub city_code: String,
    #[serde(default)]
    pub check_in_date: Option<String>,
    #[serde(default)]
    pub check_out_date: Option<String>,
    #[serde(default = "default_adults")]
    pub adults: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocationSearchArgs {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocationDetailsArgs {
    pub place_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlacePhotoArgs {
    pub photo_reference: String,
    #[serde(default = "default_max_width")]
    pub max_width: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreetViewArgs {
    pub lat: f64,
    pub lng: f64,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NearbySearchArgs {
    pub lat: f64,
    pub lng: f64,
    #[serde(default = "default_radius")]
    pub radius: u32,
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub place_type: Option<String>,
}

/// One invocation of a known capability with its arguments
#[derive(Debug, Clone, PartialEq)]
pub enum Capability {
    Weather(WeatherArgs),
    FlightOffers(FlightOfferArgs),
    Hotels(HotelArgs),
    LocationSearch(LocationSearchArgs),
    LocationDetails(LocationDetailsArgs),
    PlacePhoto(PlacePhotoArgs),
    StreetView(StreetViewArgs),
    NearbySearch(NearbySearchArgs),
}

impl Capability {
    /// Parse a tool call's function name and JSON-encoded arguments.
    ///
    /// A blank argument string is read as an empty object.
    pub fn parse(name: &str, arguments: &str) -> Result<Self, ToolCallError> {
        let tool = ToolName::from_str(name).map_err(|_| ToolCallError::UnknownTool {
            name: name.to_string(),
        })?;

        let raw = if arguments.trim().is_empty() {
            "{}"
        } else {
            arguments
        };

        let capability = match tool {
            ToolName::GetWeather => Capability::Weather(args(tool, raw)?),
            ToolName::GetFlightOffers => Capability::FlightOffers(args(tool, raw)?),
            ToolName::GetHotels => Capability::Hotels(args(tool, raw)?),
            ToolName::SearchLocation => Capability::LocationSearch(args(tool, raw)?),
            ToolName::GetLocationDetails => Capability::LocationDetails(args(tool, raw)?),
            ToolName::GetPlacePhoto => Capability::PlacePhoto(args(tool, raw)?),
            ToolName::GetStreetViewImage => Capability::StreetView(args(tool, raw)?),
            ToolName::SearchNearbyPlaces => Capability::NearbySearch(args(tool, raw)?),
        };

        Ok(capability)
    }

    pub fn tool_name(&self) -> ToolName {
        match self {
            Capability::Weather(_) => ToolName::GetWeather,
            Capability::FlightOffers(_) => ToolName::GetFlightOffers,
            Capability::Hotels(_) => ToolName::GetHotels,
            Capability::LocationSearch(_) => ToolName::SearchLocation,
            Capability::LocationDetails(_) => ToolName::GetLocationDetails,
            Capability::PlacePhoto(_) => ToolName::GetPlacePhoto,
            Capability::StreetView(_) => ToolName::GetStreetViewImage,
            Capability::NearbySearch(_) => ToolName::SearchNearbyPlaces,
        }
    }
}

fn args<T: DeserializeOwned>(tool: ToolName, raw: &str) -> Result<T, ToolCallError> {
    serde_json::from_str(raw).map_err(|source| ToolCallError::MalformedArguments {
        tool: tool.to_string(),
        source,
    })
}
