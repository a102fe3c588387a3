//! Lookup results handed back to the assistant as tool outputs.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub city: String,
    /// Degrees Celsius
    pub temperature: f64,
    pub feels_like: f64,
    /// Percent
    pub humidity: u32,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightOffer {
    pub price: String,
    pub currency: String,
    /// Segments of the outbound itinerary
    pub itinerary: Vec<FlightSegment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightSegment {
    pub departure: String,
    pub arrival: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub carrier: String,
    pub flight_number: String,
}

/// Hotel entry, priced when stay dates were given
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotelSummary {
    pub name: String,
    pub hotel_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_in_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out_date: Option<String>,
    pub contact: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceCandidate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub place_id: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceDetails {
    pub name: Option<String>,
    pub address: Option<String>,
    pub rating: Option<f64>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub opening_hours: Option<Vec<String>>,
    pub photo_reference: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyPlace {
    pub name: Option<String>,
    pub address: Option<String>,
    pub rating: Option<f64>,
    pub place_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacePhoto {
    pub photo_url: String,
    pub photo_reference: String,
    pub max_width: u32,
    /// Set when the redirect to the image could not be followed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}
