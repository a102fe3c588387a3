//! Google Maps Platform client (Places and Street View).

use reqwest::{Client, StatusCode, header, redirect};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;

use super::USER_AGENT;
use super::responses::{NearbyPlace, PlaceCandidate, PlaceDetails, PlacePhoto};
use crate::config::GoogleMapsConfig;
use crate::error::LookupError;
use crate::tools::{NearbySearchArgs, PlacePhotoArgs, StreetViewArgs};

/// Timeout for resolving a photo redirect
const PHOTO_TIMEOUT_SECS: u64 = 5;

/// Google Maps API client
#[derive(Clone)]
pub struct GoogleMapsClient {
    client: Client,
    /// Does not follow redirects, so the photo `Location` can be read
    photo_client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct FindPlaceResponse {
    status: String,
    #[serde(default)]
    candidates: Vec<RawPlace>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    result: Option<RawPlace>,
}

#[derive(Debug, Deserialize)]
struct NearbyResponse {
    status: String,
    #[serde(default)]
    results: Vec<RawPlace>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPlace {
    name: Option<String>,
    formatted_address: Option<String>,
    vicinity: Option<String>,
    place_id: Option<String>,
    rating: Option<f64>,
    formatted_phone_number: Option<String>,
    website: Option<String>,
    opening_hours: Option<OpeningHours>,
    #[serde(default)]
    photos: Vec<RawPhoto>,
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct OpeningHours {
    weekday_text: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawPhoto {
    photo_reference: String,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl RawPlace {
    fn coordinates(&self) -> (f64, f64) {
        self.geometry
            .as_ref()
            .map(|g| (g.location.lat, g.location.lng))
            .unwrap_or_default()
    }
}

impl GoogleMapsClient {
    pub fn new(config: &GoogleMapsConfig) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        let photo_client = Client::builder()
            .timeout(Duration::from_secs(PHOTO_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            photo_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn require_key(&self) -> Result<(), LookupError> {
        if self.api_key.is_empty() {
            return Err(LookupError::MissingCredentials {
                provider: "google_maps",
            });
        }
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, LookupError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(LookupError::Api {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json().await?)
    }

    /// Top candidate for a free-text place query
    pub async fn search_location(&self, query: &str) -> Result<PlaceCandidate, LookupError> {
        self.require_key()?;
        let url = format!(
            "{}/maps/api/place/findplacefromtext/json?input={}&inputtype=textquery&fields=name,geometry,place_id,formatted_address&key={}",
            self.base_url,
            urlencoding::encode(query),
            urlencoding::encode(&self.api_key)
        );

        let response: FindPlaceResponse = self.get(&url).await?;
        top_candidate(response)
    }

    /// Details for a place id
    pub async fn location_details(&self, place_id: &str) -> Result<PlaceDetails, LookupError> {
        self.require_key()?;
        let url = format!(
            "{}/maps/api/place/details/json?place_id={}&fields=name,formatted_address,rating,opening_hours,formatted_phone_number,website,photo,geometry&key={}",
            self.base_url,
            urlencoding::encode(place_id),
            urlencoding::encode(&self.api_key)
        );

        let response: DetailsResponse = self.get(&url).await?;
        details(response)
    }

    /// Points of interest around a coordinate
    pub async fn nearby_places(&self, args: &NearbySearchArgs) -> Result<Vec<NearbyPlace>, LookupError> {
        self.require_key()?;
        let mut url = format!(
            "{}/maps/api/place/nearbysearch/json?location={},{}&radius={}",
            self.base_url, args.lat, args.lng, args.radius
        );
        if let Some(keyword) = args.keyword.as_deref().filter(|k| !k.is_empty()) {
            url.push_str(&format!("&keyword={}", urlencoding::encode(keyword)));
        }
        if let Some(place_type) = args.place_type.as_deref().filter(|t| !t.is_empty()) {
            url.push_str(&format!("&type={}", urlencoding::encode(place_type)));
        }
        url.push_str(&format!("&key={}", urlencoding::encode(&self.api_key)));

        let response: NearbyResponse = self.get(&url).await?;
        nearby(response)
    }

    fn photo_url(&self, photo_reference: &str, max_width: u32) -> String {
        format!(
            "{}/maps/api/place/photo?maxwidth={}&photo_reference={}&key={}",
            self.base_url,
            max_width,
            urlencoding::encode(photo_reference),
            urlencoding::encode(&self.api_key)
        )
    }

    /// Directly viewable photo URL, resolved through the Places photo redirect
    pub async fn place_photo(&self, args: &PlacePhotoArgs) -> Result<PlacePhoto, LookupError> {
        if args.photo_reference.trim().is_empty() {
            return Err(LookupError::Unresolved {
                message: "No photo_reference provided".to_string(),
            });
        }
        self.require_key()?;

        let photo_url = self.photo_url(&args.photo_reference, args.max_width);
        let (resolved, warning) = match self.photo_client.get(&photo_url).send().await {
            Ok(response) if response.status().is_redirection() => {
                let location = response
                    .headers()
                    .get(header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                (location.unwrap_or_else(|| photo_url.clone()), None)
            }
            Ok(response) if response.status() == StatusCode::OK => (photo_url.clone(), None),
            Ok(response) => (
                photo_url.clone(),
                Some(format!(
                    "Could not follow redirect (status: {}). Using original URL.",
                    response.status().as_u16()
                )),
            ),
            Err(e) => {
                warn!(error = %e, "Place photo redirect failed");
                (
                    photo_url.clone(),
                    Some(format!(
                        "Could not resolve redirect: {}. Using original URL.",
                        e
                    )),
                )
            }
        };

        Ok(PlacePhoto {
            photo_url: resolved,
            photo_reference: args.photo_reference.clone(),
            max_width: args.max_width,
            warning,
        })
    }

    /// Street View static image URL for a coordinate
    pub fn street_view_url(&self, args: &StreetViewArgs) -> String {
        format!(
            "{}/maps/api/streetview?size={}x{}&location={},{}&key={}",
            self.base_url,
            args.width,
            args.height,
            args.lat,
            args.lng,
            urlencoding::encode(&self.api_key)
        )
    }
}

fn top_candidate(response: FindPlaceResponse) -> Result<PlaceCandidate, LookupError> {
    let candidate = match response.status.as_str() {
        "OK" => response.candidates.into_iter().next(),
        _ => None,
    }
    .ok_or_else(|| LookupError::NotFound {
        message: "No results found".to_string(),
    })?;

    let (lat, lng) = candidate.coordinates();
    Ok(PlaceCandidate {
        name: candidate.name,
        address: candidate.formatted_address,
        place_id: candidate.place_id,
        lat,
        lng,
    })
}

fn details(response: DetailsResponse) -> Result<PlaceDetails, LookupError> {
    let place = match response.status.as_str() {
        "OK" => response.result,
        _ => None,
    }
    .ok_or_else(|| LookupError::NotFound {
        message: "Could not retrieve details".to_string(),
    })?;

    let (lat, lng) = place.coordinates();
    Ok(PlaceDetails {
        name: place.name,
        address: place.formatted_address,
        rating: place.rating,
        phone: place.formatted_phone_number,
        website: place.website,
        opening_hours: place.opening_hours.and_then(|h| h.weekday_text),
        photo_reference: place.photos.into_iter().next().map(|p| p.photo_reference),
        lat,
        lng,
    })
}

fn nearby(response: NearbyResponse) -> Result<Vec<NearbyPlace>, LookupError> {
    if response.status != "OK" {
        return Err(LookupError::NotFound {
            message: "No nearby results found".to_string(),
        });
    }

    Ok(response
        .results
        .into_iter()
        .map(|p| NearbyPlace {
            name: p.name,
            address: p.vicinity,
            rating: p.rating,
            place_id: p.place_id,
        })
        .collect())
}
