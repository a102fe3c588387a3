//! Amadeus self-service client (flight offers, hotel search).
//!
//! Requests carry an OAuth2 client-credentials token that is cached until
//! shortly before it expires.

use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::USER_AGENT;
use super::responses::{FlightOffer, FlightSegment, HotelSummary};
use crate::config::AmadeusConfig;
use crate::error::LookupError;
use crate::tools::{FlightOfferArgs, HotelArgs};

/// Tokens are refreshed this long before the provider expires them
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

const MAX_FLIGHT_OFFERS: usize = 5;
const MAX_HOTEL_IDS: usize = 10;
const MAX_HOTEL_RESULTS: usize = 5;

/// Amadeus API client
pub struct AmadeusClient {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    token: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    #[serde(default)]
    title: String,
    #[serde(default)]
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationEntry {
    iata_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawOffer {
    price: RawPrice,
    #[serde(default)]
    itineraries: Vec<RawItinerary>,
}

#[derive(Debug, Deserialize)]
struct RawPrice {
    total: String,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct RawItinerary {
    #[serde(default)]
    segments: Vec<RawSegment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSegment {
    departure: RawEndpoint,
    arrival: RawEndpoint,
    carrier_code: String,
    number: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEndpoint {
    iata_code: String,
    at: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHotel {
    hotel_id: Option<String>,
    name: Option<String>,
    rating: Option<String>,
    address: Option<RawAddress>,
    contact: Option<RawContact>,
}

#[derive(Debug, Deserialize)]
struct RawAddress {
    #[serde(default)]
    lines: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawContact {
    phone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawHotelOffers {
    #[serde(default)]
    hotel: RawHotel,
    #[serde(default)]
    offers: Vec<RawHotelOffer>,
}

#[derive(Debug, Deserialize)]
struct RawHotelOffer {
    price: Option<RawHotelPrice>,
}

#[derive(Debug, Deserialize)]
struct RawHotelPrice {
    total: Option<String>,
    currency: Option<String>,
}

impl AmadeusClient {
    pub fn new(config: &AmadeusConfig) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, LookupError> {
        if self.api_key.is_empty() || self.api_secret.is_empty() {
            return Err(LookupError::MissingCredentials { provider: "amadeus" });
        }

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| Instant::now() < t.refresh_at) {
            return Ok(token.access_token.clone());
        }

        let response = self
            .client
            .post(format!("{}/v1/security/oauth2/token", self.base_url))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.api_key.as_str()),
                ("client_secret", self.api_secret.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::Api {
                status,
                message: error_message(&body),
            });
        }

        let token: TokenResponse = response.json().await?;
        debug!(expires_in = token.expires_in, "Obtained Amadeus access token");

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }

    async fn get<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<T, LookupError> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.base_url, path_and_query);

        let response = self.client.get(&url).bearer_auth(token).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::Api {
                status,
                message: error_message(&body),
            });
        }

        Ok(response.json().await?)
    }

    /// Resolve a city name to its IATA code; 3-letter codes pass through
    pub async fn resolve_city_to_iata(&self, city_code_or_name: &str) -> Result<String, LookupError> {
        let input = city_code_or_name.trim();
        if let Some(code) = as_iata_code(input) {
            return Ok(code);
        }

        let locations: DataEnvelope<LocationEntry> = self
            .get(&format!(
                "/v1/reference-data/locations?subType=CITY&keyword={}",
                urlencoding::encode(input)
            ))
            .await?;

        locations
            .data
            .into_iter()
            .next()
            .and_then(|l| l.iata_code)
            .ok_or_else(|| LookupError::Unresolved {
                message: format!("Could not find IATA code for city '{}'.", input),
            })
    }

    /// Top flight offers between two cities or airports
    pub async fn flight_offers(&self, args: &FlightOfferArgs) -> Result<Vec<FlightOffer>, LookupError> {
        let (origin, destination) = match (
            self.resolve_city_to_iata(&args.origin).await,
            self.resolve_city_to_iata(&args.destination).await,
        ) {
            (Ok(origin), Ok(destination)) => (origin, destination),
            (Err(LookupError::Unresolved { .. }), _) | (_, Err(LookupError::Unresolved { .. })) => {
                return Err(LookupError::Unresolved {
                    message: "Could not resolve one or both city names to IATA codes.".to_string(),
                });
            }
            (Err(e), _) | (_, Err(e)) => return Err(e),
        };

        let mut query = format!(
            "/v2/shopping/flight-offers?originLocationCode={}&destinationLocationCode={}&departureDate={}&adults={}",
            origin,
            destination,
            urlencoding::encode(&args.departure_date),
            args.adults
        );
        if let Some(return_date) = &args.return_date {
            query.push_str(&format!("&returnDate={}", urlencoding::encode(return_date)));
        }

        let offers: DataEnvelope<RawOffer> = self.get(&query).await?;
        info!(
            origin = %origin,
            destination = %destination,
            count = offers.data.len(),
            "Amadeus flight offers received"
        );

        Ok(summarize_offers(offers.data))
    }

    /// Hotels in a city; priced offers when both stay dates are given
    pub async fn hotels(&self, args: &HotelArgs) -> Result<Vec<HotelSummary>, LookupError> {
        let city_code = match self.resolve_city_to_iata(&args.city_code).await {
            Ok(code) => code.to_uppercase(),
            Err(LookupError::Unresolved { .. }) => {
                return Err(LookupError::Unresolved {
                    message: format!(
                        "Could not find the IATA code for the city '{}'.",
                        args.city_code
                    ),
                });
            }
            Err(e) => return Err(e),
        };

        let listing: DataEnvelope<RawHotel> = self
            .get(&format!(
                "/v1/reference-data/locations/hotels/by-city?cityCode={}",
                city_code
            ))
            .await?;

        if listing.data.is_empty() {
            return Err(LookupError::NotFound {
                message: format!(
                    "No hotels found in the reference data for city '{}' ({}).",
                    args.city_code, city_code
                ),
            });
        }

        let summaries = match (&args.check_in_date, &args.check_out_date) {
            (Some(check_in), Some(check_out)) => {
                let hotel_ids: Vec<String> = listing
                    .data
                    .iter()
                    .filter_map(|h| h.hotel_id.clone())
                    .take(MAX_HOTEL_IDS)
                    .collect();
                self.priced_hotels(&hotel_ids, check_in, check_out, args.adults)
                    .await
            }
            _ => listing
                .data
                .into_iter()
                .take(MAX_HOTEL_RESULTS)
                .map(basic_hotel)
                .collect(),
        };

        if summaries.is_empty() {
            return Err(LookupError::NotFound {
                message: format!(
                    "No available hotel offers found for '{}' ({}). Try specifying check-in and check-out dates.",
                    args.city_code, city_code
                ),
            });
        }

        info!(city_code = %city_code, count = summaries.len(), "Amadeus hotels found");
        Ok(summaries)
    }

    /// Batch offer search, falling back to one request per hotel
    async fn priced_hotels(
        &self,
        hotel_ids: &[String],
        check_in: &str,
        check_out: &str,
        adults: u32,
    ) -> Vec<HotelSummary> {
        let stay = format!(
            "checkInDate={}&checkOutDate={}&adults={}",
            urlencoding::encode(check_in),
            urlencoding::encode(check_out),
            adults
        );

        let batch: Result<DataEnvelope<RawHotelOffers>, _> = self
            .get(&format!(
                "/v3/shopping/hotel-offers?hotelIds={}&{}",
                hotel_ids.join(","),
                stay
            ))
            .await;

        let offers = match batch {
            Ok(batch) => batch.data,
            Err(e) => {
                warn!(error = %e, "Batch hotel offer search failed, trying individual hotels");
                let mut offers = Vec::new();
                for hotel_id in hotel_ids.iter().take(MAX_HOTEL_RESULTS) {
                    match self
                        .get::<DataEnvelope<RawHotelOffers>>(&format!(
                            "/v3/shopping/hotel-offers?hotelIds={}&{}",
                            urlencoding::encode(hotel_id),
                            stay
                        ))
                        .await
                    {
                        Ok(found) => offers.extend(found.data),
                        Err(e) => debug!(hotel_id = %hotel_id, error = %e, "No offers for hotel"),
                    }
                }
                offers
            }
        };

        offers
            .into_iter()
            .filter_map(|o| priced_hotel(o, check_in, check_out))
            .take(MAX_HOTEL_RESULTS)
            .collect()
    }
}

/// Three alphabetic characters are taken as an IATA code
fn as_iata_code(input: &str) -> Option<String> {
    (input.chars().count() == 3 && input.chars().all(|c| c.is_alphabetic()))
        .then(|| input.to_uppercase())
}

/// Best human-readable message from an Amadeus error body
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.errors.into_iter().next())
        .map(|e| match e.detail {
            Some(detail) if !detail.is_empty() => format!("{}: {}", e.title, detail),
            _ => e.title,
        })
        .unwrap_or_else(|| body.to_string())
}

fn summarize_offers(offers: Vec<RawOffer>) -> Vec<FlightOffer> {
    offers
        .into_iter()
        .take(MAX_FLIGHT_OFFERS)
        .map(|offer| FlightOffer {
            price: offer.price.total,
            currency: offer.price.currency,
            itinerary: offer
                .itineraries
                .into_iter()
                .next()
                .map(|i| i.segments)
                .unwrap_or_default()
                .into_iter()
                .map(|s| FlightSegment {
                    departure: s.departure.iata_code,
                    arrival: s.arrival.iata_code,
                    departure_time: s.departure.at,
                    arrival_time: s.arrival.at,
                    carrier: s.carrier_code,
                    flight_number: s.number,
                })
                .collect(),
        })
        .collect()
}

fn na(value: Option<String>) -> String {
    value.unwrap_or_else(|| "N/A".to_string())
}

fn first_line(address: Option<RawAddress>) -> String {
    na(address.and_then(|a| a.lines.into_iter().next()))
}

fn basic_hotel(hotel: RawHotel) -> HotelSummary {
    HotelSummary {
        name: na(hotel.name),
        hotel_id: na(hotel.hotel_id),
        rating: None,
        address: first_line(hotel.address),
        price: None,
        currency: None,
        check_in_date: None,
        check_out_date: None,
        contact: na(hotel.contact.and_then(|c| c.phone)),
        note: Some("Check-in and check-out dates required for pricing information".to_string()),
    }
}

fn priced_hotel(entry: RawHotelOffers, check_in: &str, check_out: &str) -> Option<HotelSummary> {
    let offer = entry.offers.into_iter().next()?;
    let (price, currency) = match offer.price {
        Some(p) => (p.total, p.currency),
        None => (None, None),
    };
    let hotel = entry.hotel;

    Some(HotelSummary {
        name: na(hotel.name),
        hotel_id: na(hotel.hotel_id),
        rating: Some(na(hotel.rating)),
        address: first_line(hotel.address),
        price: Some(na(price)),
        currency: Some(na(currency)),
        check_in_date: Some(check_in.to_string()),
        check_out_date: Some(check_out.to_string()),
        contact: na(hotel.contact.and_then(|c| c.phone)),
        note: None,
    })
}
