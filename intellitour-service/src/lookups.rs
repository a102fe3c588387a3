//! External travel lookups (weather, flights, hotels, places).
//!
//! Each provider client translates one capability's arguments into an HTTP
//! request and maps the provider response into a small serializable result.

mod amadeus;
mod google_maps;
mod responses;
mod weather;

pub use amadeus::AmadeusClient;
pub use google_maps::GoogleMapsClient;
pub use responses::{
    FlightOffer, FlightSegment, HotelSummary, NearbyPlace, PlaceCandidate, PlaceDetails,
    PlacePhoto, WeatherReport,
};
pub use weather::WeatherClient;

use async_trait::async_trait;

use crate::config::AppConfig;
use crate::error::LookupError;
use crate::tools::{
    FlightOfferArgs, HotelArgs, LocationDetailsArgs, LocationSearchArgs, NearbySearchArgs,
    PlacePhotoArgs, StreetViewArgs, WeatherArgs,
};

const USER_AGENT: &str = concat!("intellitour-service/", env!("CARGO_PKG_VERSION"));

/// One method per capability
#[async_trait]
pub trait TravelLookups: Send + Sync {
    async fn weather(&self, args: &WeatherArgs) -> Result<WeatherReport, LookupError>;

    async fn flight_offers(&self, args: &FlightOfferArgs) -> Result<Vec<FlightOffer>, LookupError>;

    async fn hotels(&self, args: &HotelArgs) -> Result<Vec<HotelSummary>, LookupError>;

    async fn search_location(
        &self,
        args: &LocationSearchArgs,
    ) -> Result<PlaceCandidate, LookupError>;

    async fn location_details(
        &self,
        args: &LocationDetailsArgs,
    ) -> Result<PlaceDetails, LookupError>;

    async fn place_photo(&self, args: &PlacePhotoArgs) -> Result<PlacePhoto, LookupError>;

    /// Pure URL construction; no request is made
    fn street_view_url(&self, args: &StreetViewArgs) -> String;

    async fn nearby_places(&self, args: &NearbySearchArgs)
    -> Result<Vec<NearbyPlace>, LookupError>;
}

/// Lookups backed by the real provider APIs
pub struct HttpTravelLookups {
    weather: WeatherClient,
    amadeus: AmadeusClient,
    maps: GoogleMapsClient,
}

impl HttpTravelLookups {
    pub fn new(config: &AppConfig) -> Result<Self, LookupError> {
        Ok(Self {
            weather: WeatherClient::new(&config.weather)?,
            amadeus: AmadeusClient::new(&config.amadeus)?,
            maps: GoogleMapsClient::new(&config.google_maps)?,
        })
    }
}

#[async_trait]
impl TravelLookups for HttpTravelLookups {
    async fn weather(&self, args: &WeatherArgs) -> Result<WeatherReport, LookupError> {
        self.weather.current(&args.city).await
    }

    async fn flight_offers(&self, args: &FlightOfferArgs) -> Result<Vec<FlightOffer>, LookupError> {
        self.amadeus.flight_offers(args).await
    }

    async fn hotels(&self, args: &HotelArgs) -> Result<Vec<HotelSummary>, LookupError> {
        self.amadeus.hotels(args).await
    }

    async fn search_location(
        &self,
        args: &LocationSearchArgs,
    ) -> Result<PlaceCandidate, LookupError> {
        self.maps.search_location(&args.query).await
    }

    async fn location_details(
        &self,
        args: &LocationDetailsArgs,
    ) -> Result<PlaceDetails, LookupError> {
        self.maps.location_details(&args.place_id).await
    }

    async fn place_photo(&self, args: &PlacePhotoArgs) -> Result<PlacePhoto, LookupError> {
        self.maps.place_photo(args).await
    }

    fn street_view_url(&self, args: &StreetViewArgs) -> String {
        self.maps.street_view_url(args)
    }

    async fn nearby_places(
        &self,
        args: &NearbySearchArgs,
    ) -> Result<Vec<NearbyPlace>, LookupError> {
        self.maps.nearby_places(args).await
    }
}
