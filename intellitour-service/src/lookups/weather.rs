//! OpenWeatherMap current-weather client.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use super::USER_AGENT;
use super::responses::WeatherReport;
use crate::config::WeatherConfig;
use crate::error::LookupError;

/// OpenWeatherMap API client
#[derive(Clone)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    main: MainReadings,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    feels_like: f64,
    humidity: u32,
}

#[derive(Debug, Deserialize)]
struct Condition {
    #[serde(default)]
    description: String,
}

impl WeatherClient {
    pub fn new(config: &WeatherConfig) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn current_url(&self, city: &str) -> String {
        format!(
            "{}/data/2.5/weather?q={}&appid={}&units=metric",
            self.base_url,
            urlencoding::encode(city),
            urlencoding::encode(&self.api_key)
        )
    }

    /// Current conditions for a city, in metric units
    pub async fn current(&self, city: &str) -> Result<WeatherReport, LookupError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(LookupError::Unresolved {
                message: "City name required.".to_string(),
            });
        }
        if self.api_key.is_empty() {
            return Err(LookupError::MissingCredentials {
                provider: "openweathermap",
            });
        }

        let response = self.client.get(self.current_url(city)).send().await?;
        match response.status() {
            status if status.is_success() => {
                let body: CurrentWeather = response.json().await?;
                Ok(report(city, body))
            }
            StatusCode::NOT_FOUND => Err(LookupError::NotFound {
                message: "Could not retrieve weather data for that city.".to_string(),
            }),
            status => Err(LookupError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

fn report(city: &str, body: CurrentWeather) -> WeatherReport {
    WeatherReport {
        city: city.to_string(),
        temperature: body.main.temp,
        feels_like: body.main.feels_like,
        humidity: body.main.humidity,
        description: body
            .weather
            .into_iter()
            .next()
            .map(|c| c.description)
            .unwrap_or_default(),
    }
}
