//! Open-Meteo weather API client
//!
//! This module fetches current conditions from the Open-Meteo API and
//! implements the [`FetchGateway`] contract over it. Payloads are kept as
//! compact JSON bytes; [`CurrentConditions::from_payload`] decodes them for
//! display.

use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use super::{CurrentConditions, Location, WeatherCondition};
use crate::gateway::{FetchError, FetchGateway};

/// Base URL for the Open-Meteo API
const OPEN_METEO_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Current-weather fields requested from Open-Meteo
const CURRENT_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,apparent_temperature,weather_code,wind_speed_10m";

/// Upper bound on one request, so a hung connection still ends in a failure
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when decoding a weather payload
#[derive(Debug, Error)]
pub enum WeatherError {
    /// Payload is not JSON of the expected shape
    #[error("Failed to parse weather payload: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Client for fetching current weather from the Open-Meteo API
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: Client,
    location: Location,
    base_url: String,
}

impl OpenMeteoClient {
    /// Create a client for the given location
    ///
    /// # Errors
    /// Returns `FetchError::Request` if the HTTP client cannot be built.
    pub fn new(location: Location) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, location))
    }

    /// Create a client with a custom HTTP client
    pub fn with_client(client: Client, location: Location) -> Self {
        Self {
            client,
            location,
            base_url: OPEN_METEO_BASE_URL.to_string(),
        }
    }

    /// Point the client at another endpoint (mock servers, mirrors)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Request URL for the configured location
    fn request_url(&self) -> String {
        format!(
            "{}?latitude={:.4}&longitude={:.4}&current={}",
            self.base_url, self.location.latitude, self.location.longitude, CURRENT_FIELDS
        )
    }

    /// Fetch the current weather as compact JSON bytes
    ///
    /// # Returns
    /// * `Ok(Vec<u8>)` - the response body re-encoded as compact JSON
    /// * `Err(FetchError)` - on transport failure, non-2xx status, or a body
    ///   that is not a JSON object
    pub async fn fetch_current(&self) -> Result<Vec<u8>, FetchError> {
        let url = self.request_url();
        tracing::debug!(%url, "requesting current weather");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let value: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|e| FetchError::Malformed(format!("invalid JSON: {}", e)))?;
        if !value.is_object() {
            return Err(FetchError::Malformed("response is not a JSON object".to_string()));
        }

        serde_json::to_vec(&value).map_err(|e| FetchError::Malformed(e.to_string()))
    }
}

impl FetchGateway for OpenMeteoClient {
    fn fetch(&self) -> BoxFuture<'_, Result<Vec<u8>, FetchError>> {
        self.fetch_current().boxed()
    }

    fn validate(&self, payload: &[u8]) -> Result<(), FetchError> {
        CurrentConditions::from_payload(payload)
            .map(|_| ())
            .map_err(|e| FetchError::Malformed(e.to_string()))
    }
}

impl CurrentConditions {
    /// Decode the `current` object of an Open-Meteo payload
    ///
    /// Requires a numeric `temperature_2m` and an integer `weather_code`;
    /// the remaining fields are optional.
    pub fn from_payload(payload: &[u8]) -> Result<Self, WeatherError> {
        let response: OpenMeteoResponse = serde_json::from_slice(payload)?;
        let current = response.current;

        Ok(CurrentConditions {
            temperature: current.temperature_2m,
            feels_like: current.apparent_temperature,
            humidity: current
                .relative_humidity_2m
                .map(|h| h.clamp(0.0, 100.0).round() as u8),
            wind: current.wind_speed_10m,
            weather_code: current.weather_code,
            condition: weather_code_to_condition(current.weather_code),
        })
    }
}

/// Map WMO weather code to WeatherCondition enum
///
/// Weather codes from WMO (World Meteorological Organization):
/// - 0: Clear sky
/// - 1-3: Mainly clear, partly cloudy, overcast
/// - 45, 48: Fog
/// - 51-57: Drizzle (including freezing drizzle)
/// - 61-67: Rain (including freezing rain)
/// - 71-77, 85-86: Snow
/// - 80-82: Rain showers
/// - 95-99: Thunderstorm
pub fn weather_code_to_condition(code: i32) -> WeatherCondition {
    match code {
        0 => WeatherCondition::Clear,
        1..=3 => WeatherCondition::PartlyCloudy,
        45 | 48 => WeatherCondition::Fog,
        51..=57 => WeatherCondition::Drizzle,
        61..=67 => WeatherCondition::Rain,
        71..=77 | 85 | 86 => WeatherCondition::Snow,
        80..=82 => WeatherCondition::Showers,
        95..=99 => WeatherCondition::Thunderstorm,
        _ => WeatherCondition::Unknown,
    }
}

/// Open-Meteo API response structure
#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    current: CurrentWeather,
}

/// Current weather data from Open-Meteo
#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature_2m: f64,
    weather_code: i32,
    relative_humidity_2m: Option<f64>,
    apparent_temperature: Option<f64>,
    wind_speed_10m: Option<f64>,
}
