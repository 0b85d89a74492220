//! Weather data models
//!
//! This module contains the location the app watches and the decoded view of
//! a cached or fetched payload used for rendering.

pub mod weather;

pub use weather::{weather_code_to_condition, OpenMeteoClient, WeatherError};

/// The fixed location whose weather is watched
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    /// Human-readable place name
    pub name: String,
    /// Latitude coordinate
    pub latitude: f64,
    /// Longitude coordinate
    pub longitude: f64,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            name: "Warsaw".to_string(),
            latitude: 52.2297,
            longitude: 21.0122,
        }
    }
}

/// Current conditions decoded from a payload
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentConditions {
    /// Temperature in Celsius
    pub temperature: f64,
    /// Feels-like temperature in Celsius
    pub feels_like: Option<f64>,
    /// Relative humidity percentage (0-100)
    pub humidity: Option<u8>,
    /// Wind speed in km/h
    pub wind: Option<f64>,
    /// Raw WMO weather code
    pub weather_code: i32,
    /// Condition derived from the weather code
    pub condition: WeatherCondition,
}

/// Types of weather conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Fog,
    Drizzle,
    Rain,
    Showers,
    Snow,
    Thunderstorm,
    Unknown,
}

impl WeatherCondition {
    /// Short display text for the condition
    pub fn label(self) -> &'static str {
        match self {
            WeatherCondition::Clear => "Clear",
            WeatherCondition::PartlyCloudy => "Partly cloudy",
            WeatherCondition::Fog => "Fog",
            WeatherCondition::Drizzle => "Drizzle",
            WeatherCondition::Rain => "Rain",
            WeatherCondition::Showers => "Showers",
            WeatherCondition::Snow => "Snow",
            WeatherCondition::Thunderstorm => "Thunderstorm",
            WeatherCondition::Unknown => "—",
        }
    }
}
