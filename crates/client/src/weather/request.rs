//! OpenWeatherMap request parameters and validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::http::ApiError;

/// Forecast horizon accepted by the 3-hourly forecast endpoint.
pub const MAX_FORECAST_DAYS: u8 = 5;

/// Where to look up the weather.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    /// City name, optionally with a country code (`London,GB`).
    City(String),
    Coords { lat: f64, lon: f64 },
}

impl Location {
    /// A city name. Surrounding whitespace is trimmed.
    pub fn city(name: &str) -> Result<Self, ApiError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::InvalidInput("city name cannot be empty".to_string()));
        }
        Ok(Location::City(name.to_string()))
    }

    /// Validated coordinates: latitude in [-90, 90], longitude in [-180, 180].
    pub fn coords(lat: f64, lon: f64) -> Result<Self, ApiError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(ApiError::InvalidInput(format!("latitude {lat} out of range (-90 to 90)")));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(ApiError::InvalidInput(format!("longitude {lon} out of range (-180 to 180)")));
        }
        Ok(Location::Coords { lat, lon })
    }

    /// Parse `"LAT,LON"`.
    pub fn parse_coords(input: &str) -> Result<Self, ApiError> {
        let invalid = || ApiError::InvalidInput(format!("invalid coordinates '{input}': expected LAT,LON"));
        let (lat, lon) = input.split_once(',').ok_or_else(invalid)?;
        let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
        let lon: f64 = lon.trim().parse().map_err(|_| invalid())?;
        Self::coords(lat, lon)
    }

    pub(crate) fn query_params(&self) -> Vec<(&'static str, String)> {
        match self {
            Location::City(name) => vec![("q", name.clone())],
            Location::Coords { lat, lon } => vec![("lat", lat.to_string()), ("lon", lon.to_string())],
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::City(name) => f.write_str(name),
            Location::Coords { lat, lon } => write!(f, "{lat},{lon}"),
        }
    }
}

/// Unit system for temperatures and wind speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }

    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
        }
    }

    pub fn wind_symbol(&self) -> &'static str {
        match self {
            Units::Metric => "m/s",
            Units::Imperial => "mph",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            other => Err(format!("unknown units '{other}': use metric or imperial")),
        }
    }
}

/// Check a forecast horizon.
pub fn validate_days(days: u8) -> Result<u8, ApiError> {
    if !(1..=MAX_FORECAST_DAYS).contains(&days) {
        return Err(ApiError::InvalidInput(format!("days must be 1-{MAX_FORECAST_DAYS}, got {days}")));
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coords() {
        assert_eq!(Location::parse_coords("51.5, -0.12").unwrap(), Location::Coords { lat: 51.5, lon: -0.12 });
        assert!(Location::parse_coords("51.5").is_err());
        assert!(Location::parse_coords("north,south").is_err());
    }

    #[test]
    fn test_coords_out_of_range() {
        assert!(matches!(Location::coords(91.0, 0.0), Err(ApiError::InvalidInput(_))));
        assert!(matches!(Location::coords(0.0, -180.5), Err(ApiError::InvalidInput(_))));
        assert!(Location::coords(-90.0, 180.0).is_ok());
        assert!(Location::coords(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_empty_city_rejected() {
        assert!(Location::city("   ").is_err());
        assert_eq!(Location::city(" Paris ").unwrap(), Location::City("Paris".into()));
    }

    #[test]
    fn test_query_params() {
        assert_eq!(Location::City("Oslo".into()).query_params(), [("q", "Oslo".to_string())]);
        let coords = Location::Coords { lat: 10.5, lon: 20.0 };
        assert_eq!(coords.query_params(), [("lat", "10.5".to_string()), ("lon", "20".to_string())]);
    }

    #[test]
    fn test_units_parse() {
        assert_eq!("Imperial".parse::<Units>().unwrap(), Units::Imperial);
        assert!("kelvin".parse::<Units>().is_err());
        assert_eq!(Units::Metric.temperature_symbol(), "°C");
    }

    #[test]
    fn test_validate_days() {
        assert!(validate_days(0).is_err());
        assert!(validate_days(6).is_err());
        assert_eq!(validate_days(5).unwrap(), 5);
    }
}
