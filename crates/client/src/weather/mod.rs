//! OpenWeatherMap client.
//!
//! ### API
//!
//! - **Endpoint**: `https://api.openweathermap.org/data/2.5` (`/weather`, `/forecast`)
//! - **Authentication**: `appid` query parameter.
//! - **Caching**: summaries are cached for the configured TTL (default 5 minutes),
//!   keyed by endpoint, location, units and forecast horizon.
//! - **Normalization**: raw responses are reduced to [`CurrentWeather`] and
//!   daily [`Forecast`] aggregates before caching.

pub mod request;
pub mod response;

pub use request::{Location, MAX_FORECAST_DAYS, Units, validate_days};
pub use response::{CurrentWeather, DailyForecast, Fetched, Forecast, compass_direction};

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use toolbelt_core::{CacheKey, ResponseCache, ToolConfig, ToolSpec};

use crate::http::{ApiClient, ApiError, ApiRequest, Auth, ClientConfig};
use response::{OwmCurrent, OwmForecast};

pub const TOOL: ToolSpec = ToolSpec {
    name: "weather-cli",
    env_prefix: "WEATHER_CLI_",
    credential_env: "OPENWEATHERMAP_API_KEY",
    setup_hint: "Get a free API key at https://openweathermap.org/api, then either:\n  \
                 export OPENWEATHERMAP_API_KEY='your-key'\n  \
                 weather-cli config --set-key 'your-key'",
    default_base_url: "https://api.openweathermap.org/data/2.5",
};

/// Current conditions and forecasts with a response cache in front.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    api: ApiClient,
    cache: Option<Arc<dyn ResponseCache>>,
}

impl WeatherClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api, cache: None }
    }

    /// Build from a loaded config; fails fast when no API key is set.
    pub fn from_config(config: &ToolConfig) -> Result<Self, ApiError> {
        let key = config.require_api_key(&TOOL)?;
        let client_config = ClientConfig::from_tool_config(config, TOOL.default_base_url, Auth::query("appid", key));
        Ok(Self::new(ApiClient::new(client_config)?))
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Current weather. With `use_cache` false the lookup is skipped but the
    /// fresh result is still stored.
    pub async fn current(
        &self, location: &Location, units: Units, use_cache: bool,
    ) -> Result<Fetched<CurrentWeather>, ApiError> {
        let mut params = location.query_params();
        params.push(("units", units.as_str().to_string()));
        let key = CacheKey::new("weather", params.iter().map(|(k, v)| (*k, v.as_str())));

        self.cached(&key, use_cache, || async {
            let raw: OwmCurrent = self.fetch("weather", location, &params).await?;
            Ok(CurrentWeather::from_raw(raw, units))
        })
        .await
    }

    /// Daily forecast for the next `days` days (1-5).
    pub async fn forecast(
        &self, location: &Location, days: u8, units: Units, use_cache: bool,
    ) -> Result<Fetched<Forecast>, ApiError> {
        let days = validate_days(days)?;
        let mut params = location.query_params();
        params.push(("units", units.as_str().to_string()));

        let mut key_params = params.clone();
        key_params.push(("days", days.to_string()));
        let key = CacheKey::new("forecast", key_params.iter().map(|(k, v)| (*k, v.as_str())));

        self.cached(&key, use_cache, || async {
            let raw: OwmForecast = self.fetch("forecast", location, &params).await?;
            Ok(Forecast::from_raw(raw, units, days))
        })
        .await
    }

    async fn fetch<T: DeserializeOwned>(
        &self, endpoint: &str, location: &Location, params: &[(&'static str, String)],
    ) -> Result<T, ApiError> {
        let request = params
            .iter()
            .fold(ApiRequest::get(endpoint), |req, (k, v)| req.query(*k, v));

        self.api.send(&request).await.map_err(|err| match err {
            ApiError::NotFound(_) => ApiError::NotFound(format!(
                "location '{location}' not found. Try coordinates or add a country code (e.g. 'London,GB')"
            )),
            other => other,
        })
    }

    async fn cached<T, F, Fut>(&self, key: &CacheKey, use_cache: bool, fetch: F) -> Result<Fetched<T>, ApiError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if use_cache
            && let Some(cache) = &self.cache
            && let Some(value) = cache.get(key).await?
        {
            match serde_json::from_value::<T>(value) {
                Ok(data) => return Ok(Fetched { data, from_cache: true }),
                Err(e) => tracing::warn!(endpoint = key.endpoint(), error = %e, "ignoring unreadable cache entry"),
            }
        }

        let data = fetch().await?;
        if let Some(cache) = &self.cache {
            cache.put(key, &serde_json::to_value(&data)?).await?;
        }
        Ok(Fetched { data, from_cache: false })
    }
}
