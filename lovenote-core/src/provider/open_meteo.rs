use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::{LoveNoteError, Result},
    http,
    model::{Location, WeatherSnapshot},
};

use super::{ProviderId, WeatherProvider};

const PROVIDER: &str = "open-meteo";
const GEOCODING_BASE: &str = "https://geocoding-api.open-meteo.com";
const FORECAST_BASE: &str = "https://api.open-meteo.com";

/// Keyless geocoding + forecast API.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    geocoding_base: String,
    forecast_base: String,
    http: Client,
}

impl OpenMeteoProvider {
    pub fn new() -> Result<Self> {
        Ok(Self {
            geocoding_base: GEOCODING_BASE.to_string(),
            forecast_base: FORECAST_BASE.to_string(),
            http: http::client()?,
        })
    }

    /// Point both endpoints somewhere else (mock servers, proxies).
    pub fn with_base_urls(
        mut self,
        geocoding: impl Into<String>,
        forecast: impl Into<String>,
    ) -> Self {
        self.geocoding_base = geocoding.into();
        self.forecast_base = forecast.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct OmSearchResponse {
    #[serde(default)]
    results: Vec<OmPlace>,
}

#[derive(Debug, Deserialize)]
struct OmPlace {
    id: Option<i64>,
    name: Option<String>,
    country: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OmForecastResponse {
    current_weather: Option<OmCurrent>,
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    temperature: Option<f64>,
    windspeed: Option<f64>,
    weathercode: Option<i64>,
    time: Option<String>,
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenMeteo
    }

    async fn resolve_city(&self, query: &str) -> Result<Location> {
        let url = format!("{}/v1/search", self.geocoding_base);

        let res = self
            .http
            .get(url)
            .query(&[
                ("name", query),
                ("count", "1"),
                ("language", "en"),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| LoveNoteError::transport(PROVIDER, e))?;

        let (parsed, _): (OmSearchResponse, _) = http::read_json(PROVIDER, res).await?;

        let place = parsed
            .results
            .into_iter()
            .next()
            .ok_or_else(|| LoveNoteError::ResolutionNotFound(query.to_string()))?;

        let (Some(latitude), Some(longitude)) = (place.latitude, place.longitude) else {
            return Err(LoveNoteError::ResolutionNotFound(query.to_string()));
        };

        Ok(Location {
            display_name: place.name.unwrap_or_else(|| query.to_string()),
            country: place.country,
            latitude,
            longitude,
            provider_location_id: place.id.map(|id| id.to_string()),
            timezone: place.timezone,
        })
    }

    async fn current_conditions(
        &self,
        location: &Location,
        tz_hint: Option<&str>,
    ) -> Result<WeatherSnapshot> {
        let url = format!("{}/v1/forecast", self.forecast_base);
        let timezone = tz_hint
            .or(location.timezone.as_deref())
            .unwrap_or("auto");

        let res = self
            .http
            .get(url)
            .query(&[
                ("latitude", location.latitude.to_string().as_str()),
                ("longitude", location.longitude.to_string().as_str()),
                ("current_weather", "true"),
                ("timezone", timezone),
            ])
            .send()
            .await
            .map_err(|e| LoveNoteError::transport(PROVIDER, e))?;

        let (parsed, _): (OmForecastResponse, _) = http::read_json(PROVIDER, res).await?;

        let Some(current) = parsed.current_weather else {
            return Ok(WeatherSnapshot::unavailable());
        };

        Ok(WeatherSnapshot {
            condition: current.weathercode.map(weather_code_to_text),
            temperature_c: current.temperature,
            feels_like_c: None,
            wind_speed_kmh: current.windspeed,
            observed_at_local: current
                .time
                .as_deref()
                .and_then(|t| NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M").ok()),
        })
    }
}

/// WMO weather interpretation codes, as reported by Open-Meteo.
pub fn weather_code_to_text(code: i64) -> String {
    let label = match code {
        0 => "Clear",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Rime fog",
        51 => "Light drizzle",
        53 => "Drizzle",
        55 => "Dense drizzle",
        61 => "Slight rain",
        63 => "Rain",
        65 => "Heavy rain",
        71 => "Slight snow",
        73 => "Snow",
        75 => "Heavy snow",
        80 | 81 => "Rain showers",
        82 => "Violent showers",
        95 => "Thunderstorm",
        other => return format!("Code {other}"),
    };
    label.to_string()
}
