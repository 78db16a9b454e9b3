use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use chrono_tz::Tz;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::{LoveNoteError, Result},
    http,
    model::{Location, WeatherSnapshot},
};

use super::{ProviderId, WeatherProvider};

const PROVIDER: &str = "qweather";
const GEO_BASE: &str = "https://geoapi.qweather.com";
const WEATHER_BASE: &str = "https://devapi.qweather.com";

/// Key-based city lookup + "weather now" API.
#[derive(Debug, Clone)]
pub struct QWeatherProvider {
    api_key: String,
    geo_base: String,
    weather_base: String,
    http: Client,
}

impl QWeatherProvider {
    pub fn new(api_key: String) -> Result<Self> {
        Ok(Self {
            api_key,
            geo_base: GEO_BASE.to_string(),
            weather_base: WEATHER_BASE.to_string(),
            http: http::client()?,
        })
    }

    pub fn with_base_urls(mut self, geo: impl Into<String>, weather: impl Into<String>) -> Self {
        self.geo_base = geo.into();
        self.weather_base = weather.into();
        self
    }
}

// QWeather reports its own status in `code` and sends numbers as strings.

#[derive(Debug, Deserialize)]
struct QwLookupResponse {
    code: String,
    #[serde(default)]
    location: Vec<QwCity>,
}

#[derive(Debug, Deserialize)]
struct QwCity {
    id: String,
    name: String,
    country: Option<String>,
    lat: String,
    lon: String,
    tz: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QwNowResponse {
    code: String,
    now: Option<QwNow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QwNow {
    obs_time: Option<String>,
    temp: Option<String>,
    feels_like: Option<String>,
    text: Option<String>,
    wind_speed: Option<String>,
}

fn number(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse().ok())
}

fn observed_local(raw: &str, tz_hint: Option<&str>) -> Option<NaiveDateTime> {
    let parsed = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M%:z").ok()?;
    match tz_hint.and_then(|tz| tz.parse::<Tz>().ok()) {
        Some(tz) => Some(parsed.with_timezone(&tz).naive_local()),
        None => Some(parsed.naive_local()),
    }
}

#[async_trait]
impl WeatherProvider for QWeatherProvider {
    fn id(&self) -> ProviderId {
        ProviderId::QWeather
    }

    async fn resolve_city(&self, query: &str) -> Result<Location> {
        let url = format!("{}/v2/city/lookup", self.geo_base);

        let res = self
            .http
            .get(url)
            .query(&[
                ("location", query),
                ("key", self.api_key.as_str()),
                ("number", "1"),
                ("lang", "en"),
            ])
            .send()
            .await
            .map_err(|e| LoveNoteError::transport(PROVIDER, e))?;

        let (parsed, raw): (QwLookupResponse, _) = http::read_json(PROVIDER, res).await?;

        match parsed.code.as_str() {
            "200" => {}
            "404" => return Err(LoveNoteError::ResolutionNotFound(query.to_string())),
            _ => return Err(LoveNoteError::protocol(PROVIDER, &raw)),
        }

        let city = parsed
            .location
            .into_iter()
            .next()
            .ok_or_else(|| LoveNoteError::ResolutionNotFound(query.to_string()))?;

        let (Some(latitude), Some(longitude)) =
            (number(Some(city.lat.as_str())), number(Some(city.lon.as_str())))
        else {
            return Err(LoveNoteError::protocol(PROVIDER, &raw));
        };

        Ok(Location {
            display_name: city.name,
            country: city.country,
            latitude,
            longitude,
            provider_location_id: Some(city.id),
            timezone: city.tz,
        })
    }

    async fn current_conditions(
        &self,
        location: &Location,
        tz_hint: Option<&str>,
    ) -> Result<WeatherSnapshot> {
        let url = format!("{}/v7/weather/now", self.weather_base);
        let target = location
            .provider_location_id
            .clone()
            .unwrap_or_else(|| format!("{:.2},{:.2}", location.longitude, location.latitude));

        let res = self
            .http
            .get(url)
            .query(&[
                ("location", target.as_str()),
                ("key", self.api_key.as_str()),
                ("lang", "en"),
                ("unit", "m"),
            ])
            .send()
            .await
            .map_err(|e| LoveNoteError::transport(PROVIDER, e))?;

        let (parsed, raw): (QwNowResponse, _) = http::read_json(PROVIDER, res).await?;

        if parsed.code != "200" {
            return Err(LoveNoteError::protocol(PROVIDER, &raw));
        }

        let Some(now) = parsed.now else {
            return Ok(WeatherSnapshot::unavailable());
        };

        let tz_hint = tz_hint.or(location.timezone.as_deref());

        Ok(WeatherSnapshot {
            condition: now.text.filter(|t| !t.is_empty()),
            temperature_c: number(now.temp.as_deref()),
            feels_like_c: number(now.feels_like.as_deref()),
            wind_speed_kmh: number(now.wind_speed.as_deref()),
            observed_at_local: now
                .obs_time
                .as_deref()
                .and_then(|t| observed_local(t, tz_hint)),
        })
    }
}
