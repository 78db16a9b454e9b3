use crate::{
    RunConfig,
    error::{LoveNoteError, Result},
    model::{Location, WeatherReport, WeatherSnapshot},
    provider::{open_meteo::OpenMeteoProvider, qweather::QWeatherProvider},
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug};
use tracing::{debug, warn};

pub mod open_meteo;
pub mod qweather;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenMeteo,
    QWeather,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenMeteo => "open-meteo",
            ProviderId::QWeather => "qweather",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenMeteo, ProviderId::QWeather]
    }

    pub fn requires_api_key(&self) -> bool {
        matches!(self, ProviderId::QWeather)
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = LoveNoteError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.trim().to_lowercase();

        match lower.as_str() {
            "open-meteo" | "openmeteo" => Ok(ProviderId::OpenMeteo),
            "qweather" => Ok(ProviderId::QWeather),
            _ => Err(LoveNoteError::Configuration(format!(
                "unknown weather provider '{value}'. Supported providers: open-meteo, qweather."
            ))),
        }
    }
}

/// A geocoding + current-conditions service.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    /// Best match for `query`, or [`LoveNoteError::ResolutionNotFound`].
    async fn resolve_city(&self, query: &str) -> Result<Location>;

    /// Current conditions at `location`. `tz_hint` is an IANA zone name used
    /// for localized timestamps when the provider supports it.
    async fn current_conditions(
        &self,
        location: &Location,
        tz_hint: Option<&str>,
    ) -> Result<WeatherSnapshot>;
}

/// Geocode `city` and fetch its current conditions.
///
/// A city with no geocoding match yields a report rendering as `"<city>: N/A"`.
/// Transport and protocol failures are returned as errors.
pub async fn resolve(
    provider: &dyn WeatherProvider,
    city: &str,
    tz_hint: Option<&str>,
) -> Result<WeatherReport> {
    let location = match provider.resolve_city(city).await {
        Ok(location) => location,
        Err(LoveNoteError::ResolutionNotFound(_)) => {
            debug!(provider = %provider.id(), city, "no geocoding match");
            return Ok(WeatherReport::unavailable(city));
        }
        Err(e) => return Err(e),
    };

    let snapshot = provider.current_conditions(&location, tz_hint).await?;

    Ok(WeatherReport {
        label: location.label(),
        snapshot,
    })
}

/// Like [`resolve`], but any failure degrades to a `"<city>: N/A"` report.
pub async fn resolve_or_placeholder(
    provider: &dyn WeatherProvider,
    city: &str,
    tz_hint: Option<&str>,
) -> WeatherReport {
    match resolve(provider, city, tz_hint).await {
        Ok(report) => report,
        Err(e) => {
            warn!(
                provider = %provider.id(),
                city,
                error = %e,
                "weather lookup failed; using placeholder"
            );
            WeatherReport::unavailable(city)
        }
    }
}

/// Construct a provider by id.
pub fn provider_for(id: ProviderId, api_key: Option<&str>) -> Result<Box<dyn WeatherProvider>> {
    let boxed: Box<dyn WeatherProvider> = match id {
        ProviderId::OpenMeteo => Box::new(OpenMeteoProvider::new()?),
        ProviderId::QWeather => {
            let api_key = api_key.ok_or_else(|| {
                LoveNoteError::Configuration(format!(
                    "no API key configured for weather provider '{id}'"
                ))
            })?;
            Box::new(QWeatherProvider::new(api_key.to_owned())?)
        }
    };

    Ok(boxed)
}

/// Construct the provider selected in the run configuration.
pub fn provider_from_config(config: &RunConfig) -> Result<Box<dyn WeatherProvider>> {
    provider_for(config.weather_provider, config.weather_api_key.as_deref())
}
