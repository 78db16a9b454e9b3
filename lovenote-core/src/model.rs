use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize, ser::SerializeMap};

use crate::dates::days_between;

/// A geocoded city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub display_name: String,
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Provider-specific id, for providers that look up weather by id rather than coordinates.
    pub provider_location_id: Option<String>,
    pub timezone: Option<String>,
}

impl Location {
    pub fn label(&self) -> String {
        match self.country.as_deref() {
            Some(country) if !country.is_empty() => format!("{}, {country}", self.display_name),
            _ => self.display_name.clone(),
        }
    }
}

/// Current conditions. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub condition: Option<String>,
    pub temperature_c: Option<f64>,
    pub feels_like_c: Option<f64>,
    pub wind_speed_kmh: Option<f64>,
    pub observed_at_local: Option<NaiveDateTime>,
}

impl WeatherSnapshot {
    /// Placeholder used when a provider could not be reached or found nothing.
    pub fn unavailable() -> Self {
        Self::default()
    }

    fn parts(&self) -> Vec<String> {
        let mut parts = Vec::new();
        if let Some(condition) = &self.condition {
            parts.push(condition.clone());
        }
        if let Some(t) = self.temperature_c {
            parts.push(format!("{t}°C"));
        }
        if let Some(t) = self.feels_like_c {
            parts.push(format!("feels like {t}°C"));
        }
        if let Some(w) = self.wind_speed_kmh {
            parts.push(format!("wind {w} km/h"));
        }
        parts
    }
}

/// A snapshot together with the label it is shown under.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub label: String,
    pub snapshot: WeatherSnapshot,
}

impl WeatherReport {
    pub fn unavailable(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            snapshot: WeatherSnapshot::unavailable(),
        }
    }
}

impl fmt::Display for WeatherReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self.snapshot.parts();
        if parts.is_empty() {
            write!(f, "{}: N/A", self.label)
        } else {
            write!(f, "{}: {}", self.label, parts.join(", "))
        }
    }
}

/// Dates the day counters are derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MilestoneContext {
    pub today: NaiveDate,
    pub together_since: NaiveDate,
    pub next_meet: NaiveDate,
}

impl MilestoneContext {
    /// Days since `together_since`; negative while that date is still ahead.
    pub fn days_together(&self) -> i64 {
        days_between(self.together_since, self.today)
    }

    /// Days until `next_meet`; negative once it has passed.
    pub fn days_to_meet(&self) -> i64 {
        days_between(self.today, self.next_meet)
    }
}

/// Template slots in the order the template declares them.
///
/// Serializes as `{"key": {"value": "..."}}`, which is the shape the
/// messaging provider expects under `data`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateFields(Vec<(String, String)>);

impl TemplateFields {
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self(entries)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Serialize for TemplateFields {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Slot<'a> {
            value: &'a str,
        }

        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, &Slot { value })?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingPayload {
    #[serde(rename = "touser")]
    pub recipient_id: String,
    pub template_id: String,
    #[serde(rename = "data")]
    pub fields: TemplateFields,
}

impl OutgoingPayload {
    /// Copy with identifiers masked, for logging.
    pub fn redacted(&self) -> Self {
        Self {
            recipient_id: "***".into(),
            template_id: "***".into(),
            fields: self.fields.clone(),
        }
    }
}

/// Body returned by the send endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProviderResponse {
    pub errcode: Option<i64>,
    #[serde(default)]
    pub errmsg: Option<String>,
    #[serde(default)]
    pub msgid: Option<i64>,
}

impl ProviderResponse {
    pub fn is_success(&self) -> bool {
        self.errcode == Some(0)
    }
}
