use chrono::NaiveDate;
use chrono_tz::Tz;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::{
    dates::parse_date,
    error::{LoveNoteError, Result},
    gate::SendWindow,
    lines::LinePools,
    provider::ProviderId,
};

/// Environment variable that points at an alternative config file.
pub const CONFIG_PATH_ENV: &str = "LOVE_NOTE_CONFIG";

/// Configuration for a single weather provider (e.g., API key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
}

/// Messaging account and recipient.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
    pub recipient_id: Option<String>,
    pub template_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PartyConfig {
    pub city: Option<String>,
    /// IANA timezone name, e.g. "Asia/Tokyo".
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MilestoneConfig {
    /// YYYY-MM-DD
    pub together_since: Option<String>,
    /// YYYY-MM-DD
    pub next_meet: Option<String>,
}

/// Raw configuration as read from disk and the environment. Every field is
/// optional here; [`Config::resolve`] checks what a run actually needs.
///
/// Example TOML:
/// ```toml
/// weather_provider = "qweather"
///
/// [providers.qweather]
/// api_key = "..."
///
/// [messaging]
/// app_id = "wx..."
///
/// [recipient]
/// city = "St. Louis"
/// timezone = "America/Chicago"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// "open-meteo" (default) or "qweather".
    pub weather_provider: Option<String>,
    pub providers: HashMap<String, ProviderConfig>,
    pub messaging: MessagingConfig,
    pub sender: PartyConfig,
    pub recipient: PartyConfig,
    pub milestones: MilestoneConfig,
    pub schedule: Option<SendWindow>,
    pub lines: Option<LinePools>,
    pub force_send: Option<bool>,
}

/// One side of the conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Party {
    pub city: String,
    pub timezone: Tz,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub app_id: String,
    pub app_secret: String,
    pub recipient_id: String,
    pub template_id: String,
}

/// Validated settings for one run. Built once and never mutated.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub credentials: Credentials,
    pub sender: Party,
    pub recipient: Party,
    pub together_since: NaiveDate,
    pub next_meet: NaiveDate,
    pub weather_provider: ProviderId,
    pub weather_api_key: Option<String>,
    pub window: SendWindow,
    pub lines: LinePools,
    pub force_send: bool,
}

const DEFAULT_SENDER_CITY: &str = "Tokyo";
const DEFAULT_SENDER_TZ: &str = "Asia/Tokyo";
const DEFAULT_RECIPIENT_CITY: &str = "St. Louis";
const DEFAULT_RECIPIENT_TZ: &str = "America/Chicago";

impl Config {
    /// Load config from `path`, `$LOVE_NOTE_CONFIG`, or the platform default,
    /// in that order. A missing file yields an empty config.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match std::env::var_os(CONFIG_PATH_ENV) {
                Some(p) if !p.is_empty() => PathBuf::from(p),
                _ => Self::config_file_path()?,
            },
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file; using environment only");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path).map_err(|e| {
            LoveNoteError::Configuration(format!(
                "failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        Self::from_toml_str(&contents).map_err(|e| match e {
            LoveNoteError::Configuration(msg) => {
                LoveNoteError::Configuration(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| LoveNoteError::Configuration(format!("failed to parse config: {e}")))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "lovenote", "lovenote").ok_or_else(|| {
            LoveNoteError::Configuration("could not determine platform config directory".into())
        })?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Overlay values from the process environment.
    pub fn apply_process_env(&mut self) {
        self.apply_env(|key| std::env::var(key).ok());
    }

    /// Overlay values from `lookup`. Blank values count as unset.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let overlay = |slot: &mut Option<String>, key: &str| {
            if let Some(v) = get(key) {
                *slot = Some(v);
            }
        };

        overlay(&mut self.messaging.app_id, "WX_APPID");
        overlay(&mut self.messaging.app_secret, "WX_SECRET");
        overlay(&mut self.messaging.recipient_id, "WX_OPENID");
        overlay(&mut self.messaging.template_id, "WX_TEMPLATE_ID");
        overlay(&mut self.sender.city, "YOU_CITY");
        overlay(&mut self.sender.timezone, "YOU_TZ");
        overlay(&mut self.recipient.city, "BF_CITY");
        overlay(&mut self.recipient.timezone, "BF_TZ");
        overlay(&mut self.milestones.together_since, "TOGETHER_DATE");
        overlay(&mut self.milestones.next_meet, "COUNTDOWN_DATE");
        overlay(&mut self.weather_provider, "WEATHER_PROVIDER");

        if let Some(key) = get("QWEATHER_KEY") {
            self.upsert_provider_api_key(ProviderId::QWeather, key);
        }
        if let Some(flag) = get("FORCE_SEND") {
            self.force_send = Some(parse_flag(&flag));
        }
    }

    /// Set/replace a provider API key.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers
            .insert(provider_id.as_str().to_string(), ProviderConfig { api_key });
    }

    /// Returns API key for a provider, if present.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.providers
            .get(provider_id.as_str())
            .map(|cfg| cfg.api_key.as_str())
    }

    /// The selected weather provider, defaulting to the keyless one.
    pub fn weather_provider_id(&self) -> Result<ProviderId> {
        match self.weather_provider.as_deref() {
            Some(s) => ProviderId::try_from(s),
            None => Ok(ProviderId::OpenMeteo),
        }
    }

    /// Validate and freeze into the settings for one run.
    pub fn resolve(self) -> Result<RunConfig> {
        let missing: Vec<&str> = [
            ("WX_APPID", &self.messaging.app_id),
            ("WX_SECRET", &self.messaging.app_secret),
            ("WX_OPENID", &self.messaging.recipient_id),
            ("WX_TEMPLATE_ID", &self.messaging.template_id),
            ("TOGETHER_DATE", &self.milestones.together_since),
            ("COUNTDOWN_DATE", &self.milestones.next_meet),
        ]
        .into_iter()
        .filter(|(_, v)| v.as_deref().is_none_or(str::is_empty))
        .map(|(k, _)| k)
        .collect();

        if !missing.is_empty() {
            return Err(LoveNoteError::Configuration(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }

        let weather_provider = self.weather_provider_id()?;
        let weather_api_key = self.provider_api_key(weather_provider).map(str::to_owned);
        if weather_provider.requires_api_key() && weather_api_key.is_none() {
            return Err(LoveNoteError::Configuration(format!(
                "no API key configured for weather provider '{weather_provider}' \
                 (set QWEATHER_KEY or [providers.{weather_provider}] api_key)"
            )));
        }

        let window = self.schedule.unwrap_or_default();
        if window.hour > 23 || window.window_minutes == 0 || window.window_minutes > 60 {
            return Err(LoveNoteError::Configuration(format!(
                "invalid send window: hour {} with {} minute(s)",
                window.hour, window.window_minutes
            )));
        }

        let lines = self.lines.unwrap_or_default();
        if lines.daily.is_empty() {
            return Err(LoveNoteError::Configuration(
                "the daily line pool must not be empty".into(),
            ));
        }

        let sender = party(
            self.sender,
            "YOU_TZ",
            DEFAULT_SENDER_CITY,
            DEFAULT_SENDER_TZ,
        )?;
        let recipient = party(
            self.recipient,
            "BF_TZ",
            DEFAULT_RECIPIENT_CITY,
            DEFAULT_RECIPIENT_TZ,
        )?;

        // Presence was checked above.
        let together_since = parse_date(
            "TOGETHER_DATE",
            self.milestones.together_since.as_deref().unwrap_or_default(),
        )?;
        let next_meet = parse_date(
            "COUNTDOWN_DATE",
            self.milestones.next_meet.as_deref().unwrap_or_default(),
        )?;

        let MessagingConfig {
            app_id,
            app_secret,
            recipient_id,
            template_id,
        } = self.messaging;

        Ok(RunConfig {
            credentials: Credentials {
                app_id: app_id.unwrap_or_default(),
                app_secret: app_secret.unwrap_or_default(),
                recipient_id: recipient_id.unwrap_or_default(),
                template_id: template_id.unwrap_or_default(),
            },
            sender,
            recipient,
            together_since,
            next_meet,
            weather_provider,
            weather_api_key,
            window,
            lines,
            force_send: self.force_send.unwrap_or(false),
        })
    }
}

fn party(cfg: PartyConfig, tz_key: &str, default_city: &str, default_tz: &str) -> Result<Party> {
    let city = cfg.city.unwrap_or_else(|| default_city.to_string());
    let tz_name = cfg.timezone.unwrap_or_else(|| default_tz.to_string());
    let timezone = tz_name.parse::<Tz>().map_err(|_| {
        LoveNoteError::Configuration(format!("{tz_key}: unknown timezone '{tz_name}'"))
    })?;
    Ok(Party { city, timezone })
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::Chicago;
    use chrono_tz::Asia::Tokyo;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("WX_APPID", "app"),
        ("WX_SECRET", "secret"),
        ("WX_OPENID", "openid"),
        ("WX_TEMPLATE_ID", "tpl"),
        ("TOGETHER_DATE", "2024-12-06"),
        ("COUNTDOWN_DATE", "2026-03-05"),
    ];

    #[test]
    fn missing_settings_are_listed_together() {
        let err = Config::default().resolve().unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, LoveNoteError::Configuration(_)));
        for key in ["WX_APPID", "WX_SECRET", "WX_OPENID", "WX_TEMPLATE_ID"] {
            assert!(msg.contains(key), "{msg}");
        }
    }

    #[test]
    fn env_only_config_gets_defaults() {
        let mut cfg = Config::default();
        cfg.apply_env(env(REQUIRED));
        let run = cfg.resolve().expect("complete config");

        assert_eq!(run.sender.city, "Tokyo");
        assert_eq!(run.sender.timezone, Tokyo);
        assert_eq!(run.recipient.city, "St. Louis");
        assert_eq!(run.recipient.timezone, Chicago);
        assert_eq!(run.weather_provider, ProviderId::OpenMeteo);
        assert_eq!(run.window, SendWindow::default());
        assert!(!run.force_send);
        assert_eq!(run.credentials.template_id, "tpl");
    }

    #[test]
    fn blank_env_values_do_not_override_file() {
        let mut cfg = Config::from_toml_str(
            r#"
            [messaging]
            app_id = "from-file"
            "#,
        )
        .unwrap();
        cfg.apply_env(env(&[("WX_APPID", "   ")]));
        assert_eq!(cfg.messaging.app_id.as_deref(), Some("from-file"));
    }

    #[test]
    fn env_overrides_file() {
        let mut cfg = Config::from_toml_str(
            r#"
            [recipient]
            city = "Paris"
            timezone = "Europe/Paris"
            "#,
        )
        .unwrap();
        cfg.apply_env(env(&[("BF_CITY", "Osaka")]));
        assert_eq!(cfg.recipient.city.as_deref(), Some("Osaka"));
        assert_eq!(cfg.recipient.timezone.as_deref(), Some("Europe/Paris"));
    }

    #[test]
    fn force_send_flag_values() {
        for (raw, expected) in [
            ("1", true),
            ("true", true),
            ("YES", true),
            ("0", false),
            ("no", false),
        ] {
            let mut cfg = Config::default();
            cfg.apply_env(env(&[("FORCE_SEND", raw)]));
            assert_eq!(cfg.force_send, Some(expected), "{raw}");
        }
    }

    #[test]
    fn unknown_timezone_is_configuration_error() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("BF_TZ", "Mars/Olympus"));
        let mut cfg = Config::default();
        cfg.apply_env(env(&pairs));
        let err = cfg.resolve().unwrap_err();
        assert!(err.to_string().contains("Mars/Olympus"));
    }

    #[test]
    fn bad_date_is_configuration_error() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("TOGETHER_DATE", "someday"));
        let mut cfg = Config::default();
        cfg.apply_env(env(&pairs));
        assert!(matches!(cfg.resolve(), Err(LoveNoteError::Configuration(_))));
    }

    #[test]
    fn qweather_requires_key() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("WEATHER_PROVIDER", "qweather"));
        let mut cfg = Config::default();
        cfg.apply_env(env(&pairs));
        let err = cfg.clone().resolve().unwrap_err();
        assert!(err.to_string().contains("qweather"));

        cfg.apply_env(env(&[("QWEATHER_KEY", "KEY")]));
        let run = cfg.resolve().expect("key supplied");
        assert_eq!(run.weather_provider, ProviderId::QWeather);
        assert_eq!(run.weather_api_key.as_deref(), Some("KEY"));
    }

    #[test]
    fn toml_overrides_window_and_lines() {
        let mut cfg = Config::from_toml_str(
            r#"
            [schedule]
            hour = 8
            window_minutes = 10

            [lines]
            daily = ["only one"]
            "#,
        )
        .unwrap();
        cfg.apply_env(env(REQUIRED));
        let run = cfg.resolve().unwrap();
        assert_eq!(run.window.hour, 8);
        assert_eq!(run.lines.daily, vec!["only one".to_string()]);
        // Pools not mentioned keep their built-in lines.
        assert!(!run.lines.anniversary.is_empty());
    }

    #[test]
    fn partial_schedule_keeps_default_width() {
        let cfg =
            Config::from_toml_str("[schedule]\nhour = 8\n").expect("partial schedule parses");
        let window = cfg.schedule.expect("schedule present");
        assert_eq!(window.hour, 8);
        assert_eq!(window.window_minutes, 5);

        let cfg = Config::from_toml_str("[schedule]\nwindow_minutes = 15\n").unwrap();
        assert_eq!(cfg.schedule.map(|w| w.hour), Some(10));
    }

    #[test]
    fn empty_daily_pool_rejected() {
        let mut cfg = Config::from_toml_str("[lines]\ndaily = []\n").unwrap();
        cfg.apply_env(env(REQUIRED));
        assert!(cfg.resolve().is_err());
    }
}
