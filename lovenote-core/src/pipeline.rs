//! One run: time gate, weather, counters, love line, template fields, send.

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, info};

use crate::{
    RunConfig,
    compose::{MessageValues, compose, format_days},
    error::Result,
    messaging::WeChatClient,
    model::{MilestoneContext, OutgoingPayload, ProviderResponse},
    provider::{WeatherProvider, provider_from_config, resolve_or_placeholder},
};

pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Bypass the time gate, in addition to any `force_send` setting.
    pub force: bool,
    /// Compose the payload but do not post it.
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Outside the send window. Carries the recipient's local time.
    Skipped { local_time: String },
    /// Dry run: everything except the final send.
    Composed(OutgoingPayload),
    Sent {
        payload: OutgoingPayload,
        response: ProviderResponse,
    },
}

#[derive(Debug)]
pub struct Pipeline<'a> {
    config: &'a RunConfig,
    weather: Box<dyn WeatherProvider>,
    messenger: WeChatClient,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a RunConfig,
        weather: Box<dyn WeatherProvider>,
        messenger: WeChatClient,
    ) -> Self {
        Self {
            config,
            weather,
            messenger,
        }
    }

    /// Wire up the providers named in `config`.
    pub fn from_config(config: &'a RunConfig) -> Result<Self> {
        let weather = provider_from_config(config)?;
        let messenger = WeChatClient::from_credentials(&config.credentials)?;
        Ok(Self::new(config, weather, messenger))
    }

    pub async fn run<R: Rng + ?Sized>(
        &self,
        now: DateTime<Utc>,
        rng: &mut R,
        options: RunOptions,
    ) -> Result<RunOutcome> {
        let local_now = now.with_timezone(&self.config.recipient.timezone);
        let force = options.force || self.config.force_send;

        let decision = self.config.window.decide(&local_now, force);
        if !decision.is_open() {
            let local_time = local_now.format(TIME_FORMAT).to_string();
            info!(
                %local_time,
                recipient_tz = %self.config.recipient.timezone,
                "outside send window; skipping"
            );
            return Ok(RunOutcome::Skipped { local_time });
        }
        debug!(?decision, "send window open");

        let values = self.message_values(now, rng).await;

        let token = self.messenger.access_token().await?;
        let field_order = self
            .messenger
            .fetch_field_order(&token, &self.config.credentials.template_id)
            .await?;

        let payload = OutgoingPayload {
            recipient_id: self.config.credentials.recipient_id.clone(),
            template_id: self.config.credentials.template_id.clone(),
            fields: compose(&field_order, &values.into_ordered()),
        };

        if let Ok(json) = serde_json::to_string_pretty(&payload.redacted()) {
            debug!("outgoing payload:\n{json}");
        }

        if options.dry_run {
            return Ok(RunOutcome::Composed(payload));
        }

        let response = self.messenger.send_with_token(&token, &payload).await?;
        Ok(RunOutcome::Sent { payload, response })
    }

    /// Everything that goes into the note, before it is fitted to the template.
    pub async fn message_values<R: Rng + ?Sized>(
        &self,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> MessageValues {
        let config = self.config;
        let local_now = now.with_timezone(&config.recipient.timezone);

        let sender_tz = config.sender.timezone.name();
        let recipient_tz = config.recipient.timezone.name();
        let sender_weather = resolve_or_placeholder(
            self.weather.as_ref(),
            &config.sender.city,
            Some(sender_tz),
        )
        .await;
        let recipient_weather = resolve_or_placeholder(
            self.weather.as_ref(),
            &config.recipient.city,
            Some(recipient_tz),
        )
        .await;

        let milestones = MilestoneContext {
            today: local_now.date_naive(),
            together_since: config.together_since,
            next_meet: config.next_meet,
        };
        let days_together = milestones.days_together();
        let days_to_meet = milestones.days_to_meet();
        debug!(days_together, days_to_meet, "milestone counters");

        let love_line = config
            .lines
            .select(milestones.today, days_together, days_to_meet, rng);

        MessageValues {
            time: local_now.format(TIME_FORMAT).to_string(),
            sender_weather: sender_weather.to_string(),
            recipient_weather: recipient_weather.to_string(),
            days_together: format_days(days_together),
            days_to_meet: format_days(days_to_meet),
            love_line,
        }
    }
}
