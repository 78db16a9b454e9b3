//! Daily send window, evaluated in the recipient's local time.

use chrono::{DateTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use tracing::info;

/// `[hour:00, hour:window_minutes)` in the recipient's timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendWindow {
    pub hour: u32,
    pub window_minutes: u32,
}

impl Default for SendWindow {
    fn default() -> Self {
        Self {
            hour: 10,
            window_minutes: 5,
        }
    }
}

/// Outcome of the time gate for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Window check bypassed.
    Forced,
    InWindow,
    Closed,
}

impl GateDecision {
    pub fn is_open(self) -> bool {
        !matches!(self, GateDecision::Closed)
    }
}

impl SendWindow {
    pub fn contains<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        now.hour() == self.hour && now.minute() < self.window_minutes
    }

    /// `now` must already be in the recipient's timezone.
    pub fn decide<Tz: TimeZone>(&self, now: &DateTime<Tz>, force: bool) -> GateDecision {
        if force {
            info!("forced send requested; skipping time window check");
            GateDecision::Forced
        } else if self.contains(now) {
            GateDecision::InWindow
        } else {
            GateDecision::Closed
        }
    }

    pub fn allows<Tz: TimeZone>(&self, now: &DateTime<Tz>, force: bool) -> bool {
        self.decide(now, force).is_open()
    }
}

/// Whether a send may happen at `now` under the default 10:00-10:05 window.
pub fn is_send_allowed<Tz: TimeZone>(now: &DateTime<Tz>, force: bool) -> bool {
    SendWindow::default().allows(now, force)
}
