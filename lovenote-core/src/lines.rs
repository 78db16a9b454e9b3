//! Picks the sentiment line for the day.

use chrono::{Datelike, NaiveDate};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

/// Day of the month that marks the monthly anniversary.
pub const ANNIVERSARY_DAY: u32 = 6;

/// Placeholder substituted with the day count in milestone lines.
pub const DAYS_PLACEHOLDER: &str = "{days}";

/// Candidate lines for each occasion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinePools {
    pub meet_day: String,
    pub anniversary: Vec<String>,
    pub milestone: Vec<String>,
    pub final_week: Vec<String>,
    pub daily: Vec<String>,
}

impl Default for LinePools {
    fn default() -> Self {
        fn owned(lines: &[&str]) -> Vec<String> {
            lines.iter().map(|s| s.to_string()).collect()
        }

        Self {
            meet_day: "Today is the day. No more screens between us, I get to hold you.".into(),
            anniversary: owned(&[
                "Happy monthly anniversary. Another month of choosing you.",
                "It's the 6th again, which means I get to fall for you all over.",
                "One more month together, and I'd still say yes every single time.",
            ]),
            milestone: owned(&[
                "{days} days together, and you're still my favourite notification.",
                "Day {days}. Every one of them was better because of you.",
                "{days} days of us. Here's to the next hundred.",
            ]),
            final_week: owned(&[
                "Less than a week left. I'm already counting the hours.",
                "The countdown is in single digits. Pack your best smile.",
                "So close now. Hold on a few more days for me.",
            ]),
            daily: owned(&[
                "If today feels heavy, lean on me. I'm right here.",
                "I hope you eat something warm and take a tiny breath for us.",
                "Even on ordinary days, you're still my favorite place.",
                "I'm cheering for you quietly, constantly, stubbornly.",
                "Miss you is my daily routine, loving you is my default setting.",
                "One day closer to seeing you. Until then, I'll hold you in my thoughts.",
                "Whatever the weather says, my forecast is: you + me = home.",
                "I love you in the small moments, the loud moments, and the in-between.",
                "When you're tired, remember: you don't have to be strong alone.",
                "Today, please be gentle with yourself. For me, too.",
            ]),
        }
    }
}

impl LinePools {
    /// Chooses the line for `today`.
    ///
    /// The meet day returns the fixed meet-day line on its own. Otherwise any
    /// anniversary, hundred-day and final-week lines come first, in that order,
    /// followed by one daily line, all joined with a single space.
    pub fn select<R: Rng + ?Sized>(
        &self,
        today: NaiveDate,
        days_together: i64,
        days_to_meet: i64,
        rng: &mut R,
    ) -> String {
        if days_to_meet == 0 {
            return self.meet_day.clone();
        }

        let mut lines: Vec<String> = Vec::with_capacity(4);

        if today.day() == ANNIVERSARY_DAY {
            lines.extend(pick(&self.anniversary, rng));
        }
        if days_together > 0 && days_together % 100 == 0 {
            lines.extend(
                pick(&self.milestone, rng)
                    .map(|line| line.replace(DAYS_PLACEHOLDER, &days_together.to_string())),
            );
        }
        if (0..=7).contains(&days_to_meet) {
            lines.extend(pick(&self.final_week, rng));
        }
        lines.extend(pick(&self.daily, rng));

        lines.join(" ")
    }
}

fn pick<R: Rng + ?Sized>(pool: &[String], rng: &mut R) -> Option<String> {
    pool.choose(rng).cloned()
}
