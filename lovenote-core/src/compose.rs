//! Positional mapping of computed values onto template fields.
//!
//! Values are matched to fields by position, not by name. Templates are
//! expected to declare their fields in the order of [`MessageValues`]:
//! time, sender weather, recipient weather, days together, days to meet,
//! love line. Reordering fields in the remote template changes which value
//! lands where.

use crate::model::TemplateFields;

/// The values placed into a note, in template order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageValues {
    pub time: String,
    pub sender_weather: String,
    pub recipient_weather: String,
    pub days_together: String,
    pub days_to_meet: String,
    pub love_line: String,
}

impl MessageValues {
    pub fn into_ordered(self) -> Vec<String> {
        vec![
            self.time,
            self.sender_weather,
            self.recipient_weather,
            self.days_together,
            self.days_to_meet,
            self.love_line,
        ]
    }
}

pub fn format_days(days: i64) -> String {
    format!("{days} days")
}

/// Zip `field_order` with `values`. Every declared field is present in the
/// result; fields past the end of `values` get an empty string, and surplus
/// values are dropped.
pub fn compose(field_order: &[String], values: &[String]) -> TemplateFields {
    let entries = field_order
        .iter()
        .enumerate()
        .map(|(i, key)| (key.clone(), values.get(i).cloned().unwrap_or_default()))
        .collect();
    TemplateFields::new(entries)
}
