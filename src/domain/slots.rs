use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Bookable start times for one provider on one date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailableSlots {
    pub date: NaiveDate,
    /// Start times as `HH:MM`, ascending.
    pub slots: Vec<String>,
    pub buffer_minutes: u32,
    /// The provider blocked this date.
    #[serde(default)]
    pub unavailable: bool,
    /// The provider has no active weekly window on this weekday.
    #[serde(default)]
    pub no_weekly_availability: bool,
}
