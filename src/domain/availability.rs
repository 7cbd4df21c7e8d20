use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One recurring weekly window during which a provider accepts bookings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderAvailability {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProviderAvailability {
    pub fn overlaps(&self, start: NaiveTime, end: NaiveTime) -> bool {
        self.start_time < end && start < self.end_time
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub fn of(date: NaiveDate) -> Self {
        use chrono::Datelike;
        Self::from(date.weekday())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "monday" => Some(DayOfWeek::Monday),
            "tuesday" => Some(DayOfWeek::Tuesday),
            "wednesday" => Some(DayOfWeek::Wednesday),
            "thursday" => Some(DayOfWeek::Thursday),
            "friday" => Some(DayOfWeek::Friday),
            "saturday" => Some(DayOfWeek::Saturday),
            "sunday" => Some(DayOfWeek::Sunday),
            _ => None,
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

/// A single date on which the provider takes no bookings, whatever the
/// weekly windows say.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderBlockedDate {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub blocked_date: NaiveDate,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAvailabilityRequest {
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

/// Sparse update of a weekly window. Only these fields are ever written.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateAvailabilityRequest {
    pub day_of_week: Option<DayOfWeek>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub is_available: Option<bool>,
}

impl UpdateAvailabilityRequest {
    pub fn is_empty(&self) -> bool {
        self.day_of_week.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.is_available.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDateRequest {
    pub blocked_date: NaiveDate,
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_mapping_follows_the_calendar() {
        // 2026-10-19 is a Monday
        let monday = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(DayOfWeek::of(monday), DayOfWeek::Monday);
        assert_eq!(DayOfWeek::of(monday + chrono::Duration::days(6)), DayOfWeek::Sunday);
    }

    #[test]
    fn day_names_round_trip_through_storage_strings() {
        for day in [DayOfWeek::Monday, DayOfWeek::Thursday, DayOfWeek::Sunday] {
            assert_eq!(DayOfWeek::parse(day.as_str()), Some(day));
        }
        assert_eq!(DayOfWeek::parse("Funday"), None);
    }
}
