use chrono::{Duration, NaiveDate, NaiveTime, Timelike, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    config::SchedulingConfig,
    domain::{AvailableSlots, DayOfWeek, ProviderAvailability},
    error::{AppError, Result},
    repository::{AvailabilityRepository, BookingRepository},
};

/// Slot grid, buffer and booking horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPolicy {
    pub slot_interval_minutes: u32,
    pub buffer_minutes: u32,
    pub booking_horizon_days: u32,
}

impl Default for SlotPolicy {
    fn default() -> Self {
        Self::from(&SchedulingConfig::default())
    }
}

impl From<&SchedulingConfig> for SlotPolicy {
    fn from(config: &SchedulingConfig) -> Self {
        Self {
            slot_interval_minutes: config.slot_interval_minutes.max(1),
            buffer_minutes: config.buffer_minutes,
            booking_horizon_days: config.booking_horizon_days,
        }
    }
}

impl SlotPolicy {
    /// Rejects dates before `today` or past the horizon (inclusive).
    pub fn check_date(&self, today: NaiveDate, date: NaiveDate) -> Result<()> {
        let latest = today + Duration::days(i64::from(self.booking_horizon_days));
        if date < today || date > latest {
            return Err(AppError::OutOfRangeDate {
                date,
                earliest: today,
                latest,
            });
        }
        Ok(())
    }
}

pub struct SlotResolver {
    availability_repo: Arc<dyn AvailabilityRepository>,
    booking_repo: Arc<dyn BookingRepository>,
    policy: SlotPolicy,
}

impl SlotResolver {
    pub fn new(
        availability_repo: Arc<dyn AvailabilityRepository>,
        booking_repo: Arc<dyn BookingRepository>,
        policy: SlotPolicy,
    ) -> Self {
        Self {
            availability_repo,
            booking_repo,
            policy,
        }
    }

    pub fn policy(&self) -> SlotPolicy {
        self.policy
    }

    pub async fn resolve(&self, provider_id: Uuid, date: NaiveDate, duration_minutes: i32) -> Result<AvailableSlots> {
        self.resolve_as_of(Utc::now().date_naive(), provider_id, date, duration_minutes)
            .await
    }

    /// Same as [`SlotResolver::resolve`] with an explicit notion of today.
    pub async fn resolve_as_of(
        &self,
        today: NaiveDate,
        provider_id: Uuid,
        date: NaiveDate,
        duration_minutes: i32,
    ) -> Result<AvailableSlots> {
        if duration_minutes <= 0 {
            return Err(AppError::InvalidDuration(duration_minutes));
        }
        self.policy.check_date(today, date)?;

        let mut result = AvailableSlots {
            date,
            slots: Vec::new(),
            buffer_minutes: self.policy.buffer_minutes,
            unavailable: false,
            no_weekly_availability: false,
        };

        if self.availability_repo.is_date_blocked(provider_id, date).await? {
            tracing::debug!("Provider {} blocked {}", provider_id, date);
            result.unavailable = true;
            return Ok(result);
        }

        let windows = self
            .availability_repo
            .list_open_windows(provider_id, DayOfWeek::of(date))
            .await?;
        if windows.is_empty() {
            result.no_weekly_availability = true;
            return Ok(result);
        }

        let booked: HashSet<u32> = self
            .booking_repo
            .list_booked_times(provider_id, date)
            .await?
            .into_iter()
            .map(minute_of_day)
            .collect();

        result.slots = generate_slots(&windows, &booked, duration_minutes as u32, &self.policy)
            .into_iter()
            .map(|t| t.format("%H:%M").to_string())
            .collect();

        Ok(result)
    }
}

fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Walks each window from its start. A start is offered when the service
/// fits before the window closes and none of the grid ticks it covers is
/// already booked. Whether or not it is offered, the cursor then moves on by
/// the service duration plus the buffer.
///
/// `windows` must be sorted by start time; `booked` holds booked start
/// times as minutes after midnight.
pub fn generate_slots(
    windows: &[ProviderAvailability],
    booked: &HashSet<u32>,
    duration_minutes: u32,
    policy: &SlotPolicy,
) -> Vec<NaiveTime> {
    let stride = duration_minutes + policy.buffer_minutes;
    let tick = policy.slot_interval_minutes.max(1) as usize;
    let mut slots = Vec::new();

    for window in windows {
        let end = minute_of_day(window.end_time);
        let mut cursor = minute_of_day(window.start_time);

        while cursor + duration_minutes <= end {
            let collides = (0..duration_minutes)
                .step_by(tick)
                .any(|offset| booked.contains(&(cursor + offset)));

            if !collides {
                if let Some(start) = NaiveTime::from_hms_opt(cursor / 60, cursor % 60, 0) {
                    slots.push(start);
                }
            }

            cursor += stride;
        }
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(start: &str, end: &str) -> ProviderAvailability {
        let now = Utc::now();
        ProviderAvailability {
            id: Uuid::new_v4(),
            provider_id: Uuid::nil(),
            day_of_week: DayOfWeek::Monday,
            start_time: NaiveTime::parse_from_str(start, "%H:%M").unwrap(),
            end_time: NaiveTime::parse_from_str(end, "%H:%M").unwrap(),
            is_available: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn booked(times: &[&str]) -> HashSet<u32> {
        times
            .iter()
            .map(|t| minute_of_day(NaiveTime::parse_from_str(t, "%H:%M").unwrap()))
            .collect()
    }

    fn render(slots: Vec<NaiveTime>) -> Vec<String> {
        slots.into_iter().map(|t| t.format("%H:%M").to_string()).collect()
    }

    #[test]
    fn stride_is_duration_plus_buffer() {
        let slots = generate_slots(&[window("09:00", "12:00")], &HashSet::new(), 60, &SlotPolicy::default());
        assert_eq!(render(slots), vec!["09:00", "10:30"]);
    }

    #[test]
    fn booked_start_removes_the_slot_but_keeps_the_stride() {
        let slots = generate_slots(&[window("09:00", "12:00")], &booked(&["09:00"]), 60, &SlotPolicy::default());
        assert_eq!(render(slots), vec!["10:30"]);
    }

    #[test]
    fn collision_checks_every_covered_tick() {
        // 09:00 with 60 minutes covers 09:00 and 09:30
        let slots = generate_slots(&[window("09:00", "12:00")], &booked(&["09:30"]), 60, &SlotPolicy::default());
        assert_eq!(render(slots), vec!["10:30"]);

        // 10:30 covers 10:30 and 11:00 but not 11:30
        let slots = generate_slots(&[window("09:00", "12:00")], &booked(&["11:30"]), 60, &SlotPolicy::default());
        assert_eq!(render(slots), vec!["09:00", "10:30"]);
    }

    #[test]
    fn window_shorter_than_service_yields_nothing() {
        let slots = generate_slots(&[window("09:00", "09:45")], &HashSet::new(), 60, &SlotPolicy::default());
        assert!(slots.is_empty());
    }

    #[test]
    fn service_ending_exactly_at_close_is_offered() {
        let slots = generate_slots(&[window("09:00", "10:00")], &HashSet::new(), 60, &SlotPolicy::default());
        assert_eq!(render(slots), vec!["09:00"]);
    }

    #[test]
    fn windows_are_concatenated_in_order() {
        let windows = [window("09:00", "11:00"), window("14:00", "16:00")];
        let slots = generate_slots(&windows, &HashSet::new(), 30, &SlotPolicy::default());
        assert_eq!(render(slots), vec!["09:00", "10:00", "14:00", "15:00"]);
    }

    #[test]
    fn buffer_comes_from_policy() {
        let policy = SlotPolicy {
            buffer_minutes: 0,
            ..SlotPolicy::default()
        };
        let slots = generate_slots(&[window("09:00", "11:00")], &HashSet::new(), 30, &policy);
        assert_eq!(render(slots), vec!["09:00", "09:30", "10:00", "10:30"]);
    }

    #[test]
    fn horizon_is_inclusive() {
        let policy = SlotPolicy::default();
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();

        assert!(policy.check_date(today, today).is_ok());
        assert!(policy.check_date(today, today + Duration::days(30)).is_ok());
        assert!(matches!(
            policy.check_date(today, today + Duration::days(31)),
            Err(AppError::OutOfRangeDate { .. })
        ));
        assert!(matches!(
            policy.check_date(today, today - Duration::days(1)),
            Err(AppError::OutOfRangeDate { .. })
        ));
    }
}
