pub mod availability;
pub mod bookings;
pub mod root;
pub mod slots;

use chrono::{NaiveTime, Timelike};

use crate::error::{AppError, Result};

/// Wall-clock times arrive as `HH:MM`; `HH:MM:SS` is accepted with the
/// seconds dropped.
pub(crate) fn parse_time(raw: &str) -> Result<NaiveTime> {
    let raw = raw.trim();
    let time = NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| AppError::BadRequest(format!("Invalid time '{}', expected HH:MM", raw)))?;

    Ok(time.with_second(0).unwrap_or(time))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_accepts_minutes_and_drops_seconds() {
        let expected = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        assert_eq!(parse_time("09:30").unwrap(), expected);
        assert_eq!(parse_time("09:30:45").unwrap(), expected);
        assert!(matches!(parse_time("9.30"), Err(AppError::BadRequest(_))));
    }
}
