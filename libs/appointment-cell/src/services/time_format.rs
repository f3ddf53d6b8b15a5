// libs/appointment-cell/src/services/time_format.rs
use std::sync::OnceLock;

use chrono::{DateTime, Duration, FixedOffset, LocalResult, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use regex::Regex;

use crate::models::{AppointmentError, ClockTime, Meridiem, TimeOfDay};

/// `YYYY-MM-DDTHH:mm:ss.SSS±HHmm`
pub const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Longest duration accepted for a timed (non all-day) appointment.
pub const MAX_DURATION_MINUTES: i64 = 24 * 60;

fn clock_time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{1,2}):(\d{2})$").unwrap())
}

/// Parse `H:MM` or `HH:MM` with hour in 1..=12 and minute in 0..=59.
pub fn parse_clock_time(text: &str) -> Result<ClockTime, AppointmentError> {
    let invalid = || AppointmentError::Validation(format!("Invalid time '{}', expected hh:mm", text));

    let captures = clock_time_pattern().captures(text.trim()).ok_or_else(invalid)?;
    let hour12: u32 = captures[1].parse().map_err(|_| invalid())?;
    let minute: u32 = captures[2].parse().map_err(|_| invalid())?;

    if !(1..=12).contains(&hour12) || minute > 59 {
        return Err(invalid());
    }

    Ok(ClockTime { hour12, minute })
}

pub fn to_24_hour(hour12: u32, meridiem: Meridiem) -> u32 {
    match (meridiem, hour12) {
        (Meridiem::Am, 12) => 0,
        (Meridiem::Am, hour) => hour,
        (Meridiem::Pm, 12) => 12,
        (Meridiem::Pm, hour) => hour + 12,
    }
}

/// Resolve a 12-hour wall-clock reading on `date` to an instant in `tz`.
///
/// Ambiguous local times (clocks turned back) resolve to the earlier instant;
/// times skipped by a forward transition are rejected.
pub fn to_absolute(date: NaiveDate, time: TimeOfDay, tz: &Tz) -> Result<DateTime<Tz>, AppointmentError> {
    let hour = to_24_hour(time.hour12, time.meridiem);
    let naive = date.and_hms_opt(hour, time.minute, 0).ok_or_else(|| {
        AppointmentError::InvalidTime(format!(
            "{}:{:02} {:?} is not a valid time of day",
            time.hour12, time.minute, time.meridiem
        ))
    })?;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(instant) => Ok(instant),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        LocalResult::None => Err(AppointmentError::InvalidTime(format!(
            "{} does not exist in time zone {}",
            naive,
            tz.name()
        ))),
    }
}

/// Read an instant back as a 12-hour wall-clock time.
pub fn to_time_of_day<T: TimeZone>(instant: &DateTime<T>) -> TimeOfDay {
    let hour = instant.hour();
    let (hour12, meridiem) = match hour {
        0 => (12, Meridiem::Am),
        1..=11 => (hour, Meridiem::Am),
        12 => (12, Meridiem::Pm),
        _ => (hour - 12, Meridiem::Pm),
    };

    TimeOfDay {
        hour12,
        minute: instant.minute(),
        meridiem,
    }
}

pub fn add_duration<T: TimeZone>(instant: DateTime<T>, minutes: i64) -> Result<DateTime<T>, AppointmentError> {
    if minutes <= 0 || minutes > MAX_DURATION_MINUTES {
        return Err(AppointmentError::Validation(format!(
            "Duration must be between 1 and {} minutes, got {}",
            MAX_DURATION_MINUTES, minutes
        )));
    }

    instant
        .clone()
        .checked_add_signed(Duration::minutes(minutes))
        .ok_or_else(|| AppointmentError::InvalidTime(format!("{:?} plus {} minutes is out of range", instant, minutes)))
}

/// First instant of `date` in `tz`. Zones that switch DST at midnight start the day at 01:00.
pub fn start_of_day(date: NaiveDate, tz: &Tz) -> Result<DateTime<Tz>, AppointmentError> {
    (0..=2)
        .filter_map(|hour| date.and_hms_opt(hour, 0, 0))
        .find_map(|naive| tz.from_local_datetime(&naive).earliest())
        .ok_or_else(|| AppointmentError::InvalidTime(format!("No start of day for {} in {}", date, tz.name())))
}

/// Last representable millisecond of `date` in `tz`.
pub fn end_of_day(date: NaiveDate, tz: &Tz) -> Result<DateTime<Tz>, AppointmentError> {
    let naive = date
        .and_hms_milli_opt(23, 59, 59, 999)
        .ok_or_else(|| AppointmentError::InvalidTime(format!("No end of day for {}", date)))?;

    tz.from_local_datetime(&naive)
        .latest()
        .ok_or_else(|| AppointmentError::InvalidTime(format!("{} does not exist in time zone {}", naive, tz.name())))
}

pub fn format_wire<T: TimeZone>(instant: &DateTime<T>) -> String
where
    T::Offset: std::fmt::Display,
{
    instant.format(WIRE_FORMAT).to_string()
}

/// Accepts the wire format as well as RFC 3339.
pub fn parse_wire(text: &str) -> Result<DateTime<FixedOffset>, AppointmentError> {
    DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(text))
        .map_err(|e| AppointmentError::Validation(format!("Invalid date-time '{}': {}", text, e)))
}

/// Serde adapters for wire-format instants.
pub mod wire {
    use super::*;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S, T>(instant: &DateTime<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: TimeZone,
        T::Offset: std::fmt::Display,
    {
        serializer.serialize_str(&format_wire(instant))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        parse_wire(&text)
            .map(|instant| instant.with_timezone(&Utc))
            .map_err(de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S>(instant: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match instant {
                Some(instant) => serializer.serialize_some(&format_wire(instant)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let text: Option<String> = Option::deserialize(deserializer)?;
            text.map(|text| {
                parse_wire(&text)
                    .map(|instant| instant.with_timezone(&Utc))
                    .map_err(de::Error::custom)
            })
            .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_clock_time_accepts_one_and_two_digit_hours() {
        assert_eq!(parse_clock_time("9:05").unwrap(), ClockTime { hour12: 9, minute: 5 });
        assert_eq!(parse_clock_time("09:30").unwrap(), ClockTime { hour12: 9, minute: 30 });
        assert_eq!(parse_clock_time("12:00").unwrap(), ClockTime { hour12: 12, minute: 0 });
    }

    #[test]
    fn test_parse_clock_time_rejects_out_of_range_and_malformed() {
        for text in ["0:30", "13:00", "10:60", "10:5", "1030", "ab:cd", "", "10:30 PM", "123:00"] {
            assert!(parse_clock_time(text).is_err(), "{} should be rejected", text);
        }
    }

    #[test]
    fn test_to_absolute_pm_adds_twelve_hours() {
        let time = ClockTime { hour12: 9, minute: 30 }.with_meridiem(Meridiem::Pm);
        let instant = to_absolute(date(2024, 3, 1), time, &Tz::UTC).unwrap();

        assert_eq!(instant.naive_local(), date(2024, 3, 1).and_hms_opt(21, 30, 0).unwrap());
    }

    #[test]
    fn test_twelve_am_is_midnight_and_twelve_pm_is_noon() {
        let midnight = to_absolute(date(2024, 3, 1), TimeOfDay { hour12: 12, minute: 0, meridiem: Meridiem::Am }, &Tz::UTC).unwrap();
        let noon = to_absolute(date(2024, 3, 1), TimeOfDay { hour12: 12, minute: 0, meridiem: Meridiem::Pm }, &Tz::UTC).unwrap();

        assert_eq!(midnight.hour(), 0);
        assert_eq!(noon.hour(), 12);
    }

    #[test]
    fn test_to_absolute_round_trips_every_valid_time() {
        let tz: Tz = "Africa/Nairobi".parse().unwrap();
        for meridiem in [Meridiem::Am, Meridiem::Pm] {
            for hour12 in 1..=12 {
                for minute in 0..60 {
                    let time = TimeOfDay { hour12, minute, meridiem };
                    let instant = to_absolute(date(2024, 6, 15), time, &tz).unwrap();
                    assert_eq!(to_time_of_day(&instant), time);
                }
            }
        }
    }

    #[test]
    fn test_skipped_local_time_is_rejected() {
        let tz: Tz = "America/New_York".parse().unwrap();
        let time = TimeOfDay { hour12: 2, minute: 30, meridiem: Meridiem::Am };

        assert!(matches!(
            to_absolute(date(2024, 3, 10), time, &tz),
            Err(AppointmentError::InvalidTime(_))
        ));
    }

    #[test]
    fn test_add_duration_bounds() {
        let start = to_absolute(date(2024, 3, 1), TimeOfDay { hour12: 10, minute: 0, meridiem: Meridiem::Am }, &Tz::UTC).unwrap();

        assert_eq!(add_duration(start, 30).unwrap().minute(), 30);
        assert_eq!(add_duration(start, MAX_DURATION_MINUTES).unwrap().day(), 2);
        assert!(add_duration(start, 0).is_err());
        assert!(add_duration(start, -15).is_err());
        assert!(add_duration(start, MAX_DURATION_MINUTES + 1).is_err());

        let last_instant = Utc.from_utc_datetime(&NaiveDate::MAX.and_hms_opt(23, 50, 0).unwrap());
        assert!(matches!(add_duration(last_instant, 30), Err(AppointmentError::InvalidTime(_))));
    }

    #[test]
    fn test_start_of_day_skips_missing_midnight() {
        // Chile moves clocks forward at midnight
        let tz: Tz = "America/Santiago".parse().unwrap();
        let start = start_of_day(date(2023, 9, 3), &tz).unwrap();
        assert_eq!(start.hour(), 1);
        assert_eq!(start_of_day(date(2024, 1, 1), &Tz::UTC).unwrap().hour(), 0);
    }

    #[test]
    fn test_end_of_day_is_last_millisecond() {
        let end = end_of_day(date(2024, 2, 29), &Tz::UTC).unwrap();
        assert_eq!(format_wire(&end), "2024-02-29T23:59:59.999+0000");
    }

    #[test]
    fn test_wire_format_carries_numeric_offset() {
        let tz: Tz = "Asia/Kolkata".parse().unwrap();
        let instant = to_absolute(date(2024, 1, 1), TimeOfDay { hour12: 9, minute: 0, meridiem: Meridiem::Am }, &tz).unwrap();

        let text = format_wire(&instant);
        assert_eq!(text, "2024-01-01T09:00:00.000+0530");
        assert_eq!(parse_wire(&text).unwrap(), instant.fixed_offset());
    }

    #[test]
    fn test_parse_wire_accepts_rfc3339() {
        let parsed = parse_wire("2024-01-01T09:00:00Z").unwrap();
        assert_eq!(parsed.with_timezone(&Utc).hour(), 9);
        assert!(parse_wire("yesterday").is_err());
    }
}
