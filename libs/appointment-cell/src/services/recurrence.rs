// libs/appointment-cell/src/services/recurrence.rs
use chrono::{Datelike, Duration, NaiveDate};
use chrono_tz::Tz;
use tracing::{debug, instrument};

use crate::models::{AppointmentError, Frequency, Occurrence, RecurringPattern, TimeOfDay};
use crate::services::time_format;

/// Expands a start date, time of day and optional recurring pattern into concrete occurrences.
pub struct RecurrenceExpander {
    tz: Tz,
}

impl RecurrenceExpander {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Occurrences in ascending order. Without a pattern exactly one occurrence on
    /// `series_start` is produced; an end date before `series_start` yields none.
    #[instrument(skip(self, pattern), fields(tz = %self.tz.name()))]
    pub fn expand(
        &self,
        series_start: NaiveDate,
        time_of_day: TimeOfDay,
        duration_minutes: Option<i64>,
        all_day: bool,
        pattern: Option<&RecurringPattern>,
    ) -> Result<Vec<Occurrence>, AppointmentError> {
        let dates = match pattern {
            None => vec![series_start],
            Some(pattern) => occurrence_dates(series_start, pattern)?,
        };

        debug!("Expanding {} occurrence dates from {}", dates.len(), series_start);

        dates
            .into_iter()
            .map(|date| self.occurrence_on(date, time_of_day, duration_minutes, all_day))
            .collect()
    }

    fn occurrence_on(
        &self,
        date: NaiveDate,
        time_of_day: TimeOfDay,
        duration_minutes: Option<i64>,
        all_day: bool,
    ) -> Result<Occurrence, AppointmentError> {
        if all_day {
            let start = time_format::start_of_day(date, &self.tz)?;
            let end = time_format::end_of_day(date, &self.tz)?;
            return Ok(Occurrence { start, end, all_day });
        }

        let minutes = duration_minutes.ok_or_else(|| {
            AppointmentError::Validation("Duration is required for timed appointments".to_string())
        })?;
        let start = time_format::to_absolute(date, time_of_day, &self.tz)?;
        let end = time_format::add_duration(start, minutes)?;

        Ok(Occurrence { start, end, all_day })
    }
}

/// Dates selected by `pattern`, starting on or after `series_start`.
pub fn occurrence_dates(series_start: NaiveDate, pattern: &RecurringPattern) -> Result<Vec<NaiveDate>, AppointmentError> {
    if pattern.period < 1 {
        return Err(AppointmentError::Validation("Recurrence period must be at least 1".to_string()));
    }

    let end_date = pattern.end_date.ok_or_else(|| {
        AppointmentError::Validation("Recurring appointments require an end date".to_string())
    })?;

    if end_date < series_start {
        return Ok(Vec::new());
    }

    let period = i64::from(pattern.period);

    match pattern.frequency {
        Frequency::Day => {
            let step = Duration::days(period);
            let mut dates = Vec::new();
            let mut next = Some(series_start);
            // Stepping past the last representable date ends the series.
            while let Some(date) = next.filter(|date| *date <= end_date) {
                dates.push(date);
                next = date.checked_add_signed(step);
            }
            Ok(dates)
        }
        Frequency::Week => {
            if pattern.days_of_week.is_empty() {
                return Err(AppointmentError::Validation(
                    "Weekly recurrence requires at least one weekday".to_string(),
                ));
            }

            // Windows are Sunday-aligned, matching the calendar week.
            let week_start = series_start
                .checked_sub_signed(Duration::days(i64::from(series_start.weekday().num_days_from_sunday())))
                .ok_or_else(|| AppointmentError::Validation(format!("Start date {} is out of range", series_start)))?;
            let window = Duration::days(7 * period);
            let mut dates = Vec::new();
            let mut next_window = Some(week_start);

            while let Some(window_start) = next_window.filter(|date| *date <= end_date) {
                dates.extend(
                    window_start
                        .iter_days()
                        .take(7)
                        .filter(|date| *date >= series_start && *date <= end_date)
                        .filter(|date| pattern.includes_weekday(date.weekday())),
                );
                next_window = window_start.checked_add_signed(window);
            }

            Ok(dates)
        }
    }
}
