// libs/appointment-cell/src/services/draft.rs
use chrono::NaiveDate;
use tracing::debug;

use crate::models::{
    AppointmentDraft, AppointmentError, Frequency, Meridiem, Occurrence, RecurringPattern, TimeOfDay,
};
use crate::services::recurrence::RecurrenceExpander;
use crate::services::time_format::{self, MAX_DURATION_MINUTES};

/// The scheduling part of a draft once it has passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftSchedule {
    pub series_start: NaiveDate,
    pub time_of_day: TimeOfDay,
    pub duration_minutes: Option<i64>,
    pub all_day: bool,
    pub pattern: Option<RecurringPattern>,
}

impl AppointmentDraft {
    pub fn patient_uuid(&self) -> Result<&str, AppointmentError> {
        required(self.patient_uuid.as_deref(), "Patient")
    }

    pub fn service_uuid(&self) -> Result<&str, AppointmentError> {
        required(self.service_uuid.as_deref(), "Service")
    }

    pub fn location_uuid(&self) -> Result<&str, AppointmentError> {
        required(self.location_uuid.as_deref(), "Location")
    }

    pub fn is_recurring(&self) -> bool {
        self.recurring_pattern.is_some()
    }

    /// Reject everything that must never reach the network.
    pub fn validate(&self) -> Result<DraftSchedule, AppointmentError> {
        self.patient_uuid()?;
        self.service_uuid()?;
        self.location_uuid()?;

        let time_of_day = match (self.all_day, self.start_time.as_deref()) {
            (true, _) => TimeOfDay { hour12: 12, minute: 0, meridiem: Meridiem::Am },
            (false, Some(text)) => time_format::parse_clock_time(text)?.with_meridiem(self.meridiem),
            (false, None) => return Err(AppointmentError::Validation("Start time is required".to_string())),
        };

        let duration_minutes = if self.all_day {
            None
        } else {
            match self.duration_minutes {
                Some(minutes) if minutes > 0 && minutes <= MAX_DURATION_MINUTES => Some(minutes),
                Some(minutes) => {
                    return Err(AppointmentError::Validation(format!(
                        "Duration must be between 1 and {} minutes, got {}",
                        MAX_DURATION_MINUTES, minutes
                    )))
                }
                None => return Err(AppointmentError::Validation("Duration is required".to_string())),
            }
        };

        if let Some(pattern) = &self.recurring_pattern {
            validate_pattern(self.start_date, pattern)?;
        }

        if let Some(scheduled_on) = self.date_appointment_scheduled {
            if scheduled_on > self.start_date {
                return Err(AppointmentError::Validation(format!(
                    "Date appointment scheduled ({}) cannot be after the appointment date ({})",
                    scheduled_on, self.start_date
                )));
            }
        }

        debug!("Draft for patient {:?} validated", self.patient_uuid);

        Ok(DraftSchedule {
            series_start: self.start_date,
            time_of_day,
            duration_minutes,
            all_day: self.all_day,
            pattern: self.recurring_pattern.clone(),
        })
    }

    /// Validate, then expand into concrete occurrences.
    pub fn occurrences(&self, expander: &RecurrenceExpander) -> Result<Vec<Occurrence>, AppointmentError> {
        let schedule = self.validate()?;
        expander.expand(
            schedule.series_start,
            schedule.time_of_day,
            schedule.duration_minutes,
            schedule.all_day,
            schedule.pattern.as_ref(),
        )
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, AppointmentError> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(AppointmentError::Validation(format!("{} is required", field))),
    }
}

fn validate_pattern(series_start: NaiveDate, pattern: &RecurringPattern) -> Result<(), AppointmentError> {
    if pattern.period < 1 {
        return Err(AppointmentError::Validation("Recurrence period must be at least 1".to_string()));
    }

    let end_date = pattern.end_date.ok_or_else(|| {
        AppointmentError::Validation("Recurring appointments require an end date".to_string())
    })?;

    if end_date < series_start {
        return Err(AppointmentError::Validation(format!(
            "Recurrence end date {} is before the start date {}",
            end_date, series_start
        )));
    }

    if pattern.frequency == Frequency::Week && pattern.days_of_week.is_empty() {
        return Err(AppointmentError::Validation("Select at least one day of the week".to_string()));
    }

    Ok(())
}
