// libs/appointment-cell/src/services/payload.rs
use chrono::Weekday;
use chrono_tz::Tz;
use tracing::{debug, instrument};

use crate::models::{
    AppointmentDraft, AppointmentError, AppointmentPayload, AppointmentStatus, Frequency,
    Occurrence, ProviderPayload, RecurringAppointmentPayload, RecurringPattern,
    RecurringPatternPayload, SingleAppointmentPayload,
};
use crate::services::time_format;

const WEEK_ORDER: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// Serializes a validated draft into what the EMR expects on submission.
pub struct AppointmentPayloadBuilder {
    tz: Tz,
}

impl AppointmentPayloadBuilder {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// A single appointment, or for a recurring draft the first occurrence paired with
    /// the serialized pattern.
    #[instrument(skip(self, draft, occurrences), fields(occurrences = occurrences.len()))]
    pub fn build(&self, draft: &AppointmentDraft, occurrences: &[Occurrence]) -> Result<AppointmentPayload, AppointmentError> {
        draft.validate()?;

        let first = occurrences.first().ok_or_else(|| {
            AppointmentError::Validation("No occurrences to submit".to_string())
        })?;
        let appointment_request = self.single(draft, first)?;

        match &draft.recurring_pattern {
            None => Ok(AppointmentPayload::Single(appointment_request)),
            Some(pattern) => {
                let recurring_pattern = self.pattern(pattern)?;
                debug!("Built recurring payload ending {}", recurring_pattern.end_date);
                Ok(AppointmentPayload::Recurring(RecurringAppointmentPayload {
                    appointment_request,
                    recurring_pattern,
                }))
            }
        }
    }

    /// One standalone payload per occurrence, used when a series is submitted partially.
    ///
    /// When editing, only the first payload keeps the existing identity; the others are
    /// created as new appointments.
    pub fn build_each(&self, draft: &AppointmentDraft, occurrences: &[Occurrence]) -> Result<Vec<SingleAppointmentPayload>, AppointmentError> {
        draft.validate()?;
        occurrences
            .iter()
            .enumerate()
            .map(|(index, occurrence)| {
                let mut payload = self.single(draft, occurrence)?;
                if index > 0 {
                    payload.uuid = None;
                }
                Ok(payload)
            })
            .collect()
    }

    fn single(&self, draft: &AppointmentDraft, occurrence: &Occurrence) -> Result<SingleAppointmentPayload, AppointmentError> {
        let date_appointment_scheduled = draft
            .date_appointment_scheduled
            .map(|date| time_format::start_of_day(date, &self.tz).map(|instant| time_format::format_wire(&instant)))
            .transpose()?;

        Ok(SingleAppointmentPayload {
            uuid: draft.uuid.clone(),
            patient_uuid: draft.patient_uuid()?.to_string(),
            service_uuid: draft.service_uuid()?.to_string(),
            location_uuid: Some(draft.location_uuid()?.to_string()),
            providers: draft
                .providers
                .iter()
                .map(|provider| ProviderPayload {
                    uuid: provider.uuid.clone(),
                    response: provider.response,
                })
                .collect(),
            appointment_kind: draft.appointment_kind,
            status: draft.status.unwrap_or(AppointmentStatus::Scheduled),
            start_date_time: time_format::format_wire(&occurrence.start),
            end_date_time: time_format::format_wire(&occurrence.end),
            comments: draft.comments.clone(),
            date_appointment_scheduled,
        })
    }

    fn pattern(&self, pattern: &RecurringPattern) -> Result<RecurringPatternPayload, AppointmentError> {
        let end_date = pattern.end_date.ok_or_else(|| {
            AppointmentError::Validation("Recurring appointments require an end date".to_string())
        })?;

        let days_of_week = match pattern.frequency {
            Frequency::Day => Vec::new(),
            Frequency::Week => WEEK_ORDER
                .iter()
                .filter(|day| pattern.includes_weekday(**day))
                .map(|day| weekday_name(*day).to_string())
                .collect(),
        };

        Ok(RecurringPatternPayload {
            frequency: pattern.frequency,
            period: pattern.period,
            end_date: time_format::format_wire(&time_format::end_of_day(end_date, &self.tz)?),
            days_of_week,
        })
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MONDAY",
        Weekday::Tue => "TUESDAY",
        Weekday::Wed => "WEDNESDAY",
        Weekday::Thu => "THURSDAY",
        Weekday::Fri => "FRIDAY",
        Weekday::Sat => "SATURDAY",
        Weekday::Sun => "SUNDAY",
    }
}
