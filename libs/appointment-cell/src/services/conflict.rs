// libs/appointment-cell/src/services/conflict.rs
use chrono::{Datelike, NaiveTime};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::models::{
    Appointment, AppointmentStatus, ConflictOutcome, Occurrence, RejectionReason,
    ScreenedOccurrence, ServiceDefinition,
};

/// Screens proposed occurrences against service hours and the patient's existing bookings.
///
/// Works on the snapshot the caller fetched; it never re-fetches.
pub struct ConflictDetectionService {
    tz: Tz,
}

impl ConflictDetectionService {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Service hours are checked before double booking.
    pub fn classify(
        &self,
        occurrence: &Occurrence,
        patient_uuid: &str,
        existing_appointments: &[Appointment],
        service: &ServiceDefinition,
        exclude_appointment_uuid: Option<&str>,
    ) -> ConflictOutcome {
        if !self.is_within_service_hours(occurrence, service) {
            debug!("Occurrence at {} is outside the hours of service {}", occurrence.start, service.uuid);
            return ConflictOutcome::Rejected(RejectionReason::ServiceUnavailable);
        }

        let conflicting = self.find_patient_conflicts(
            occurrence,
            patient_uuid,
            existing_appointments,
            exclude_appointment_uuid,
        );

        if !conflicting.is_empty() {
            warn!("Patient {} is double booked at {} ({} overlapping appointments)",
                  patient_uuid, occurrence.start, conflicting.len());
            return ConflictOutcome::Rejected(RejectionReason::DoubleBooked);
        }

        ConflictOutcome::Accepted
    }

    pub fn classify_all(
        &self,
        occurrences: &[Occurrence],
        patient_uuid: &str,
        existing_appointments: &[Appointment],
        service: &ServiceDefinition,
        exclude_appointment_uuid: Option<&str>,
    ) -> Vec<ScreenedOccurrence> {
        occurrences
            .iter()
            .map(|occurrence| ScreenedOccurrence {
                occurrence: occurrence.clone(),
                outcome: self.classify(occurrence, patient_uuid, existing_appointments, service, exclude_appointment_uuid),
            })
            .collect()
    }

    /// Non-cancelled appointments of the same patient whose interval overlaps the occurrence.
    pub fn find_patient_conflicts<'a>(
        &self,
        occurrence: &Occurrence,
        patient_uuid: &str,
        existing_appointments: &'a [Appointment],
        exclude_appointment_uuid: Option<&str>,
    ) -> Vec<&'a Appointment> {
        let start = occurrence.start_utc();
        let end = occurrence.end_utc();

        existing_appointments
            .iter()
            .filter(|appointment| appointment.patient_uuid == patient_uuid)
            .filter(|appointment| appointment.status != AppointmentStatus::Cancelled)
            .filter(|appointment| Some(appointment.uuid.as_str()) != exclude_appointment_uuid)
            .filter(|appointment| appointment.overlaps(start, end))
            .collect()
    }

    /// All-day occurrences and services without configured hours are always within hours.
    pub fn is_within_service_hours(&self, occurrence: &Occurrence, service: &ServiceDefinition) -> bool {
        if occurrence.all_day {
            return true;
        }

        let start = occurrence.start.with_timezone(&self.tz);
        let end = occurrence.end.with_timezone(&self.tz);

        let windows: Vec<(NaiveTime, NaiveTime)> = if service.uses_weekly_availability() {
            service
                .weekly_availability
                .iter()
                .filter(|window| window.day_of_week == start.weekday())
                .map(|window| (window.start_time, window.end_time))
                .collect()
        } else {
            match (service.start_time, service.end_time) {
                (Some(open), Some(close)) => vec![(open, close)],
                _ => return true,
            }
        };

        // An interval running past midnight cannot fit a same-day window.
        if end.date_naive() != start.date_naive() {
            return false;
        }

        let (start_time, end_time) = (start.time(), end.time());
        windows
            .iter()
            .any(|(open, close)| *open <= start_time && end_time <= *close)
    }
}
