#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

use appointment_cell::models::{
    Appointment, AppointmentDraft, AppointmentKind, AppointmentStatus, Meridiem,
    ProviderAssignment, ProviderResponse, ServiceDefinition, ServiceRef,
};

pub const PATIENT: &str = "patient-p";
pub const SERVICE: &str = "service-general";
pub const LOCATION: &str = "location-opd";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

pub fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// A timed single-appointment draft for `PATIENT` at `SERVICE`.
pub fn draft(start_date: NaiveDate, start_time: &str, meridiem: Meridiem, duration_minutes: i64) -> AppointmentDraft {
    AppointmentDraft {
        uuid: None,
        patient_uuid: Some(PATIENT.to_string()),
        service_uuid: Some(SERVICE.to_string()),
        location_uuid: Some(LOCATION.to_string()),
        providers: vec![ProviderAssignment {
            uuid: "provider-1".to_string(),
            name: Some("Dr. Test".to_string()),
            response: ProviderResponse::Accepted,
        }],
        appointment_kind: AppointmentKind::Scheduled,
        start_date,
        start_time: Some(start_time.to_string()),
        meridiem,
        duration_minutes: Some(duration_minutes),
        all_day: false,
        recurring_pattern: None,
        comments: None,
        date_appointment_scheduled: None,
        status: None,
    }
}

pub fn appointment(
    uuid: &str,
    patient_uuid: &str,
    service: (&str, &str),
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    status: AppointmentStatus,
) -> Appointment {
    Appointment {
        uuid: uuid.to_string(),
        patient_uuid: patient_uuid.to_string(),
        providers: Vec::new(),
        service: ServiceRef {
            uuid: service.0.to_string(),
            name: service.1.to_string(),
        },
        location_uuid: Some(LOCATION.to_string()),
        appointment_kind: AppointmentKind::Scheduled,
        start_date_time: start,
        end_date_time: end,
        comments: None,
        status,
        date_appointment_scheduled: None,
        all_day: false,
    }
}

/// Open `open`..`close` every day.
pub fn service_with_hours(open: NaiveTime, close: NaiveTime) -> ServiceDefinition {
    ServiceDefinition {
        uuid: SERVICE.to_string(),
        name: "General Consultation".to_string(),
        start_time: Some(open),
        end_time: Some(close),
        weekly_availability: Vec::new(),
    }
}
