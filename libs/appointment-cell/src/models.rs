// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use std::fmt;

use crate::services::time_format::{self, wire};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub uuid: String,
    pub patient_uuid: String,
    #[serde(default)]
    pub providers: Vec<ProviderAssignment>,
    pub service: ServiceRef,
    pub location_uuid: Option<String>,
    pub appointment_kind: AppointmentKind,
    #[serde(with = "wire")]
    pub start_date_time: DateTime<Utc>,
    #[serde(with = "wire")]
    pub end_date_time: DateTime<Utc>,
    pub comments: Option<String>,
    pub status: AppointmentStatus,
    #[serde(default, with = "wire::option")]
    pub date_appointment_scheduled: Option<DateTime<Utc>>,
    #[serde(default)]
    pub all_day: bool,
}

impl Appointment {
    /// First provider, in list order, whose response is `Accepted`.
    pub fn primary_provider(&self) -> Option<&ProviderAssignment> {
        self.providers
            .iter()
            .find(|provider| provider.response == ProviderResponse::Accepted)
    }

    /// Calendar date of the start instant in the given zone.
    pub fn start_date(&self, tz: &Tz) -> NaiveDate {
        self.start_date_time.with_timezone(tz).date_naive()
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_date_time < end && start < self.end_date_time
    }

    /// `start < end`, or for all-day appointments `end` is the end of the start's local day.
    pub fn has_valid_interval(&self, tz: &Tz) -> bool {
        if self.all_day {
            match time_format::end_of_day(self.start_date(tz), tz) {
                Ok(end_of_day) => end_of_day.with_timezone(&Utc) == self.end_date_time,
                Err(_) => false,
            }
        } else {
            self.start_date_time < self.end_date_time
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AppointmentStatus {
    Requested,
    Scheduled,
    CheckedIn,
    Completed,
    Missed,
    Cancelled,
}

impl AppointmentStatus {
    /// Completed, Missed and Cancelled only leave through an undo.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Missed | AppointmentStatus::Cancelled
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Requested => write!(f, "Requested"),
            AppointmentStatus::Scheduled => write!(f, "Scheduled"),
            AppointmentStatus::CheckedIn => write!(f, "CheckedIn"),
            AppointmentStatus::Completed => write!(f, "Completed"),
            AppointmentStatus::Missed => write!(f, "Missed"),
            AppointmentStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum AppointmentKind {
    #[default]
    Scheduled,
    WalkIn,
    Virtual,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProviderResponse {
    Accepted,
    Pending,
    Tentative,
    Rejected,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAssignment {
    pub uuid: String,
    #[serde(default)]
    pub name: Option<String>,
    pub response: ProviderResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRef {
    pub uuid: String,
    pub name: String,
}

// ==============================================================================
// SERVICE CONFIGURATION
// ==============================================================================

/// An appointment service with its operating hours.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDefinition {
    pub uuid: String,
    pub name: String,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub weekly_availability: Vec<ServiceAvailability>,
}

impl ServiceDefinition {
    pub fn uses_weekly_availability(&self) -> bool {
        !self.weekly_availability.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAvailability {
    pub day_of_week: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

// ==============================================================================
// TIME OF DAY
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Meridiem {
    #[default]
    Am,
    Pm,
}

/// A parsed `H:MM` / `HH:MM` clock reading on a 12-hour dial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTime {
    pub hour12: u32,
    pub minute: u32,
}

impl ClockTime {
    pub fn with_meridiem(self, meridiem: Meridiem) -> TimeOfDay {
        TimeOfDay {
            hour12: self.hour12,
            minute: self.minute,
            meridiem,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeOfDay {
    pub hour12: u32,
    pub minute: u32,
    pub meridiem: Meridiem,
}

// ==============================================================================
// RECURRENCE MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Day,
    Week,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecurringPattern {
    pub frequency: Frequency,
    pub period: u32,
    #[serde(default)]
    pub days_of_week: Vec<Weekday>,
    /// Inclusive last date of the series.
    pub end_date: Option<NaiveDate>,
}

impl RecurringPattern {
    pub fn includes_weekday(&self, weekday: Weekday) -> bool {
        self.days_of_week.contains(&weekday)
    }
}

/// One concrete interval produced by expanding a draft.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    #[serde(serialize_with = "wire::serialize")]
    pub start: DateTime<Tz>,
    #[serde(serialize_with = "wire::serialize")]
    pub end: DateTime<Tz>,
    pub all_day: bool,
}

impl Occurrence {
    pub fn date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start.with_timezone(&Utc)
    }

    pub fn end_utc(&self) -> DateTime<Utc> {
        self.end.with_timezone(&Utc)
    }
}

// ==============================================================================
// DRAFT (FORM STATE) MODELS
// ==============================================================================

/// Form state for a new or edited appointment before expansion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDraft {
    /// Present when editing an existing appointment.
    pub uuid: Option<String>,
    pub patient_uuid: Option<String>,
    pub service_uuid: Option<String>,
    pub location_uuid: Option<String>,
    #[serde(default)]
    pub providers: Vec<ProviderAssignment>,
    #[serde(default)]
    pub appointment_kind: AppointmentKind,
    pub start_date: NaiveDate,
    pub start_time: Option<String>,
    #[serde(default)]
    pub meridiem: Meridiem,
    pub duration_minutes: Option<i64>,
    #[serde(default)]
    pub all_day: bool,
    pub recurring_pattern: Option<RecurringPattern>,
    pub comments: Option<String>,
    pub date_appointment_scheduled: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
}

// ==============================================================================
// CONFLICT MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    ServiceUnavailable,
    DoubleBooked,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::ServiceUnavailable => write!(f, "service_unavailable"),
            RejectionReason::DoubleBooked => write!(f, "double_booked"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum ConflictOutcome {
    Accepted,
    Rejected(RejectionReason),
}

impl ConflictOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ConflictOutcome::Accepted)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenedOccurrence {
    pub occurrence: Occurrence,
    pub outcome: ConflictOutcome,
}

/// What to do with a recurring series when some occurrences are rejected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SeriesConflictPolicy {
    /// Any rejected occurrence blocks the whole submission.
    #[default]
    RejectWholeSeries,
    /// Rejected occurrences are dropped; the rest are submitted.
    SkipConflicting,
}

// ==============================================================================
// STATUS MACHINE MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusAction {
    CheckIn,
    Complete,
    Miss,
    Cancel,
    Undo,
}

impl fmt::Display for StatusAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusAction::CheckIn => write!(f, "check_in"),
            StatusAction::Complete => write!(f, "complete"),
            StatusAction::Miss => write!(f, "miss"),
            StatusAction::Cancel => write!(f, "cancel"),
            StatusAction::Undo => write!(f, "undo"),
        }
    }
}

/// A status change as applied; callers keep it to be able to undo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusTransition {
    pub appointment_uuid: String,
    pub action: StatusAction,
    pub from: AppointmentStatus,
    pub to: AppointmentStatus,
}

/// Notification sent to appointment-list subscribers after a successful write.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentListChange {
    pub appointment_uuids: Vec<String>,
    pub status: Option<AppointmentStatus>,
    pub reason: ChangeReason,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeReason {
    Created,
    Updated,
    StatusChanged,
    StatusReverted,
}

// ==============================================================================
// CALENDAR MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CalendarPeriod {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DailyServiceCount {
    pub service_uuid: String,
    pub service_name: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarBucket {
    pub date: NaiveDate,
    pub services: Vec<DailyServiceCount>,
    pub total: u32,
}

/// Calendar selection owned by the caller; serializable so it can be saved as a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarViewState {
    pub period: CalendarPeriod,
    pub reference_date: NaiveDate,
    pub timezone: Tz,
}

// ==============================================================================
// WIRE PAYLOADS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderPayload {
    pub uuid: String,
    pub response: ProviderResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SingleAppointmentPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub patient_uuid: String,
    pub service_uuid: String,
    pub location_uuid: Option<String>,
    pub providers: Vec<ProviderPayload>,
    pub appointment_kind: AppointmentKind,
    pub status: AppointmentStatus,
    pub start_date_time: String,
    pub end_date_time: String,
    pub comments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_appointment_scheduled: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecurringPatternPayload {
    #[serde(rename = "type")]
    pub frequency: Frequency,
    pub period: u32,
    pub end_date: String,
    pub days_of_week: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecurringAppointmentPayload {
    pub appointment_request: SingleAppointmentPayload,
    pub recurring_pattern: RecurringPatternPayload,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum AppointmentPayload {
    Single(SingleAppointmentPayload),
    Recurring(RecurringAppointmentPayload),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangePayload {
    pub to_status: AppointmentStatus,
    pub on_date: String,
    pub time_zone: String,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error, PartialEq)]
pub enum AppointmentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Service is not available at the requested time")]
    ServiceUnavailable,

    #[error("Patient already has an appointment at the requested time")]
    DoubleBooked,

    #[error("{rejected} of {total} occurrences in the series were rejected")]
    SeriesRejected { rejected: usize, total: usize },

    #[error("Action {action} is disabled for status {status}")]
    ActionDisabled { action: StatusAction, status: AppointmentStatus },

    #[error("Nothing to undo for status {0}")]
    NothingToUndo(AppointmentStatus),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("No Content")]
    NoContent,

    #[error("Request aborted")]
    Aborted,

    #[error("Submission stopped after saving {appointment_uuids:?}: {cause}")]
    PartialSubmission {
        appointment_uuids: Vec<String>,
        cause: Box<AppointmentError>,
    },
}

impl AppointmentError {
    pub fn is_validation(&self) -> bool {
        matches!(self, AppointmentError::Validation(_) | AppointmentError::InvalidTime(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            AppointmentError::ServiceUnavailable
                | AppointmentError::DoubleBooked
                | AppointmentError::SeriesRejected { .. }
        )
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, AppointmentError::Transport(_))
    }
}

impl From<RejectionReason> for AppointmentError {
    fn from(reason: RejectionReason) -> Self {
        match reason {
            RejectionReason::ServiceUnavailable => AppointmentError::ServiceUnavailable,
            RejectionReason::DoubleBooked => AppointmentError::DoubleBooked,
        }
    }
}

impl From<shared_database::EmrClientError> for AppointmentError {
    fn from(err: shared_database::EmrClientError) -> Self {
        match err {
            shared_database::EmrClientError::NoContent => AppointmentError::NoContent,
            other => AppointmentError::Transport(other.to_string()),
        }
    }
}
