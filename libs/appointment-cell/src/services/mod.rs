pub mod time_format;
pub mod recurrence;
pub mod lifecycle;
pub mod conflict;
pub mod calendar;
pub mod draft;
pub mod payload;
pub mod gateway;
pub mod notifications;
pub mod scheduling;

pub use recurrence::RecurrenceExpander;
pub use lifecycle::AppointmentLifecycleService;
pub use conflict::ConflictDetectionService;
pub use calendar::CalendarAggregator;
pub use payload::AppointmentPayloadBuilder;
pub use gateway::{AppointmentGateway, EmrAppointmentGateway, SubmissionReceipt};
pub use notifications::AppointmentSubscribers;
pub use scheduling::{AppointmentSchedulingService, SubmissionOutcome};
