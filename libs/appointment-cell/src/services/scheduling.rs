// libs/appointment-cell/src/services/scheduling.rs
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use futures::future::{AbortRegistration, Abortable};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::models::{
    Appointment, AppointmentDraft, AppointmentError, AppointmentPayload, AppointmentStatus,
    CalendarBucket, CalendarViewState, ChangeReason, ConflictOutcome, Occurrence,
    ScreenedOccurrence, SeriesConflictPolicy, StatusAction, StatusTransition,
};
use crate::services::calendar::CalendarAggregator;
use crate::services::conflict::ConflictDetectionService;
use crate::services::gateway::{AppointmentGateway, SubmissionReceipt};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::notifications::AppointmentSubscribers;
use crate::services::payload::AppointmentPayloadBuilder;
use crate::services::recurrence::RecurrenceExpander;
use crate::services::time_format;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub appointment_uuids: Vec<String>,
    pub submitted: usize,
    pub skipped: Vec<ScreenedOccurrence>,
}

/// Runs a draft through expansion, screening, payload building and submission,
/// and applies status changes. Every gateway call is single-shot; nothing is retried.
pub struct AppointmentSchedulingService {
    gateway: Arc<dyn AppointmentGateway>,
    subscribers: AppointmentSubscribers,
    tz: Tz,
    expander: RecurrenceExpander,
    conflict_service: ConflictDetectionService,
    lifecycle_service: AppointmentLifecycleService,
    payload_builder: AppointmentPayloadBuilder,
    calendar: CalendarAggregator,
}

impl AppointmentSchedulingService {
    pub fn new(gateway: Arc<dyn AppointmentGateway>, subscribers: AppointmentSubscribers, tz: Tz) -> Self {
        Self {
            gateway,
            subscribers,
            tz,
            expander: RecurrenceExpander::new(tz),
            conflict_service: ConflictDetectionService::new(tz),
            lifecycle_service: AppointmentLifecycleService::new(),
            payload_builder: AppointmentPayloadBuilder::new(tz),
            calendar: CalendarAggregator::new(tz),
        }
    }

    pub fn lifecycle(&self) -> &AppointmentLifecycleService {
        &self.lifecycle_service
    }

    /// Validate and expand without touching the network.
    pub fn occurrences(&self, draft: &AppointmentDraft) -> Result<Vec<Occurrence>, AppointmentError> {
        draft.occurrences(&self.expander)
    }

    pub fn build_payload(&self, draft: &AppointmentDraft) -> Result<AppointmentPayload, AppointmentError> {
        let occurrences = self.occurrences(draft)?;
        self.payload_builder.build(draft, &occurrences)
    }

    /// Expand the draft and classify each occurrence against a freshly fetched snapshot.
    #[instrument(skip(self, draft, abort), fields(patient = ?draft.patient_uuid))]
    pub async fn preview(
        &self,
        draft: &AppointmentDraft,
        abort: Option<AbortRegistration>,
    ) -> Result<Vec<ScreenedOccurrence>, AppointmentError> {
        let occurrences = self.occurrences(draft)?;
        guarded(self.screen(draft, occurrences), abort).await
    }

    async fn screen(
        &self,
        draft: &AppointmentDraft,
        occurrences: Vec<Occurrence>,
    ) -> Result<Vec<ScreenedOccurrence>, AppointmentError> {
        let (Some(first), Some(last)) = (occurrences.first(), occurrences.last()) else {
            return Ok(Vec::new());
        };

        let (range_start, range_end) = padded_range(first.start_utc(), last.end_utc());
        let existing = self.gateway.fetch_appointments(range_start, range_end).await?;
        let service = self.gateway.fetch_service(draft.service_uuid()?).await?;

        debug!("Screening {} occurrences against {} existing appointments", occurrences.len(), existing.len());

        Ok(self.conflict_service.classify_all(
            &occurrences,
            draft.patient_uuid()?,
            &existing,
            &service,
            draft.uuid.as_deref(),
        ))
    }

    /// Screen and submit a draft, applying `policy` to rejected occurrences.
    #[instrument(skip(self, draft, abort), fields(patient = ?draft.patient_uuid, recurring = draft.is_recurring()))]
    pub async fn submit(
        &self,
        draft: &AppointmentDraft,
        policy: SeriesConflictPolicy,
        abort: Option<AbortRegistration>,
    ) -> Result<SubmissionOutcome, AppointmentError> {
        let occurrences = self.occurrences(draft)?;
        if occurrences.is_empty() {
            return Err(AppointmentError::Validation("The recurrence produces no appointments".to_string()));
        }

        guarded(self.screen_and_submit(draft, occurrences, policy), abort).await
    }

    async fn screen_and_submit(
        &self,
        draft: &AppointmentDraft,
        occurrences: Vec<Occurrence>,
        policy: SeriesConflictPolicy,
    ) -> Result<SubmissionOutcome, AppointmentError> {
        let total = occurrences.len();
        let screened = self.screen(draft, occurrences.clone()).await?;
        let (accepted, skipped): (Vec<ScreenedOccurrence>, Vec<ScreenedOccurrence>) =
            screened.into_iter().partition(|entry| entry.outcome.is_accepted());

        if !skipped.is_empty() {
            warn!("{} of {} occurrences rejected under policy {:?}", skipped.len(), total, policy);

            if policy == SeriesConflictPolicy::RejectWholeSeries || accepted.is_empty() {
                return Err(rejection_error(&skipped, total));
            }
        }

        let receipt = if skipped.is_empty() {
            match self.payload_builder.build(draft, &occurrences)? {
                AppointmentPayload::Single(payload) => self.gateway.submit_appointment(&payload).await?,
                AppointmentPayload::Recurring(payload) => self.gateway.submit_recurring_appointments(&payload).await?,
            }
        } else {
            // A series with gaps cannot be described by the pattern; submit survivors one by one.
            let survivors: Vec<Occurrence> = accepted.iter().map(|entry| entry.occurrence.clone()).collect();
            let mut receipt = SubmissionReceipt::default();
            for (index, payload) in self.payload_builder.build_each(draft, &survivors)?.iter().enumerate() {
                match self.gateway.submit_appointment(payload).await {
                    Ok(single) => receipt.appointment_uuids.extend(single.appointment_uuids),
                    Err(cause) if index == 0 => return Err(cause),
                    Err(cause) => {
                        warn!("Submission failed after {} of {} occurrences were saved: {}", index, survivors.len(), cause);
                        self.subscribers.notify(receipt.appointment_uuids.clone(), None, change_reason(draft));
                        return Err(AppointmentError::PartialSubmission {
                            appointment_uuids: receipt.appointment_uuids,
                            cause: Box::new(cause),
                        });
                    }
                }
            }
            receipt
        };

        self.subscribers.notify(receipt.appointment_uuids.clone(), None, change_reason(draft));

        info!("Submitted {} of {} occurrences", accepted.len(), total);

        Ok(SubmissionOutcome {
            appointment_uuids: receipt.appointment_uuids,
            submitted: accepted.len(),
            skipped,
        })
    }

    /// Apply a forward status action, persist it and notify subscribers.
    #[instrument(skip(self, abort))]
    pub async fn change_status(
        &self,
        appointment_uuid: &str,
        current_status: AppointmentStatus,
        action: StatusAction,
        abort: Option<AbortRegistration>,
    ) -> Result<StatusTransition, AppointmentError> {
        let transition = self.lifecycle_service.apply(appointment_uuid, current_status, action)?;
        let now = Utc::now().with_timezone(&self.tz);

        guarded(
            self.gateway.submit_status_change(appointment_uuid, transition.to, now, self.tz.name()),
            abort,
        )
        .await?;

        self.subscribers.notify(
            vec![appointment_uuid.to_string()],
            Some(transition.to),
            ChangeReason::StatusChanged,
        );

        Ok(transition)
    }

    /// Revert a terminal transition previously returned by [`change_status`](Self::change_status).
    #[instrument(skip(self, abort))]
    pub async fn undo_status(
        &self,
        transition: &StatusTransition,
        abort: Option<AbortRegistration>,
    ) -> Result<StatusTransition, AppointmentError> {
        let reverted = self.lifecycle_service.undo(transition)?;

        guarded(self.gateway.undo_status_change(&reverted.appointment_uuid), abort).await?;

        self.subscribers.notify(
            vec![reverted.appointment_uuid.clone()],
            Some(reverted.to),
            ChangeReason::StatusReverted,
        );

        Ok(reverted)
    }

    /// Fetch the appointments of the selected period and bucket them.
    #[instrument(skip(self, abort))]
    pub async fn calendar(
        &self,
        state: &CalendarViewState,
        abort: Option<AbortRegistration>,
    ) -> Result<Vec<CalendarBucket>, AppointmentError> {
        let (window_start, window_end) = state.period.window(state.reference_date);
        let range_start = time_format::start_of_day(window_start, &state.timezone)?.with_timezone(&Utc);
        let range_end = time_format::end_of_day(window_end, &state.timezone)?.with_timezone(&Utc);

        let appointments: Vec<Appointment> =
            guarded(self.gateway.fetch_appointments(range_start, range_end), abort).await?;

        Ok(self.calendar.aggregate_view(&appointments, state))
    }
}

/// Run `future`, resolving to [`AppointmentError::Aborted`] if the caller aborts first.
pub async fn guarded<T, F>(future: F, abort: Option<AbortRegistration>) -> Result<T, AppointmentError>
where
    F: Future<Output = Result<T, AppointmentError>>,
{
    match abort {
        Some(registration) => Abortable::new(future, registration)
            .await
            .map_err(|_| AppointmentError::Aborted)?,
        None => future.await,
    }
}

// Existing appointments may start before or end after the proposed series.
fn padded_range(start: DateTime<Utc>, end: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        start.checked_sub_signed(Duration::days(1)).unwrap_or(start),
        end.checked_add_signed(Duration::days(1)).unwrap_or(end),
    )
}

fn change_reason(draft: &AppointmentDraft) -> ChangeReason {
    if draft.uuid.is_some() {
        ChangeReason::Updated
    } else {
        ChangeReason::Created
    }
}

fn rejection_error(rejected: &[ScreenedOccurrence], total: usize) -> AppointmentError {
    match (total, rejected.first().map(|entry| entry.outcome)) {
        (1, Some(ConflictOutcome::Rejected(reason))) => reason.into(),
        _ => AppointmentError::SeriesRejected {
            rejected: rejected.len(),
            total,
        },
    }
}
