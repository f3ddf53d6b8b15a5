// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, info, warn};

use crate::models::{AppointmentError, AppointmentStatus, StatusAction, StatusTransition};

/// Stateless appointment status machine.
///
/// Undo needs the status held before the terminal transition, so callers keep the
/// [`StatusTransition`] returned by [`apply`](Self::apply).
pub struct AppointmentLifecycleService;

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Statuses an action may be applied from.
    pub fn valid_sources(&self, action: StatusAction) -> &'static [AppointmentStatus] {
        match action {
            StatusAction::CheckIn => &[AppointmentStatus::Scheduled, AppointmentStatus::Requested],
            StatusAction::Complete => &[
                AppointmentStatus::CheckedIn,
                AppointmentStatus::Scheduled,
                AppointmentStatus::Requested,
            ],
            StatusAction::Miss | StatusAction::Cancel => &[
                AppointmentStatus::Requested,
                AppointmentStatus::Scheduled,
                AppointmentStatus::CheckedIn,
            ],
            StatusAction::Undo => &[
                AppointmentStatus::Completed,
                AppointmentStatus::Missed,
                AppointmentStatus::Cancelled,
            ],
        }
    }

    /// Status reached by a forward action. `Undo` has no fixed target.
    pub fn target_status(&self, action: StatusAction) -> Option<AppointmentStatus> {
        match action {
            StatusAction::CheckIn => Some(AppointmentStatus::CheckedIn),
            StatusAction::Complete => Some(AppointmentStatus::Completed),
            StatusAction::Miss => Some(AppointmentStatus::Missed),
            StatusAction::Cancel => Some(AppointmentStatus::Cancelled),
            StatusAction::Undo => None,
        }
    }

    pub fn is_enabled(&self, current_status: AppointmentStatus, action: StatusAction) -> bool {
        self.valid_sources(action).contains(&current_status)
    }

    /// Actions a user may trigger from `current_status`, in display order.
    pub fn available_actions(&self, current_status: AppointmentStatus) -> Vec<StatusAction> {
        [
            StatusAction::CheckIn,
            StatusAction::Complete,
            StatusAction::Miss,
            StatusAction::Cancel,
            StatusAction::Undo,
        ]
        .into_iter()
        .filter(|action| self.is_enabled(current_status, *action))
        .collect()
    }

    /// Apply a forward action. Disabled actions are reported, not silently ignored.
    pub fn apply(
        &self,
        appointment_uuid: &str,
        current_status: AppointmentStatus,
        action: StatusAction,
    ) -> Result<StatusTransition, AppointmentError> {
        debug!("Applying {} to appointment {} in status {}", action, appointment_uuid, current_status);

        let target = match self.target_status(action) {
            Some(target) if self.is_enabled(current_status, action) => target,
            _ => {
                warn!("Action {} is disabled for appointment {} in status {}", action, appointment_uuid, current_status);
                return Err(AppointmentError::ActionDisabled { action, status: current_status });
            }
        };

        info!("Status transition validated: {} -> {}", current_status, target);

        Ok(StatusTransition {
            appointment_uuid: appointment_uuid.to_string(),
            action,
            from: current_status,
            to: target,
        })
    }

    /// Compensating transition back to the status held before `transition`.
    pub fn undo(&self, transition: &StatusTransition) -> Result<StatusTransition, AppointmentError> {
        if !transition.to.is_terminal() {
            warn!("Undo requested for non-terminal status {}", transition.to);
            return Err(AppointmentError::NothingToUndo(transition.to));
        }

        if transition.from.is_terminal() {
            return Err(AppointmentError::Validation(format!(
                "Cannot restore terminal status {}",
                transition.from
            )));
        }

        info!("Undoing {} on appointment {}: {} -> {}", transition.action, transition.appointment_uuid, transition.to, transition.from);

        Ok(StatusTransition {
            appointment_uuid: transition.appointment_uuid.clone(),
            action: StatusAction::Undo,
            from: transition.to,
            to: transition.from,
        })
    }
}
