// libs/appointment-cell/src/services/notifications.rs
use tokio::sync::broadcast;
use tracing::debug;

use crate::models::{AppointmentListChange, AppointmentStatus, ChangeReason};

pub type ChangeReceiver = broadcast::Receiver<AppointmentListChange>;

/// Fan-out of appointment changes to whoever caches appointment lists.
#[derive(Clone)]
pub struct AppointmentSubscribers {
    sender: broadcast::Sender<AppointmentListChange>,
}

impl Default for AppointmentSubscribers {
    fn default() -> Self {
        Self::new(256)
    }
}

impl AppointmentSubscribers {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> ChangeReceiver {
        self.sender.subscribe()
    }

    pub fn notify(&self, appointment_uuids: Vec<String>, status: Option<AppointmentStatus>, reason: ChangeReason) {
        let change = AppointmentListChange {
            appointment_uuids,
            status,
            reason,
        };

        // No receivers just means no list is cached right now.
        match self.sender.send(change) {
            Ok(receivers) => debug!("Notified {} appointment list subscribers ({:?})", receivers, reason),
            Err(_) => debug!("No appointment list subscribers to notify ({:?})", reason),
        }
    }
}
