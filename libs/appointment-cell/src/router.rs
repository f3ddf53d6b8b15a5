// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use shared_config::AppConfig;

use crate::handlers;
use crate::services::gateway::{AppointmentGateway, EmrAppointmentGateway};
use crate::services::notifications::AppointmentSubscribers;
use crate::services::scheduling::AppointmentSchedulingService;

/// Shared state of the appointment routes.
pub struct AppointmentState {
    pub config: AppConfig,
    pub scheduling: AppointmentSchedulingService,
    pub subscribers: AppointmentSubscribers,
}

impl AppointmentState {
    pub fn new(config: AppConfig) -> Self {
        let gateway = Arc::new(EmrAppointmentGateway::new(&config));
        Self::with_gateway(config, gateway)
    }

    pub fn with_gateway(config: AppConfig, gateway: Arc<dyn AppointmentGateway>) -> Self {
        let subscribers = AppointmentSubscribers::default();
        let scheduling = AppointmentSchedulingService::new(
            gateway,
            subscribers.clone(),
            config.scheduling_timezone,
        );

        Self {
            config,
            scheduling,
            subscribers,
        }
    }
}

pub fn appointment_routes(state: Arc<AppointmentState>) -> Router {
    Router::new()
        .route("/", post(handlers::submit_appointment))
        .route("/occurrences", post(handlers::expand_occurrences))
        .route("/preview", post(handlers::preview_appointment))
        .route("/payload", post(handlers::build_appointment_payload))
        .route("/calendar", get(handlers::get_calendar))
        .route("/{appointment_uuid}/actions", get(handlers::get_available_actions))
        .route("/{appointment_uuid}/status", post(handlers::change_appointment_status))
        .route("/{appointment_uuid}/status/undo", post(handlers::undo_appointment_status))
        .with_state(state)
}
