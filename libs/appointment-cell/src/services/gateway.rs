// libs/appointment-cell/src/services/gateway.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::EmrClient;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, RecurringAppointmentPayload,
    ServiceDefinition, SingleAppointmentPayload, StatusChangePayload,
};
use crate::services::time_format;

/// Identities of the appointments the EMR created or updated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionReceipt {
    pub appointment_uuids: Vec<String>,
}

/// Read/write boundary to the system that stores appointments.
#[async_trait]
pub trait AppointmentGateway: Send + Sync {
    async fn fetch_appointments(
        &self,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    async fn fetch_service(&self, service_uuid: &str) -> Result<ServiceDefinition, AppointmentError>;

    async fn submit_appointment(&self, payload: &SingleAppointmentPayload) -> Result<SubmissionReceipt, AppointmentError>;

    async fn submit_recurring_appointments(
        &self,
        payload: &RecurringAppointmentPayload,
    ) -> Result<SubmissionReceipt, AppointmentError>;

    async fn submit_status_change(
        &self,
        appointment_uuid: &str,
        to_status: AppointmentStatus,
        timestamp: DateTime<Tz>,
        time_zone: &str,
    ) -> Result<(), AppointmentError>;

    async fn undo_status_change(&self, appointment_uuid: &str) -> Result<(), AppointmentError>;
}

/// [`AppointmentGateway`] over the EMR REST API.
///
/// Records whose interval is inverted in `tz` are dropped when fetched.
pub struct EmrAppointmentGateway {
    emr: Arc<EmrClient>,
    tz: Tz,
}

impl EmrAppointmentGateway {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            emr: Arc::new(EmrClient::new(config)),
            tz: config.scheduling_timezone,
        }
    }

    pub fn with_client(emr: Arc<EmrClient>, tz: Tz) -> Self {
        Self { emr, tz }
    }
}

#[async_trait]
impl AppointmentGateway for EmrAppointmentGateway {
    async fn fetch_appointments(
        &self,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Fetching appointments from {} to {}", range_start, range_end);

        let body = json!({
            "startDate": time_format::format_wire(&range_start),
            "endDate": time_format::format_wire(&range_end),
        });

        let result: Vec<Value> = self.emr
            .request(Method::POST, "/ws/rest/v1/appointments/search", Some(body))
            .await?;

        let appointments: Vec<Appointment> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| AppointmentError::Transport(format!("Failed to parse appointments: {}", e)))?;

        let (valid, invalid): (Vec<Appointment>, Vec<Appointment>) = appointments
            .into_iter()
            .partition(|appointment| appointment.has_valid_interval(&self.tz));

        for appointment in &invalid {
            warn!(
                "Dropping appointment {} with end {} before start {}",
                appointment.uuid, appointment.end_date_time, appointment.start_date_time
            );
        }

        Ok(valid)
    }

    async fn fetch_service(&self, service_uuid: &str) -> Result<ServiceDefinition, AppointmentError> {
        let path = format!("/ws/rest/v1/appointmentService?uuid={}", urlencoding::encode(service_uuid));

        let result: Value = self.emr.request(Method::GET, &path, None).await?;

        serde_json::from_value(result)
            .map_err(|e| AppointmentError::Transport(format!("Failed to parse service {}: {}", service_uuid, e)))
    }

    async fn submit_appointment(&self, payload: &SingleAppointmentPayload) -> Result<SubmissionReceipt, AppointmentError> {
        let body = serde_json::to_value(payload)
            .map_err(|e| AppointmentError::Validation(format!("Failed to serialize appointment: {}", e)))?;

        let result: Value = self.emr
            .request(Method::POST, "/ws/rest/v1/appointment", Some(body))
            .await?;

        let receipt = receipt_from(&result);
        info!("EMR accepted appointment(s) {:?}", receipt.appointment_uuids);
        Ok(receipt)
    }

    async fn submit_recurring_appointments(
        &self,
        payload: &RecurringAppointmentPayload,
    ) -> Result<SubmissionReceipt, AppointmentError> {
        let body = serde_json::to_value(payload)
            .map_err(|e| AppointmentError::Validation(format!("Failed to serialize recurring appointment: {}", e)))?;

        let result: Value = self.emr
            .request(Method::POST, "/ws/rest/v1/recurring-appointments", Some(body))
            .await?;

        let receipt = receipt_from(&result);
        info!("EMR accepted recurring series with {} appointments", receipt.appointment_uuids.len());
        Ok(receipt)
    }

    async fn submit_status_change(
        &self,
        appointment_uuid: &str,
        to_status: AppointmentStatus,
        timestamp: DateTime<Tz>,
        time_zone: &str,
    ) -> Result<(), AppointmentError> {
        let payload = StatusChangePayload {
            to_status,
            on_date: time_format::format_wire(&timestamp),
            time_zone: time_zone.to_string(),
        };
        let body = serde_json::to_value(&payload)
            .map_err(|e| AppointmentError::Validation(format!("Failed to serialize status change: {}", e)))?;

        let path = format!("/ws/rest/v1/appointments/{}/status-change", urlencoding::encode(appointment_uuid));
        let _: Value = self.emr.request(Method::POST, &path, Some(body)).await?;

        Ok(())
    }

    async fn undo_status_change(&self, appointment_uuid: &str) -> Result<(), AppointmentError> {
        let path = format!("/ws/rest/v1/appointments/{}/undo-status-change", urlencoding::encode(appointment_uuid));
        let _: Value = self.emr.request(Method::POST, &path, None).await?;

        Ok(())
    }
}

// Single submissions answer with the appointment, series with a list of them.
fn receipt_from(body: &Value) -> SubmissionReceipt {
    let uuid_of = |item: &Value| {
        item.get("uuid")
            .or_else(|| item.get("appointmentDefaultResponse").and_then(|inner| inner.get("uuid")))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    let appointment_uuids = match body {
        Value::Array(items) => items.iter().filter_map(uuid_of).collect(),
        other => uuid_of(other).into_iter().collect(),
    };

    SubmissionReceipt { appointment_uuids }
}
