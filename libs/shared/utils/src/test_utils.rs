use std::sync::Arc;
use chrono_tz::Tz;
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;

pub struct TestConfig {
    pub emr_base_url: String,
    pub emr_username: String,
    pub emr_password: String,
    pub scheduling_timezone: Tz,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            emr_base_url: "http://localhost:8080/openmrs".to_string(),
            emr_username: "test-user".to_string(),
            emr_password: "test-password".to_string(),
            scheduling_timezone: Tz::UTC,
        }
    }
}

impl TestConfig {
    /// Point the config at a mock EMR, e.g. a `wiremock::MockServer::uri()`.
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            emr_base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    pub fn in_timezone(mut self, tz: Tz) -> Self {
        self.scheduling_timezone = tz;
        self
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            emr_base_url: self.emr_base_url.clone(),
            emr_username: self.emr_username.clone(),
            emr_password: self.emr_password.clone(),
            scheduling_timezone: self.scheduling_timezone,
            request_timeout_secs: 5,
            api_port: 3000,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct MockEmrResponses;

impl MockEmrResponses {
    /// An appointment as returned by the appointment search. Times are wire-format strings.
    pub fn appointment_response(
        patient_uuid: &str,
        service_uuid: &str,
        start: &str,
        end: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "uuid": Uuid::new_v4().to_string(),
            "patientUuid": patient_uuid,
            "providers": [
                {
                    "uuid": "provider-1",
                    "name": "Dr. Test",
                    "response": "ACCEPTED"
                }
            ],
            "service": {
                "uuid": service_uuid,
                "name": "General Consultation"
            },
            "locationUuid": "location-1",
            "appointmentKind": "Scheduled",
            "startDateTime": start,
            "endDateTime": end,
            "comments": null,
            "status": status,
            "dateAppointmentScheduled": null,
            "allDay": false
        })
    }

    /// A service open 09:00 to 17:00 every day.
    pub fn service_response(service_uuid: &str) -> serde_json::Value {
        json!({
            "uuid": service_uuid,
            "name": "General Consultation",
            "startTime": "09:00:00",
            "endTime": "17:00:00",
            "weeklyAvailability": []
        })
    }

    pub fn service_with_weekly_availability(service_uuid: &str, days: &[(&str, &str, &str)]) -> serde_json::Value {
        let availability: Vec<serde_json::Value> = days
            .iter()
            .map(|(day, start, end)| json!({
                "dayOfWeek": day,
                "startTime": start,
                "endTime": end
            }))
            .collect();

        json!({
            "uuid": service_uuid,
            "name": "Physiotherapy",
            "startTime": null,
            "endTime": null,
            "weeklyAvailability": availability
        })
    }

    pub fn created_appointment_response(appointment_uuid: &str) -> serde_json::Value {
        json!({
            "uuid": appointment_uuid,
            "status": "Scheduled"
        })
    }

    pub fn created_series_response(appointment_uuids: &[&str]) -> serde_json::Value {
        let items: Vec<serde_json::Value> = appointment_uuids
            .iter()
            .map(|uuid| json!({ "appointmentDefaultResponse": { "uuid": uuid } }))
            .collect();
        json!(items)
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "error": {
                "message": message,
                "code": code
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.emr_base_url, "http://localhost:8080/openmrs");
        assert_eq!(app_config.scheduling_timezone, Tz::UTC);
        assert!(app_config.is_configured());
    }

    #[test]
    fn test_config_for_mock_server() {
        let tz: Tz = "Africa/Nairobi".parse().unwrap();
        let config = TestConfig::with_base_url("http://127.0.0.1:4010").in_timezone(tz);
        let app_config = config.to_app_config();

        assert_eq!(app_config.emr_base_url, "http://127.0.0.1:4010");
        assert_eq!(app_config.timezone_name(), "Africa/Nairobi");
    }

    #[test]
    fn test_series_response_wraps_each_uuid() {
        let response = MockEmrResponses::created_series_response(&["a", "b"]);
        let items = response.as_array().unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["appointmentDefaultResponse"]["uuid"], "b");
    }
}
