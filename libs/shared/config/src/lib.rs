use std::env;
use chrono_tz::Tz;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub emr_base_url: String,
    pub emr_username: String,
    pub emr_password: String,
    pub scheduling_timezone: Tz,
    pub request_timeout_secs: u64,
    pub api_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            emr_base_url: env::var("EMR_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("EMR_BASE_URL not set, using empty value");
                    String::new()
                }),
            emr_username: env::var("EMR_USERNAME")
                .unwrap_or_else(|_| {
                    warn!("EMR_USERNAME not set, using empty value");
                    String::new()
                }),
            emr_password: env::var("EMR_PASSWORD")
                .unwrap_or_else(|_| {
                    warn!("EMR_PASSWORD not set, using empty value");
                    String::new()
                }),
            scheduling_timezone: env::var("SCHEDULING_TIMEZONE")
                .ok()
                .and_then(|name| match name.parse::<Tz>() {
                    Ok(tz) => Some(tz),
                    Err(_) => {
                        warn!("SCHEDULING_TIMEZONE '{}' is not a known zone, using UTC", name);
                        None
                    }
                })
                .unwrap_or(Tz::UTC),
            request_timeout_secs: parse_or_default("EMR_REQUEST_TIMEOUT_SECS", 30),
            api_port: parse_or_default("API_PORT", 3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing EMR environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.emr_base_url.is_empty()
            && !self.emr_username.is_empty()
            && !self.emr_password.is_empty()
    }

    /// Name of the zone used for local wall-clock times, as sent to the EMR.
    pub fn timezone_name(&self) -> &'static str {
        self.scheduling_timezone.name()
    }
}

fn parse_or_default<T: std::str::FromStr + std::fmt::Display + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
