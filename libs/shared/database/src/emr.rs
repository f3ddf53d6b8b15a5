use std::time::Duration;

use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE},
    Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

use shared_config::AppConfig;

#[derive(Error, Debug)]
pub enum EmrClientError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("EMR API error ({status}): {body}")]
    Status { status: StatusCode, body: String },

    /// The server answered with a success status but no body.
    #[error("No Content")]
    NoContent,

    #[error("Failed to decode EMR response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for EmrClientError {
    fn from(err: reqwest::Error) -> Self {
        EmrClientError::Transport(err.to_string())
    }
}

/// REST client for the remote EMR appointments API.
pub struct EmrClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl EmrClient {
    pub fn new(config: &AppConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build EMR HTTP client with timeout ({}), using defaults", e);
                Client::new()
            });

        Self {
            client,
            base_url: config.emr_base_url.trim_end_matches('/').to_string(),
            username: config.emr_username.clone(),
            password: config.emr_password.clone(),
        }
    }

    fn get_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Send a request and decode the JSON body.
    ///
    /// An empty body on a success status is reported as [`EmrClientError::NoContent`],
    /// distinct from a transport failure.
    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T, EmrClientError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut req = self.client.request(method, &url)
            .headers(self.get_headers());

        if !self.username.is_empty() {
            req = req.basic_auth(&self.username, Some(&self.password));
        }

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            error!("EMR API error ({}): {}", status, text);
            return Err(EmrClientError::Status { status, body: text });
        }

        if text.trim().is_empty() {
            warn!("EMR API returned {} with an empty body for {}", status, url);
            return Err(EmrClientError::NoContent);
        }

        serde_json::from_str(&text).map_err(|e| EmrClientError::Decode(e.to_string()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> EmrClient {
        let config = AppConfig {
            emr_base_url: server.uri(),
            emr_username: "admin".to_string(),
            emr_password: "Admin123".to_string(),
            scheduling_timezone: chrono_tz::Tz::UTC,
            request_timeout_secs: 5,
            api_port: 3000,
        };
        EmrClient::new(&config)
    }

    #[tokio::test]
    async fn test_request_decodes_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ws/rest/v1/appointments"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"uuid": "a-1"}])))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let body: Vec<Value> = client.request(Method::GET, "/ws/rest/v1/appointments", None).await.unwrap();

        assert_eq!(body.len(), 1);
        assert_eq!(body[0]["uuid"], "a-1");
    }

    #[tokio::test]
    async fn test_empty_success_body_is_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ws/rest/v1/appointments"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result: Result<Value, _> = client
            .request(Method::POST, "/ws/rest/v1/appointments", Some(json!({})))
            .await;

        assert_matches!(result, Err(EmrClientError::NoContent));
    }

    #[tokio::test]
    async fn test_server_error_keeps_status_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ws/rest/v1/appointments"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result: Result<Value, _> = client
            .request(Method::POST, "/ws/rest/v1/appointments", Some(json!({})))
            .await;

        assert_matches!(result, Err(EmrClientError::Status { status, body }) => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body, "boom");
        });
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let config = AppConfig {
            emr_base_url: "http://127.0.0.1:9".to_string(),
            emr_username: String::new(),
            emr_password: String::new(),
            scheduling_timezone: chrono_tz::Tz::UTC,
            request_timeout_secs: 2,
            api_port: 3000,
        };
        let client = EmrClient::new(&config);
        let result: Result<Value, _> = client.request(Method::GET, "/ws/rest/v1/appointments", None).await;

        assert_matches!(result, Err(EmrClientError::Transport(_)));
    }
}
