//! NASA APOD API client
//!
//! This module fetches a single day's entry from the Astronomy Picture of the
//! Day API, and the media an entry points to, behind the [`PictureSource`]
//! trait so the store can be driven by another transport in tests.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use super::thumbnail::ThumbnailError;
use super::Picture;
use crate::config::{Config, DATE_FORMAT};

/// Timeout applied to every request made by [`ApodClient`]
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while fetching and persisting one day
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed (network, timeout or non-2xx status)
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body is not valid JSON, or not a picture record
    #[error("Could not decode response as JSON: {0}")]
    Decode(#[from] serde_json::Error),

    /// The provider answered with an `error` field
    #[error("Provider error: {0}")]
    Provider(String),

    /// An image entry did not say where the image lives
    #[error("Image entry has no url")]
    MissingMediaUrl,

    /// Writing a file into the store failed
    #[error("Failed to write {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The thumbnail could not be produced
    #[error("Thumbnail generation failed: {0}")]
    Thumbnail(#[from] ThumbnailError),
}

/// Where pictures come from
///
/// `fetch_day` returns the raw response body so the store can persist it
/// byte-for-byte; decoding happens in [`parse_picture`].
#[async_trait]
pub trait PictureSource: Send + Sync {
    /// Fetch the raw API response body for one date
    async fn fetch_day(&self, date: NaiveDate) -> Result<String, FetchError>;

    /// Fetch the media at `url` (used for thumbnails)
    async fn fetch_media(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Client for the APOD API
#[derive(Debug, Clone)]
pub struct ApodClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl ApodClient {
    /// Create a client for the given endpoint and API key
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|error| {
                warn!(%error, "Failed to build HTTP client with timeout, using defaults");
                Client::new()
            });

        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// Create a client using the endpoint and key from `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.endpoint.clone(), config.api_key.clone())
    }

    /// Replace the underlying HTTP client
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl PictureSource for ApodClient {
    async fn fetch_day(&self, date: NaiveDate) -> Result<String, FetchError> {
        let date = date.format(DATE_FORMAT).to_string();

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("date", date.as_str()),
                ("concept_tags", "true"),
            ])
            .send()
            .await?
            .error_for_status()?;

        Ok(response.text().await?)
    }

    async fn fetch_media(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Decode a raw API response body into a [`Picture`]
///
/// # Returns
/// * `Ok(Picture)` for a well-formed record
/// * `Err(FetchError::Decode)` if the body is not JSON or lacks `media_type`
/// * `Err(FetchError::Provider)` if the body carries an `error` field
pub fn parse_picture(body: &str) -> Result<Picture, FetchError> {
    let value: Value = serde_json::from_str(body)?;

    if let Some(error) = value.get("error") {
        return Err(FetchError::Provider(provider_message(error)));
    }

    Ok(serde_json::from_value(value)?)
}

/// Extract a human-readable message from the provider's `error` field
///
/// The field is usually a plain string, but api.nasa.gov reports key problems
/// as `{"code": ..., "message": ...}`.
fn provider_message(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        Value::Object(fields) => fields
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MediaType;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const IMAGE_BODY: &str = r#"{"date":"2024-01-02","media_type":"image","title":"Orion","url":"https://apod.nasa.gov/apod/image/2401/orion.jpg"}"#;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_valid_response() {
        let picture = parse_picture(IMAGE_BODY).expect("valid body");
        assert_eq!(picture.media_type, MediaType::Image);
        assert_eq!(picture.title(), Some("Orion"));
    }

    #[test]
    fn test_parse_malformed_json() {
        let result = parse_picture("<html>Service Unavailable</html>");
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[test]
    fn test_parse_provider_error_string() {
        let result = parse_picture(r#"{"error": "No data available for date: 2024-01-02"}"#);
        match result {
            Err(FetchError::Provider(message)) => {
                assert_eq!(message, "No data available for date: 2024-01-02")
            }
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_provider_error_object() {
        let body = r#"{"error": {"code": "API_KEY_INVALID", "message": "An invalid api_key was supplied."}}"#;
        match parse_picture(body) {
            Err(FetchError::Provider(message)) => {
                assert_eq!(message, "An invalid api_key was supplied.")
            }
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_missing_media_type() {
        let result = parse_picture(r#"{"title": "No kind"}"#);
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[tokio::test]
    async fn test_fetch_day_sends_expected_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/planetary/apod"))
            .and(query_param("api_key", "TEST_KEY"))
            .and(query_param("date", "2024-01-02"))
            .and(query_param("concept_tags", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_string(IMAGE_BODY))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApodClient::new(format!("{}/planetary/apod", server.uri()), "TEST_KEY");
        let body = client
            .fetch_day(date(2024, 1, 2))
            .await
            .expect("fetch should succeed");

        assert_eq!(body, IMAGE_BODY);
    }

    #[tokio::test]
    async fn test_fetch_day_non_success_status_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/planetary/apod"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = ApodClient::new(format!("{}/planetary/apod", server.uri()), "TEST_KEY");
        let result = client.fetch_day(date(2024, 1, 2)).await;

        assert!(matches!(result, Err(FetchError::Transport(_))));
    }

    #[tokio::test]
    async fn test_fetch_media_returns_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/image/orion.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1_u8, 2, 3]))
            .mount(&server)
            .await;

        let client = ApodClient::new(server.uri(), "TEST_KEY");
        let bytes = client
            .fetch_media(&format!("{}/image/orion.jpg", server.uri()))
            .await
            .expect("media fetch");

        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_fetch_media_not_found() {
        let server = MockServer::start().await;
        let client = ApodClient::new(server.uri(), "TEST_KEY");

        let result = client
            .fetch_media(&format!("{}/missing.jpg", server.uri()))
            .await;

        assert!(matches!(result, Err(FetchError::Transport(_))));
    }
}
