//! Outbound Devin AI API client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Errors from the Devin API.
#[derive(Debug, Error)]
pub enum DevinError {
    #[error("Devin API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Devin API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Devin API response missing {0}")]
    MissingField(&'static str),
}

/// A session created in Devin for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevinSession {
    pub session_id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// The part of the Devin API the factory uses.
#[async_trait]
pub trait DevinApi: Send + Sync {
    /// Start a Devin session working on `prompt`.
    async fn create_session(&self, prompt: &str) -> Result<DevinSession, DevinError>;
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    prompt: &'a str,
    idempotent: bool,
}

/// HTTP client for the Devin REST API.
pub struct HttpDevinClient {
    inner: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpDevinClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DevinError> {
        let inner = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            inner,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl DevinApi for HttpDevinClient {
    async fn create_session(&self, prompt: &str) -> Result<DevinSession, DevinError> {
        let url = format!("{}/sessions", self.base_url);
        debug!(url = %url, "POST request");

        let response = self
            .inner
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&CreateSessionRequest {
                prompt,
                idempotent: true,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DevinError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: DevinSession = response.json().await?;
        if session.session_id.is_empty() {
            return Err(DevinError::MissingField("session_id"));
        }
        info!(session_id = %session.session_id, "Devin session created");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_response_shape() {
        let session: DevinSession = serde_json::from_str(
            r#"{"session_id": "devin-123", "url": "https://app.devin.ai/sessions/123", "is_new_session": true}"#,
        )
        .unwrap();
        assert_eq!(session.session_id, "devin-123");
        assert_eq!(
            session.url.as_deref(),
            Some("https://app.devin.ai/sessions/123")
        );
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let client =
            HttpDevinClient::new("https://api.devin.ai/v1/", "key", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url, "https://api.devin.ai/v1");
    }
}
