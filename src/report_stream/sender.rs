//! # ReportStream Sender
//!
//! Submits one HL7 report per call: exchanges a signed client assertion for
//! a bearer token, then posts the report to the `waters` endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use tracing::{debug, info, instrument, warn};

use super::errors::{SendError, SendResult};
use super::responses::{Report, ReportStreamToken};
use super::token::sign_client_assertion;
use super::ReportSender;
use crate::secrets::SecretStore;

const TOKEN_PATH: &str = "/api/token";
const WATERS_PATH: &str = "/api/waters";
const HL7_CONTENT_TYPE: &str = "application/hl7-v2";
const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

#[derive(Debug, Clone)]
pub struct ReportStreamSenderConfig {
    pub base_url: String,
    pub client_name: String,
    pub scope: String,
    pub environment: String,
    /// Name of the secret holding the RSA signing key
    pub private_key_secret: String,
    pub request_timeout: Duration,
}

pub struct ReportStreamSender {
    client: Client,
    config: ReportStreamSenderConfig,
    secrets: Arc<dyn SecretStore>,
}

impl std::fmt::Debug for ReportStreamSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportStreamSender")
            .field("base_url", &self.config.base_url)
            .field("client_name", &self.config.client_name)
            .finish()
    }
}

impl ReportStreamSender {
    pub fn new(config: ReportStreamSenderConfig, secrets: Arc<dyn SecretStore>) -> SendResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            config,
            secrets,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_token(&self) -> SendResult<String> {
        let private_key = self
            .secrets
            .get_secret(&self.config.private_key_secret)
            .await
            .map_err(|e| SendError::token(e.to_string()))?;

        let assertion = sign_client_assertion(
            &self.config.client_name,
            &self.config.environment,
            &private_key,
        )?;

        let form = [
            ("scope", self.config.scope.as_str()),
            ("grant_type", "client_credentials"),
            ("client_assertion_type", CLIENT_ASSERTION_TYPE),
            ("client_assertion", assertion.as_str()),
        ];

        let response = self
            .client
            .post(self.url(TOKEN_PATH))
            .form(&form)
            .send()
            .await
            .map_err(|e| SendError::token(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SendError::token(e.to_string()))?;

        if status != StatusCode::OK {
            warn!(status = status.as_u16(), response_body = %body, "Token request rejected");
            return Err(SendError::token(format!("token endpoint returned {status}")));
        }

        let token: ReportStreamToken =
            serde_json::from_str(&body).map_err(|e| SendError::decode(e.to_string()))?;

        debug!(scope = %token.scope, expires_in = token.expires_in, "Obtained access token");
        Ok(token.access_token)
    }
}

#[async_trait]
impl ReportSender for ReportStreamSender {
    #[instrument(skip(self, contents), fields(bytes = contents.len()))]
    async fn send_report(&self, contents: &[u8]) -> SendResult<String> {
        let token = self.get_token().await?;

        let response = self
            .client
            .post(self.url(WATERS_PATH))
            .header(header::CONTENT_TYPE, HL7_CONTENT_TYPE)
            .header("client", &self.config.client_name)
            .bearer_auth(token)
            .body(contents.to_vec())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.as_u16() >= 300 {
            warn!(status = status.as_u16(), response_body = %body, "ReportStream rejected report");
            return Err(SendError::from_status(status.as_u16(), body));
        }

        let report: Report =
            serde_json::from_str(&body).map_err(|e| SendError::decode(e.to_string()))?;

        info!(report_id = %report.report_id, "Report accepted by ReportStream");
        Ok(report.report_id)
    }

    fn sender_name(&self) -> &'static str {
        "report_stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::InMemorySecretStore;

    fn config(base_url: &str) -> ReportStreamSenderConfig {
        ReportStreamSenderConfig {
            base_url: base_url.to_string(),
            client_name: "flexion.simulated-lab".to_string(),
            scope: "flexion.*.report".to_string(),
            environment: "local".to_string(),
            private_key_secret: "ca-phl-reportstream-private-key-local".to_string(),
            request_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let sender = ReportStreamSender::new(
            config("http://localhost:7071/"),
            Arc::new(InMemorySecretStore::new()),
        )
        .unwrap();

        assert_eq!(sender.url(WATERS_PATH), "http://localhost:7071/api/waters");
    }

    #[tokio::test]
    async fn test_missing_key_is_a_retryable_token_error() {
        let sender = ReportStreamSender::new(
            config("http://localhost:7071"),
            Arc::new(InMemorySecretStore::new()),
        )
        .unwrap();

        let err = sender.send_report(b"MSH|").await.unwrap_err();

        assert!(matches!(err, SendError::Token { .. }));
        assert!(!err.is_non_transient());
    }
}
