//! SendGrid mail channel.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::Sender;
use crate::utils::url::join_endpoint;
use crate::{Error, Result};

/// SendGrid integration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendGridConfig {
    /// API key, sent as a bearer token.
    #[serde(default)]
    pub api_key: String,
    /// Display name of the sender.
    #[serde(default = "default_from_name")]
    pub from_name: String,
    /// Sender address.
    #[serde(default = "default_from_address")]
    pub from_address: String,
    /// API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Prefix of every subject line.
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
}

fn default_from_name() -> String {
    "valmon".to_string()
}

fn default_from_address() -> String {
    "valmon@sendgrid.net".to_string()
}

fn default_api_url() -> String {
    "https://api.sendgrid.com".to_string()
}

fn default_subject_prefix() -> String {
    "Valmon Alert".to_string()
}

impl Default for SendGridConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            from_name: default_from_name(),
            from_address: default_from_address(),
            api_url: default_api_url(),
            subject_prefix: default_subject_prefix(),
        }
    }
}

/// Sends alerts through the SendGrid v3 mail API.
pub struct SendGridSender {
    config: SendGridConfig,
    client: Client,
}

impl SendGridSender {
    pub fn new(config: SendGridConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn build_subject(&self, memo: &str) -> String {
        format!("{}: {}", self.config.subject_prefix, memo)
    }

    fn build_message(&self, payload: &[u8], memo: &str, recipient: &str) -> serde_json::Value {
        json!({
            "personalizations": [{ "to": [{ "email": recipient }] }],
            "from": {
                "email": self.config.from_address,
                "name": self.config.from_name,
            },
            "subject": self.build_subject(memo),
            "content": [{
                "type": "text/html",
                "value": String::from_utf8_lossy(payload),
            }],
        })
    }
}

#[async_trait]
impl Sender for SendGridSender {
    fn channel_type(&self) -> &'static str {
        "sendgrid"
    }

    async fn send(&self, payload: &[u8], memo: &str, recipient: &str) -> Result<()> {
        let url = join_endpoint(&self.config.api_url, "/v3/mail/send");
        let message = self.build_message(payload, memo, recipient);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&message)
            .send()
            .await
            .map_err(|e| Error::Notification(format!("SendGrid request failed: {}", e)))?;

        // SendGrid acknowledges queued mail with 202 only.
        if response.status() != StatusCode::ACCEPTED {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%recipient, %status, "SendGrid rejected alert");
            return Err(Error::Notification(format!(
                "SendGrid failed: {} - {}",
                status, body
            )));
        }

        debug!(%recipient, memo, "SendGrid alert sent");
        Ok(())
    }
}
