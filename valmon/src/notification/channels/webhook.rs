//! Generic webhook channel.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::{Client, header::HeaderMap};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::Sender;
use crate::{Error, Result};

/// Webhook channel configuration, shared by every configured webhook target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// HTTP method (default: POST).
    #[serde(default = "default_method")]
    pub method: String,
    /// Custom headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Authentication type.
    #[serde(default)]
    pub auth: Option<WebhookAuth>,
}

fn default_method() -> String {
    "POST".to_string()
}

/// Webhook authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WebhookAuth {
    /// Bearer token authentication.
    Bearer { token: String },
    /// Basic authentication.
    Basic { username: String, password: String },
    /// Custom header authentication.
    Header { name: String, value: String },
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
            headers: BTreeMap::new(),
            auth: None,
        }
    }
}

/// Posts alerts as JSON documents to webhook URLs.
pub struct WebhookSender {
    config: WebhookConfig,
    client: Client,
}

impl WebhookSender {
    pub fn new(config: WebhookConfig, client: Client) -> Self {
        Self { config, client }
    }

    /// Build the request headers.
    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        for (name, value) in &self.config.headers {
            if let (Ok(name), Ok(value)) = (
                name.parse::<reqwest::header::HeaderName>(),
                value.parse::<reqwest::header::HeaderValue>(),
            ) {
                headers.insert(name, value);
            }
        }

        match &self.config.auth {
            Some(WebhookAuth::Bearer { token }) => {
                if let Ok(value) = format!("Bearer {}", token).parse() {
                    headers.insert(reqwest::header::AUTHORIZATION, value);
                }
            }
            Some(WebhookAuth::Header { name, value }) => {
                if let (Ok(name), Ok(value)) = (
                    name.parse::<reqwest::header::HeaderName>(),
                    value.parse::<reqwest::header::HeaderValue>(),
                ) {
                    headers.insert(name, value);
                }
            }
            // Basic auth is applied on the request builder.
            Some(WebhookAuth::Basic { .. }) | None => {}
        }

        headers
    }

    /// Build the JSON body. Payloads that are JSON are embedded as is.
    fn build_payload(&self, payload: &[u8], memo: &str) -> serde_json::Value {
        let payload = serde_json::from_slice::<serde_json::Value>(payload)
            .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(payload).into()));

        json!({
            "memo": memo,
            "payload": payload,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })
    }
}

#[async_trait]
impl Sender for WebhookSender {
    fn channel_type(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, payload: &[u8], memo: &str, recipient: &str) -> Result<()> {
        let body = self.build_payload(payload, memo);

        let mut request = match self.config.method.to_uppercase().as_str() {
            "PUT" => self.client.put(recipient),
            _ => self.client.post(recipient),
        };
        request = request.headers(self.build_headers()).json(&body);

        if let Some(WebhookAuth::Basic { username, password }) = &self.config.auth {
            request = request.basic_auth(username, Some(password));
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Notification(format!("Webhook request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%recipient, %status, "Webhook rejected alert");
            return Err(Error::Notification(format!(
                "Webhook failed: {} - {}",
                status, body
            )));
        }

        debug!(%recipient, memo, "Webhook alert sent");
        Ok(())
    }
}
