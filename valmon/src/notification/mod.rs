//! Notification module.
//!
//! A [`Notifier`] delivers one alert (payload and memo) to every recipient it
//! was configured with. Notifiers are independent of each other: the
//! scheduler invokes all of them for each novel observation and records each
//! outcome separately.
//!
//! [`RecipientNotifier`] pairs a recipient list with a channel [`Sender`] and
//! stops at the first recipient that fails.

pub mod channels;

pub use channels::{SendGridConfig, SendGridSender, Sender, WebhookConfig, WebhookSender};

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::Result;
use crate::config::AppConfig;

/// Notifier name of the SendGrid e-mail/SMS channel.
pub const SENDGRID_NOTIFIER: &str = "SendGrid";

/// Notifier name of the webhook channel.
pub const WEBHOOK_NOTIFIER: &str = "Webhook";

/// Alert delivery contract.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Stable name reported in cycle summaries.
    fn name(&self) -> &str;

    /// Deliver `payload` with `memo` to every recipient.
    async fn alert(&self, payload: &[u8], memo: &str) -> Result<()>;
}

/// Notifier iterating a fixed recipient list through a [`Sender`].
pub struct RecipientNotifier<S> {
    name: String,
    sender: S,
    recipients: Vec<String>,
}

impl<S: Sender> RecipientNotifier<S> {
    pub fn new(name: impl Into<String>, sender: S, recipients: Vec<String>) -> Self {
        Self {
            name: name.into(),
            sender,
            recipients,
        }
    }
}

#[async_trait]
impl<S: Sender> Notifier for RecipientNotifier<S> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn alert(&self, payload: &[u8], memo: &str) -> Result<()> {
        for recipient in &self.recipients {
            if let Err(e) = self.sender.send(payload, memo, recipient).await {
                warn!(
                    notifier = %self.name,
                    channel = self.sender.channel_type(),
                    %recipient,
                    memo,
                    error = %e,
                    "Failed to deliver alert"
                );
                return Err(e);
            }
            debug!(notifier = %self.name, %recipient, memo, "Delivered alert");
        }
        Ok(())
    }
}

/// Build the notifiers configured by `config`.
///
/// SendGrid receives e-mail and SMS-gateway recipients; webhook targets get
/// their own notifier. Channels without recipients are not created.
pub fn create_notifiers(config: &AppConfig, client: &Client) -> Vec<Arc<dyn Notifier>> {
    let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();
    let targets = &config.targets;

    let sendgrid_recipients: Vec<String> = targets
        .email_recipients
        .iter()
        .chain(targets.sms_recipients.iter())
        .cloned()
        .collect();
    if !sendgrid_recipients.is_empty() {
        let sender = SendGridSender::new(config.integrations.sendgrid.clone(), client.clone());
        notifiers.push(Arc::new(RecipientNotifier::new(
            SENDGRID_NOTIFIER,
            sender,
            sendgrid_recipients,
        )));
    }

    if !targets.webhooks.is_empty() {
        let sender = WebhookSender::new(config.integrations.webhook.clone(), client.clone());
        notifiers.push(Arc::new(RecipientNotifier::new(
            WEBHOOK_NOTIFIER,
            sender,
            targets.webhooks.clone(),
        )));
    }

    notifiers
}
