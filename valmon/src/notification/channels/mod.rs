//! Delivery channels.
//!
//! A channel knows how to hand one alert to one recipient:
//! - SendGrid (e-mail and SMS gateway addresses)
//! - Generic webhooks (HTTP POST with a JSON body)

mod sendgrid;
mod webhook;

pub use sendgrid::{SendGridConfig, SendGridSender};
pub use webhook::{WebhookAuth, WebhookConfig, WebhookSender};

use async_trait::async_trait;

use crate::Result;

/// Single-recipient delivery contract.
#[async_trait]
pub trait Sender: Send + Sync {
    /// Get the channel type name.
    fn channel_type(&self) -> &'static str;

    /// Deliver `payload` with `memo` to one recipient.
    async fn send(&self, payload: &[u8], memo: &str, recipient: &str) -> Result<()>;
}
