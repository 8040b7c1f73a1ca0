//! Alert fan-out to the configured notification channels.
//!
//! Channels are independent transports: a failure on one is recorded and
//! logged but never prevents delivery attempts on the others, and nothing
//! here propagates an error to the caller.

use std::fmt;
use std::time::Duration;

use lettre::message::{Mailbox, Mailboxes, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use reqwest::Client;
use serde_json::json;
use tracing::{error, info, instrument};

use crate::config::{ChannelConfig, EmailChannel, WebhookChannel};

/// Upper bound for one delivery attempt, per channel. A hung endpoint must
/// not stall the scheduler.
const CHANNEL_TIMEOUT: Duration = Duration::from_secs(10);

const EMAIL_SUBJECT: &str = "Vigil Host Alert";

/// Port that speaks TLS from the first byte; every other port upgrades via
/// STARTTLS before authenticating.
const SMTPS_PORT: u16 = 465;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Webhook,
    Email,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Webhook => write!(f, "webhook"),
            ChannelKind::Email => write!(f, "email"),
        }
    }
}

/// One delivery attempt and its outcome.
#[derive(Debug)]
pub struct ChannelAttempt {
    pub channel: ChannelKind,
    pub outcome: Result<(), DeliveryError>,
}

/// Aggregated outcome of one dispatch across all enabled channels.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub attempts: Vec<ChannelAttempt>,
}

impl DispatchReport {
    pub fn delivered(&self) -> usize {
        self.attempts
            .iter()
            .filter(|attempt| attempt.outcome.is_ok())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.attempts.len() - self.delivered()
    }
}

pub struct AlertDispatcher {
    client: Client,
    channels: ChannelConfig,
    host_label: String,
}

impl AlertDispatcher {
    pub fn new(channels: ChannelConfig, host_label: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(CHANNEL_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            channels,
            host_label,
        }
    }

    /// Send one alert message to every enabled channel, webhook first.
    ///
    /// No retries within a dispatch: the next breached tick is the retry
    /// vector.
    #[instrument(skip_all)]
    pub async fn dispatch(&self, message: &str) -> DispatchReport {
        let mut report = DispatchReport::default();

        if let Some(webhook) = &self.channels.webhook {
            let outcome = self.send_webhook(webhook, message).await;
            match &outcome {
                Ok(()) => info!("webhook alert sent"),
                Err(e) => error!("webhook alert failed: {e}"),
            }
            report.attempts.push(ChannelAttempt {
                channel: ChannelKind::Webhook,
                outcome,
            });
        }

        if let Some(email) = &self.channels.email {
            let outcome = self.send_email(email, message).await;
            match &outcome {
                Ok(()) => info!("email alert sent to {} recipient(s)", email.recipients.len()),
                Err(e) => error!("email alert failed: {e}"),
            }
            report.attempts.push(ChannelAttempt {
                channel: ChannelKind::Email,
                outcome,
            });
        }

        report
    }

    async fn send_webhook(
        &self,
        webhook: &WebhookChannel,
        message: &str,
    ) -> Result<(), DeliveryError> {
        let payload = json!({ "text": message });

        let response = self
            .client
            .post(&webhook.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DeliveryError::Status(response.status().as_u16()));
        }

        Ok(())
    }

    async fn send_email(&self, email: &EmailChannel, message: &str) -> Result<(), DeliveryError> {
        let from: Mailbox = email
            .user
            .parse()
            .map_err(|e| DeliveryError::Address(format!("{}: {e}", email.user)))?;

        let mut recipients = Mailboxes::new();
        for recipient in &email.recipients {
            let to: Mailbox = recipient
                .parse()
                .map_err(|e| DeliveryError::Address(format!("{recipient}: {e}")))?;
            recipients.push(to);
        }

        // Repeated `.to()` calls replace the To header, keeping only the
        // last recipient; the whole list must go into one header.
        let mail = Message::builder()
            .from(from)
            .mailbox(header::To::from(recipients))
            .subject(format!("{EMAIL_SUBJECT}: {}", self.host_label))
            .body(message.to_string())
            .map_err(|e| DeliveryError::Message(e.to_string()))?;

        let transport = if email.port == SMTPS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&email.server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&email.server)
        }
        .map_err(|e| DeliveryError::Smtp(e.to_string()))?
        .port(email.port)
        .credentials(Credentials::new(email.user.clone(), email.pass.clone()))
        .timeout(Some(CHANNEL_TIMEOUT))
        .build();

        transport
            .send(mail)
            .await
            .map_err(|e| DeliveryError::Smtp(e.to_string()))?;

        Ok(())
    }
}

/// A single channel's delivery failure. Contained within the dispatcher.
#[derive(Debug)]
pub enum DeliveryError {
    /// Webhook request could not be sent (connect, DNS, timeout)
    Request(String),

    /// Webhook endpoint answered with a non-2xx status
    Status(u16),

    /// A configured mail address did not parse
    Address(String),

    /// The mail message could not be assembled
    Message(String),

    /// SMTP connection, upgrade, authentication, or protocol failure
    Smtp(String),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::Request(msg) => write!(f, "webhook request failed: {}", msg),
            DeliveryError::Status(code) => {
                write!(f, "webhook endpoint returned status {}", code)
            }
            DeliveryError::Address(msg) => write!(f, "invalid mail address: {}", msg),
            DeliveryError::Message(msg) => write!(f, "failed to build mail message: {}", msg),
            DeliveryError::Smtp(msg) => write!(f, "SMTP delivery failed: {}", msg),
        }
    }
}

impl std::error::Error for DeliveryError {}
