//! Mail relay for order notifications.
//!
//! Supports three modes:
//! 1. Send via Resend API (when an API key is configured)
//! 2. POST the message to a webhook URL (for DIY delivery)
//! 3. Disabled (no email sent, log only)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of attempting to send an email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailSendResult {
    /// Email was sent successfully via Resend
    Sent,
    /// Message was POSTed to the configured webhook URL
    WebhookCalled,
    /// No API key or webhook configured
    NoApiKey,
}

/// A fully rendered email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<EmailSendResult>;
}

/// Resend API request body.
#[derive(Debug, Serialize)]
struct ResendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    text: &'a str,
    html: &'a str,
}

/// Resend API response.
#[derive(Debug, Deserialize)]
struct ResendEmailResponse {
    id: String,
}

/// Webhook payload sent when a relay URL is configured.
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    event: &'static str,
    from: &'a str,
    #[serde(flatten)]
    message: &'a EmailMessage,
}

/// Email service using the Resend API or a relay webhook.
#[derive(Clone)]
pub struct EmailService {
    api_key: Option<String>,
    /// "From" header, e.g. `Storefront <orders@shop.ch>`
    from: String,
    webhook_url: Option<String>,
    http_client: Client,
}

impl EmailService {
    pub fn new(
        api_key: Option<String>,
        from: String,
        webhook_url: Option<String>,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("Email HTTP client: {}", e)))?;
        Ok(Self {
            api_key,
            from,
            webhook_url,
            http_client,
        })
    }

    /// Send email via Resend API.
    async fn send_via_resend(&self, api_key: &str, message: &EmailMessage) -> Result<EmailSendResult> {
        let request = ResendEmailRequest {
            from: &self.from,
            to: vec![&message.to],
            subject: &message.subject,
            text: &message.text,
            html: &message.html,
        };

        let response = self
            .http_client
            .post(RESEND_API_URL)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to send request to Resend API");
                AppError::Notification(format!("Email service error: {}", e))
            })?;

        if response.status().is_success() {
            let result: ResendEmailResponse = response.json().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to parse Resend API response");
                AppError::Notification("Email service response error".into())
            })?;

            tracing::info!(
                to = %message.to,
                email_id = %result.id,
                subject = %message.subject,
                "Email sent via Resend"
            );
            Ok(EmailSendResult::Sent)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Resend API returned error");
            Err(AppError::Notification(format!(
                "Email service error: {} - {}",
                status, body
            )))
        }
    }

    /// POST the message to the relay webhook.
    async fn call_webhook(&self, webhook_url: &str, message: &EmailMessage) -> Result<EmailSendResult> {
        let payload = WebhookPayload {
            event: "email",
            from: &self.from,
            message,
        };

        let response = self
            .http_client
            .post(webhook_url)
            .header("X-Storefront-Event", "email")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, webhook_url = %webhook_url, "Failed to call email webhook");
                AppError::Notification(format!("Webhook call failed: {}", e))
            })?;

        if response.status().is_success() {
            tracing::info!(
                to = %message.to,
                webhook_url = %webhook_url,
                "Email webhook called successfully"
            );
            Ok(EmailSendResult::WebhookCalled)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %body,
                webhook_url = %webhook_url,
                "Email webhook returned error"
            );
            Err(AppError::Notification(format!(
                "Email webhook error: {} - {}",
                status, body
            )))
        }
    }
}

#[async_trait]
impl Mailer for EmailService {
    /// Resolution order: relay webhook, then Resend, then skip.
    async fn send(&self, message: &EmailMessage) -> Result<EmailSendResult> {
        if let Some(webhook_url) = &self.webhook_url {
            return self.call_webhook(webhook_url, message).await;
        }

        let Some(api_key) = &self.api_key else {
            tracing::warn!(
                to = %message.to,
                subject = %message.subject,
                "No Resend API key or email webhook configured, skipping email"
            );
            return Ok(EmailSendResult::NoApiKey);
        };

        self.send_via_resend(api_key, message).await
    }
}
