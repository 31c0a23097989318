use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};

use super::{CheckoutRequest, CheckoutSession, PaymentGateway, SessionDetails, SessionLineItem};

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Signatures older than this are rejected to prevent replays.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct CreateSessionResponse {
    id: String,
    url: Option<String>,
    success_url: Option<String>,
    cancel_url: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RetrievedSession {
    id: String,
    status: Option<String>,
    payment_status: String,
    amount_total: Option<i64>,
    currency: Option<String>,
    customer_email: Option<String>,
    customer_details: Option<StripeCustomerDetails>,
    created: i64,
    line_items: Option<StripeList<StripeLineItem>>,
}

#[derive(Debug, Deserialize)]
struct StripeList<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct StripeLineItem {
    description: Option<String>,
    quantity: Option<i64>,
    amount_total: i64,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    api_base: String,
    secret_key: Option<String>,
}

impl StripeClient {
    pub fn new(api_base: &str, secret_key: Option<String>) -> Result<Self> {
        let client = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key,
        })
    }

    /// URL of one checkout session. Ids must look like `cs_<alphanumerics>`.
    fn session_url(&self, session_id: &str) -> Result<String> {
        let well_formed = session_id.strip_prefix("cs_").is_some_and(|rest| {
            !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
        if !well_formed {
            return Err(AppError::BadRequest("Invalid checkout session id".into()));
        }
        Ok(format!("{}/v1/checkout/sessions/{}", self.api_base, session_id))
    }

    fn secret_key(&self) -> Result<&str> {
        self.secret_key
            .as_deref()
            .ok_or_else(|| AppError::PaymentProvider("STRIPE_SECRET_KEY is not configured".into()))
    }

    async fn error_from_response(response: reqwest::Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<StripeErrorResponse>(&body)
            .ok()
            .and_then(|e| e.error.message)
            .unwrap_or(body);
        AppError::PaymentProvider(format!("Stripe API error ({}): {}", status, message))
    }
}

/// Flatten a checkout request into Stripe's bracketed form encoding.
pub fn checkout_form_params(request: &CheckoutRequest) -> Vec<(String, String)> {
    let mut params = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];

    if let Some(reference) = &request.client_reference_id {
        params.push(("client_reference_id".to_string(), reference.clone()));
    }

    for (i, item) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{}]", i);
        params.push((
            format!("{}[price_data][currency]", prefix),
            request.currency.clone(),
        ));
        params.push((
            format!("{}[price_data][unit_amount]", prefix),
            item.unit_amount.to_string(),
        ));
        params.push((
            format!("{}[price_data][product_data][name]", prefix),
            item.name.clone(),
        ));
        if let Some(description) = &item.description {
            params.push((
                format!("{}[price_data][product_data][description]", prefix),
                description.clone(),
            ));
        }
        if let Some(image) = &item.image_url {
            params.push((
                format!("{}[price_data][product_data][images][0]", prefix),
                image.clone(),
            ));
        }
        params.push((format!("{}[quantity]", prefix), item.quantity.to_string()));
    }

    params
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(self.secret_key()?)
            .form(&checkout_form_params(request))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let session: CreateSessionResponse = response.json().await?;
        let url = session.url.ok_or_else(|| {
            AppError::PaymentProvider(format!("Stripe session {} has no checkout URL", session.id))
        })?;

        tracing::info!(
            session_id = %session.id,
            line_items = request.line_items.len(),
            amount = ?request.total(),
            "Stripe checkout session created"
        );

        Ok(CheckoutSession {
            id: session.id,
            url,
            success_url: session.success_url,
            cancel_url: session.cancel_url,
            status: session.status,
        })
    }

    async fn retrieve_checkout_session(&self, session_id: &str) -> Result<SessionDetails> {
        let response = self
            .client
            .get(self.session_url(session_id)?)
            .bearer_auth(self.secret_key()?)
            .query(&[("expand[]", "line_items")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let session: RetrievedSession = response.json().await?;
        let customer_email = session
            .customer_details
            .and_then(|d| d.email)
            .or(session.customer_email);

        Ok(SessionDetails {
            id: session.id,
            status: session.status,
            payment_status: session.payment_status,
            amount_total: session.amount_total,
            currency: session.currency,
            customer_email,
            created: session.created,
            line_items: session
                .line_items
                .map(|list| list.data)
                .unwrap_or_default()
                .into_iter()
                .map(|item| SessionLineItem {
                    description: item.description.unwrap_or_default(),
                    quantity: item.quantity.unwrap_or(1),
                    amount_total: item.amount_total,
                })
                .collect(),
        })
    }
}

/// Verifies the `Stripe-Signature` header of incoming webhooks.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
}

impl WebhookVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
        }
    }

    /// Check `header` (`t=<unix>,v1=<hex>[,v1=<hex>...]`) against `payload`.
    ///
    /// Returns `Err` for a malformed header, `Ok(false)` for a stale
    /// timestamp or when no `v1` signature matches.
    pub fn verify(&self, payload: &[u8], header: &str) -> Result<bool> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = Some(value),
                Some(("v1", value)) => signatures.push(value),
                _ => {}
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| AppError::SignatureInvalid("Missing timestamp in signature header".into()))?;
        if signatures.is_empty() {
            return Err(AppError::SignatureInvalid(
                "No v1 signature in signature header".into(),
            ));
        }

        let ts: i64 = timestamp
            .parse()
            .map_err(|_| AppError::SignatureInvalid("Invalid timestamp in signature header".into()))?;
        let now = chrono::Utc::now().timestamp();
        if now.abs_diff(ts) > SIGNATURE_TOLERANCE_SECS.unsigned_abs() {
            tracing::warn!(timestamp = ts, "Webhook signature timestamp outside tolerance");
            return Ok(false);
        }

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| AppError::Internal("Invalid webhook secret".into()))?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = hex::encode(mac.finalize().into_bytes());

        Ok(signatures
            .iter()
            .any(|sig| bool::from(expected.as_bytes().ct_eq(sig.as_bytes()))))
    }
}

#[derive(Debug, Deserialize)]
pub struct StripeWebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

/// The subset of a checkout session object carried in webhook events.
#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    #[serde(default)]
    pub payment_status: Option<String>,
    pub amount_total: Option<i64>,
    pub customer_email: Option<String>,
    pub customer_details: Option<StripeCustomerDetails>,
}

impl StripeCheckoutSession {
    pub fn is_paid(&self) -> bool {
        matches!(
            self.payment_status.as_deref(),
            Some("paid") | Some("no_payment_required")
        )
    }

    pub fn email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.email.as_deref())
            .or(self.customer_email.as_deref())
    }
}

#[derive(Debug, Deserialize)]
pub struct StripeCustomerDetails {
    pub email: Option<String>,
}
