mod stripe;

pub use stripe::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One priced line of a checkout, in minor units of the settlement currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub description: Option<String>,
    pub unit_amount: i64,
    pub quantity: i64,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub line_items: Vec<LineItem>,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    /// Our browser session id for cart checkouts
    pub client_reference_id: Option<String>,
}

impl CheckoutRequest {
    /// Sum of `unit_amount * quantity`, or None when it does not fit in an `i64`.
    pub fn total(&self) -> Option<i64> {
        self.line_items.iter().try_fold(0i64, |sum, item| {
            item.unit_amount
                .checked_mul(item.quantity)
                .and_then(|line| sum.checked_add(line))
        })
    }
}

/// A freshly created hosted checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
    pub status: Option<String>,
}

/// A checkout session as reported by the provider after the fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetails {
    pub id: String,
    pub status: Option<String>,
    pub payment_status: String,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub customer_email: Option<String>,
    pub created: i64,
    pub line_items: Vec<SessionLineItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionLineItem {
    pub description: String,
    pub quantity: i64,
    pub amount_total: i64,
}

/// Fixed checkout parameters applied to every session we create.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Hosted-checkout payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession>;

    /// Fetch a session including its line items.
    async fn retrieve_checkout_session(&self, session_id: &str) -> Result<SessionDetails>;
}
