use axum::{
    body::Bytes,
    extract::{Extension, State},
    response::Html,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cart::CartStore;
use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Query};
use crate::models::{MAX_QUANTITY, Session, cart_total_overflow};
use crate::payments::{CheckoutRequest, LineItem};
use crate::util::{escape_html, format_amount, to_minor_units};

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// Kept untyped so a missing, non-array or empty list gets one answer
    #[serde(default)]
    pub line_items: Option<Value>,
    #[serde(default)]
    pub success_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
}

/// One ad-hoc item as sent by the storefront. `price` is in major units.
#[derive(Debug, Deserialize)]
pub struct CheckoutItemInput {
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Option<f64>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
}

impl CheckoutItemInput {
    pub fn into_line_item(self, index: usize) -> Result<LineItem> {
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest(format!("line_items[{}]: name is required", index)))?;
        let unit_amount = self.price.and_then(to_minor_units).ok_or_else(|| {
            AppError::BadRequest(format!("line_items[{}]: price must be greater than 0", index))
        })?;
        let quantity = self.quantity.unwrap_or(1);
        if !(1..=MAX_QUANTITY).contains(&quantity) {
            return Err(AppError::BadRequest(format!(
                "line_items[{}]: quantity must be between 1 and {}",
                index, MAX_QUANTITY
            )));
        }

        Ok(LineItem {
            name,
            description: self.description.filter(|d| !d.is_empty()),
            unit_amount,
            quantity,
            image_url: self.images.and_then(|imgs| imgs.into_iter().next()),
        })
    }
}

pub fn parse_line_items(value: Option<Value>) -> Result<Vec<LineItem>> {
    let items = match value {
        Some(Value::Array(items)) if !items.is_empty() => items,
        _ => return Err(AppError::BadRequest("No items provided".into())),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value::<CheckoutItemInput>(item)
                .map_err(|e| AppError::BadRequest(format!("line_items[{}]: {}", i, e)))?
                .into_line_item(i)
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct CheckoutUrl {
    pub url: String,
}

/// Create a hosted checkout session from client-supplied line items.
/// Nothing is stored locally; the webhook records the outcome.
pub async fn create_session(
    State(state): State<AppState>,
    Json(input): Json<CreateSessionRequest>,
) -> Result<Json<CheckoutUrl>> {
    let line_items = parse_line_items(input.line_items)?;

    let request = CheckoutRequest {
        line_items,
        currency: state.checkout.currency.clone(),
        success_url: input
            .success_url
            .unwrap_or_else(|| state.checkout.success_url.clone()),
        cancel_url: input
            .cancel_url
            .unwrap_or_else(|| state.checkout.cancel_url.clone()),
        client_reference_id: None,
    };
    request.total().ok_or_else(cart_total_overflow)?;

    let session = state.payments.create_checkout_session(&request).await?;
    Ok(Json(CheckoutUrl { url: session.url }))
}

#[derive(Debug, Default, Deserialize)]
pub struct CartCheckoutRequest {
    #[serde(default)]
    pub success_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
}

/// Check out the session's cart. Prices come from the catalog, not from the
/// cart snapshot. The cart is cleared once the provider session exists.
pub async fn checkout_cart(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    body: Bytes,
) -> Result<Json<CheckoutUrl>> {
    let input: CartCheckoutRequest = if body.is_empty() {
        CartCheckoutRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::BadRequest(e.to_string()))?
    };

    let line_items = {
        let conn = state.db.get()?;
        let entries = CartStore::new(&conn, &session.id).entries()?;
        if entries.is_empty() {
            return Err(AppError::BadRequest("Cart is empty".into()));
        }

        let mut line_items = Vec::with_capacity(entries.len());
        for entry in entries {
            let product = queries::get_product_by_id(&conn, entry.product_id)?
                .filter(|p| p.available)
                .ok_or_else(|| {
                    AppError::ProductUnavailable(format!("{} is no longer available", entry.name))
                })?;
            line_items.push(LineItem {
                name: product.name,
                description: product.description.filter(|d| !d.is_empty()),
                unit_amount: product.price_cents,
                quantity: entry.quantity,
                image_url: product.image_url,
            });
        }
        line_items
    };

    let request = CheckoutRequest {
        line_items,
        currency: state.checkout.currency.clone(),
        success_url: input
            .success_url
            .unwrap_or_else(|| state.checkout.success_url.clone()),
        cancel_url: input
            .cancel_url
            .unwrap_or_else(|| state.checkout.cancel_url.clone()),
        client_reference_id: Some(session.id.clone()),
    };
    let total = request.total().ok_or_else(cart_total_overflow)?;

    let checkout = state.payments.create_checkout_session(&request).await?;

    let conn = state.db.get()?;
    queries::record_checkout_session(&conn, &checkout.id, Some(&session.id))?;
    CartStore::new(&conn, &session.id).clear()?;

    tracing::info!(
        session_id = %checkout.id,
        cart_session = %session.id,
        amount = total,
        "Cart checked out"
    );

    Ok(Json(CheckoutUrl { url: checkout.url }))
}

#[derive(Debug, Deserialize)]
pub struct SuccessQuery {
    pub session_id: Option<String>,
}

const FALLBACK_SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Vielen Dank</title></head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
<h2>Vielen Dank für Ihre Bestellung!</h2>
<p>Sie erhalten in Kürze eine Bestätigung per E-Mail.</p>
</body>
</html>"#;

/// Confirmation page shown after the hosted checkout redirects back.
pub async fn success_page(
    State(state): State<AppState>,
    Query(query): Query<SuccessQuery>,
) -> Html<String> {
    let Some(session_id) = query.session_id.filter(|id| !id.is_empty()) else {
        return Html(FALLBACK_SUCCESS_PAGE.to_string());
    };

    let details = match state.payments.retrieve_checkout_session(&session_id).await {
        Ok(details) => details,
        Err(e) => {
            tracing::warn!(error = %e, session_id = %session_id, "Could not load session for success page");
            return Html(FALLBACK_SUCCESS_PAGE.to_string());
        }
    };

    let currency = details
        .currency
        .as_deref()
        .unwrap_or(state.checkout.currency.as_str());
    let total = format_amount(details.amount_total.unwrap_or(0), currency);
    let email_line = details
        .customer_email
        .as_deref()
        .map(|email| {
            format!(
                "<p>Eine Bestätigung wurde an <strong>{}</strong> gesendet.</p>",
                escape_html(email)
            )
        })
        .unwrap_or_default();

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Vielen Dank</title></head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
<h2>Vielen Dank für Ihre Bestellung!</h2>
<p><strong>Bestellnummer:</strong> {}</p>
<p><strong>Betrag:</strong> {}</p>
{}
</body>
</html>"#,
        escape_html(&details.id),
        escape_html(&total),
        email_line
    ))
}
