use axum::{body::Bytes, extract::State, http::HeaderMap};
use serde::Serialize;

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::models::CheckoutStatus;
use crate::notifications::{CompletedOrder, NotificationDispatcher};
use crate::payments::{StripeCheckoutSession, StripeWebhookEvent};

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Stripe webhook endpoint. Only signature and payload problems produce an
/// error response; once the event is authentic it is always acknowledged,
/// and downstream failures are logged for manual replay.
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>> {
    let signature = headers
        .get("stripe-signature")
        .ok_or_else(|| AppError::SignatureInvalid("Missing stripe-signature header".into()))?
        .to_str()
        .map_err(|_| AppError::SignatureInvalid("Invalid stripe-signature header".into()))?;

    let Some(verifier) = state.webhook_verifier.as_ref() else {
        tracing::error!("STRIPE_WEBHOOK_SECRET is not configured, rejecting webhook");
        return Err(AppError::SignatureInvalid("Webhook secret not configured".into()));
    };

    if !verifier.verify(&body, signature)? {
        tracing::warn!("Stripe webhook signature mismatch");
        return Err(AppError::SignatureInvalid(
            "No signatures found matching the expected signature for payload".into(),
        ));
    }

    let event: StripeWebhookEvent = serde_json::from_slice(&body).map_err(|e| {
        tracing::error!(error = %e, "Failed to parse Stripe webhook");
        AppError::SignatureInvalid(format!("Invalid payload: {}", e))
    })?;

    match event.event_type.as_str() {
        "checkout.session.completed" | "checkout.session.async_payment_succeeded" => {
            handle_checkout_completed(&state, &event).await
        }
        "checkout.session.async_payment_failed" => {
            if let Some(session) = parse_session(&event) {
                tracing::warn!(
                    event_id = %event.id,
                    session_id = %session.id,
                    "Delayed payment failed for checkout session"
                );
            }
        }
        "checkout.session.expired" => handle_checkout_expired(&state, &event),
        other => tracing::debug!(event_id = %event.id, event_type = %other, "Ignoring Stripe event"),
    }

    Ok(Json(WebhookAck { received: true }))
}

fn parse_session(event: &StripeWebhookEvent) -> Option<StripeCheckoutSession> {
    match serde_json::from_value(event.data.object.clone()) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::error!(
                error = %e,
                event_id = %event.id,
                "Failed to parse checkout session from event"
            );
            None
        }
    }
}

/// Finalize a paid session and notify. Only the delivery that moves the
/// session out of `open` sends mail.
async fn handle_checkout_completed(state: &AppState, event: &StripeWebhookEvent) {
    let Some(session) = parse_session(event) else {
        return;
    };

    if !session.is_paid() {
        tracing::info!(
            event_id = %event.id,
            session_id = %session.id,
            payment_status = ?session.payment_status,
            "Checkout completed without payment yet, awaiting async result"
        );
        return;
    }

    let won = {
        let conn = match state.db.get() {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, event_id = %event.id, session_id = %session.id, "DB connection error");
                return;
            }
        };
        queries::finalize_checkout_session(
            &conn,
            &session.id,
            CheckoutStatus::Completed,
            session.amount_total,
            session.email(),
        )
    };

    match won {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!(
                event_id = %event.id,
                session_id = %session.id,
                "Checkout session already finalized, skipping notifications"
            );
            return;
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                event_id = %event.id,
                session_id = %session.id,
                "Failed to finalize checkout session"
            );
            return;
        }
    }

    tracing::info!(
        event_id = %event.id,
        session_id = %session.id,
        amount = ?session.amount_total,
        "Payment succeeded"
    );

    let order = CompletedOrder {
        session_id: session.id.clone(),
        event_id: event.id.clone(),
        amount_total: session.amount_total,
        customer_email: session.email().map(String::from),
    };
    NotificationDispatcher::new(
        state.payments.as_ref(),
        state.mailer.as_ref(),
        &state.notifications,
    )
    .order_completed(&order)
    .await;
}

fn handle_checkout_expired(state: &AppState, event: &StripeWebhookEvent) {
    let Some(session) = parse_session(event) else {
        return;
    };

    let result = state.db.get().map_err(AppError::from).and_then(|conn| {
        queries::finalize_checkout_session(&conn, &session.id, CheckoutStatus::Expired, None, None)
    });

    match result {
        Ok(true) => tracing::info!(event_id = %event.id, session_id = %session.id, "Checkout abandoned"),
        Ok(false) => tracing::debug!(
            event_id = %event.id,
            session_id = %session.id,
            "Expired event for already finalized session"
        ),
        Err(e) => tracing::error!(
            error = %e,
            event_id = %event.id,
            session_id = %session.id,
            "Failed to mark checkout session expired"
        ),
    }
}
