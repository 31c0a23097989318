//! Order confirmation and sale alert emails sent after a completed payment.

use crate::email::{EmailMessage, Mailer};
use crate::payments::{PaymentGateway, SessionDetails, SessionLineItem};
use crate::util::{escape_html, format_amount, format_timestamp};

#[derive(Debug, Clone)]
pub struct NotificationSettings {
    pub shop_name: String,
    /// Sale alerts are skipped when unset
    pub admin_email: Option<String>,
    /// Used when the provider does not report a currency
    pub currency: String,
}

/// What the webhook knew about the order when it was completed.
#[derive(Debug, Clone)]
pub struct CompletedOrder {
    pub session_id: String,
    pub event_id: String,
    pub amount_total: Option<i64>,
    pub customer_email: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub customer_notified: bool,
    pub admin_notified: bool,
}

pub struct NotificationDispatcher<'a> {
    payments: &'a dyn PaymentGateway,
    mailer: &'a dyn Mailer,
    settings: &'a NotificationSettings,
}

impl<'a> NotificationDispatcher<'a> {
    pub fn new(
        payments: &'a dyn PaymentGateway,
        mailer: &'a dyn Mailer,
        settings: &'a NotificationSettings,
    ) -> Self {
        Self {
            payments,
            mailer,
            settings,
        }
    }

    /// Send the customer confirmation and the admin alert for a completed
    /// order. Never fails: every error is logged with the session id so the
    /// mail can be resent by hand.
    pub async fn order_completed(&self, order: &CompletedOrder) -> DispatchSummary {
        let details = match self.payments.retrieve_checkout_session(&order.session_id).await {
            Ok(details) => Some(details),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    event_id = %order.event_id,
                    session_id = %order.session_id,
                    "Failed to fetch checkout session for notifications"
                );
                None
            }
        };

        let view = OrderView::new(order, details.as_ref(), &self.settings.currency);
        let mut summary = DispatchSummary::default();

        match view.customer_email {
            Some(to) => {
                let message = self.customer_confirmation(&view, to);
                summary.customer_notified = self.deliver(order, &message, "customer confirmation").await;
            }
            None => tracing::warn!(
                event_id = %order.event_id,
                session_id = %order.session_id,
                "No customer email on completed session, skipping confirmation"
            ),
        }

        if let Some(admin) = &self.settings.admin_email {
            let message = self.admin_alert(&view, admin);
            summary.admin_notified = self.deliver(order, &message, "admin sale alert").await;
        }

        summary
    }

    async fn deliver(&self, order: &CompletedOrder, message: &EmailMessage, kind: &str) -> bool {
        match self.mailer.send(message).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    event_id = %order.event_id,
                    session_id = %order.session_id,
                    kind = kind,
                    "Failed to send order notification"
                );
                false
            }
        }
    }

    fn customer_confirmation(&self, view: &OrderView<'_>, to: &str) -> EmailMessage {
        let shop = &self.settings.shop_name;
        let subject = format!("Bestellung bestätigt - {}", shop);
        let text = format!(
            "Vielen Dank für Ihre Bestellung!\n\nBestellnummer: {}\nBetrag: {}\nStatus: Bezahlt\n\nWir versenden in 1-2 Werktagen. Tracking per E-Mail.\n\n{}",
            view.session_id, view.total, shop
        );
        let html = format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
<h2 style="color: #333;">Vielen Dank für Ihre Bestellung!</h2>
<p><strong>Bestellnummer:</strong> {}</p>
<p><strong>Betrag:</strong> {}</p>
<p><strong>Status:</strong> Bezahlt</p>
<hr style="border: none; border-top: 1px solid #eee; margin: 30px 0;">
<p style="color: #666;">Wir versenden in 1-2 Werktagen. Tracking per E-Mail.</p>
<p style="color: #999; font-size: 12px;">{}</p>
</body>
</html>"#,
            escape_html(view.session_id),
            escape_html(&view.total),
            escape_html(shop)
        );

        EmailMessage {
            to: to.to_string(),
            subject,
            text,
            html,
        }
    }

    fn admin_alert(&self, view: &OrderView<'_>, to: &str) -> EmailMessage {
        let subject = format!("NEUER VERKAUF: {}", view.total);
        let customer = view.customer_email.unwrap_or("unbekannt");

        let mut text = format!(
            "Neuer Verkauf eingegangen!\n\nSession ID: {}\nKunde: {}\nBetrag: {}\n\nBestellung:\n",
            view.session_id, customer, view.total
        );
        let mut items_html = String::new();
        if view.line_items.is_empty() {
            text.push_str("Keine Artikel\n");
            items_html.push_str("<li>Keine Artikel</li>");
        }
        for item in view.line_items {
            let line = format!(
                "{}x {} - {}",
                item.quantity,
                item.description,
                format_amount(item.amount_total, view.currency)
            );
            text.push_str(&format!("{}\n", line));
            items_html.push_str(&format!("<li>{}</li>", escape_html(&line)));
        }
        if let Some(created) = view.created {
            text.push_str(&format!("\nZeit: {}", format_timestamp(created)));
        }

        let time_html = view
            .created
            .map(|created| {
                format!(
                    r#"<p style="color: #999; font-size: 12px;">Zeit: {}</p>"#,
                    format_timestamp(created)
                )
            })
            .unwrap_or_default();

        let html = format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
<h2 style="color: #333;">Neuer Verkauf eingegangen!</h2>
<p><strong>Session ID:</strong> {}</p>
<p><strong>Kunde:</strong> {}</p>
<p><strong>Betrag:</strong> {}</p>
<hr style="border: none; border-top: 1px solid #eee; margin: 30px 0;">
<h3>Bestellung:</h3>
<ul>{}</ul>
{}
</body>
</html>"#,
            escape_html(view.session_id),
            escape_html(customer),
            escape_html(&view.total),
            items_html,
            time_html
        );

        EmailMessage {
            to: to.to_string(),
            subject,
            text,
            html,
        }
    }
}

/// Order data merged from the provider and the webhook event.
struct OrderView<'a> {
    session_id: &'a str,
    customer_email: Option<&'a str>,
    currency: &'a str,
    total: String,
    line_items: &'a [SessionLineItem],
    created: Option<i64>,
}

impl<'a> OrderView<'a> {
    fn new(
        order: &'a CompletedOrder,
        details: Option<&'a SessionDetails>,
        default_currency: &'a str,
    ) -> Self {
        let currency = details
            .and_then(|d| d.currency.as_deref())
            .unwrap_or(default_currency);
        let amount = details
            .and_then(|d| d.amount_total)
            .or(order.amount_total)
            .unwrap_or(0);

        Self {
            session_id: &order.session_id,
            customer_email: details
                .and_then(|d| d.customer_email.as_deref())
                .or(order.customer_email.as_deref()),
            currency,
            total: format_amount(amount, currency),
            line_items: details.map(|d| d.line_items.as_slice()).unwrap_or(&[]),
            created: details.map(|d| d.created),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::email::EmailSendResult;
    use crate::error::{AppError, Result};
    use crate::payments::{CheckoutRequest, CheckoutSession};

    struct FixedGateway {
        details: Option<SessionDetails>,
    }

    #[async_trait]
    impl PaymentGateway for FixedGateway {
        async fn create_checkout_session(&self, _: &CheckoutRequest) -> Result<CheckoutSession> {
            Err(AppError::PaymentProvider("unused".into()))
        }

        async fn retrieve_checkout_session(&self, _: &str) -> Result<SessionDetails> {
            self.details
                .clone()
                .ok_or_else(|| AppError::PaymentProvider("unavailable".into()))
        }
    }

    #[derive(Default)]
    struct Outbox {
        sent: Mutex<Vec<EmailMessage>>,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for Outbox {
        async fn send(&self, message: &EmailMessage) -> Result<EmailSendResult> {
            if self.fail {
                return Err(AppError::Notification("relay down".into()));
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(EmailSendResult::Sent)
        }
    }

    fn settings() -> NotificationSettings {
        NotificationSettings {
            shop_name: "Nima <Schmuck>".into(),
            admin_email: Some("admin@example.ch".into()),
            currency: "chf".into(),
        }
    }

    fn order() -> CompletedOrder {
        CompletedOrder {
            session_id: "cs_test_123".into(),
            event_id: "evt_1".into(),
            amount_total: Some(3998),
            customer_email: Some("event@example.ch".into()),
        }
    }

    fn details() -> SessionDetails {
        SessionDetails {
            id: "cs_test_123".into(),
            status: Some("complete".into()),
            payment_status: "paid".into(),
            amount_total: Some(3998),
            currency: Some("chf".into()),
            customer_email: Some("buyer@example.ch".into()),
            created: 1_705_327_380,
            line_items: vec![SessionLineItem {
                description: "Pearl <Ring>".into(),
                quantity: 2,
                amount_total: 3998,
            }],
        }
    }

    #[tokio::test]
    async fn test_sends_customer_and_admin_mail() {
        let gateway = FixedGateway {
            details: Some(details()),
        };
        let outbox = Outbox::default();
        let settings = settings();

        let summary = NotificationDispatcher::new(&gateway, &outbox, &settings)
            .order_completed(&order())
            .await;

        assert!(summary.customer_notified && summary.admin_notified);
        let sent = outbox.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, "buyer@example.ch");
        assert!(sent[0].text.contains("39.98 CHF"));
        assert!(sent[0].html.contains("Nima &lt;Schmuck&gt;"));
        assert_eq!(sent[1].to, "admin@example.ch");
        assert_eq!(sent[1].subject, "NEUER VERKAUF: 39.98 CHF");
        assert!(sent[1].html.contains("2x Pearl &lt;Ring&gt; - 39.98 CHF"));
        assert!(sent[1].text.contains("Zeit: 15.01.2024, 14:03 UTC"));
    }

    #[tokio::test]
    async fn test_falls_back_to_event_data_when_retrieval_fails() {
        let gateway = FixedGateway { details: None };
        let outbox = Outbox::default();
        let settings = settings();

        let summary = NotificationDispatcher::new(&gateway, &outbox, &settings)
            .order_completed(&order())
            .await;

        assert!(summary.customer_notified);
        let sent = outbox.sent.lock().unwrap();
        assert_eq!(sent[0].to, "event@example.ch");
        assert!(sent[1].text.contains("Keine Artikel"));
    }

    #[tokio::test]
    async fn test_mail_failure_is_swallowed() {
        let gateway = FixedGateway {
            details: Some(details()),
        };
        let outbox = Outbox {
            fail: true,
            ..Default::default()
        };
        let settings = settings();

        let summary = NotificationDispatcher::new(&gateway, &outbox, &settings)
            .order_completed(&order())
            .await;

        assert_eq!(summary, DispatchSummary::default());
    }
}
