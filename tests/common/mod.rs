//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;

pub use storefront::db::{AppState, queries};
pub use storefront::models::*;

use storefront::email::{EmailMessage, EmailSendResult, Mailer};
use storefront::error::{AppError, Result};
use storefront::middleware::{AdminCredentials, SessionSettings};
use storefront::notifications::NotificationSettings;
use storefront::payments::{
    CheckoutRequest, CheckoutSession, CheckoutSettings, PaymentGateway, SessionDetails,
    SessionLineItem, WebhookVerifier,
};

pub const WEBHOOK_SECRET: &str = "whsec_test123secret456";
pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";
pub const ADMIN_EMAIL: &str = "admin@shop.test";

// ============ Payment Gateway ============

/// Records every checkout request and serves canned session details.
#[derive(Default)]
pub struct RecordingGateway {
    pub created: Mutex<Vec<CheckoutRequest>>,
    pub retrieved: Mutex<Vec<String>>,
    pub sessions: Mutex<HashMap<String, SessionDetails>>,
    pub fail: AtomicBool,
    counter: AtomicUsize,
}

impl RecordingGateway {
    pub fn created(&self) -> Vec<CheckoutRequest> {
        self.created.lock().unwrap().clone()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn insert_session(&self, details: SessionDetails) {
        self.sessions
            .lock()
            .unwrap()
            .insert(details.id.clone(), details);
    }
}

pub fn paid_session_details(id: &str, email: &str) -> SessionDetails {
    SessionDetails {
        id: id.to_string(),
        status: Some("complete".into()),
        payment_status: "paid".into(),
        amount_total: Some(3998),
        currency: Some("chf".into()),
        customer_email: Some(email.to_string()),
        created: 1_705_327_380,
        line_items: vec![SessionLineItem {
            description: "Pearl Ring".into(),
            quantity: 2,
            amount_total: 3998,
        }],
    }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::PaymentProvider("card_declined".into()));
        }
        self.created.lock().unwrap().push(request.clone());
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("cs_test_{}", n);
        Ok(CheckoutSession {
            url: format!("https://checkout.stripe.test/c/pay/{}", id),
            id,
            success_url: Some(request.success_url.clone()),
            cancel_url: Some(request.cancel_url.clone()),
            status: Some("open".into()),
        })
    }

    async fn retrieve_checkout_session(&self, session_id: &str) -> Result<SessionDetails> {
        self.retrieved.lock().unwrap().push(session_id.to_string());
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| AppError::PaymentProvider(format!("No such checkout.session: {}", session_id)))
    }
}

// ============ Mailer ============

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
    pub fail: AtomicBool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, to: &str) -> usize {
        self.sent.lock().unwrap().iter().filter(|m| m.to == to).count()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<EmailSendResult> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Notification("relay unavailable".into()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(EmailSendResult::Sent)
    }
}

// ============ App State ============

pub struct TestContext {
    pub state: AppState,
    pub gateway: Arc<RecordingGateway>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestContext {
    pub fn new() -> Self {
        let gateway = Arc::new(RecordingGateway::default());
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState {
            db: storefront::db::create_memory_pool().expect("in-memory pool"),
            payments: gateway.clone(),
            mailer: mailer.clone(),
            webhook_verifier: Some(WebhookVerifier::new(WEBHOOK_SECRET)),
            checkout: CheckoutSettings {
                currency: "chf".into(),
                success_url: "http://localhost:3000/success?session_id={CHECKOUT_SESSION_ID}".into(),
                cancel_url: "http://localhost:3000/checkout-test.html".into(),
            },
            notifications: NotificationSettings {
                shop_name: "Test Shop".into(),
                admin_email: Some(ADMIN_EMAIL.into()),
                currency: "chf".into(),
            },
            admin: AdminCredentials::new(ADMIN_USERNAME, Some(ADMIN_PASSWORD)),
            sessions: SessionSettings {
                ttl_days: 7,
                cookie_secure: false,
            },
        };
        Self {
            state,
            gateway,
            mailer,
        }
    }

    pub fn app(&self) -> Router {
        storefront::app(self.state.clone())
    }
}

// ============ Fixtures ============

pub fn create_test_product(state: &AppState, name: &str, price: f64, available: bool) -> Product {
    let conn = state.db.get().unwrap();
    let input = CreateProduct {
        name: name.to_string(),
        description: Some(format!("{} description", name)),
        price,
        category: Some("rings".into()),
        materials: Some("silver, pearl".into()),
        image_url: Some(format!("https://cdn.shop.test/{}.jpg", name.to_lowercase().replace(' ', "-"))),
        available,
    };
    let price_cents = input.validate().unwrap();
    queries::create_product(&conn, &input, price_cents).unwrap()
}

// ============ Requests ============

pub fn json_request(method: &str, uri: &str, body: &Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

/// The `sid=...` pair from a response's Set-Cookie header, ready to send back.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("sid="))
        .and_then(|v| v.split(';').next())
        .map(String::from)
}

pub fn session_id(cookie: &str) -> &str {
    cookie.trim_start_matches("sid=")
}

/// Log in as admin and return the rotated session cookie.
pub async fn admin_login(ctx: &TestContext) -> String {
    use tower::ServiceExt;

    let response = ctx
        .app()
        .oneshot(json_request(
            "POST",
            "/admin/login",
            &serde_json::json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    session_cookie(&response).expect("login should set a session cookie")
}

// ============ Webhooks ============

pub fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn stripe_signature_header(payload: &[u8], secret: &str, timestamp: i64) -> String {
    type HmacSha256 = Hmac<Sha256>;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(format!("{}.", timestamp).as_bytes());
    mac.update(payload);
    format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    )
}

pub fn checkout_event(event_id: &str, event_type: &str, object: Value) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "id": event_id,
        "type": event_type,
        "data": { "object": object }
    }))
    .unwrap()
}

pub fn signed_webhook(payload: Vec<u8>) -> Request<Body> {
    let signature = stripe_signature_header(&payload, WEBHOOK_SECRET, current_timestamp());
    Request::builder()
        .method("POST")
        .uri("/checkout/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header("stripe-signature", signature)
        .body(Body::from(payload))
        .unwrap()
}

// ============ Multipart ============

pub const BOUNDARY: &str = "storefront-test-boundary";

pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

pub fn file_part<'a>(name: &'a str, filename: &'a str, content_type: &'a str, data: &'a [u8]) -> Part<'a> {
    Part {
        name,
        filename: Some(filename),
        content_type: Some(content_type),
        data,
    }
}

pub fn text_part<'a>(name: &'a str, value: &'a str) -> Part<'a> {
    Part {
        name,
        filename: None,
        content_type: None,
        data: value.as_bytes(),
    }
}

pub fn multipart_request(uri: &str, parts: &[Part<'_>], cookie: &str) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(filename) = part.filename {
            disposition.push_str(&format!("; filename=\"{}\"", filename));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .unwrap()
}
