//! Tests for checkout session creation and the success page.

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::*;

#[tokio::test]
async fn test_create_session_converts_prices_to_minor_units() {
    let ctx = TestContext::new();

    let response = ctx
        .app()
        .oneshot(json_request(
            "POST",
            "/checkout/create-session",
            &json!({
                "line_items": [
                    { "name": "Pearl Ring", "description": "Silver", "price": 19.99, "quantity": 2,
                      "images": ["https://cdn.shop.test/ring.jpg", "https://cdn.shop.test/ring-2.jpg"] },
                    { "name": "Gift Box", "price": 12.5 }
                ]
            }),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["url"].as_str().is_some_and(|u| !u.is_empty()));

    let created = ctx.gateway.created();
    assert_eq!(created.len(), 1);
    let request = &created[0];
    assert_eq!(request.currency, "chf");
    assert_eq!(request.line_items[0].unit_amount, 1999);
    assert_eq!(request.line_items[0].quantity, 2);
    assert_eq!(
        request.line_items[0].image_url.as_deref(),
        Some("https://cdn.shop.test/ring.jpg")
    );
    assert_eq!(request.line_items[1].unit_amount, 1250);
    assert_eq!(request.line_items[1].quantity, 1);
    assert_eq!(request.total(), Some(2 * 1999 + 1250));
    assert_eq!(
        request.success_url,
        "http://localhost:3000/success?session_id={CHECKOUT_SESSION_ID}"
    );
    assert_eq!(request.client_reference_id, None);
}

#[tokio::test]
async fn test_create_session_honors_custom_redirects() {
    let ctx = TestContext::new();

    let response = ctx
        .app()
        .oneshot(json_request(
            "POST",
            "/checkout/create-session",
            &json!({
                "line_items": [{ "name": "Ring", "price": 10 }],
                "success_url": "https://shop.test/thanks",
                "cancel_url": "https://shop.test/cart"
            }),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let request = &ctx.gateway.created()[0];
    assert_eq!(request.success_url, "https://shop.test/thanks");
    assert_eq!(request.cancel_url, "https://shop.test/cart");
}

#[tokio::test]
async fn test_create_session_rejects_bad_line_items_before_provider_call() {
    let ctx = TestContext::new();

    let bodies = [
        json!({}),
        json!({ "line_items": [] }),
        json!({ "line_items": "Pearl Ring" }),
        json!({ "line_items": { "name": "Pearl Ring", "price": 10 } }),
        json!({ "line_items": [{ "price": 10 }] }),
        json!({ "line_items": [{ "name": "Ring", "price": 0 }] }),
        json!({ "line_items": [{ "name": "Ring", "price": 10, "quantity": 0 }] }),
        json!({ "line_items": [{ "name": "Ring", "price": 10, "quantity": 1000 }] }),
        json!({ "line_items": [{ "name": "Ring", "price": 10, "quantity": i64::MAX }] }),
        json!({ "line_items": [{ "name": "Vault", "price": 1.0e16, "quantity": 10 }] }),
    ];

    for body in bodies {
        let response = ctx
            .app()
            .oneshot(json_request("POST", "/checkout/create-session", &body, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
        let error = body_json(response).await;
        assert!(error["error"].is_string());
    }

    assert!(ctx.gateway.created().is_empty());
}

#[tokio::test]
async fn test_create_session_missing_items_message() {
    let ctx = TestContext::new();

    let response = ctx
        .app()
        .oneshot(json_request(
            "POST",
            "/checkout/create-session",
            &json!({ "line_items": [] }),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, json!({ "error": "No items provided" }));
}

#[tokio::test]
async fn test_create_session_provider_failure_returns_500() {
    let ctx = TestContext::new();
    ctx.gateway.set_failing(true);

    let response = ctx
        .app()
        .oneshot(json_request(
            "POST",
            "/checkout/create-session",
            &json!({ "line_items": [{ "name": "Ring", "price": 10 }] }),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Payment session creation failed" })
    );
}

#[tokio::test]
async fn test_cart_checkout_end_to_end() {
    let ctx = TestContext::new();
    let product = create_test_product(&ctx.state, "Pearl Ring", 19.99, true);

    let response = ctx
        .app()
        .oneshot(json_request(
            "POST",
            "/cart/add",
            &json!({ "productId": product.id, "quantity": 2 }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).expect("new visitors get a session cookie");

    let response = ctx
        .app()
        .oneshot(empty_request("POST", "/cart/checkout", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let url = body["url"].as_str().unwrap();
    assert!(!url.is_empty());

    let created = ctx.gateway.created();
    assert_eq!(created.len(), 1);
    let request = &created[0];
    assert_eq!(request.currency, "chf");
    assert_eq!(request.line_items.len(), 1);
    assert_eq!(request.line_items[0].name, "Pearl Ring");
    assert_eq!(request.line_items[0].unit_amount, 1999);
    assert_eq!(request.line_items[0].quantity, 2);
    assert_eq!(request.client_reference_id.as_deref(), Some(session_id(&cookie)));

    // The open session is recorded and the cart is emptied
    {
        let conn = ctx.state.db.get().unwrap();
        let record = queries::get_checkout_session(&conn, "cs_test_1").unwrap().unwrap();
        assert_eq!(record.status, CheckoutStatus::Open);
        assert_eq!(record.cart_session_id.as_deref(), Some(session_id(&cookie)));
    }

    let response = ctx
        .app()
        .oneshot(empty_request("GET", "/cart", Some(&cookie)))
        .await
        .unwrap();
    let cart = body_json(response).await;
    assert_eq!(cart["items"], json!([]));
    assert_eq!(cart["totalCents"], 0);
}

#[tokio::test]
async fn test_cart_checkout_uses_current_catalog_price() {
    let ctx = TestContext::new();
    let product = create_test_product(&ctx.state, "Pearl Ring", 19.99, true);

    let response = ctx
        .app()
        .oneshot(json_request(
            "POST",
            "/cart/add",
            &json!({ "productId": product.id }),
            None,
        ))
        .await
        .unwrap();
    let cookie = session_cookie(&response).unwrap();

    {
        let conn = ctx.state.db.get().unwrap();
        let update = UpdateProduct {
            name: None,
            description: None,
            price: Some(24.5),
            category: None,
            materials: None,
            image_url: None,
            available: None,
        };
        queries::update_product(&conn, product.id, &update, Some(2450)).unwrap();
    }

    let response = ctx
        .app()
        .oneshot(empty_request("POST", "/cart/checkout", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(ctx.gateway.created()[0].line_items[0].unit_amount, 2450);
}

#[tokio::test]
async fn test_cart_checkout_with_empty_cart_is_rejected() {
    let ctx = TestContext::new();

    let response = ctx
        .app()
        .oneshot(empty_request("POST", "/cart/checkout", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(ctx.gateway.created().is_empty());
}

#[tokio::test]
async fn test_cart_checkout_provider_failure_keeps_cart() {
    let ctx = TestContext::new();
    let product = create_test_product(&ctx.state, "Pearl Ring", 19.99, true);

    let response = ctx
        .app()
        .oneshot(json_request(
            "POST",
            "/cart/add",
            &json!({ "productId": product.id }),
            None,
        ))
        .await
        .unwrap();
    let cookie = session_cookie(&response).unwrap();

    ctx.gateway.set_failing(true);
    let response = ctx
        .app()
        .oneshot(empty_request("POST", "/cart/checkout", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = ctx
        .app()
        .oneshot(empty_request("GET", "/cart", Some(&cookie)))
        .await
        .unwrap();
    let cart = body_json(response).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_success_page_shows_order() {
    let ctx = TestContext::new();
    ctx.gateway
        .insert_session(paid_session_details("cs_test_ok", "buyer@shop.test"));

    let response = ctx
        .app()
        .oneshot(empty_request("GET", "/success?session_id=cs_test_ok", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("cs_test_ok"));
    assert!(html.contains("39.98 CHF"));
    assert!(html.contains("buyer@shop.test"));
}

#[tokio::test]
async fn test_success_page_falls_back_without_session() {
    let ctx = TestContext::new();

    for uri in ["/success", "/success?session_id=cs_unknown"] {
        let response = ctx.app().oneshot(empty_request("GET", uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Vielen Dank"));
        assert!(!html.contains("Bestellnummer"));
    }
}

#[tokio::test]
async fn test_stateless_checkout_routes_do_not_issue_sessions() {
    let ctx = TestContext::new();

    let response = ctx
        .app()
        .oneshot(json_request(
            "POST",
            "/checkout/create-session",
            &json!({ "line_items": [{ "name": "Ring", "price": 10 }] }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).is_none());

    let response = ctx
        .app()
        .oneshot(empty_request("GET", "/success", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).is_none());

    let conn = ctx.state.db.get().unwrap();
    let sessions: i64 = conn
        .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
        .unwrap();
    assert_eq!(sessions, 0);
}

#[tokio::test]
async fn test_success_page_ignores_malformed_session_id() {
    let ctx = TestContext::new();

    let response = ctx
        .app()
        .oneshot(empty_request(
            "GET",
            "/success?session_id=..%2F..%2Fv1%2Fcustomers%2Fcus_123",
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Vielen Dank"));
}
