//! Tests for the public catalog, hero listing and health endpoints.

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::*;

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new();

    let response = ctx
        .app()
        .oneshot(empty_request("GET", "/health", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_public_listing_hides_unavailable_products() {
    let ctx = TestContext::new();
    let ring = create_test_product(&ctx.state, "Pearl Ring", 19.99, true);
    create_test_product(&ctx.state, "Sold Out", 10.0, false);

    let response = ctx
        .app()
        .oneshot(empty_request("GET", "/api/products", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let products = body_json(response).await;
    let products = products.as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["id"], ring.id);
    assert_eq!(products[0]["price_cents"], 1999);
}

#[tokio::test]
async fn test_public_listing_filters() {
    let ctx = TestContext::new();
    create_test_product(&ctx.state, "Pearl Ring", 19.99, true);
    let chain = {
        let conn = ctx.state.db.get().unwrap();
        let input = CreateProduct {
            name: "Gold Chain".into(),
            description: None,
            price: 120.0,
            category: Some("necklaces".into()),
            materials: Some("gold".into()),
            image_url: None,
            available: true,
        };
        queries::create_product(&conn, &input, 12000).unwrap()
    };

    let response = ctx
        .app()
        .oneshot(empty_request("GET", "/api/products?category=necklaces", None))
        .await
        .unwrap();
    let products = body_json(response).await;
    assert_eq!(products.as_array().unwrap().len(), 1);
    assert_eq!(products[0]["id"], chain.id);

    let response = ctx
        .app()
        .oneshot(empty_request("GET", "/api/products?materials=pearl", None))
        .await
        .unwrap();
    let products = body_json(response).await;
    assert_eq!(products.as_array().unwrap().len(), 1);
    assert_eq!(products[0]["name"], "Pearl Ring");

    let response = ctx
        .app()
        .oneshot(empty_request("GET", "/api/products?category=earrings", None))
        .await
        .unwrap();
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_product_detail_shows_sold_out_products() {
    let ctx = TestContext::new();
    let sold_out = create_test_product(&ctx.state, "Sold Out", 10.0, false);

    let response = ctx
        .app()
        .oneshot(empty_request("GET", &format!("/api/products/{}", sold_out.id), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["available"], false);

    let response = ctx
        .app()
        .oneshot(empty_request("GET", "/api/products/9999", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, json!({ "error": "Product not found" }));

    let response = ctx
        .app()
        .oneshot(empty_request("GET", "/api/products/not-a-number", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_hero_listing() {
    let ctx = TestContext::new();

    let response = ctx
        .app()
        .oneshot(empty_request("GET", "/api/hero", None))
        .await
        .unwrap();
    assert_eq!(
        body_json(response).await,
        json!({ "success": true, "data": [], "count": 0 })
    );

    {
        let conn = ctx.state.db.get().unwrap();
        for header in ["Summer", "Winter"] {
            queries::create_hero(
                &conn,
                &HeroFields {
                    hero_header: header.into(),
                    hero_title1: "Handmade".into(),
                    hero_title2: "Silver".into(),
                    hero_title3: "Jewellery".into(),
                    target_url: "/shop".into(),
                },
            )
            .unwrap();
        }
    }

    let response = ctx
        .app()
        .oneshot(empty_request("GET", "/api/hero", None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"][0]["heroimg_count"], 0);
}

#[tokio::test]
async fn test_public_routes_do_not_issue_sessions() {
    let ctx = TestContext::new();

    let response = ctx
        .app()
        .oneshot(empty_request("GET", "/api/products", None))
        .await
        .unwrap();

    assert!(session_cookie(&response).is_none());
}

#[test]
fn test_file_pool_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.db");
    let path = path.to_str().unwrap();

    let id = {
        let pool = storefront::db::create_pool(path).unwrap();
        let conn = pool.get().unwrap();
        let input = CreateProduct {
            name: "Pearl Ring".into(),
            description: None,
            price: 19.99,
            category: None,
            materials: None,
            image_url: None,
            available: true,
        };
        queries::create_product(&conn, &input, 1999).unwrap().id
    };

    let pool = storefront::db::create_pool(path).unwrap();
    let conn = pool.get().unwrap();
    let product = queries::get_product_by_id(&conn, id).unwrap().unwrap();
    assert_eq!(product.name, "Pearl Ring");
    assert_eq!(product.price_cents, 1999);
}
