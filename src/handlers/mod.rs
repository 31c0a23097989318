pub mod admin;
pub mod cart;
pub mod checkout;
pub mod public;
pub mod webhooks;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::db::AppState;

/// Ad-hoc checkout and the return page. Neither touches the visitor session.
pub fn checkout_router() -> Router<AppState> {
    Router::new()
        .route("/checkout/create-session", post(checkout::create_session))
        .route("/success", get(checkout::success_page))
}

pub fn storefront_router() -> Router<AppState> {
    Router::new()
        .route("/cart", get(cart::get_cart))
        .route("/cart/add", post(cart::add_to_cart))
        .route("/cart/checkout", post(checkout::checkout_cart))
        .route(
            "/cart/{product_id}",
            put(cart::update_cart_item).delete(cart::remove_from_cart),
        )
}
