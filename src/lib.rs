pub mod cart;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod notifications;
pub mod pagination;
pub mod payments;
pub mod uploads;
pub mod util;

use axum::{Router, middleware::from_fn_with_state};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::AppState;
use crate::handlers::{admin, public, webhooks};

/// Build the full application router.
///
/// Catalog reads and the webhook are stateless; cart, checkout and admin
/// routes run inside the `sid` session middleware.
pub fn app(state: AppState) -> Router {
    let session_routes = handlers::storefront_router()
        .merge(admin::router())
        .layer(from_fn_with_state(state.clone(), middleware::load_session));

    Router::new()
        .merge(public::router())
        .merge(webhooks::router())
        .merge(handlers::checkout_router())
        .merge(session_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
