mod auth;
mod gallery;
mod heroes;
mod products;

pub use auth::*;
pub use gallery::*;
pub use heroes::*;
pub use products::*;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
};

use crate::db::AppState;
use crate::middleware::require_admin;
use crate::uploads::upload_body_limit;

pub fn router() -> Router<AppState> {
    // Session endpoints are reachable without an admin session
    let session_routes = Router::new()
        .route("/admin/login", post(login))
        .route("/admin/logout", post(logout))
        .route("/admin/me", get(me));

    let upload_routes = Router::new()
        .route("/admin/heroimg/{id}", post(upload_hero_images))
        .layer(DefaultBodyLimit::max(upload_body_limit(MAX_HERO_IMAGES)))
        .merge(
            Router::new()
                .route("/admin/gallery", post(create_gallery_entry))
                .layer(DefaultBodyLimit::max(upload_body_limit(MAX_GALLERY_IMAGES + 1))),
        );

    let protected_routes = Router::new()
        .route("/admin/products", get(list_products).post(create_product))
        .route(
            "/admin/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/admin/hero", post(create_hero))
        .route("/admin/hero/{id}", put(update_hero).delete(delete_hero))
        .merge(upload_routes)
        .route_layer(middleware::from_fn(require_admin));

    session_routes.merge(protected_routes)
}
