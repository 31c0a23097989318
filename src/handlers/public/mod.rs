mod catalog;
mod media;

pub use catalog::*;
pub use media::*;

use axum::{Router, routing::get};
use serde::Serialize;

use crate::db::AppState;
use crate::extractors::Json;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/products", get(list_products))
        .route("/api/products/{id}", get(get_product))
        .route("/api/hero", get(list_heroes))
        .route("/api/hero/{id}", get(get_hero))
        .route("/api/heroimg/{id}/{idx}", get(get_hero_image))
        .route("/api/gallery", get(list_gallery))
        .route("/api/gallery/{id}/avatar", get(get_gallery_avatar))
        .route("/api/gallery/{id}/gallery/{idx}", get(get_gallery_image))
}
