use axum::extract::{Extension, State};

use crate::cart::CartStore;
use crate::db::AppState;
use crate::error::Result;
use crate::extractors::{Json, Path};
use crate::models::{AddToCart, CartView, Session, UpdateCartItem};

pub async fn get_cart(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<CartView>> {
    let conn = state.db.get()?;
    Ok(Json(CartStore::new(&conn, &session.id).list()?))
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(input): Json<AddToCart>,
) -> Result<Json<CartView>> {
    let conn = state.db.get()?;
    let cart = CartStore::new(&conn, &session.id).add(input.product_id, input.quantity.unwrap_or(1))?;
    Ok(Json(cart))
}

pub async fn update_cart_item(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(product_id): Path<i64>,
    Json(input): Json<UpdateCartItem>,
) -> Result<Json<CartView>> {
    let conn = state.db.get()?;
    let cart = CartStore::new(&conn, &session.id).update(product_id, input.quantity)?;
    Ok(Json(cart))
}

pub async fn remove_from_cart(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(product_id): Path<i64>,
) -> Result<Json<CartView>> {
    let conn = state.db.get()?;
    Ok(Json(CartStore::new(&conn, &session.id).remove(product_id)?))
}
