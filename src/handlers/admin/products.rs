use axum::{extract::State, http::StatusCode};
use serde::Serialize;

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path, Query};
use crate::models::{CreateProduct, Product, ProductFilter, UpdateProduct};
use crate::pagination::{Paginated, PaginationQuery};

pub async fn list_products(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationQuery>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Paginated<Product>>> {
    let conn = state.db.get()?;
    let (products, total) = queries::list_products_paginated(
        &conn,
        &filter,
        pagination.limit(),
        pagination.offset(),
    )?;
    Ok(Json(Paginated::new(products, total, &pagination)))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Product>> {
    let conn = state.db.get()?;
    let product = queries::get_product_by_id(&conn, id)?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;
    Ok(Json(product))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<CreateProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    let price_cents = input.validate()?;
    let conn = state.db.get()?;
    let product = queries::create_product(&conn, &input, price_cents)?;
    tracing::info!(product_id = product.id, name = %product.name, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateProduct>,
) -> Result<Json<Product>> {
    let price_cents = input.validate()?;
    let conn = state.db.get()?;

    if !queries::update_product(&conn, id, &input, price_cents)? {
        return Err(AppError::NotFound("Product not found".into()));
    }

    let product = queries::get_product_by_id(&conn, id)?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;
    Ok(Json(product))
}

#[derive(Debug, Serialize)]
pub struct DeletedProduct {
    pub message: &'static str,
    pub data: Product,
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeletedProduct>> {
    let conn = state.db.get()?;
    let product = queries::get_product_by_id(&conn, id)?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;

    queries::delete_product(&conn, id)?;
    tracing::info!(product_id = id, "Product deleted");

    Ok(Json(DeletedProduct {
        message: "Product deleted",
        data: product,
    }))
}
