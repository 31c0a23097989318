use axum::{extract::State, response::Response};
use serde::Serialize;

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::models::{GallerySummary, Hero};
use crate::uploads::image_response;

#[derive(Debug, Serialize)]
pub struct HeroList {
    pub success: bool,
    pub data: Vec<Hero>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct HeroDetail {
    pub success: bool,
    pub data: Hero,
}

pub async fn list_heroes(State(state): State<AppState>) -> Result<Json<HeroList>> {
    let conn = state.db.get()?;
    let heroes = queries::list_heroes(&conn)?;
    Ok(Json(HeroList {
        success: true,
        count: heroes.len(),
        data: heroes,
    }))
}

pub async fn get_hero(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<HeroDetail>> {
    let conn = state.db.get()?;
    let hero = queries::get_hero_by_id(&conn, id)?
        .ok_or_else(|| AppError::NotFound("Hero not found".into()))?;
    Ok(Json(HeroDetail {
        success: true,
        data: hero,
    }))
}

pub async fn get_hero_image(
    State(state): State<AppState>,
    Path((id, idx)): Path<(i64, String)>,
) -> Result<Response> {
    let idx: i64 = idx
        .parse()
        .ok()
        .filter(|i| *i >= 0)
        .ok_or_else(|| AppError::BadRequest("Invalid image index".into()))?;

    let conn = state.db.get()?;
    let image = queries::get_hero_image(&conn, id, idx)?
        .ok_or_else(|| AppError::NotFound("Image not found".into()))?;
    Ok(image_response(image))
}

pub async fn list_gallery(State(state): State<AppState>) -> Result<Json<Vec<GallerySummary>>> {
    let conn = state.db.get()?;
    Ok(Json(queries::list_gallery(&conn)?))
}

pub async fn get_gallery_avatar(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response> {
    let conn = state.db.get()?;
    let image = queries::get_gallery_avatar(&conn, id)?
        .ok_or_else(|| AppError::NotFound("Avatar not found".into()))?;
    Ok(image_response(image))
}

/// Invalid indexes are reported as missing images.
pub async fn get_gallery_image(
    State(state): State<AppState>,
    Path((id, idx)): Path<(i64, String)>,
) -> Result<Response> {
    let not_found = || AppError::NotFound("Image not found".into());
    let idx: i64 = idx.parse().ok().filter(|i| *i >= 0).ok_or_else(not_found)?;

    let conn = state.db.get()?;
    let image = queries::get_gallery_image(&conn, id, idx)?.ok_or_else(not_found)?;
    Ok(image_response(image))
}
