use axum::{
    extract::{Multipart, State},
    http::StatusCode,
};
use serde::Serialize;

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::models::{Hero, HeroInput};
use crate::uploads::{multipart_error, read_image};

pub const MAX_HERO_IMAGES: usize = 3;

#[derive(Debug, Serialize)]
pub struct HeroResponse {
    pub success: bool,
    pub message: &'static str,
    pub data: Hero,
}

#[derive(Debug, Serialize)]
pub struct HeroDeleted {
    pub success: bool,
    pub message: &'static str,
}

pub async fn create_hero(
    State(state): State<AppState>,
    Json(input): Json<HeroInput>,
) -> Result<(StatusCode, Json<HeroResponse>)> {
    let fields = input.validate()?;
    let conn = state.db.get()?;
    let hero = queries::create_hero(&conn, &fields)?;

    Ok((
        StatusCode::CREATED,
        Json(HeroResponse {
            success: true,
            message: "Hero created successfully",
            data: hero,
        }),
    ))
}

pub async fn update_hero(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<HeroInput>,
) -> Result<Json<HeroResponse>> {
    let fields = input.validate()?;
    let conn = state.db.get()?;

    if !queries::update_hero(&conn, id, &fields)? {
        return Err(AppError::NotFound("Hero not found".into()));
    }
    let hero = queries::get_hero_by_id(&conn, id)?
        .ok_or_else(|| AppError::NotFound("Hero not found".into()))?;

    Ok(Json(HeroResponse {
        success: true,
        message: "Hero updated successfully",
        data: hero,
    }))
}

pub async fn delete_hero(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<HeroDeleted>> {
    let conn = state.db.get()?;
    if !queries::delete_hero(&conn, id)? {
        return Err(AppError::NotFound("Hero not found".into()));
    }
    Ok(Json(HeroDeleted {
        success: true,
        message: "Hero deleted successfully",
    }))
}

#[derive(Debug, Serialize)]
pub struct HeroImagesUploaded {
    pub success: bool,
    pub hero: Hero,
}

/// Replace a hero's images with the `heroImg` files of a multipart upload.
pub async fn upload_hero_images(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<HeroImagesUploaded>> {
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(String::from);
        if field_name.as_deref() != Some("heroImg") {
            return Err(AppError::BadRequest(format!(
                "Unexpected field: {}",
                field_name.unwrap_or_default()
            )));
        }
        if images.len() == MAX_HERO_IMAGES {
            return Err(AppError::BadRequest(format!(
                "At most {} images allowed",
                MAX_HERO_IMAGES
            )));
        }
        images.push(read_image(field).await?);
    }

    if images.is_empty() {
        return Err(AppError::BadRequest("No images uploaded".into()));
    }

    let conn = state.db.get()?;
    if !queries::replace_hero_images(&conn, id, &images)? {
        return Err(AppError::NotFound("Hero not found".into()));
    }
    let hero = queries::get_hero_by_id(&conn, id)?
        .ok_or_else(|| AppError::NotFound("Hero not found".into()))?;

    tracing::info!(hero_id = id, count = images.len(), "Hero images replaced");
    Ok(Json(HeroImagesUploaded {
        success: true,
        hero,
    }))
}
