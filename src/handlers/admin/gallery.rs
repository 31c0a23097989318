use axum::extract::{Multipart, State};
use serde::Serialize;

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::models::GalleryEntry;
use crate::uploads::{multipart_error, read_image};

pub const MAX_GALLERY_IMAGES: usize = 8;

#[derive(Debug, Serialize)]
pub struct GalleryCreated {
    pub success: bool,
    pub product: GalleryEntry,
}

/// Multipart upload: text `name`, optional file `avatar`, up to eight
/// `gallery` files.
pub async fn create_gallery_entry(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<GalleryCreated>> {
    let mut name = None;
    let mut avatar = None;
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(String::from);
        match field_name.as_deref() {
            Some("name") => {
                name = Some(field.text().await.map_err(multipart_error)?);
            }
            Some("avatar") => {
                if avatar.is_some() {
                    return Err(AppError::BadRequest("Only one avatar allowed".into()));
                }
                avatar = Some(read_image(field).await?);
            }
            Some("gallery") => {
                if images.len() == MAX_GALLERY_IMAGES {
                    return Err(AppError::BadRequest(format!(
                        "At most {} gallery images allowed",
                        MAX_GALLERY_IMAGES
                    )));
                }
                images.push(read_image(field).await?);
            }
            other => {
                return Err(AppError::BadRequest(format!(
                    "Unexpected field: {}",
                    other.unwrap_or_default()
                )));
            }
        }
    }

    let name = name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "Unnamed".to_string());

    let conn = state.db.get()?;
    let entry = queries::create_gallery_entry(&conn, &name, avatar.as_ref(), &images)?;
    tracing::info!(
        gallery_id = entry.id,
        has_avatar = avatar.is_some(),
        images = images.len(),
        "Gallery entry created"
    );

    Ok(Json(GalleryCreated {
        success: true,
        product: entry,
    }))
}
