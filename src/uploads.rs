//! Image upload validation and serving, shared by heroes and the gallery.

use axum::{
    extract::multipart::{Field, MultipartError},
    http::header,
    response::{IntoResponse, Response},
};

use crate::error::{AppError, Result};
use crate::models::{ImageUpload, StoredImage};

pub const MAX_IMAGE_BYTES: usize = 8 * 1024 * 1024;

/// Request body limit for an upload of `files` images plus form overhead.
pub const fn upload_body_limit(files: usize) -> usize {
    files * MAX_IMAGE_BYTES + 1024 * 1024
}

pub fn multipart_error(e: MultipartError) -> AppError {
    AppError::BadRequest(e.body_text())
}

/// Check an uploaded file and keep it in memory.
pub fn validate_image(content_type: Option<&str>, data: Vec<u8>) -> Result<ImageUpload> {
    let content_type = content_type
        .filter(|ct| ct.starts_with("image/"))
        .ok_or_else(|| AppError::BadRequest("Only images allowed".into()))?;
    if data.len() > MAX_IMAGE_BYTES {
        return Err(AppError::BadRequest("File >8MB".into()));
    }
    if data.is_empty() {
        return Err(AppError::BadRequest("Empty file".into()));
    }
    Ok(ImageUpload {
        content_type: content_type.to_string(),
        data,
    })
}

pub async fn read_image(field: Field<'_>) -> Result<ImageUpload> {
    let content_type = field.content_type().map(String::from);
    let data = field.bytes().await.map_err(multipart_error)?;
    validate_image(content_type.as_deref(), data.to_vec())
}

/// Serve a stored image with its original content type.
pub fn image_response(image: StoredImage) -> Response {
    (
        [
            (header::CONTENT_TYPE, image.content_type),
            (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
        ],
        image.data,
    )
        .into_response()
}
