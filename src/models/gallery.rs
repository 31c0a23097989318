use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryEntry {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
}

/// Listing row: sizes only, image bytes are served separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GallerySummary {
    pub id: i64,
    pub name: String,
    /// Avatar size in bytes (None = no avatar)
    pub avatar_size: Option<i64>,
    pub gallery_count: i64,
}

/// An uploaded image held in memory until it is written to the database.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub content_type: String,
    pub data: Vec<u8>,
}

/// A stored image ready to be served.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub content_type: String,
    pub data: Vec<u8>,
}
