use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::MediaKind;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Media {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub public_id: String,
    pub url: String,
    pub content_type: String,
    pub kind: MediaKind,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

impl MediaKind {
    /// Accepted upload types; anything else is rejected before reaching the provider
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        if essence.starts_with("image/") {
            Some(MediaKind::Image)
        } else if essence.starts_with("video/") {
            Some(MediaKind::Video)
        } else if essence == "application/pdf" {
            Some(MediaKind::Document)
        } else {
            None
        }
    }

    /// Resource type segment used by the storage provider
    pub fn resource_type(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Document => "raw",
        }
    }
}
