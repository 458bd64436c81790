// handlers/protected/media.rs - File uploads through the storage provider

use axum::extract::{Multipart, State};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Media;
use crate::error::ApiError;
use crate::handlers::extract::{Path, Query};
use crate::handlers::validate::Pagination;
use crate::middleware::{ApiResponse, ApiResult, AuthContext};
use crate::services::Upload;
use crate::types::MediaKind;

/// POST /media/upload - multipart field `file`, optional text field `folder`
pub async fn upload_post(State(state): State<AppState>, auth: AuthContext, mut multipart: Multipart) -> ApiResult<Media> {
    let max_bytes = state.config.api.max_upload_bytes;
    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut folder: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?;
                file = Some((file_name, content_type, bytes.to_vec()));
            }
            Some("folder") => folder = Some(field.text().await?),
            _ => {}
        }
    }

    let (file_name, content_type, bytes) = file.ok_or_else(|| ApiError::bad_request("Please provide a file to upload"))?;
    if bytes.is_empty() {
        return Err(ApiError::bad_request("Uploaded file is empty"));
    }
    if bytes.len() > max_bytes {
        return Err(ApiError::payload_too_large(format!(
            "File exceeds the upload size limit of {} bytes",
            max_bytes
        )));
    }
    let kind = MediaKind::from_content_type(&content_type)
        .ok_or_else(|| ApiError::bad_request("Only image, video and PDF files are allowed"))?;

    let stored = state
        .files
        .upload(Upload {
            bytes,
            file_name,
            content_type: content_type.clone(),
            kind,
            folder,
        })
        .await?;

    let media = Media {
        id: Uuid::new_v4(),
        owner_id: auth.id,
        public_id: stored.public_id,
        url: stored.url,
        content_type,
        kind,
        size_bytes: stored.size_bytes,
        created_at: Utc::now(),
    };

    if let Err(e) = state.store.insert_media(&media).await {
        // do not leave an orphan at the provider
        if let Err(cleanup) = state.files.destroy(&media.public_id, kind).await {
            warn!(public_id = %media.public_id, error = %cleanup, "Failed to remove orphaned upload");
        }
        return Err(e.into());
    }

    info!(media_id = %media.id, kind = ?kind, size = media.size_bytes, "File uploaded");
    Ok(ApiResponse::created(media).with_message("File uploaded successfully"))
}

/// GET /media
pub async fn media_get(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(paging): Query<Pagination>,
) -> ApiResult<Vec<Media>> {
    Ok(ApiResponse::success(state.store.list_media(auth.id, state.page(&paging)).await?))
}

/// DELETE /media/:id - removed at the provider first, then locally
pub async fn media_delete(State(state): State<AppState>, auth: AuthContext, Path(id): Path<Uuid>) -> ApiResult<()> {
    let media = state
        .store
        .find_media(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Media not found"))?;
    auth.require_owner_or_admin(media.owner_id)?;

    state.files.destroy(&media.public_id, media.kind).await?;
    state.store.delete_media(media.id).await?;
    Ok(ApiResponse::message("File deleted successfully"))
}
