// handlers/protected/classes.rs - Class authoring, enrollment and reviews
//
// Verified collaborators and admins author classes; anyone signed in may
// enroll in a published class and, once enrolled, review it.

use axum::extract::State;
use chrono::Utc;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{Class, Enrollment, RatingSummary, Review, Video};
use crate::database::CatalogFilter;
use crate::error::ApiError;
use crate::handlers::extract::{Json, Path, Query};
use crate::handlers::validate::{self, filled, optional_text, require_fields, text, Pagination};
use crate::middleware::{ApiResponse, ApiResult, AuthContext};

async fn find_class(state: &AppState, id: Uuid) -> Result<Class, ApiError> {
    state
        .store
        .find_class(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Class not found"))
}

#[derive(Debug, Deserialize)]
pub struct ClassInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// POST /classes - created as a draft until an admin publishes it
pub async fn class_post(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<ClassInput>,
) -> ApiResult<Class> {
    auth.require_verified_author()?;
    require_fields(&[("title", filled(&body.title))])?;

    let mut class = Class::new(auth.id, text(body.title));
    class.description = optional_text(body.description);
    class.category = optional_text(body.category);
    class.thumbnail_url = optional_text(body.thumbnail_url);
    state.store.insert_class(&class).await?;

    info!(class_id = %class.id, collaborator_id = %auth.id, "Class created");
    Ok(ApiResponse::created(class).with_message("Class created successfully"))
}

/// GET /classes/mine
pub async fn classes_mine_get(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(paging): Query<Pagination>,
) -> ApiResult<Vec<Class>> {
    let filter = CatalogFilter {
        owner_id: Some(auth.id),
        ..Default::default()
    };
    Ok(ApiResponse::success(state.store.list_classes(filter, state.page(&paging)).await?))
}

/// PUT /classes/:id
pub async fn class_put(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<ClassInput>,
) -> ApiResult<Class> {
    let mut class = find_class(&state, id).await?;
    auth.require_owner_or_admin(class.collaborator_id)?;

    if let Some(title) = body.title {
        if title.trim().is_empty() {
            return Err(ApiError::bad_request("title cannot be empty"));
        }
        class.title = title.trim().to_string();
    }
    if let Some(description) = body.description {
        class.description = optional_text(Some(description));
    }
    if let Some(category) = body.category {
        class.category = optional_text(Some(category));
    }
    if let Some(thumbnail_url) = body.thumbnail_url {
        class.thumbnail_url = optional_text(Some(thumbnail_url));
    }
    class.updated_at = Utc::now();
    state.store.save_class(&class).await?;
    let class = find_class(&state, id).await?;

    Ok(ApiResponse::success(class).with_message("Class updated successfully"))
}

/// DELETE /classes/:id - removes videos, enrollments and reviews with it
pub async fn class_delete(State(state): State<AppState>, auth: AuthContext, Path(id): Path<Uuid>) -> ApiResult<()> {
    let class = find_class(&state, id).await?;
    auth.require_owner_or_admin(class.collaborator_id)?;

    state.store.delete_class(class.id).await?;
    info!(class_id = %id, actor_id = %auth.id, "Class deleted");
    Ok(ApiResponse::message("Class deleted successfully"))
}

// Videos

#[derive(Debug, Deserialize)]
pub struct VideoInput {
    pub title: Option<String>,
    pub video_url: Option<String>,
    pub duration_seconds: Option<i32>,
    pub position: Option<i32>,
}

fn check_video_numbers(body: &VideoInput) -> Result<(), ApiError> {
    if matches!(body.duration_seconds, Some(d) if d < 0) {
        return Err(ApiError::bad_request("duration_seconds cannot be negative"));
    }
    if matches!(body.position, Some(p) if p < 1) {
        return Err(ApiError::bad_request("position must be at least 1"));
    }
    Ok(())
}

/// POST /classes/:id/videos - appended unless a position is given
pub async fn video_post(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<VideoInput>,
) -> ApiResult<Video> {
    let class = find_class(&state, id).await?;
    auth.require_owner(class.collaborator_id)?;
    require_fields(&[("title", filled(&body.title)), ("video_url", filled(&body.video_url))])?;
    check_video_numbers(&body)?;

    let existing = state.store.list_videos(class.id).await?;
    let next_position = existing.iter().map(|v| v.position).max().unwrap_or(0) + 1;
    let video = Video {
        id: Uuid::new_v4(),
        class_id: class.id,
        title: text(body.title),
        video_url: text(body.video_url),
        duration_seconds: body.duration_seconds.unwrap_or(0),
        position: body.position.unwrap_or(next_position),
        created_at: Utc::now(),
    };
    state.store.insert_video(&video).await?;

    Ok(ApiResponse::created(video).with_message("Video added successfully"))
}

/// PUT /classes/:id/videos/:video_id
pub async fn video_put(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((id, video_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<VideoInput>,
) -> ApiResult<Video> {
    let class = find_class(&state, id).await?;
    auth.require_owner(class.collaborator_id)?;
    check_video_numbers(&body)?;

    let mut video = state
        .store
        .find_video(class.id, video_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;

    if let Some(title) = optional_text(body.title) {
        video.title = title;
    }
    if let Some(video_url) = optional_text(body.video_url) {
        video.video_url = video_url;
    }
    if let Some(duration_seconds) = body.duration_seconds {
        video.duration_seconds = duration_seconds;
    }
    if let Some(position) = body.position {
        video.position = position;
    }
    state.store.save_video(&video).await?;

    Ok(ApiResponse::success(video).with_message("Video updated successfully"))
}

/// DELETE /classes/:id/videos/:video_id
pub async fn video_delete(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((id, video_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<()> {
    let class = find_class(&state, id).await?;
    auth.require_owner(class.collaborator_id)?;

    if !state.store.delete_video(class.id, video_id).await? {
        return Err(ApiError::not_found("Video not found"));
    }
    Ok(ApiResponse::message("Video deleted successfully"))
}

// Enrollment

#[derive(Debug, Serialize)]
pub struct EnrolledClass {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub class: Option<Class>,
}

/// POST /classes/:id/enroll
pub async fn enroll_post(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Enrollment> {
    let class = find_class(&state, id).await?;
    if !class.is_published {
        return Err(ApiError::not_found("Class not found"));
    }

    let enrollment = Enrollment::new(class.id, auth.id);
    state.store.enroll(&enrollment).await?;
    Ok(ApiResponse::created(enrollment).with_message("Enrolled successfully"))
}

/// GET /classes/enrolled
pub async fn enrolled_get(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(paging): Query<Pagination>,
) -> ApiResult<Vec<EnrolledClass>> {
    let enrollments = state.store.list_enrollments(auth.id, state.page(&paging)).await?;
    let classes = try_join_all(enrollments.iter().map(|e| state.store.find_class(e.class_id))).await?;

    let enrolled = enrollments
        .into_iter()
        .zip(classes)
        .map(|(enrollment, class)| EnrolledClass { enrollment, class })
        .collect();
    Ok(ApiResponse::success(enrolled))
}

#[derive(Debug, Deserialize)]
pub struct ProgressInput {
    pub progress: Option<i32>,
}

/// PUT /classes/:id/progress - reaching 100 stamps completion once
pub async fn progress_put(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<ProgressInput>,
) -> ApiResult<Enrollment> {
    let progress = body
        .progress
        .ok_or_else(|| ApiError::bad_request("Please provide all required fields: progress"))?;
    validate::range("progress", progress, 0, 100)?;

    let mut enrollment = state
        .store
        .find_enrollment(id, auth.id)
        .await?
        .ok_or_else(|| ApiError::not_found("You are not enrolled in this class"))?;
    enrollment.set_progress(progress);
    state.store.save_enrollment(&enrollment).await?;

    Ok(ApiResponse::success(enrollment).with_message("Progress updated"))
}

// Reviews

#[derive(Debug, Deserialize)]
pub struct ReviewInput {
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReviewResult {
    pub review: Review,
    pub rating: RatingSummary,
}

/// POST /classes/:id/reviews - one review per account, resubmitting replaces it
pub async fn review_post(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<ReviewInput>,
) -> ApiResult<ReviewResult> {
    let rating = body
        .rating
        .ok_or_else(|| ApiError::bad_request("Please provide all required fields: rating"))?;
    validate::range("rating", rating, 1, 5)?;

    let class = find_class(&state, id).await?;
    if state.store.find_enrollment(class.id, auth.id).await?.is_none() {
        return Err(ApiError::forbidden("You must be enrolled in this class to review it"));
    }

    let now = Utc::now();
    let review = Review {
        class_id: class.id,
        account_id: auth.id,
        rating,
        comment: optional_text(body.comment),
        created_at: now,
        updated_at: now,
    };
    let summary = state.store.upsert_review(&review).await?;

    Ok(ApiResponse::success(ReviewResult {
        review,
        rating: summary,
    })
    .with_message("Review saved"))
}
