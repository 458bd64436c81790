// handlers/public/catalog.rs - Published classes, events and weekly guides
//
// Anonymous clients only ever see published content; drafts are reachable
// through the owner's /mine listings.

use axum::extract::State;
use serde::Serialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{Class, Event, Review, Video, WeekGuide};
use crate::database::CatalogFilter;
use crate::error::ApiError;
use crate::handlers::extract::{Path, Query};
use crate::handlers::validate::Pagination;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::week;

#[derive(Debug, Serialize)]
pub struct ClassDetail {
    #[serde(flatten)]
    pub class: Class,
    pub videos: Vec<Video>,
}

/// GET /classes
pub async fn classes_get(State(state): State<AppState>, Query(paging): Query<Pagination>) -> ApiResult<Vec<Class>> {
    let filter = CatalogFilter {
        published_only: true,
        ..Default::default()
    };
    let classes = state.store.list_classes(filter, state.page(&paging)).await?;
    Ok(ApiResponse::success(classes))
}

/// GET /classes/:id
pub async fn class_get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<ClassDetail> {
    let class = published_class(&state, id).await?;
    let videos = state.store.list_videos(class.id).await?;
    Ok(ApiResponse::success(ClassDetail { class, videos }))
}

/// GET /classes/:id/reviews
pub async fn class_reviews_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(paging): Query<Pagination>,
) -> ApiResult<Vec<Review>> {
    let class = published_class(&state, id).await?;
    let reviews = state.store.list_reviews(class.id, state.page(&paging)).await?;
    Ok(ApiResponse::success(reviews))
}

/// GET /events - published events that have not started yet, soonest first
pub async fn events_get(State(state): State<AppState>, Query(paging): Query<Pagination>) -> ApiResult<Vec<Event>> {
    let filter = CatalogFilter {
        published_only: true,
        upcoming_only: true,
        ..Default::default()
    };
    let events = state.store.list_events(filter, state.page(&paging)).await?;
    Ok(ApiResponse::success(events))
}

/// GET /events/:id
pub async fn event_get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Event> {
    let event = state
        .store
        .find_event(id)
        .await?
        .filter(|e| e.is_published)
        .ok_or_else(|| ApiError::not_found("Event not found"))?;
    Ok(ApiResponse::success(event))
}

/// GET /pregnancy/weeks/:week
pub async fn week_guide_get(State(state): State<AppState>, Path(week_number): Path<i32>) -> ApiResult<WeekGuide> {
    if !week::is_valid_week(week_number) {
        return Err(ApiError::bad_request(format!(
            "Week must be between {} and {}",
            week::FIRST_WEEK,
            week::TOTAL_WEEKS
        )));
    }
    let guide = state
        .store
        .find_week_guide(week_number)
        .await?
        .ok_or_else(|| ApiError::not_found("Week guide not found"))?;
    Ok(ApiResponse::success(guide))
}

async fn published_class(state: &AppState, id: Uuid) -> Result<Class, ApiError> {
    state
        .store
        .find_class(id)
        .await?
        .filter(|c| c.is_published)
        .ok_or_else(|| ApiError::not_found("Class not found"))
}
