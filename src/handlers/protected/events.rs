// handlers/protected/events.rs - Event authoring and registration
//
// Seat allocation happens inside the store as one atomic step, so racing
// registrants can never push an event past its capacity.

use axum::extract::State;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{Event, Notification, Registration};
use crate::database::CatalogFilter;
use crate::error::ApiError;
use crate::handlers::extract::{Json, Path, Query};
use crate::handlers::validate::{self, filled, optional_text, require_fields, text, Pagination};
use crate::middleware::{ApiResponse, ApiResult, AuthContext};
use crate::services::record;
use crate::types::{NotificationKind, RegistrationStatus};

async fn find_event(state: &AppState, id: Uuid) -> Result<Event, ApiError> {
    state
        .store
        .find_event(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event not found"))
}

#[derive(Debug, Deserialize)]
pub struct EventInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub is_online: Option<bool>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub capacity: Option<i32>,
    pub waitlist_enabled: Option<bool>,
}

fn check_schedule(event: &Event) -> Result<(), ApiError> {
    if let Some(ends_at) = event.ends_at {
        if ends_at <= event.starts_at {
            return Err(ApiError::bad_request("ends_at must be after starts_at"));
        }
    }
    if event.capacity <= 0 {
        return Err(ApiError::bad_request("capacity must be greater than 0"));
    }
    Ok(())
}

/// POST /events - created as a draft until an admin publishes it
pub async fn event_post(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<EventInput>,
) -> ApiResult<Event> {
    auth.require_verified_author()?;
    require_fields(&[
        ("title", filled(&body.title)),
        ("starts_at", body.starts_at.is_some()),
        ("capacity", body.capacity.is_some()),
    ])?;

    let starts_at = body.starts_at.unwrap_or_else(Utc::now);
    validate::future_instant("starts_at", starts_at)?;

    let mut event = Event::new(auth.id, text(body.title), starts_at, body.capacity.unwrap_or_default());
    event.description = optional_text(body.description);
    event.location = optional_text(body.location);
    event.is_online = body.is_online.unwrap_or(false);
    event.ends_at = body.ends_at;
    event.waitlist_enabled = body.waitlist_enabled.unwrap_or(false);
    check_schedule(&event)?;

    state.store.insert_event(&event).await?;
    info!(event_id = %event.id, organizer_id = %auth.id, "Event created");
    Ok(ApiResponse::created(event).with_message("Event created successfully"))
}

/// GET /events/mine
pub async fn events_mine_get(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(paging): Query<Pagination>,
) -> ApiResult<Vec<Event>> {
    let filter = CatalogFilter {
        owner_id: Some(auth.id),
        ..Default::default()
    };
    Ok(ApiResponse::success(state.store.list_events(filter, state.page(&paging)).await?))
}

/// PUT /events/:id
pub async fn event_put(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<EventInput>,
) -> ApiResult<Event> {
    let mut event = find_event(&state, id).await?;
    auth.require_owner_or_admin(event.organizer_id)?;

    if let Some(title) = body.title {
        if title.trim().is_empty() {
            return Err(ApiError::bad_request("title cannot be empty"));
        }
        event.title = title.trim().to_string();
    }
    if let Some(description) = body.description {
        event.description = optional_text(Some(description));
    }
    if let Some(location) = body.location {
        event.location = optional_text(Some(location));
    }
    if let Some(is_online) = body.is_online {
        event.is_online = is_online;
    }
    if let Some(starts_at) = body.starts_at {
        validate::future_instant("starts_at", starts_at)?;
        event.starts_at = starts_at;
    }
    if body.ends_at.is_some() {
        event.ends_at = body.ends_at;
    }
    if let Some(capacity) = body.capacity {
        event.capacity = capacity;
    }
    if let Some(waitlist_enabled) = body.waitlist_enabled {
        event.waitlist_enabled = waitlist_enabled;
    }
    check_schedule(&event)?;
    event.updated_at = Utc::now();
    state.store.save_event(&event).await?;
    let event = find_event(&state, id).await?;

    Ok(ApiResponse::success(event).with_message("Event updated successfully"))
}

/// DELETE /events/:id
pub async fn event_delete(State(state): State<AppState>, auth: AuthContext, Path(id): Path<Uuid>) -> ApiResult<()> {
    let event = find_event(&state, id).await?;
    auth.require_owner_or_admin(event.organizer_id)?;

    state.store.delete_event(event.id).await?;
    info!(event_id = %id, actor_id = %auth.id, "Event deleted");
    Ok(ApiResponse::message("Event deleted successfully"))
}

/// POST /events/:id/register
pub async fn register_post(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Registration> {
    let event = find_event(&state, id).await?;
    if !event.is_published {
        return Err(ApiError::not_found("Event not found"));
    }
    if event.starts_at <= Utc::now() {
        return Err(ApiError::bad_request("This event has already started"));
    }

    let registration = state.store.register_attendee(event.id, auth.id).await?;
    let (title, message) = match registration.status {
        RegistrationStatus::Waitlisted => ("Added to the waitlist", "You have been added to the waitlist"),
        _ => ("Registration confirmed", "Successfully registered for the event"),
    };

    record(
        state.store.as_ref(),
        Notification::new(
            auth.id,
            NotificationKind::EventRegistration,
            title,
            format!("{}: {}", title, event.title),
            Some(format!("/events/{}", event.id)),
        ),
    )
    .await;

    info!(event_id = %event.id, account_id = %auth.id, status = ?registration.status, "Event registration");
    Ok(ApiResponse::created(registration).with_message(message))
}

/// DELETE /events/:id/register - frees the seat; waitlisted entries stay waitlisted
pub async fn register_delete(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Registration> {
    let registration = state.store.cancel_registration(id, auth.id).await?;
    Ok(ApiResponse::success(registration).with_message("Registration cancelled"))
}

#[derive(Debug, Serialize)]
pub struct RegisteredEvent {
    #[serde(flatten)]
    pub registration: Registration,
    pub event: Option<Event>,
}

/// GET /events/registered
pub async fn registered_get(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(paging): Query<Pagination>,
) -> ApiResult<Vec<RegisteredEvent>> {
    let registrations = state
        .store
        .list_account_registrations(auth.id, state.page(&paging))
        .await?;
    let events = try_join_all(registrations.iter().map(|r| state.store.find_event(r.event_id))).await?;

    let registered = registrations
        .into_iter()
        .zip(events)
        .map(|(registration, event)| RegisteredEvent { registration, event })
        .collect();
    Ok(ApiResponse::success(registered))
}

/// GET /events/:id/registrations - organizer or admin
pub async fn registrations_get(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<Registration>> {
    let event = find_event(&state, id).await?;
    auth.require_owner_or_admin(event.organizer_id)?;
    Ok(ApiResponse::success(state.store.list_registrations(event.id).await?))
}
