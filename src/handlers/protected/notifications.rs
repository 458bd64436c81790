// handlers/protected/notifications.rs - The signed-in account's inbox

use axum::extract::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Notification;
use crate::error::ApiError;
use crate::handlers::extract::{Path, Query};
use crate::handlers::validate::Pagination;
use crate::middleware::{ApiResponse, ApiResult, AuthContext};

#[derive(Debug, Deserialize)]
pub struct InboxQuery {
    #[serde(default)]
    pub unread: bool,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /notifications?unread=true - newest first
pub async fn notifications_get(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<InboxQuery>,
) -> ApiResult<Vec<Notification>> {
    let page = state.page(&Pagination {
        page: query.page,
        limit: query.limit,
    });
    Ok(ApiResponse::success(
        state.store.list_notifications(auth.id, query.unread, page).await?,
    ))
}

/// PUT /notifications/:id/read - another account's notification reads as missing
pub async fn notification_read_put(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state
        .store
        .find_notification(id)
        .await?
        .filter(|n| n.account_id == auth.id)
        .ok_or_else(|| ApiError::not_found("Notification not found"))?;

    state.store.mark_read(id).await?;
    Ok(ApiResponse::message("Notification marked as read"))
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: u64,
}

/// PUT /notifications/read-all
pub async fn notifications_read_all_put(State(state): State<AppState>, auth: AuthContext) -> ApiResult<MarkedRead> {
    let updated = state.store.mark_all_read(auth.id).await?;
    Ok(ApiResponse::success(MarkedRead { updated }).with_message("All notifications marked as read"))
}
