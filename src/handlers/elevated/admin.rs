// handlers/elevated/admin.rs - Moderation, verification and publishing

use axum::extract::State;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{Account, Class, DashboardStats, Event, Notification, Report, WeekGuide};
use crate::error::ApiError;
use crate::handlers::extract::{Json, Path, Query};
use crate::handlers::validate::{filled, optional_text, require_fields, text, Pagination};
use crate::middleware::{ApiResponse, ApiResult, AuthContext};
use crate::services::mailer::{deliver, Email};
use crate::services::{notify, week};
use crate::types::{NotificationKind, ReportStatus, Role};

/// GET /admin/stats
pub async fn stats_get(State(state): State<AppState>) -> ApiResult<DashboardStats> {
    Ok(ApiResponse::success(state.store.dashboard_stats().await?))
}

#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    pub role: Option<Role>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /admin/users?role=
pub async fn users_get(State(state): State<AppState>, Query(query): Query<UsersQuery>) -> ApiResult<Vec<Account>> {
    let page = state.page(&Pagination {
        page: query.page,
        limit: query.limit,
    });
    Ok(ApiResponse::success(state.store.list_accounts(query.role, page).await?))
}

#[derive(Debug, Deserialize)]
pub struct ReportsQuery {
    pub status: Option<ReportStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /admin/reports?status=
pub async fn reports_get(State(state): State<AppState>, Query(query): Query<ReportsQuery>) -> ApiResult<Vec<Report>> {
    let page = state.page(&Pagination {
        page: query.page,
        limit: query.limit,
    });
    Ok(ApiResponse::success(state.store.list_reports(query.status, page).await?))
}

#[derive(Debug, Deserialize)]
pub struct ReportReview {
    pub status: Option<ReportStatus>,
}

/// PUT /admin/reports/:id - notifies the reporter
pub async fn report_put(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<ReportReview>,
) -> ApiResult<Report> {
    let status = match body.status {
        Some(ReportStatus::Pending) => {
            return Err(ApiError::bad_request("Status must be reviewed, resolved or dismissed"));
        }
        Some(status) => status,
        None => return Err(ApiError::bad_request("Please provide all required fields: status")),
    };

    let mut report = state
        .store
        .find_report(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Report not found"))?;
    report.status = status;
    report.reviewed_by = Some(auth.id);
    report.updated_at = Utc::now();
    state.store.save_report(&report).await?;

    notify(
        state.store.as_ref(),
        auth.id,
        Notification::new(
            report.reporter_id,
            NotificationKind::ReportUpdate,
            "Your report was reviewed",
            format!("A moderator marked your report as {}", status_label(status)),
            None,
        ),
    )
    .await;

    info!(report_id = %id, status = ?status, admin_id = %auth.id, "Report reviewed");
    Ok(ApiResponse::success(report).with_message("Report updated successfully"))
}

fn status_label(status: ReportStatus) -> &'static str {
    match status {
        ReportStatus::Pending => "pending",
        ReportStatus::Reviewed => "reviewed",
        ReportStatus::Resolved => "resolved",
        ReportStatus::Dismissed => "dismissed",
    }
}

/// PUT /admin/collaborators/:id/verify - notifies and emails the collaborator
pub async fn verify_collaborator_put(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Account> {
    let found = state
        .store
        .find_account(id)
        .await?
        .filter(|found| found.account.role == Role::Collaborator)
        .ok_or_else(|| ApiError::not_found("Collaborator not found"))?;

    if !state.store.verify_collaborator(id).await? {
        return Ok(ApiResponse::success(found.account).with_message("Collaborator is already verified"));
    }
    let account = state
        .store
        .find_account(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Collaborator not found"))?
        .account;

    notify(
        state.store.as_ref(),
        auth.id,
        Notification::new(
            account.id,
            NotificationKind::CollaboratorVerified,
            "Your account is verified",
            "You can now publish classes and events",
            None,
        ),
    )
    .await;
    deliver(state.mailer.as_ref(), Email::collaborator_verified(&account)).await;

    info!(account_id = %account.id, admin_id = %auth.id, "Collaborator verified");
    Ok(ApiResponse::success(account).with_message("Collaborator verified successfully"))
}

#[derive(Debug, Default, Deserialize)]
pub struct PublishInput {
    pub published: Option<bool>,
}

/// PUT /admin/classes/:id/publish - `{published}` defaults to true
pub async fn class_publish_put(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<PublishInput>>,
) -> ApiResult<Class> {
    let published = body.and_then(|Json(b)| b.published).unwrap_or(true);
    if !state.store.set_class_published(id, published).await? {
        return Err(ApiError::not_found("Class not found"));
    }
    let class = state
        .store
        .find_class(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Class not found"))?;

    let message = if published { "Class published" } else { "Class unpublished" };
    Ok(ApiResponse::success(class).with_message(message))
}

/// PUT /admin/events/:id/publish
pub async fn event_publish_put(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<PublishInput>>,
) -> ApiResult<Event> {
    let published = body.and_then(|Json(b)| b.published).unwrap_or(true);
    if !state.store.set_event_published(id, published).await? {
        return Err(ApiError::not_found("Event not found"));
    }
    let event = state
        .store
        .find_event(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event not found"))?;

    let message = if published { "Event published" } else { "Event unpublished" };
    Ok(ApiResponse::success(event).with_message(message))
}

#[derive(Debug, Deserialize)]
pub struct WeekGuideInput {
    pub title: Option<String>,
    pub baby_size: Option<String>,
    pub baby_development: Option<String>,
    pub mother_changes: Option<String>,
    #[serde(default)]
    pub tips: Vec<String>,
}

/// PUT /admin/weeks/:week - create or replace the guide for a week
pub async fn week_put(
    State(state): State<AppState>,
    Path(week_number): Path<i32>,
    Json(body): Json<WeekGuideInput>,
) -> ApiResult<WeekGuide> {
    if !week::is_valid_week(week_number) {
        return Err(ApiError::bad_request(format!(
            "Week must be between {} and {}",
            week::FIRST_WEEK,
            week::TOTAL_WEEKS
        )));
    }
    require_fields(&[
        ("title", filled(&body.title)),
        ("baby_development", filled(&body.baby_development)),
    ])?;

    let guide = WeekGuide {
        week: week_number,
        title: text(body.title),
        baby_size: optional_text(body.baby_size),
        baby_development: text(body.baby_development),
        mother_changes: optional_text(body.mother_changes),
        tips: body
            .tips
            .into_iter()
            .map(|tip| tip.trim().to_string())
            .filter(|tip| !tip.is_empty())
            .collect(),
        updated_at: Utc::now(),
    };
    state.store.save_week_guide(&guide).await?;

    Ok(ApiResponse::success(guide).with_message("Week guide saved"))
}
