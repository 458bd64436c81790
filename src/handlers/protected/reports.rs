// handlers/protected/reports.rs - Content reports for moderation

use axum::extract::State;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::Report;
use crate::error::ApiError;
use crate::handlers::extract::Json;
use crate::handlers::validate::{filled, optional_text, require_fields, text};
use crate::middleware::{ApiResponse, ApiResult, AuthContext};
use crate::types::ReportTarget;

#[derive(Debug, Deserialize)]
pub struct ReportInput {
    pub target: Option<ReportTarget>,
    pub target_id: Option<Uuid>,
    pub reason: Option<String>,
    pub details: Option<String>,
}

/// POST /reports - the reported record must exist
pub async fn report_post(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<ReportInput>,
) -> ApiResult<Report> {
    require_fields(&[
        ("target", body.target.is_some()),
        ("target_id", body.target_id.is_some()),
        ("reason", filled(&body.reason)),
    ])?;
    let (target, target_id) = match (body.target, body.target_id) {
        (Some(target), Some(target_id)) => (target, target_id),
        _ => return Err(ApiError::bad_request("Please provide all required fields: target, target_id")),
    };

    let exists = match target {
        ReportTarget::Post => state.store.find_post(target_id).await?.is_some(),
        ReportTarget::Comment => state.store.find_comment(target_id).await?.is_some(),
        ReportTarget::Group => state.store.find_group(target_id).await?.is_some(),
        ReportTarget::Account => state.store.find_account(target_id).await?.is_some(),
    };
    if !exists {
        return Err(ApiError::not_found("Reported content not found"));
    }

    let report = Report::new(auth.id, target, target_id, text(body.reason), optional_text(body.details));
    state.store.insert_report(&report).await?;

    info!(report_id = %report.id, target = ?target, "Report submitted");
    Ok(ApiResponse::created(report).with_message("Report submitted successfully"))
}
