// handlers/protected/pregnancy.rs - Pregnancy tracking (mothers only)
//
// The stored week is refreshed whenever a pregnancy is read, so it only
// lags between reads.

use axum::extract::State;
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{Pregnancy, SymptomLog, WeekGuide};
use crate::error::ApiError;
use crate::handlers::extract::{Json, Path, Query};
use crate::handlers::validate::{self, filled, optional_text, require_fields, text, Pagination};
use crate::middleware::{ApiResponse, ApiResult, AuthContext};
use crate::services::week;
use crate::types::PregnancyStatus;

/// Furthest a due date may be from today
const MAX_WEEKS_AHEAD: i64 = 42;

pub(crate) fn check_due_date(due_date: NaiveDate, today: NaiveDate) -> Result<(), ApiError> {
    validate::future_date("due_date", due_date, today)?;
    if due_date > today + Duration::weeks(MAX_WEEKS_AHEAD) {
        return Err(ApiError::bad_request(format!(
            "due_date cannot be more than {} weeks away",
            MAX_WEEKS_AHEAD
        )));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct PregnancyOverview {
    #[serde(flatten)]
    pub pregnancy: Pregnancy,
    pub trimester: i32,
    pub days_until_due: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_guide: Option<WeekGuide>,
}

/// Persist a new week if time has moved it on
async fn refreshed(state: &AppState, mut pregnancy: Pregnancy) -> Result<Pregnancy, ApiError> {
    if pregnancy.refresh_week(state.today()) {
        state
            .store
            .update_pregnancy_week(pregnancy.id, pregnancy.due_date, pregnancy.current_week)
            .await?;
    }
    Ok(pregnancy)
}

async fn owned(state: &AppState, auth: &AuthContext, id: Uuid) -> Result<Pregnancy, ApiError> {
    let pregnancy = state
        .store
        .find_pregnancy(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Pregnancy not found"))?;
    auth.require_owner(pregnancy.mother_id)?;
    Ok(pregnancy)
}

async fn current(state: &AppState, auth: &AuthContext) -> Result<Pregnancy, ApiError> {
    let pregnancy = state
        .store
        .active_pregnancy(auth.id)
        .await?
        .ok_or_else(|| ApiError::not_found("No active pregnancy found"))?;
    refreshed(state, pregnancy).await
}

#[derive(Debug, Deserialize)]
pub struct CreatePregnancy {
    pub due_date: Option<NaiveDate>,
    pub baby_name: Option<String>,
    pub notes: Option<String>,
}

/// POST /pregnancy
pub async fn pregnancy_post(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<CreatePregnancy>,
) -> ApiResult<Pregnancy> {
    let due_date = body
        .due_date
        .ok_or_else(|| ApiError::bad_request("Please provide all required fields: due_date"))?;
    let today = state.today();
    check_due_date(due_date, today)?;

    let mut pregnancy = Pregnancy::new(auth.id, due_date, today);
    pregnancy.baby_name = optional_text(body.baby_name);
    pregnancy.notes = optional_text(body.notes);
    state.store.insert_pregnancy(&pregnancy).await?;

    info!(pregnancy_id = %pregnancy.id, week = pregnancy.current_week, "Pregnancy created");
    Ok(ApiResponse::created(pregnancy).with_message("Pregnancy created successfully"))
}

/// GET /pregnancy/current
pub async fn pregnancy_current_get(State(state): State<AppState>, auth: AuthContext) -> ApiResult<PregnancyOverview> {
    let pregnancy = current(&state, &auth).await?;
    let today = state.today();
    let week_guide = state.store.find_week_guide(pregnancy.current_week).await?;

    Ok(ApiResponse::success(PregnancyOverview {
        trimester: week::trimester(pregnancy.current_week),
        days_until_due: week::days_until_due(pregnancy.due_date, today),
        week_guide,
        pregnancy,
    }))
}

/// GET /pregnancy/:id
pub async fn pregnancy_get(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Pregnancy> {
    let pregnancy = owned(&state, &auth, id).await?;
    Ok(ApiResponse::success(refreshed(&state, pregnancy).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePregnancy {
    pub due_date: Option<NaiveDate>,
    pub status: Option<PregnancyStatus>,
    pub baby_name: Option<String>,
    pub notes: Option<String>,
}

/// PUT /pregnancy/:id
pub async fn pregnancy_put(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePregnancy>,
) -> ApiResult<Pregnancy> {
    let mut pregnancy = owned(&state, &auth, id).await?;
    let today = state.today();

    if let Some(status) = body.status {
        pregnancy.status = status;
    }
    if let Some(due_date) = body.due_date {
        if pregnancy.is_active() {
            check_due_date(due_date, today)?;
        }
        pregnancy.due_date = due_date;
    }
    if let Some(baby_name) = body.baby_name {
        pregnancy.baby_name = optional_text(Some(baby_name));
    }
    if let Some(notes) = body.notes {
        pregnancy.notes = optional_text(Some(notes));
    }
    pregnancy.refresh_week(today);
    pregnancy.updated_at = Utc::now();

    // store rejects a second active pregnancy with 409
    state.store.save_pregnancy(&pregnancy).await?;
    Ok(ApiResponse::success(pregnancy).with_message("Pregnancy updated successfully"))
}

#[derive(Debug, Deserialize)]
pub struct CreateSymptom {
    pub symptom: Option<String>,
    pub severity: Option<i32>,
    pub notes: Option<String>,
}

/// POST /pregnancy/symptoms - logged against the active pregnancy
pub async fn symptom_post(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<CreateSymptom>,
) -> ApiResult<SymptomLog> {
    require_fields(&[("symptom", filled(&body.symptom)), ("severity", body.severity.is_some())])?;
    let severity = body.severity.unwrap_or_default();
    validate::range("severity", severity, 1, 10)?;

    let pregnancy = current(&state, &auth).await?;
    let log = SymptomLog::new(&pregnancy, text(body.symptom), severity, optional_text(body.notes));
    state.store.insert_symptom(&log).await?;

    Ok(ApiResponse::created(log).with_message("Symptom logged successfully"))
}

#[derive(Debug, Deserialize)]
pub struct SymptomQuery {
    pub week: Option<i32>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /pregnancy/symptoms?week=
pub async fn symptoms_get(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<SymptomQuery>,
) -> ApiResult<Vec<SymptomLog>> {
    if let Some(week_number) = query.week {
        validate::range("week", week_number, week::FIRST_WEEK, week::TOTAL_WEEKS)?;
    }
    let pregnancy = current(&state, &auth).await?;
    let page = state.page(&Pagination {
        page: query.page,
        limit: query.limit,
    });
    let logs = state.store.list_symptoms(pregnancy.id, query.week, page).await?;
    Ok(ApiResponse::success(logs))
}
