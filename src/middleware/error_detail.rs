//! Outside production, internal error detail is shown in the failure envelope.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};

use crate::app::AppState;
use crate::error::ErrorDetail;

pub async fn expose_error_detail(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if state.config.is_production() {
        return response;
    }

    match response.extensions().get::<ErrorDetail>().cloned() {
        Some(ErrorDetail(detailed)) => (response.status(), Json(detailed)).into_response(),
        None => response,
    }
}
