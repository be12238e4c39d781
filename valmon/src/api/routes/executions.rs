//! Monitor execution routes.

use axum::{Json, Router, extract::State, routing::get};

use crate::api::error::{ApiError, ApiResult};
use crate::api::server::AppState;
use crate::scheduler::CycleSummary;

/// Create the executions router.
pub fn router() -> Router<AppState> {
    Router::new().route("/latest", get(latest_execution))
}

/// Latest poll cycle summary.
///
/// Before the first cycle completes there is nothing to return; that is
/// reported as a server error rather than an empty success.
async fn latest_execution(State(state): State<AppState>) -> ApiResult<Json<CycleSummary>> {
    match CycleSummary::load_latest(state.store.as_ref()).await? {
        Some(summary) => Ok(Json(summary)),
        None => Err(ApiError::internal("no monitor execution recorded yet")),
    }
}
