//! API route definitions.

pub mod executions;
pub mod health;

use axum::Router;

use crate::api::server::AppState;

/// Create the status API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest("/executions", executions::router())
        .with_state(state)
}
