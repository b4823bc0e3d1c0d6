//! HTTP host: common routes plus a fallback that dispatches through the route table.

use crate::error::AppError;
use crate::handlers::dispatch;
use crate::response::success_one_ok;
use crate::routes::common_routes;
use crate::state::AppState;
use axum::{
    extract::State,
    http::Uri,
    response::{IntoResponse, Response},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

const BODY_LIMIT: usize = 64 * 1024;

/// Controllers resolve relations synchronously, so each request runs on a blocking thread.
async fn dispatch_route(State(state): State<AppState>, uri: Uri) -> Result<Response, AppError> {
    let path = uri.path().to_string();
    let data = tokio::task::spawn_blocking(move || dispatch(&state, &path))
        .await
        .map_err(|e| AppError::Internal(format!("controller task failed: {}", e)))??;
    Ok(success_one_ok(data).into_response())
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .merge(common_routes())
        .fallback(dispatch_route)
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
