use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use luvo_shared::errors::AppResult;
use luvo_shared::types::api::ApiResponse;
use luvo_shared::types::auth::AuthUser;

use crate::lifecycle::window::WindowQuota;
use crate::AppState;

// GET /swipes/:scope/quota
pub async fn get_quota(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(scope): Path<String>,
) -> AppResult<Json<ApiResponse<WindowQuota>>> {
    let quota = state.swipes.quota(&scope, auth_user.id).await?;
    Ok(Json(ApiResponse::ok(quota)))
}

// POST /swipes/:scope
pub async fn record_swipe(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(scope): Path<String>,
) -> AppResult<Json<ApiResponse<WindowQuota>>> {
    let quota = state.swipes.record(&scope, auth_user.id).await?;
    Ok(Json(ApiResponse::ok(quota)))
}
