use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use luvo_shared::errors::AppResult;
use luvo_shared::types::api::ApiResponse;
use luvo_shared::types::auth::AuthUser;

use crate::store::{InteractionCounts, ReactionOutcome};
use crate::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct SharePayload {
    pub platform: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

// POST /streams/:id/like
pub async fn toggle_like(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ReactionOutcome>>> {
    Ok(Json(ApiResponse::ok(
        state.interactions.toggle_like(stream_id, auth_user.id)?,
    )))
}

// POST /streams/:id/dislike
pub async fn toggle_dislike(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ReactionOutcome>>> {
    Ok(Json(ApiResponse::ok(
        state.interactions.toggle_dislike(stream_id, auth_user.id)?,
    )))
}

// POST /streams/:id/share
pub async fn share_stream(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<Uuid>,
    payload: Option<Json<SharePayload>>,
) -> AppResult<Json<ApiResponse<InteractionCounts>>> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let counts =
        state
            .interactions
            .share(stream_id, auth_user.id, payload.platform, payload.metadata)?;
    Ok(Json(ApiResponse::ok(counts)))
}
