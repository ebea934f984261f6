use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use luvo_shared::errors::AppResult;
use luvo_shared::types::api::ApiResponse;
use luvo_shared::types::auth::AuthUser;

use crate::models::{Stream, StreamViewer};
use crate::services::stream_service::StreamJoinResponse;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateStreamPayload {
    pub title: String,
    #[serde(default)]
    pub is_paid: bool,
}

// POST /streams
pub async fn create_stream(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateStreamPayload>,
) -> AppResult<Json<ApiResponse<Stream>>> {
    let stream = state
        .streams
        .create(auth_user.id, &payload.title, payload.is_paid)?;
    Ok(Json(ApiResponse::ok(stream)))
}

// GET /streams/live
pub async fn list_live_streams(
    _auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<Stream>>>> {
    Ok(Json(ApiResponse::ok(state.streams.list_live()?)))
}

// GET /streams/:id
pub async fn get_stream(
    _auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Stream>>> {
    Ok(Json(ApiResponse::ok(state.streams.get(stream_id)?)))
}

// POST /streams/:id/start
pub async fn start_stream(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Stream>>> {
    Ok(Json(ApiResponse::ok(
        state.streams.start(stream_id, auth_user.id)?,
    )))
}

// POST /streams/:id/end
pub async fn end_stream(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Stream>>> {
    Ok(Json(ApiResponse::ok(
        state.streams.end(stream_id, auth_user.id)?,
    )))
}

// POST /streams/:id/join
pub async fn join_stream(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<StreamJoinResponse>>> {
    Ok(Json(ApiResponse::ok(
        state.streams.join(stream_id, auth_user.id)?,
    )))
}

// POST /streams/:id/leave
pub async fn leave_stream(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Stream>>> {
    Ok(Json(ApiResponse::ok(
        state.streams.leave(stream_id, auth_user.id)?,
    )))
}

// GET /streams/:id/viewers
pub async fn list_viewers(
    _auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<StreamViewer>>>> {
    Ok(Json(ApiResponse::ok(state.streams.viewers(stream_id)?)))
}
