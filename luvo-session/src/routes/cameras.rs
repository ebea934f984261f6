use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use luvo_shared::errors::AppResult;
use luvo_shared::types::api::ApiResponse;
use luvo_shared::types::auth::AuthUser;

use crate::models::{CameraSwitch, StreamCamera};
use crate::services::stream_service::{CameraRegistration, CameraView};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterCameraPayload {
    pub label: String,
    #[serde(default)]
    pub device_info: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct SwitchCameraPayload {
    pub from_camera_id: Option<Uuid>,
    pub to_camera_id: Uuid,
}

// POST /streams/:id/cameras
pub async fn register_camera(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<Uuid>,
    Json(payload): Json<RegisterCameraPayload>,
) -> AppResult<Json<ApiResponse<CameraRegistration>>> {
    let registration = state.streams.register_camera(
        stream_id,
        auth_user.id,
        &payload.label,
        payload.device_info,
    )?;
    Ok(Json(ApiResponse::ok(registration)))
}

// GET /streams/:id/cameras
pub async fn list_cameras(
    _auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<CameraView>>>> {
    Ok(Json(ApiResponse::ok(state.streams.cameras(stream_id)?)))
}

// POST /cameras/:id/promote
pub async fn promote_camera(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(camera_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<StreamCamera>>> {
    Ok(Json(ApiResponse::ok(
        state.streams.promote_camera(camera_id, auth_user.id)?,
    )))
}

// POST /cameras/:id/heartbeat
pub async fn camera_heartbeat(
    _auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(camera_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CameraView>>> {
    Ok(Json(ApiResponse::ok(
        state.streams.camera_heartbeat(camera_id)?,
    )))
}

// POST /streams/:id/switch
pub async fn switch_camera(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<Uuid>,
    Json(payload): Json<SwitchCameraPayload>,
) -> AppResult<Json<ApiResponse<CameraSwitch>>> {
    let switch = state.streams.switch_camera(
        stream_id,
        auth_user.id,
        payload.from_camera_id,
        payload.to_camera_id,
    )?;
    Ok(Json(ApiResponse::ok(switch)))
}

// GET /streams/:id/switches
pub async fn switch_history(
    _auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<CameraSwitch>>>> {
    Ok(Json(ApiResponse::ok(
        state.streams.switch_history(stream_id)?,
    )))
}
