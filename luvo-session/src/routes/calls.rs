use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use luvo_shared::errors::{AppError, AppResult};
use luvo_shared::types::api::ApiResponse;
use luvo_shared::types::auth::AuthUser;

use crate::lifecycle::call::EndReason;
use crate::models::CallSession;
use crate::services::call_service::{AnswerResponse, InitiatedCall};
use crate::store::CallDetail;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct InitiateCallPayload {
    pub invitee_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Default)]
pub struct EndCallPayload {
    pub reason: Option<String>,
}

// POST /calls
pub async fn initiate_call(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<InitiateCallPayload>,
) -> AppResult<Json<ApiResponse<InitiatedCall>>> {
    let initiated = state.calls.initiate(auth_user.id, &payload.invitee_ids)?;
    Ok(Json(ApiResponse::ok(initiated)))
}

// GET /calls/:id
pub async fn get_call(
    _auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(call_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CallDetail>>> {
    Ok(Json(ApiResponse::ok(state.calls.get(call_id)?)))
}

// POST /calls/:id/ring
pub async fn ring_call(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(call_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CallSession>>> {
    Ok(Json(ApiResponse::ok(
        state.calls.ring(call_id, auth_user.id)?,
    )))
}

// POST /calls/:id/answer
pub async fn answer_call(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(call_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<AnswerResponse>>> {
    Ok(Json(ApiResponse::ok(
        state.calls.answer(call_id, auth_user.id)?,
    )))
}

// POST /calls/:id/end
pub async fn end_call(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(call_id): Path<Uuid>,
    payload: Option<Json<EndCallPayload>>,
) -> AppResult<Json<ApiResponse<CallSession>>> {
    let reason = match payload.and_then(|Json(p)| p.reason) {
        Some(raw) => raw
            .parse::<EndReason>()
            .map_err(AppError::bad_request)?,
        None => EndReason::Hangup,
    };
    let call = state.calls.end(call_id, Some(auth_user.id), reason)?;
    Ok(Json(ApiResponse::ok(call)))
}
