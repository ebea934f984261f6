use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{
    call_participants, call_sessions, camera_switches, stream_cameras, stream_interactions,
    stream_payments, stream_viewers, streams,
};

// --- CallSession ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = call_sessions)]
pub struct CallSession {
    pub id: Uuid,
    pub initiator_id: Uuid,
    pub status: String,
    pub channel_name: String,
    pub started_at: DateTime<Utc>,
    pub connected_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_secs: Option<i32>,
    pub end_reason: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = call_sessions)]
pub struct NewCallSession {
    pub initiator_id: Uuid,
    pub status: String,
    pub channel_name: String,
    pub started_at: DateTime<Utc>,
}

// --- CallParticipant ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = call_participants)]
pub struct CallParticipant {
    pub id: Uuid,
    pub call_id: Uuid,
    pub user_id: Uuid,
    pub transport_uid: i64,
    pub invited_at: DateTime<Utc>,
    pub joined_at: Option<DateTime<Utc>>,
    pub left_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = call_participants)]
pub struct NewCallParticipant {
    pub call_id: Uuid,
    pub user_id: Uuid,
    pub transport_uid: i64,
    pub invited_at: DateTime<Utc>,
    pub joined_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

// --- Stream ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = streams)]
pub struct Stream {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub status: String,
    pub channel_name: String,
    pub is_paid: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub current_viewers: i32,
    pub likes_count: i32,
    pub dislikes_count: i32,
    pub shares_count: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = streams)]
pub struct NewStream {
    pub owner_id: Uuid,
    pub title: String,
    pub status: String,
    pub channel_name: String,
    pub is_paid: bool,
}

// --- StreamViewer ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = stream_viewers)]
pub struct StreamViewer {
    pub id: Uuid,
    pub stream_id: Uuid,
    pub user_id: Uuid,
    pub transport_uid: i64,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = stream_viewers)]
pub struct NewStreamViewer {
    pub stream_id: Uuid,
    pub user_id: Uuid,
    pub transport_uid: i64,
    pub joined_at: DateTime<Utc>,
}

// --- StreamCamera ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = stream_cameras)]
pub struct StreamCamera {
    pub id: Uuid,
    pub stream_id: Uuid,
    pub label: String,
    pub device_info: serde_json::Value,
    pub stream_key: String,
    pub transport_uid: i64,
    pub is_active: bool,
    pub is_primary: bool,
    pub last_seen_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = stream_cameras)]
pub struct NewStreamCamera {
    pub stream_id: Uuid,
    pub label: String,
    pub device_info: serde_json::Value,
    pub stream_key: String,
    pub transport_uid: i64,
    pub last_seen_at: DateTime<Utc>,
}

// --- CameraSwitch (append-only audit trail) ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = camera_switches)]
pub struct CameraSwitch {
    pub id: Uuid,
    pub stream_id: Uuid,
    pub from_camera_id: Option<Uuid>,
    pub to_camera_id: Uuid,
    pub actor_id: Uuid,
    pub switched_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = camera_switches)]
pub struct NewCameraSwitch {
    pub stream_id: Uuid,
    pub from_camera_id: Option<Uuid>,
    pub to_camera_id: Uuid,
    pub actor_id: Uuid,
}

// --- StreamInteraction ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = stream_interactions)]
pub struct StreamInteraction {
    pub id: Uuid,
    pub stream_id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub platform: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = stream_interactions)]
pub struct NewStreamInteraction {
    pub stream_id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub platform: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

// --- StreamPayment ---

#[derive(Debug, Queryable, Identifiable, Serialize, Deserialize, Clone)]
#[diesel(table_name = stream_payments)]
pub struct StreamPayment {
    pub id: Uuid,
    pub stream_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub paid_at: DateTime<Utc>,
}
