use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::PgConnection;
use uuid::Uuid;

use luvo_shared::clients::db::DbPool;
use luvo_shared::errors::{AppError, AppResult, ErrorCode};

use crate::lifecycle::call::{close_out, CallStatus, EndReason};
use crate::lifecycle::interaction::{decide_toggle, ReactionKind, ToggleAction};
use crate::lifecycle::stream::StreamStatus;
use crate::models::{
    CallParticipant, CallSession, CameraSwitch, NewCallParticipant, NewCallSession,
    NewCameraSwitch, NewStream, NewStreamCamera, NewStreamInteraction, NewStreamViewer, Stream,
    StreamCamera, StreamInteraction, StreamViewer,
};
use crate::schema::{
    call_participants, call_sessions, camera_switches, stream_cameras, stream_interactions,
    stream_viewers, streams,
};

use super::{
    AnsweredCall, CallDetail, EndedCall, EndedStream, InteractionCounts, ReactionOutcome,
    SessionStore, StreamJoin,
};

type PooledPg = PooledConnection<ConnectionManager<PgConnection>>;

/// Postgres-backed session store.
///
/// Multi-step operations run inside a transaction with the session row
/// locked (`SELECT ... FOR UPDATE`), so state checks, roster mutations and
/// count recomputation are serialized per session. Single-step transitions
/// are conditional updates filtered on the expected prior status.
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> AppResult<PooledPg> {
        self.pool
            .get()
            .map_err(|e| AppError::internal(format!("database connection error: {e}")))
    }
}

fn parse_call_status(raw: &str) -> AppResult<CallStatus> {
    raw.parse().map_err(AppError::internal)
}

fn parse_stream_status(raw: &str) -> AppResult<StreamStatus> {
    raw.parse().map_err(AppError::internal)
}

fn recount_viewers(conn: &mut PgConnection, stream_id: Uuid) -> AppResult<Stream> {
    let active: i64 = stream_viewers::table
        .filter(stream_viewers::stream_id.eq(stream_id))
        .filter(stream_viewers::is_active.eq(true))
        .count()
        .get_result(conn)?;

    let stream = diesel::update(streams::table.find(stream_id))
        .set(streams::current_viewers.eq(active as i32))
        .get_result::<Stream>(conn)?;
    Ok(stream)
}

fn recount_interactions(conn: &mut PgConnection, stream_id: Uuid) -> AppResult<InteractionCounts> {
    let count_kind = |conn: &mut PgConnection, kind: &str| -> AppResult<i64> {
        Ok(stream_interactions::table
            .filter(stream_interactions::stream_id.eq(stream_id))
            .filter(stream_interactions::kind.eq(kind))
            .count()
            .get_result(conn)?)
    };
    let counts = InteractionCounts {
        likes: count_kind(conn, "like")? as i32,
        dislikes: count_kind(conn, "dislike")? as i32,
        shares: count_kind(conn, "share")? as i32,
    };

    diesel::update(streams::table.find(stream_id))
        .set((
            streams::likes_count.eq(counts.likes),
            streams::dislikes_count.eq(counts.dislikes),
            streams::shares_count.eq(counts.shares),
        ))
        .execute(conn)?;
    Ok(counts)
}

fn stream_for_update(conn: &mut PgConnection, stream_id: Uuid) -> AppResult<Stream> {
    streams::table
        .find(stream_id)
        .for_update()
        .first::<Stream>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::StreamNotFound, "stream not found"))
}

fn call_for_update(conn: &mut PgConnection, call_id: Uuid) -> AppResult<CallSession> {
    call_sessions::table
        .find(call_id)
        .for_update()
        .first::<CallSession>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::CallNotFound, "call not found"))
}

impl SessionStore for PgStore {
    // --- calls ---

    fn channel_name_taken(&self, name: &str) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let in_calls: i64 = call_sessions::table
            .filter(call_sessions::channel_name.eq(name))
            .count()
            .get_result(&mut conn)?;
        if in_calls > 0 {
            return Ok(true);
        }
        let in_streams: i64 = streams::table
            .filter(streams::channel_name.eq(name))
            .count()
            .get_result(&mut conn)?;
        Ok(in_streams > 0)
    }

    fn create_call(
        &self,
        initiator_id: Uuid,
        channel_name: &str,
        invitee_ids: &[Uuid],
        transport_uids: &[i64],
        initiator_uid: i64,
        now: DateTime<Utc>,
    ) -> AppResult<CallDetail> {
        let mut conn = self.conn()?;
        conn.transaction::<_, AppError, _>(|conn| {
            let call: CallSession = diesel::insert_into(call_sessions::table)
                .values(&NewCallSession {
                    initiator_id,
                    status: CallStatus::Initiated.to_string(),
                    channel_name: channel_name.to_string(),
                    started_at: now,
                })
                .get_result(conn)?;

            let mut rows = vec![NewCallParticipant {
                call_id: call.id,
                user_id: initiator_id,
                transport_uid: initiator_uid,
                invited_at: now,
                joined_at: Some(now),
                is_active: true,
            }];
            for (user_id, uid) in invitee_ids.iter().zip(transport_uids) {
                rows.push(NewCallParticipant {
                    call_id: call.id,
                    user_id: *user_id,
                    transport_uid: *uid,
                    invited_at: now,
                    joined_at: None,
                    is_active: false,
                });
            }
            let participants: Vec<CallParticipant> =
                diesel::insert_into(call_participants::table)
                    .values(&rows)
                    .get_results(conn)?;

            Ok(CallDetail { call, participants })
        })
    }

    fn get_call(&self, call_id: Uuid) -> AppResult<CallDetail> {
        let mut conn = self.conn()?;
        let call = call_sessions::table
            .find(call_id)
            .first::<CallSession>(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::CallNotFound, "call not found"))?;
        let participants = call_participants::table
            .filter(call_participants::call_id.eq(call_id))
            .order(call_participants::invited_at.asc())
            .load::<CallParticipant>(&mut conn)?;
        Ok(CallDetail { call, participants })
    }

    fn mark_ringing(
        &self,
        call_id: Uuid,
        user_id: Uuid,
        _now: DateTime<Utc>,
    ) -> AppResult<CallSession> {
        let mut conn = self.conn()?;
        conn.transaction::<_, AppError, _>(|conn| {
            let member: i64 = call_participants::table
                .filter(call_participants::call_id.eq(call_id))
                .filter(call_participants::user_id.eq(user_id))
                .count()
                .get_result(conn)?;
            if member == 0 {
                return Err(AppError::new(
                    ErrorCode::ParticipantNotFound,
                    "user is not part of this call",
                ));
            }

            let call = call_for_update(conn, call_id)?;
            let status = parse_call_status(&call.status)?;
            match status {
                CallStatus::Ringing => Ok(call),
                s if s.can_ring() => {
                    let call = diesel::update(call_sessions::table.find(call_id))
                        .set(call_sessions::status.eq(CallStatus::Ringing.to_string()))
                        .get_result::<CallSession>(conn)?;
                    Ok(call)
                }
                s => Err(AppError::illegal_transition("ring", &s.to_string())),
            }
        })
    }

    fn answer_call(
        &self,
        call_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<AnsweredCall> {
        let mut conn = self.conn()?;
        conn.transaction::<_, AppError, _>(|conn| {
            let call = call_for_update(conn, call_id)?;
            let status = parse_call_status(&call.status)?;
            if !status.can_answer() {
                return Err(AppError::illegal_transition("answer", &status.to_string()));
            }

            let existing: CallParticipant = call_participants::table
                .filter(call_participants::call_id.eq(call_id))
                .filter(call_participants::user_id.eq(user_id))
                .first(conn)
                .optional()?
                .ok_or_else(|| {
                    AppError::new(ErrorCode::ParticipantNotFound, "user is not part of this call")
                })?;

            // The row lock on the call serializes concurrent answers:
            // connected_at is only written while still unset.
            let call = diesel::update(call_sessions::table.find(call_id))
                .set((
                    call_sessions::status.eq(CallStatus::Connected.to_string()),
                    call_sessions::connected_at.eq(call.connected_at.unwrap_or(now)),
                ))
                .get_result::<CallSession>(conn)?;

            let participant = diesel::update(call_participants::table.find(existing.id))
                .set((
                    call_participants::joined_at.eq(existing.joined_at.unwrap_or(now)),
                    call_participants::left_at.eq(None::<DateTime<Utc>>),
                    call_participants::is_active.eq(true),
                ))
                .get_result::<CallParticipant>(conn)?;

            Ok(AnsweredCall { call, participant })
        })
    }

    fn end_call(
        &self,
        call_id: Uuid,
        reason: EndReason,
        now: DateTime<Utc>,
    ) -> AppResult<EndedCall> {
        let mut conn = self.conn()?;
        conn.transaction::<_, AppError, _>(|conn| {
            let call = call_for_update(conn, call_id)?;
            let status = parse_call_status(&call.status)?;
            if status.is_terminal() {
                return Ok(EndedCall {
                    call,
                    already_ended: true,
                });
            }

            let (final_status, duration) = close_out(call.connected_at, now);
            let call = diesel::update(call_sessions::table.find(call_id))
                .set((
                    call_sessions::status.eq(final_status.to_string()),
                    call_sessions::ended_at.eq(now),
                    call_sessions::duration_secs.eq(duration),
                    call_sessions::end_reason.eq(reason.to_string()),
                ))
                .get_result::<CallSession>(conn)?;

            diesel::update(
                call_participants::table
                    .filter(call_participants::call_id.eq(call_id))
                    .filter(call_participants::is_active.eq(true)),
            )
            .set((
                call_participants::left_at.eq(now),
                call_participants::is_active.eq(false),
            ))
            .execute(conn)?;

            Ok(EndedCall {
                call,
                already_ended: false,
            })
        })
    }

    fn stale_call_ids(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Uuid>> {
        let mut conn = self.conn()?;
        let ids = call_sessions::table
            .filter(call_sessions::status.eq_any(vec![
                CallStatus::Initiated.to_string(),
                CallStatus::Ringing.to_string(),
            ]))
            .filter(call_sessions::started_at.lt(cutoff))
            .select(call_sessions::id)
            .load::<Uuid>(&mut conn)?;
        Ok(ids)
    }

    // --- streams ---

    fn create_stream(
        &self,
        owner_id: Uuid,
        title: &str,
        channel_name: &str,
        is_paid: bool,
    ) -> AppResult<Stream> {
        let mut conn = self.conn()?;
        let stream = diesel::insert_into(streams::table)
            .values(&NewStream {
                owner_id,
                title: title.to_string(),
                status: StreamStatus::Upcoming.to_string(),
                channel_name: channel_name.to_string(),
                is_paid,
            })
            .get_result::<Stream>(&mut conn)?;
        Ok(stream)
    }

    fn get_stream(&self, stream_id: Uuid) -> AppResult<Stream> {
        let mut conn = self.conn()?;
        streams::table
            .find(stream_id)
            .first::<Stream>(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::StreamNotFound, "stream not found"))
    }

    fn list_live_streams(&self) -> AppResult<Vec<Stream>> {
        let mut conn = self.conn()?;
        Ok(streams::table
            .filter(streams::status.eq(StreamStatus::Live.to_string()))
            .order(streams::started_at.desc())
            .load::<Stream>(&mut conn)?)
    }

    fn start_stream(&self, stream_id: Uuid, now: DateTime<Utc>) -> AppResult<Stream> {
        let mut conn = self.conn()?;
        // Conditional update: only an upcoming stream goes live.
        let updated = diesel::update(
            streams::table
                .find(stream_id)
                .filter(streams::status.eq(StreamStatus::Upcoming.to_string())),
        )
        .set((
            streams::status.eq(StreamStatus::Live.to_string()),
            streams::started_at.eq(now),
        ))
        .get_result::<Stream>(&mut conn)
        .optional()?;

        match updated {
            Some(stream) => Ok(stream),
            None => {
                let stream = self.get_stream(stream_id)?;
                Err(AppError::illegal_transition("start", &stream.status))
            }
        }
    }

    fn end_stream(&self, stream_id: Uuid, now: DateTime<Utc>) -> AppResult<EndedStream> {
        let mut conn = self.conn()?;
        conn.transaction::<_, AppError, _>(|conn| {
            let updated = diesel::update(
                streams::table
                    .find(stream_id)
                    .filter(streams::status.eq(StreamStatus::Live.to_string())),
            )
            .set((
                streams::status.eq(StreamStatus::Ended.to_string()),
                streams::ended_at.eq(now),
                streams::current_viewers.eq(0),
            ))
            .get_result::<Stream>(conn)
            .optional()?;

            let stream = match updated {
                Some(stream) => stream,
                None => {
                    let stream = streams::table
                        .find(stream_id)
                        .first::<Stream>(conn)
                        .optional()?
                        .ok_or_else(|| {
                            AppError::new(ErrorCode::StreamNotFound, "stream not found")
                        })?;
                    return Err(AppError::illegal_transition("end", &stream.status));
                }
            };

            let disconnected = diesel::update(
                stream_viewers::table
                    .filter(stream_viewers::stream_id.eq(stream_id))
                    .filter(stream_viewers::is_active.eq(true)),
            )
            .set((
                stream_viewers::left_at.eq(now),
                stream_viewers::is_active.eq(false),
            ))
            .execute(conn)?;

            Ok(EndedStream {
                stream,
                viewers_disconnected: disconnected as i32,
            })
        })
    }

    fn join_stream(
        &self,
        stream_id: Uuid,
        user_id: Uuid,
        transport_uid: i64,
        now: DateTime<Utc>,
    ) -> AppResult<StreamJoin> {
        let mut conn = self.conn()?;
        conn.transaction::<_, AppError, _>(|conn| {
            let stream = stream_for_update(conn, stream_id)?;
            let status = parse_stream_status(&stream.status)?;
            if !status.accepts_viewers() {
                return Err(AppError::illegal_transition("join", &status.to_string()));
            }

            let existing: Option<StreamViewer> = stream_viewers::table
                .filter(stream_viewers::stream_id.eq(stream_id))
                .filter(stream_viewers::user_id.eq(user_id))
                .first(conn)
                .optional()?;

            let viewer = match existing {
                Some(row) => diesel::update(stream_viewers::table.find(row.id))
                    .set((
                        stream_viewers::left_at.eq(None::<DateTime<Utc>>),
                        stream_viewers::is_active.eq(true),
                    ))
                    .get_result::<StreamViewer>(conn)?,
                None => diesel::insert_into(stream_viewers::table)
                    .values(&NewStreamViewer {
                        stream_id,
                        user_id,
                        transport_uid,
                        joined_at: now,
                    })
                    .get_result::<StreamViewer>(conn)?,
            };

            let stream = recount_viewers(conn, stream_id)?;
            Ok(StreamJoin { stream, viewer })
        })
    }

    fn leave_stream(
        &self,
        stream_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Stream> {
        let mut conn = self.conn()?;
        conn.transaction::<_, AppError, _>(|conn| {
            stream_for_update(conn, stream_id)?;

            let deactivated = diesel::update(
                stream_viewers::table
                    .filter(stream_viewers::stream_id.eq(stream_id))
                    .filter(stream_viewers::user_id.eq(user_id))
                    .filter(stream_viewers::is_active.eq(true)),
            )
            .set((
                stream_viewers::left_at.eq(now),
                stream_viewers::is_active.eq(false),
            ))
            .execute(conn)?;
            if deactivated == 0 {
                return Err(AppError::new(
                    ErrorCode::ViewerNotFound,
                    "no active viewer for this user",
                ));
            }

            recount_viewers(conn, stream_id)
        })
    }

    fn list_viewers(&self, stream_id: Uuid) -> AppResult<Vec<StreamViewer>> {
        let mut conn = self.conn()?;
        Ok(stream_viewers::table
            .filter(stream_viewers::stream_id.eq(stream_id))
            .order(stream_viewers::joined_at.asc())
            .load::<StreamViewer>(&mut conn)?)
    }

    fn stream_uid_taken(&self, stream_id: Uuid, transport_uid: i64) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let viewers: i64 = stream_viewers::table
            .filter(stream_viewers::stream_id.eq(stream_id))
            .filter(stream_viewers::transport_uid.eq(transport_uid))
            .count()
            .get_result(&mut conn)?;
        if viewers > 0 {
            return Ok(true);
        }
        let cameras: i64 = stream_cameras::table
            .filter(stream_cameras::stream_id.eq(stream_id))
            .filter(stream_cameras::transport_uid.eq(transport_uid))
            .count()
            .get_result(&mut conn)?;
        Ok(cameras > 0)
    }

    // --- cameras ---

    fn stream_key_taken(&self, key: &str) -> AppResult<bool> {
        let mut conn = self.conn()?;
        let count: i64 = stream_cameras::table
            .filter(stream_cameras::stream_key.eq(key))
            .count()
            .get_result(&mut conn)?;
        Ok(count > 0)
    }

    fn register_camera(
        &self,
        stream_id: Uuid,
        label: &str,
        device_info: serde_json::Value,
        stream_key: &str,
        transport_uid: i64,
        now: DateTime<Utc>,
    ) -> AppResult<StreamCamera> {
        let mut conn = self.conn()?;
        self.get_stream(stream_id)?;
        let camera = diesel::insert_into(stream_cameras::table)
            .values(&NewStreamCamera {
                stream_id,
                label: label.to_string(),
                device_info,
                stream_key: stream_key.to_string(),
                transport_uid,
                last_seen_at: now,
            })
            .get_result::<StreamCamera>(&mut conn)?;
        Ok(camera)
    }

    fn get_camera(&self, camera_id: Uuid) -> AppResult<StreamCamera> {
        let mut conn = self.conn()?;
        stream_cameras::table
            .find(camera_id)
            .first::<StreamCamera>(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::CameraNotFound, "camera not found"))
    }

    fn list_cameras(&self, stream_id: Uuid) -> AppResult<Vec<StreamCamera>> {
        let mut conn = self.conn()?;
        Ok(stream_cameras::table
            .filter(stream_cameras::stream_id.eq(stream_id))
            .order(stream_cameras::created_at.asc())
            .load::<StreamCamera>(&mut conn)?)
    }

    fn promote_camera(&self, camera_id: Uuid) -> AppResult<StreamCamera> {
        let mut conn = self.conn()?;
        conn.transaction::<_, AppError, _>(|conn| {
            let camera = stream_cameras::table
                .find(camera_id)
                .for_update()
                .first::<StreamCamera>(conn)
                .optional()?
                .ok_or_else(|| AppError::new(ErrorCode::CameraNotFound, "camera not found"))?;

            // One update scoped by stream id: every row's is_primary becomes
            // (id == target), so two racing promotions serialize on the row
            // locks and the loser's result still holds the invariant.
            diesel::update(
                stream_cameras::table.filter(stream_cameras::stream_id.eq(camera.stream_id)),
            )
            .set(stream_cameras::is_primary.eq(stream_cameras::id.eq(camera_id)))
            .execute(conn)?;

            Ok(stream_cameras::table
                .find(camera_id)
                .first::<StreamCamera>(conn)?)
        })
    }

    fn camera_heartbeat(&self, camera_id: Uuid, now: DateTime<Utc>) -> AppResult<StreamCamera> {
        let mut conn = self.conn()?;
        diesel::update(stream_cameras::table.find(camera_id))
            .set((
                stream_cameras::last_seen_at.eq(now),
                stream_cameras::is_active.eq(true),
            ))
            .get_result::<StreamCamera>(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::CameraNotFound, "camera not found"))
    }

    fn record_switch(
        &self,
        switch: NewCameraSwitch,
        now: DateTime<Utc>,
    ) -> AppResult<CameraSwitch> {
        let mut conn = self.conn()?;
        let row = diesel::insert_into(camera_switches::table)
            .values((&switch, camera_switches::switched_at.eq(now)))
            .get_result::<CameraSwitch>(&mut conn)?;
        Ok(row)
    }

    fn list_switches(&self, stream_id: Uuid) -> AppResult<Vec<CameraSwitch>> {
        let mut conn = self.conn()?;
        Ok(camera_switches::table
            .filter(camera_switches::stream_id.eq(stream_id))
            .order(camera_switches::switched_at.asc())
            .load::<CameraSwitch>(&mut conn)?)
    }

    // --- interactions ---

    fn toggle_reaction(
        &self,
        stream_id: Uuid,
        user_id: Uuid,
        kind: ReactionKind,
        _now: DateTime<Utc>,
    ) -> AppResult<ReactionOutcome> {
        let mut conn = self.conn()?;
        conn.transaction::<_, AppError, _>(|conn| {
            // Lock the stream row so toggle + recount serialize per stream.
            stream_for_update(conn, stream_id)?;

            let existing: Option<StreamInteraction> = stream_interactions::table
                .filter(stream_interactions::stream_id.eq(stream_id))
                .filter(stream_interactions::user_id.eq(user_id))
                .filter(stream_interactions::kind.eq_any(vec!["like", "dislike"]))
                .first(conn)
                .optional()?;
            let existing_kind = existing
                .as_ref()
                .map(|row| row.kind.parse::<ReactionKind>())
                .transpose()
                .map_err(AppError::internal)?;

            let action = decide_toggle(existing_kind, kind);
            match (action, existing) {
                (ToggleAction::Added, _) => {
                    diesel::insert_into(stream_interactions::table)
                        .values(&NewStreamInteraction {
                            stream_id,
                            user_id,
                            kind: kind.to_string(),
                            platform: None,
                            metadata: None,
                        })
                        .execute(conn)?;
                }
                (ToggleAction::Removed, Some(row)) => {
                    diesel::delete(stream_interactions::table.find(row.id)).execute(conn)?;
                }
                (ToggleAction::Flipped, Some(row)) => {
                    diesel::update(stream_interactions::table.find(row.id))
                        .set(stream_interactions::kind.eq(kind.to_string()))
                        .execute(conn)?;
                }
                (_, None) => {
                    return Err(AppError::internal("reaction row vanished mid-toggle"))
                }
            }

            let counts = recount_interactions(conn, stream_id)?;
            Ok(ReactionOutcome { action, counts })
        })
    }

    fn add_share(
        &self,
        stream_id: Uuid,
        user_id: Uuid,
        platform: Option<String>,
        metadata: Option<serde_json::Value>,
        _now: DateTime<Utc>,
    ) -> AppResult<InteractionCounts> {
        let mut conn = self.conn()?;
        conn.transaction::<_, AppError, _>(|conn| {
            stream_for_update(conn, stream_id)?;

            diesel::insert_into(stream_interactions::table)
                .values(&NewStreamInteraction {
                    stream_id,
                    user_id,
                    kind: "share".to_string(),
                    platform,
                    metadata,
                })
                .execute(conn)?;

            recount_interactions(conn, stream_id)
        })
    }
}
