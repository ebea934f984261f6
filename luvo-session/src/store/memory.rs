use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use luvo_shared::errors::{AppError, AppResult, ErrorCode};

use crate::lifecycle::call::{close_out, CallStatus, EndReason};
use crate::lifecycle::interaction::{decide_toggle, ReactionKind, ToggleAction};
use crate::lifecycle::stream::StreamStatus;
use crate::models::{
    CallParticipant, CallSession, CameraSwitch, NewCameraSwitch, Stream, StreamCamera,
    StreamInteraction, StreamViewer,
};

use super::{
    AnsweredCall, CallDetail, EndedCall, EndedStream, InteractionCounts, ReactionOutcome,
    SessionStore, StreamJoin,
};

/// In-memory session store.
///
/// One lock guards all session state; every operation holds the write lock
/// for its whole duration, so each trait method is serializable exactly
/// like a single-statement database update. Backs the test suite.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    calls: HashMap<Uuid, CallSession>,
    participants: Vec<CallParticipant>,
    streams: HashMap<Uuid, Stream>,
    viewers: Vec<StreamViewer>,
    cameras: HashMap<Uuid, StreamCamera>,
    switches: Vec<CameraSwitch>,
    interactions: Vec<StreamInteraction>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn call_status(call: &CallSession) -> AppResult<CallStatus> {
    call.status.parse().map_err(AppError::internal)
}

fn stream_status(stream: &Stream) -> AppResult<StreamStatus> {
    stream.status.parse().map_err(AppError::internal)
}

impl State {
    fn call_mut(&mut self, call_id: Uuid) -> AppResult<&mut CallSession> {
        self.calls
            .get_mut(&call_id)
            .ok_or_else(|| AppError::new(ErrorCode::CallNotFound, "call not found"))
    }

    fn stream_mut(&mut self, stream_id: Uuid) -> AppResult<&mut Stream> {
        self.streams
            .get_mut(&stream_id)
            .ok_or_else(|| AppError::new(ErrorCode::StreamNotFound, "stream not found"))
    }

    fn recount_viewers(&mut self, stream_id: Uuid) -> i32 {
        let count = self
            .viewers
            .iter()
            .filter(|v| v.stream_id == stream_id && v.is_active)
            .count() as i32;
        if let Some(stream) = self.streams.get_mut(&stream_id) {
            stream.current_viewers = count;
        }
        count
    }

    fn recount_interactions(&mut self, stream_id: Uuid) -> InteractionCounts {
        let mut counts = InteractionCounts {
            likes: 0,
            dislikes: 0,
            shares: 0,
        };
        for row in self.interactions.iter().filter(|i| i.stream_id == stream_id) {
            match row.kind.as_str() {
                "like" => counts.likes += 1,
                "dislike" => counts.dislikes += 1,
                "share" => counts.shares += 1,
                _ => {}
            }
        }
        if let Some(stream) = self.streams.get_mut(&stream_id) {
            stream.likes_count = counts.likes;
            stream.dislikes_count = counts.dislikes;
            stream.shares_count = counts.shares;
        }
        counts
    }
}

impl SessionStore for MemoryStore {
    // --- calls ---

    fn channel_name_taken(&self, name: &str) -> AppResult<bool> {
        let state = self.state.read().unwrap();
        Ok(state.calls.values().any(|c| c.channel_name == name)
            || state.streams.values().any(|s| s.channel_name == name))
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
        let mut state = self.state.write().unwrap();

        let call = CallSession {
            id: Uuid::now_v7(),
            initiator_id,
            status: CallStatus::Initiated.to_string(),
            channel_name: channel_name.to_string(),
            started_at: now,
            connected_at: None,
            ended_at: None,
            duration_secs: None,
            end_reason: None,
        };

        let mut participants = vec![CallParticipant {
            id: Uuid::now_v7(),
            call_id: call.id,
            user_id: initiator_id,
            transport_uid: initiator_uid,
            invited_at: now,
            joined_at: Some(now),
            left_at: None,
            is_active: true,
        }];
        for (user_id, uid) in invitee_ids.iter().zip(transport_uids) {
            participants.push(CallParticipant {
                id: Uuid::now_v7(),
                call_id: call.id,
                user_id: *user_id,
                transport_uid: *uid,
                invited_at: now,
                joined_at: None,
                left_at: None,
                is_active: false,
            });
        }

        state.calls.insert(call.id, call.clone());
        state.participants.extend(participants.clone());

        Ok(CallDetail { call, participants })
    }

    fn get_call(&self, call_id: Uuid) -> AppResult<CallDetail> {
        let state = self.state.read().unwrap();
        let call = state
            .calls
            .get(&call_id)
            .cloned()
            .ok_or_else(|| AppError::new(ErrorCode::CallNotFound, "call not found"))?;
        let participants = state
            .participants
            .iter()
            .filter(|p| p.call_id == call_id)
            .cloned()
            .collect();
        Ok(CallDetail { call, participants })
    }

    fn mark_ringing(
        &self,
        call_id: Uuid,
        user_id: Uuid,
        _now: DateTime<Utc>,
    ) -> AppResult<CallSession> {
        let mut state = self.state.write().unwrap();

        if !state
            .participants
            .iter()
            .any(|p| p.call_id == call_id && p.user_id == user_id)
        {
            return Err(AppError::new(
                ErrorCode::ParticipantNotFound,
                "user is not part of this call",
            ));
        }

        let call = state.call_mut(call_id)?;
        let status = call_status(call)?;
        match status {
            CallStatus::Ringing => {}
            s if s.can_ring() => call.status = CallStatus::Ringing.to_string(),
            s => return Err(AppError::illegal_transition("ring", &s.to_string())),
        }
        Ok(call.clone())
    }

    fn answer_call(
        &self,
        call_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<AnsweredCall> {
        let mut state = self.state.write().unwrap();

        let call = state.call_mut(call_id)?;
        let status = call_status(call)?;
        if !status.can_answer() {
            return Err(AppError::illegal_transition("answer", &status.to_string()));
        }

        call.status = CallStatus::Connected.to_string();
        // First writer wins; a second concurrent answer sees it already set.
        if call.connected_at.is_none() {
            call.connected_at = Some(now);
        }
        let call = call.clone();

        let participant = state
            .participants
            .iter_mut()
            .find(|p| p.call_id == call_id && p.user_id == user_id)
            .ok_or_else(|| {
                AppError::new(ErrorCode::ParticipantNotFound, "user is not part of this call")
            })?;
        if participant.joined_at.is_none() {
            participant.joined_at = Some(now);
        }
        participant.left_at = None;
        participant.is_active = true;

        Ok(AnsweredCall {
            call,
            participant: participant.clone(),
        })
    }

    fn end_call(
        &self,
        call_id: Uuid,
        reason: EndReason,
        now: DateTime<Utc>,
    ) -> AppResult<EndedCall> {
        let mut state = self.state.write().unwrap();

        let call = state.call_mut(call_id)?;
        if call_status(call)?.is_terminal() {
            return Ok(EndedCall {
                call: call.clone(),
                already_ended: true,
            });
        }

        let (final_status, duration) = close_out(call.connected_at, now);
        call.status = final_status.to_string();
        call.ended_at = Some(now);
        call.duration_secs = Some(duration);
        call.end_reason = Some(reason.to_string());
        let call = call.clone();

        for p in state
            .participants
            .iter_mut()
            .filter(|p| p.call_id == call_id && p.is_active)
        {
            p.left_at = Some(now);
            p.is_active = false;
        }

        Ok(EndedCall {
            call,
            already_ended: false,
        })
    }

    fn stale_call_ids(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Uuid>> {
        let state = self.state.read().unwrap();
        Ok(state
            .calls
            .values()
            .filter(|c| {
                matches!(
                    call_status(c),
                    Ok(CallStatus::Initiated | CallStatus::Ringing)
                ) && c.started_at < cutoff
            })
            .map(|c| c.id)
            .collect())
    }

    // --- streams ---

    fn create_stream(
        &self,
        owner_id: Uuid,
        title: &str,
        channel_name: &str,
        is_paid: bool,
    ) -> AppResult<Stream> {
        let mut state = self.state.write().unwrap();
        let stream = Stream {
            id: Uuid::now_v7(),
            owner_id,
            title: title.to_string(),
            status: StreamStatus::Upcoming.to_string(),
            channel_name: channel_name.to_string(),
            is_paid,
            started_at: None,
            ended_at: None,
            current_viewers: 0,
            likes_count: 0,
            dislikes_count: 0,
            shares_count: 0,
            created_at: Utc::now(),
        };
        state.streams.insert(stream.id, stream.clone());
        Ok(stream)
    }

    fn get_stream(&self, stream_id: Uuid) -> AppResult<Stream> {
        let state = self.state.read().unwrap();
        state
            .streams
            .get(&stream_id)
            .cloned()
            .ok_or_else(|| AppError::new(ErrorCode::StreamNotFound, "stream not found"))
    }

    fn list_live_streams(&self) -> AppResult<Vec<Stream>> {
        let state = self.state.read().unwrap();
        Ok(state
            .streams
            .values()
            .filter(|s| matches!(stream_status(s), Ok(StreamStatus::Live)))
            .cloned()
            .collect())
    }

    fn start_stream(&self, stream_id: Uuid, now: DateTime<Utc>) -> AppResult<Stream> {
        let mut state = self.state.write().unwrap();
        let stream = state.stream_mut(stream_id)?;
        let status = stream_status(stream)?;
        if !status.can_start() {
            return Err(AppError::illegal_transition("start", &status.to_string()));
        }
        stream.status = StreamStatus::Live.to_string();
        stream.started_at = Some(now);
        Ok(stream.clone())
    }

    fn end_stream(&self, stream_id: Uuid, now: DateTime<Utc>) -> AppResult<EndedStream> {
        let mut state = self.state.write().unwrap();

        let stream = state.stream_mut(stream_id)?;
        let status = stream_status(stream)?;
        if !status.can_end() {
            return Err(AppError::illegal_transition("end", &status.to_string()));
        }
        stream.status = StreamStatus::Ended.to_string();
        stream.ended_at = Some(now);
        stream.current_viewers = 0;
        let stream = stream.clone();

        let mut disconnected = 0;
        for v in state
            .viewers
            .iter_mut()
            .filter(|v| v.stream_id == stream_id && v.is_active)
        {
            v.left_at = Some(now);
            v.is_active = false;
            disconnected += 1;
        }

        Ok(EndedStream {
            stream,
            viewers_disconnected: disconnected,
        })
    }

    fn join_stream(
        &self,
        stream_id: Uuid,
        user_id: Uuid,
        transport_uid: i64,
        now: DateTime<Utc>,
    ) -> AppResult<StreamJoin> {
        let mut state = self.state.write().unwrap();

        let stream = state.stream_mut(stream_id)?;
        let status = stream_status(stream)?;
        if !status.accepts_viewers() {
            return Err(AppError::illegal_transition("join", &status.to_string()));
        }

        let viewer = match state
            .viewers
            .iter_mut()
            .find(|v| v.stream_id == stream_id && v.user_id == user_id)
        {
            Some(existing) => {
                // Rejoin reactivates rather than duplicating the row.
                existing.left_at = None;
                existing.is_active = true;
                existing.clone()
            }
            None => {
                let viewer = StreamViewer {
                    id: Uuid::now_v7(),
                    stream_id,
                    user_id,
                    transport_uid,
                    joined_at: now,
                    left_at: None,
                    is_active: true,
                };
                state.viewers.push(viewer.clone());
                viewer
            }
        };

        state.recount_viewers(stream_id);
        let stream = state.streams[&stream_id].clone();

        Ok(StreamJoin { stream, viewer })
    }

    fn leave_stream(
        &self,
        stream_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Stream> {
        let mut state = self.state.write().unwrap();

        state.stream_mut(stream_id)?;
        let viewer = state
            .viewers
            .iter_mut()
            .find(|v| v.stream_id == stream_id && v.user_id == user_id && v.is_active)
            .ok_or_else(|| {
                AppError::new(ErrorCode::ViewerNotFound, "no active viewer for this user")
            })?;
        viewer.left_at = Some(now);
        viewer.is_active = false;

        state.recount_viewers(stream_id);
        Ok(state.streams[&stream_id].clone())
    }

    fn list_viewers(&self, stream_id: Uuid) -> AppResult<Vec<StreamViewer>> {
        let state = self.state.read().unwrap();
        Ok(state
            .viewers
            .iter()
            .filter(|v| v.stream_id == stream_id)
            .cloned()
            .collect())
    }

    fn stream_uid_taken(&self, stream_id: Uuid, transport_uid: i64) -> AppResult<bool> {
        let state = self.state.read().unwrap();
        Ok(state
            .viewers
            .iter()
            .any(|v| v.stream_id == stream_id && v.transport_uid == transport_uid)
            || state
                .cameras
                .values()
                .any(|c| c.stream_id == stream_id && c.transport_uid == transport_uid))
    }

    // --- cameras ---

    fn stream_key_taken(&self, key: &str) -> AppResult<bool> {
        let state = self.state.read().unwrap();
        Ok(state.cameras.values().any(|c| c.stream_key == key))
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
        let mut state = self.state.write().unwrap();
        state.stream_mut(stream_id)?;

        let camera = StreamCamera {
            id: Uuid::now_v7(),
            stream_id,
            label: label.to_string(),
            device_info,
            stream_key: stream_key.to_string(),
            transport_uid,
            is_active: true,
            is_primary: false,
            last_seen_at: now,
            created_at: now,
        };
        state.cameras.insert(camera.id, camera.clone());
        Ok(camera)
    }

    fn get_camera(&self, camera_id: Uuid) -> AppResult<StreamCamera> {
        let state = self.state.read().unwrap();
        state
            .cameras
            .get(&camera_id)
            .cloned()
            .ok_or_else(|| AppError::new(ErrorCode::CameraNotFound, "camera not found"))
    }

    fn list_cameras(&self, stream_id: Uuid) -> AppResult<Vec<StreamCamera>> {
        let state = self.state.read().unwrap();
        Ok(state
            .cameras
            .values()
            .filter(|c| c.stream_id == stream_id)
            .cloned()
            .collect())
    }

    fn promote_camera(&self, camera_id: Uuid) -> AppResult<StreamCamera> {
        let mut state = self.state.write().unwrap();

        let stream_id = state
            .cameras
            .get(&camera_id)
            .map(|c| c.stream_id)
            .ok_or_else(|| AppError::new(ErrorCode::CameraNotFound, "camera not found"))?;

        // Demote-then-promote under one lock: sibling demotion and the
        // promotion are a single atomic region scoped by stream id.
        for camera in state.cameras.values_mut().filter(|c| c.stream_id == stream_id) {
            camera.is_primary = camera.id == camera_id;
        }

        Ok(state.cameras[&camera_id].clone())
    }

    fn camera_heartbeat(&self, camera_id: Uuid, now: DateTime<Utc>) -> AppResult<StreamCamera> {
        let mut state = self.state.write().unwrap();
        let camera = state
            .cameras
            .get_mut(&camera_id)
            .ok_or_else(|| AppError::new(ErrorCode::CameraNotFound, "camera not found"))?;
        camera.last_seen_at = now;
        camera.is_active = true;
        Ok(camera.clone())
    }

    fn record_switch(
        &self,
        switch: NewCameraSwitch,
        now: DateTime<Utc>,
    ) -> AppResult<CameraSwitch> {
        let mut state = self.state.write().unwrap();
        let row = CameraSwitch {
            id: Uuid::now_v7(),
            stream_id: switch.stream_id,
            from_camera_id: switch.from_camera_id,
            to_camera_id: switch.to_camera_id,
            actor_id: switch.actor_id,
            switched_at: now,
        };
        state.switches.push(row.clone());
        Ok(row)
    }

    fn list_switches(&self, stream_id: Uuid) -> AppResult<Vec<CameraSwitch>> {
        let state = self.state.read().unwrap();
        Ok(state
            .switches
            .iter()
            .filter(|s| s.stream_id == stream_id)
            .cloned()
            .collect())
    }

    // --- interactions ---

    fn toggle_reaction(
        &self,
        stream_id: Uuid,
        user_id: Uuid,
        kind: ReactionKind,
        now: DateTime<Utc>,
    ) -> AppResult<ReactionOutcome> {
        let mut state = self.state.write().unwrap();
        state.stream_mut(stream_id)?;

        let existing_idx = state.interactions.iter().position(|i| {
            i.stream_id == stream_id
                && i.user_id == user_id
                && (i.kind == "like" || i.kind == "dislike")
        });
        let existing_kind = existing_idx
            .map(|idx| state.interactions[idx].kind.parse::<ReactionKind>())
            .transpose()
            .map_err(AppError::internal)?;

        let action = decide_toggle(existing_kind, kind);
        match (action, existing_idx) {
            (ToggleAction::Added, _) => {
                state.interactions.push(StreamInteraction {
                    id: Uuid::now_v7(),
                    stream_id,
                    user_id,
                    kind: kind.to_string(),
                    platform: None,
                    metadata: None,
                    created_at: now,
                });
            }
            (ToggleAction::Removed, Some(idx)) => {
                state.interactions.remove(idx);
            }
            (ToggleAction::Flipped, Some(idx)) => {
                state.interactions[idx].kind = kind.to_string();
            }
            (_, None) => return Err(AppError::internal("reaction row vanished mid-toggle")),
        }

        let counts = state.recount_interactions(stream_id);
        Ok(ReactionOutcome { action, counts })
    }

    fn add_share(
        &self,
        stream_id: Uuid,
        user_id: Uuid,
        platform: Option<String>,
        metadata: Option<serde_json::Value>,
        now: DateTime<Utc>,
    ) -> AppResult<InteractionCounts> {
        let mut state = self.state.write().unwrap();
        state.stream_mut(stream_id)?;

        state.interactions.push(StreamInteraction {
            id: Uuid::now_v7(),
            stream_id,
            user_id,
            kind: "share".to_string(),
            platform,
            metadata,
            created_at: now,
        });

        Ok(state.recount_interactions(stream_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn store() -> MemoryStore {
        MemoryStore::new()
    }

    fn live_stream(store: &MemoryStore) -> Stream {
        let stream = store
            .create_stream(Uuid::new_v4(), "morning show", "ch_test", false)
            .unwrap();
        store.start_stream(stream.id, Utc::now()).unwrap()
    }

    fn active_count(store: &MemoryStore, stream_id: Uuid) -> i32 {
        store
            .list_viewers(stream_id)
            .unwrap()
            .iter()
            .filter(|v| v.is_active)
            .count() as i32
    }

    // --- calls ---

    #[test]
    fn create_call_builds_full_roster() {
        let store = store();
        let initiator = Uuid::new_v4();
        let invitee = Uuid::new_v4();
        let detail = store
            .create_call(initiator, "ch_a", &[invitee], &[2], 1, Utc::now())
            .unwrap();

        assert_eq!(detail.call.status, "initiated");
        assert_eq!(detail.participants.len(), 2);
        let init_row = detail
            .participants
            .iter()
            .find(|p| p.user_id == initiator)
            .unwrap();
        assert!(init_row.joined_at.is_some());
        assert!(init_row.is_active);
        let invitee_row = detail
            .participants
            .iter()
            .find(|p| p.user_id == invitee)
            .unwrap();
        assert!(invitee_row.joined_at.is_none());
        assert!(!invitee_row.is_active);
    }

    #[test]
    fn answer_connects_and_marks_joined() {
        let store = store();
        let invitee = Uuid::new_v4();
        let detail = store
            .create_call(Uuid::new_v4(), "ch_a", &[invitee], &[2], 1, Utc::now())
            .unwrap();

        let answered = store.answer_call(detail.call.id, invitee, Utc::now()).unwrap();
        assert_eq!(answered.call.status, "connected");
        assert!(answered.call.connected_at.is_some());
        assert!(answered.participant.joined_at.is_some());
        assert!(answered.participant.is_active);
    }

    #[test]
    fn concurrent_answers_set_connected_at_once() {
        let store = Arc::new(store());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let detail = store
            .create_call(Uuid::new_v4(), "ch_a", &[a, b], &[2, 3], 1, Utc::now())
            .unwrap();
        let call_id = detail.call.id;

        let handles: Vec<_> = [a, b]
            .into_iter()
            .map(|user| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.answer_call(call_id, user, Utc::now()).unwrap())
            })
            .collect();
        let results: Vec<AnsweredCall> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        // Both succeed, both joined, and both observed the same
        // connected_at: the first writer won and the second was a no-op.
        assert!(results.iter().all(|r| r.participant.joined_at.is_some()));
        assert_eq!(results[0].call.connected_at, results[1].call.connected_at);

        let detail = store.get_call(call_id).unwrap();
        assert_eq!(detail.call.status, "connected");
        assert!(detail.call.connected_at.is_some());
    }

    #[test]
    fn answer_after_end_is_illegal() {
        let store = store();
        let invitee = Uuid::new_v4();
        let detail = store
            .create_call(Uuid::new_v4(), "ch_a", &[invitee], &[2], 1, Utc::now())
            .unwrap();
        store
            .end_call(detail.call.id, EndReason::Hangup, Utc::now())
            .unwrap();

        let err = store
            .answer_call(detail.call.id, invitee, Utc::now())
            .unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::IllegalTransition);
    }

    #[test]
    fn end_is_idempotent_and_marks_participants_left() {
        let store = store();
        let invitee = Uuid::new_v4();
        let detail = store
            .create_call(Uuid::new_v4(), "ch_a", &[invitee], &[2], 1, Utc::now())
            .unwrap();
        store.answer_call(detail.call.id, invitee, Utc::now()).unwrap();

        let first = store
            .end_call(detail.call.id, EndReason::Hangup, Utc::now())
            .unwrap();
        assert!(!first.already_ended);
        assert_eq!(first.call.status, "ended");
        assert!(first.call.duration_secs.is_some());

        let second = store
            .end_call(detail.call.id, EndReason::Hangup, Utc::now())
            .unwrap();
        assert!(second.already_ended);
        assert_eq!(second.call.ended_at, first.call.ended_at);

        let detail = store.get_call(detail.call.id).unwrap();
        assert!(detail.participants.iter().all(|p| !p.is_active));
        assert!(detail
            .participants
            .iter()
            .filter(|p| p.joined_at.is_some())
            .all(|p| p.left_at.is_some()));
    }

    #[test]
    fn unanswered_call_ends_as_missed_with_zero_duration() {
        let store = store();
        let detail = store
            .create_call(Uuid::new_v4(), "ch_a", &[Uuid::new_v4()], &[2], 1, Utc::now())
            .unwrap();

        let ended = store
            .end_call(detail.call.id, EndReason::Timeout, Utc::now())
            .unwrap();
        assert_eq!(ended.call.status, "missed");
        assert_eq!(ended.call.duration_secs, Some(0));
        assert_eq!(ended.call.end_reason.as_deref(), Some("timeout"));
    }

    #[test]
    fn stale_call_ids_only_pick_pre_cutoff_pending_calls() {
        let store = store();
        let stale = store
            .create_call(Uuid::new_v4(), "ch_a", &[Uuid::new_v4()], &[2], 1,
                Utc::now() - chrono::Duration::seconds(300))
            .unwrap();
        let fresh = store
            .create_call(Uuid::new_v4(), "ch_b", &[Uuid::new_v4()], &[2], 1, Utc::now())
            .unwrap();

        let cutoff = Utc::now() - chrono::Duration::seconds(120);
        let ids = store.stale_call_ids(cutoff).unwrap();
        assert!(ids.contains(&stale.call.id));
        assert!(!ids.contains(&fresh.call.id));
    }

    // --- streams ---

    #[test]
    fn viewer_count_matches_active_rows_after_every_op() {
        let store = store();
        let stream = live_stream(&store);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let join = store.join_stream(stream.id, a, 10, Utc::now()).unwrap();
        assert_eq!(join.stream.current_viewers, active_count(&store, stream.id));

        let join = store.join_stream(stream.id, b, 11, Utc::now()).unwrap();
        assert_eq!(join.stream.current_viewers, 2);
        assert_eq!(join.stream.current_viewers, active_count(&store, stream.id));

        let left = store.leave_stream(stream.id, a, Utc::now()).unwrap();
        assert_eq!(left.current_viewers, 1);
        assert_eq!(left.current_viewers, active_count(&store, stream.id));
    }

    #[test]
    fn rejoin_reactivates_instead_of_duplicating() {
        let store = store();
        let stream = live_stream(&store);
        let user = Uuid::new_v4();

        store.join_stream(stream.id, user, 10, Utc::now()).unwrap();
        store.leave_stream(stream.id, user, Utc::now()).unwrap();
        let rejoined = store.join_stream(stream.id, user, 99, Utc::now()).unwrap();

        let viewers = store.list_viewers(stream.id).unwrap();
        assert_eq!(viewers.len(), 1);
        assert!(viewers[0].is_active);
        assert!(viewers[0].left_at.is_none());
        // The original transport uid survives a rejoin.
        assert_eq!(viewers[0].transport_uid, 10);
        assert_eq!(rejoined.stream.current_viewers, 1);
    }

    #[test]
    fn stream_uid_taken_spans_viewers_and_cameras() {
        let store = store();
        let stream = live_stream(&store);
        store
            .join_stream(stream.id, Uuid::new_v4(), 10, Utc::now())
            .unwrap();
        store
            .register_camera(stream.id, "cam", serde_json::json!({}), "sk_a", 20, Utc::now())
            .unwrap();

        assert!(store.stream_uid_taken(stream.id, 10).unwrap());
        assert!(store.stream_uid_taken(stream.id, 20).unwrap());
        assert!(!store.stream_uid_taken(stream.id, 30).unwrap());
        // Scoped per stream: another stream may reuse the same uid.
        let other = store
            .create_stream(Uuid::new_v4(), "other", "ch_other", false)
            .unwrap();
        assert!(!store.stream_uid_taken(other.id, 10).unwrap());
    }

    #[test]
    fn corrupt_status_surfaces_internal_error() {
        let store = store();
        let detail = store
            .create_call(Uuid::new_v4(), "ch_a", &[Uuid::new_v4()], &[2], 1, Utc::now())
            .unwrap();
        let stream = live_stream(&store);

        {
            let mut state = store.state.write().unwrap();
            state.calls.get_mut(&detail.call.id).unwrap().status = "garbled".into();
            state.streams.get_mut(&stream.id).unwrap().status = "garbled".into();
        }

        let err = store
            .end_call(detail.call.id, EndReason::Hangup, Utc::now())
            .unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InternalError);

        let err = store.end_stream(stream.id, Utc::now()).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InternalError);
    }

    #[test]
    fn join_requires_live_stream() {
        let store = store();
        let stream = store
            .create_stream(Uuid::new_v4(), "later", "ch_x", false)
            .unwrap();
        let err = store
            .join_stream(stream.id, Uuid::new_v4(), 10, Utc::now())
            .unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::IllegalTransition);
    }

    #[test]
    fn end_stream_disconnects_all_viewers_and_blocks_restart() {
        let store = store();
        let stream = live_stream(&store);
        for i in 0..3 {
            store
                .join_stream(stream.id, Uuid::new_v4(), 10 + i, Utc::now())
                .unwrap();
        }

        let ended = store.end_stream(stream.id, Utc::now()).unwrap();
        assert_eq!(ended.viewers_disconnected, 3);
        assert_eq!(ended.stream.current_viewers, 0);
        assert_eq!(ended.stream.status, "ended");

        let viewers = store.list_viewers(stream.id).unwrap();
        assert!(viewers.iter().all(|v| !v.is_active && v.left_at.is_some()));

        let err = store.start_stream(stream.id, Utc::now()).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::IllegalTransition);
    }

    #[test]
    fn end_stream_requires_live() {
        let store = store();
        let stream = store
            .create_stream(Uuid::new_v4(), "later", "ch_x", false)
            .unwrap();
        let err = store.end_stream(stream.id, Utc::now()).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::IllegalTransition);
    }

    // --- cameras ---

    #[test]
    fn promote_leaves_exactly_one_primary() {
        let store = store();
        let stream = live_stream(&store);
        let cams: Vec<_> = (0..3)
            .map(|i| {
                store
                    .register_camera(
                        stream.id,
                        &format!("cam-{i}"),
                        serde_json::json!({}),
                        &format!("sk_{i}"),
                        100 + i,
                        Utc::now(),
                    )
                    .unwrap()
            })
            .collect();

        store.promote_camera(cams[0].id).unwrap();
        store.promote_camera(cams[2].id).unwrap();

        let primaries: Vec<_> = store
            .list_cameras(stream.id)
            .unwrap()
            .into_iter()
            .filter(|c| c.is_primary)
            .collect();
        assert_eq!(primaries.len(), 1);
        assert_eq!(primaries[0].id, cams[2].id);
    }

    #[test]
    fn concurrent_promotions_never_leave_two_primaries() {
        let store = Arc::new(store());
        let stream = live_stream(&store);
        let cams: Vec<_> = (0..4)
            .map(|i| {
                store
                    .register_camera(
                        stream.id,
                        &format!("cam-{i}"),
                        serde_json::json!({}),
                        &format!("sk_{i}"),
                        100 + i,
                        Utc::now(),
                    )
                    .unwrap()
            })
            .collect();

        let handles: Vec<_> = cams
            .iter()
            .map(|cam| {
                let store = Arc::clone(&store);
                let id = cam.id;
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        store.promote_camera(id).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let primaries = store
            .list_cameras(stream.id)
            .unwrap()
            .into_iter()
            .filter(|c| c.is_primary)
            .count();
        assert_eq!(primaries, 1);
    }

    #[test]
    fn switch_log_is_append_only_and_outlives_cameras() {
        let store = store();
        let stream = live_stream(&store);
        let cam_a = store
            .register_camera(stream.id, "a", serde_json::json!({}), "sk_a", 1, Utc::now())
            .unwrap();
        let cam_b = store
            .register_camera(stream.id, "b", serde_json::json!({}), "sk_b", 2, Utc::now())
            .unwrap();

        store
            .record_switch(
                NewCameraSwitch {
                    stream_id: stream.id,
                    from_camera_id: None,
                    to_camera_id: cam_a.id,
                    actor_id: stream.owner_id,
                },
                Utc::now(),
            )
            .unwrap();
        store
            .record_switch(
                NewCameraSwitch {
                    stream_id: stream.id,
                    from_camera_id: Some(cam_a.id),
                    to_camera_id: cam_b.id,
                    actor_id: stream.owner_id,
                },
                Utc::now(),
            )
            .unwrap();

        let switches = store.list_switches(stream.id).unwrap();
        assert_eq!(switches.len(), 2);
        assert_eq!(switches[1].from_camera_id, Some(cam_a.id));
    }

    // --- interactions ---

    #[test]
    fn toggle_like_twice_removes_it() {
        let store = store();
        let stream = live_stream(&store);
        let user = Uuid::new_v4();

        let first = store
            .toggle_reaction(stream.id, user, ReactionKind::Like, Utc::now())
            .unwrap();
        assert_eq!(first.action, ToggleAction::Added);
        assert_eq!(first.counts.likes, 1);

        let second = store
            .toggle_reaction(stream.id, user, ReactionKind::Like, Utc::now())
            .unwrap();
        assert_eq!(second.action, ToggleAction::Removed);
        assert_eq!(second.counts.likes, 0);
    }

    #[test]
    fn like_then_dislike_flips_instead_of_accumulating() {
        let store = store();
        let stream = live_stream(&store);
        let user = Uuid::new_v4();

        store
            .toggle_reaction(stream.id, user, ReactionKind::Like, Utc::now())
            .unwrap();
        let flipped = store
            .toggle_reaction(stream.id, user, ReactionKind::Dislike, Utc::now())
            .unwrap();

        assert_eq!(flipped.action, ToggleAction::Flipped);
        assert_eq!(flipped.counts.likes, 0);
        assert_eq!(flipped.counts.dislikes, 1);

        let stream = store.get_stream(stream.id).unwrap();
        assert_eq!(stream.likes_count, 0);
        assert_eq!(stream.dislikes_count, 1);
    }

    #[test]
    fn shares_are_unbounded_per_user() {
        let store = store();
        let stream = live_stream(&store);
        let user = Uuid::new_v4();

        store
            .add_share(stream.id, user, Some("twitter".into()), None, Utc::now())
            .unwrap();
        let counts = store
            .add_share(stream.id, user, Some("telegram".into()), None, Utc::now())
            .unwrap();

        assert_eq!(counts.shares, 2);
        assert_eq!(store.get_stream(stream.id).unwrap().shares_count, 2);
    }
}
