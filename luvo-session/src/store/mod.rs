pub mod memory;
pub mod pg;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use luvo_shared::errors::AppResult;

use crate::lifecycle::call::EndReason;
use crate::lifecycle::interaction::{ReactionKind, ToggleAction};
use crate::models::{
    CallParticipant, CallSession, CameraSwitch, NewCameraSwitch, Stream, StreamCamera,
    StreamViewer,
};

#[derive(Debug, Clone, Serialize)]
pub struct CallDetail {
    pub call: CallSession,
    pub participants: Vec<CallParticipant>,
}

#[derive(Debug, Clone)]
pub struct AnsweredCall {
    pub call: CallSession,
    pub participant: CallParticipant,
}

#[derive(Debug, Clone)]
pub struct EndedCall {
    pub call: CallSession,
    /// True when the call was already terminal and this end was a no-op.
    pub already_ended: bool,
}

#[derive(Debug, Clone)]
pub struct EndedStream {
    pub stream: Stream,
    pub viewers_disconnected: i32,
}

#[derive(Debug, Clone)]
pub struct StreamJoin {
    pub stream: Stream,
    pub viewer: StreamViewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InteractionCounts {
    pub likes: i32,
    pub dislikes: i32,
    pub shares: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReactionOutcome {
    pub action: ToggleAction,
    pub counts: InteractionCounts,
}

/// Durable session state, one method per atomic lifecycle operation.
///
/// Each backend owns the atomicity of its operations: the Postgres store
/// uses transactions and single conditional updates scoped by session id,
/// the in-memory store holds its write lock for the whole operation. State
/// checks and mutations therefore never race across method boundaries.
pub trait SessionStore: Send + Sync {
    // --- calls ---

    fn channel_name_taken(&self, name: &str) -> AppResult<bool>;

    /// Persist a new call in `initiated` with its full roster. The
    /// initiator's row arrives with `joined_at` already set.
    fn create_call(
        &self,
        initiator_id: Uuid,
        channel_name: &str,
        invitee_ids: &[Uuid],
        transport_uids: &[i64],
        initiator_uid: i64,
        now: DateTime<Utc>,
    ) -> AppResult<CallDetail>;

    fn get_call(&self, call_id: Uuid) -> AppResult<CallDetail>;

    fn mark_ringing(&self, call_id: Uuid, user_id: Uuid, now: DateTime<Utc>)
        -> AppResult<CallSession>;

    /// Join a participant: session moves to `connected`, `connected_at` is
    /// set exactly once (first writer wins), the participant row gets
    /// `joined_at`. Fails `IllegalTransition` from terminal states.
    fn answer_call(&self, call_id: Uuid, user_id: Uuid, now: DateTime<Utc>)
        -> AppResult<AnsweredCall>;

    /// Terminal transition. Idempotent: ending an already-terminal call
    /// returns the existing state with `already_ended` set.
    fn end_call(
        &self,
        call_id: Uuid,
        reason: EndReason,
        now: DateTime<Utc>,
    ) -> AppResult<EndedCall>;

    /// Ids of calls still in `initiated`/`ringing` that started before
    /// `cutoff`; used by the stale-call sweeper.
    fn stale_call_ids(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Uuid>>;

    // --- streams ---

    fn create_stream(
        &self,
        owner_id: Uuid,
        title: &str,
        channel_name: &str,
        is_paid: bool,
    ) -> AppResult<Stream>;

    fn get_stream(&self, stream_id: Uuid) -> AppResult<Stream>;

    fn list_live_streams(&self) -> AppResult<Vec<Stream>>;

    fn start_stream(&self, stream_id: Uuid, now: DateTime<Utc>) -> AppResult<Stream>;

    /// End the broadcast: status change, viewer-count reset and bulk
    /// deactivation of every active viewer happen atomically.
    fn end_stream(&self, stream_id: Uuid, now: DateTime<Utc>) -> AppResult<EndedStream>;

    /// Reactivate-or-create the viewer row, then recompute
    /// `current_viewers` from active rows. Never a blind increment.
    fn join_stream(
        &self,
        stream_id: Uuid,
        user_id: Uuid,
        transport_uid: i64,
        now: DateTime<Utc>,
    ) -> AppResult<StreamJoin>;

    fn leave_stream(&self, stream_id: Uuid, user_id: Uuid, now: DateTime<Utc>)
        -> AppResult<Stream>;

    fn list_viewers(&self, stream_id: Uuid) -> AppResult<Vec<StreamViewer>>;

    /// Whether a transport UID is already held by any viewer or camera of
    /// this stream. Viewers and cameras share one channel, so uniqueness
    /// spans both rosters.
    fn stream_uid_taken(&self, stream_id: Uuid, transport_uid: i64) -> AppResult<bool>;

    // --- cameras ---

    fn stream_key_taken(&self, key: &str) -> AppResult<bool>;

    fn register_camera(
        &self,
        stream_id: Uuid,
        label: &str,
        device_info: serde_json::Value,
        stream_key: &str,
        transport_uid: i64,
        now: DateTime<Utc>,
    ) -> AppResult<StreamCamera>;

    fn get_camera(&self, camera_id: Uuid) -> AppResult<StreamCamera>;

    fn list_cameras(&self, stream_id: Uuid) -> AppResult<Vec<StreamCamera>>;

    /// Promote to primary, demoting every sibling of the same stream in
    /// the same atomic operation. At most one primary per stream holds
    /// even under concurrent promotions.
    fn promote_camera(&self, camera_id: Uuid) -> AppResult<StreamCamera>;

    fn camera_heartbeat(&self, camera_id: Uuid, now: DateTime<Utc>) -> AppResult<StreamCamera>;

    /// Append to the immutable switch log. Rows are never mutated and
    /// outlive camera deactivation.
    fn record_switch(&self, switch: NewCameraSwitch, now: DateTime<Utc>)
        -> AppResult<CameraSwitch>;

    fn list_switches(&self, stream_id: Uuid) -> AppResult<Vec<CameraSwitch>>;

    // --- interactions ---

    /// Apply the toggle rule for like/dislike, then recompute and persist
    /// all interaction counts on the stream from the rows themselves.
    fn toggle_reaction(
        &self,
        stream_id: Uuid,
        user_id: Uuid,
        kind: ReactionKind,
        now: DateTime<Utc>,
    ) -> AppResult<ReactionOutcome>;

    /// Shares are never deduplicated; insert and recount.
    fn add_share(
        &self,
        stream_id: Uuid,
        user_id: Uuid,
        platform: Option<String>,
        metadata: Option<serde_json::Value>,
        now: DateTime<Utc>,
    ) -> AppResult<InteractionCounts>;
}
