use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use luvo_shared::errors::{AppError, AppResult, ErrorCode};
use luvo_shared::types::event::payloads;

use crate::events::EventPublisher;
use crate::lifecycle::keygen;
use crate::lifecycle::stream::camera_online;
use crate::models::{CameraSwitch, NewCameraSwitch, Stream, StreamCamera, StreamViewer};
use crate::payments::PaymentLedger;
use crate::store::SessionStore;
use crate::transport::{TokenIssuer, TransportCredential};

#[derive(Debug, Clone, Serialize)]
pub struct StreamJoinResponse {
    pub stream: Stream,
    pub viewer: StreamViewer,
    pub credential: TransportCredential,
}

#[derive(Debug, Clone, Serialize)]
pub struct CameraRegistration {
    pub camera: StreamCamera,
    pub credential: TransportCredential,
}

/// Camera with its liveness derived from the heartbeat, not stored.
#[derive(Debug, Clone, Serialize)]
pub struct CameraView {
    #[serde(flatten)]
    pub camera: StreamCamera,
    pub online: bool,
}

pub struct StreamService {
    store: Arc<dyn SessionStore>,
    tokens: Arc<dyn TokenIssuer>,
    payments: Arc<dyn PaymentLedger>,
    publisher: EventPublisher,
}

impl StreamService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        tokens: Arc<dyn TokenIssuer>,
        payments: Arc<dyn PaymentLedger>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            store,
            tokens,
            payments,
            publisher,
        }
    }

    /// Transport UID free within this stream's channel, which viewers and
    /// cameras share. Same capped retry as key generation.
    fn unique_stream_uid(&self, stream_id: Uuid) -> AppResult<i64> {
        keygen::generate_unique("transport uid", keygen::transport_uid, |uid| {
            self.store.stream_uid_taken(stream_id, *uid)
        })
    }

    fn owned_stream(&self, stream_id: Uuid, actor_id: Uuid) -> AppResult<Stream> {
        let stream = self.store.get_stream(stream_id)?;
        if stream.owner_id != actor_id {
            return Err(AppError::new(
                ErrorCode::Forbidden,
                "only the stream owner can do this",
            ));
        }
        Ok(stream)
    }

    pub fn create(&self, owner_id: Uuid, title: &str, is_paid: bool) -> AppResult<Stream> {
        let channel_name = keygen::generate_unique("channel name", keygen::channel_name, |c| {
            self.store.channel_name_taken(c)
        })?;
        let stream = self
            .store
            .create_stream(owner_id, title, &channel_name, is_paid)?;
        tracing::info!(stream_id = %stream.id, owner_id = %owner_id, "stream created");
        Ok(stream)
    }

    pub fn get(&self, stream_id: Uuid) -> AppResult<Stream> {
        self.store.get_stream(stream_id)
    }

    pub fn list_live(&self) -> AppResult<Vec<Stream>> {
        self.store.list_live_streams()
    }

    pub fn start(&self, stream_id: Uuid, actor_id: Uuid) -> AppResult<Stream> {
        self.owned_stream(stream_id, actor_id)?;
        let stream = self.store.start_stream(stream_id, Utc::now())?;
        self.publisher.stream_started(payloads::StreamStarted {
            stream_id,
            owner_id: stream.owner_id,
            channel_name: stream.channel_name.clone(),
        });
        Ok(stream)
    }

    pub fn end(&self, stream_id: Uuid, actor_id: Uuid) -> AppResult<Stream> {
        self.owned_stream(stream_id, actor_id)?;
        let ended = self.store.end_stream(stream_id, Utc::now())?;
        tracing::info!(
            stream_id = %stream_id,
            viewers_disconnected = ended.viewers_disconnected,
            "stream ended"
        );
        self.publisher.stream_ended(payloads::StreamEnded {
            stream_id,
            owner_id: ended.stream.owner_id,
            viewers_disconnected: ended.viewers_disconnected,
        });
        Ok(ended.stream)
    }

    /// Join as a viewer. Paid streams require a completed payment unless
    /// the viewer is the owner; the check happens before any state change.
    pub fn join(&self, stream_id: Uuid, user_id: Uuid) -> AppResult<StreamJoinResponse> {
        let stream = self.store.get_stream(stream_id)?;
        if stream.is_paid
            && stream.owner_id != user_id
            && !self.payments.has_completed_payment(stream_id, user_id)?
        {
            return Err(AppError::new(
                ErrorCode::PaymentRequired,
                "this stream requires a completed payment to join",
            ));
        }

        let transport_uid = self.unique_stream_uid(stream_id)?;
        let joined = self
            .store
            .join_stream(stream_id, user_id, transport_uid, Utc::now())?;
        let credential = self
            .tokens
            .mint(&joined.stream.channel_name, joined.viewer.transport_uid)?;

        self.publisher.viewer_joined(payloads::ViewerJoined {
            stream_id,
            user_id,
            current_viewers: joined.stream.current_viewers,
        });

        Ok(StreamJoinResponse {
            stream: joined.stream,
            viewer: joined.viewer,
            credential,
        })
    }

    pub fn leave(&self, stream_id: Uuid, user_id: Uuid) -> AppResult<Stream> {
        let stream = self.store.leave_stream(stream_id, user_id, Utc::now())?;
        self.publisher.viewer_left(payloads::ViewerLeft {
            stream_id,
            user_id,
            current_viewers: stream.current_viewers,
        });
        Ok(stream)
    }

    pub fn viewers(&self, stream_id: Uuid) -> AppResult<Vec<StreamViewer>> {
        self.store.get_stream(stream_id)?;
        self.store.list_viewers(stream_id)
    }

    // --- cameras ---

    pub fn register_camera(
        &self,
        stream_id: Uuid,
        actor_id: Uuid,
        label: &str,
        device_info: serde_json::Value,
    ) -> AppResult<CameraRegistration> {
        let stream = self.owned_stream(stream_id, actor_id)?;

        let stream_key = keygen::generate_unique("stream key", keygen::stream_key, |k| {
            self.store.stream_key_taken(k)
        })?;
        let transport_uid = self.unique_stream_uid(stream_id)?;
        let camera = self.store.register_camera(
            stream_id,
            label,
            device_info,
            &stream_key,
            transport_uid,
            Utc::now(),
        )?;
        let credential = self
            .tokens
            .mint(&stream.channel_name, camera.transport_uid)?;

        tracing::info!(stream_id = %stream_id, camera_id = %camera.id, "camera registered");
        Ok(CameraRegistration { camera, credential })
    }

    pub fn cameras(&self, stream_id: Uuid) -> AppResult<Vec<CameraView>> {
        self.store.get_stream(stream_id)?;
        let now = Utc::now();
        Ok(self
            .store
            .list_cameras(stream_id)?
            .into_iter()
            .map(|camera| CameraView {
                online: camera_online(camera.is_active, camera.last_seen_at, now),
                camera,
            })
            .collect())
    }

    pub fn promote_camera(&self, camera_id: Uuid, actor_id: Uuid) -> AppResult<StreamCamera> {
        let camera = self.store.get_camera(camera_id)?;
        self.owned_stream(camera.stream_id, actor_id)?;
        self.store.promote_camera(camera_id)
    }

    pub fn camera_heartbeat(&self, camera_id: Uuid) -> AppResult<CameraView> {
        let camera = self.store.camera_heartbeat(camera_id, Utc::now())?;
        Ok(CameraView {
            online: camera_online(camera.is_active, camera.last_seen_at, Utc::now()),
            camera,
        })
    }

    /// Record a camera switch in the append-only audit log. Both endpoints
    /// must belong to the stream being switched.
    pub fn switch_camera(
        &self,
        stream_id: Uuid,
        actor_id: Uuid,
        from_camera_id: Option<Uuid>,
        to_camera_id: Uuid,
    ) -> AppResult<CameraSwitch> {
        self.owned_stream(stream_id, actor_id)?;

        let to = self.store.get_camera(to_camera_id)?;
        if to.stream_id != stream_id {
            return Err(AppError::new(
                ErrorCode::CameraStreamMismatch,
                "target camera belongs to a different stream",
            ));
        }
        if let Some(from_id) = from_camera_id {
            let from = self.store.get_camera(from_id)?;
            if from.stream_id != stream_id {
                return Err(AppError::new(
                    ErrorCode::CameraStreamMismatch,
                    "source camera belongs to a different stream",
                ));
            }
        }

        let switch = self.store.record_switch(
            NewCameraSwitch {
                stream_id,
                from_camera_id,
                to_camera_id,
                actor_id,
            },
            Utc::now(),
        )?;

        self.publisher.camera_switched(payloads::CameraSwitched {
            stream_id,
            from_camera_id,
            to_camera_id,
            actor_id,
        });
        Ok(switch)
    }

    pub fn switch_history(&self, stream_id: Uuid) -> AppResult<Vec<CameraSwitch>> {
        self.store.get_stream(stream_id)?;
        self.store.list_switches(stream_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::memory::MemoryPaymentLedger;
    use crate::signaling::test_support::RecordingFanout;
    use crate::store::memory::MemoryStore;
    use crate::transport::JwtTokenIssuer;
    use luvo_shared::types::event::routing_keys;

    struct Harness {
        service: StreamService,
        payments: Arc<MemoryPaymentLedger>,
        fanout: Arc<RecordingFanout>,
    }

    fn harness() -> Harness {
        let payments = Arc::new(MemoryPaymentLedger::new());
        let fanout = Arc::new(RecordingFanout::new());
        let service = StreamService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(JwtTokenIssuer::new("test-secret", 3600)),
            payments.clone(),
            EventPublisher::new(fanout.clone()),
        );
        Harness {
            service,
            payments,
            fanout,
        }
    }

    #[test]
    fn paid_stream_gates_join_until_payment() {
        let h = harness();
        let owner = Uuid::new_v4();
        let viewer = Uuid::new_v4();

        let stream = h.service.create(owner, "backstage", true).unwrap();
        h.service.start(stream.id, owner).unwrap();

        let err = h.service.join(stream.id, viewer).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::PaymentRequired);
        // The failed join left no viewer row behind.
        assert!(h.service.viewers(stream.id).unwrap().is_empty());

        h.payments.mark_paid(stream.id, viewer);
        let joined = h.service.join(stream.id, viewer).unwrap();
        assert_eq!(joined.stream.current_viewers, 1);
        assert!(!joined.credential.token.is_empty());
    }

    #[test]
    fn owner_joins_own_paid_stream_without_payment() {
        let h = harness();
        let owner = Uuid::new_v4();
        let stream = h.service.create(owner, "backstage", true).unwrap();
        h.service.start(stream.id, owner).unwrap();
        assert!(h.service.join(stream.id, owner).is_ok());
    }

    #[test]
    fn only_the_owner_controls_the_stream() {
        let h = harness();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let stream = h.service.create(owner, "show", false).unwrap();

        let err = h.service.start(stream.id, stranger).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::Forbidden);
        let err = h
            .service
            .register_camera(stream.id, stranger, "main", serde_json::json!({}))
            .unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::Forbidden);
    }

    #[test]
    fn switch_rejects_cameras_from_another_stream() {
        let h = harness();
        let owner = Uuid::new_v4();
        let stream_a = h.service.create(owner, "a", false).unwrap();
        let stream_b = h.service.create(owner, "b", false).unwrap();
        let cam_b = h
            .service
            .register_camera(stream_b.id, owner, "main", serde_json::json!({}))
            .unwrap();

        let err = h
            .service
            .switch_camera(stream_a.id, owner, None, cam_b.camera.id)
            .unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::CameraStreamMismatch);
        assert!(h.service.switch_history(stream_a.id).unwrap().is_empty());
    }

    #[test]
    fn lifecycle_and_viewer_events_fire() {
        let h = harness();
        let owner = Uuid::new_v4();
        let viewer = Uuid::new_v4();

        let stream = h.service.create(owner, "show", false).unwrap();
        h.service.start(stream.id, owner).unwrap();
        h.service.join(stream.id, viewer).unwrap();
        h.service.leave(stream.id, viewer).unwrap();
        h.service.end(stream.id, owner).unwrap();

        assert_eq!(
            h.fanout.routing_keys(),
            vec![
                routing_keys::STREAM_SESSION_STARTED,
                routing_keys::STREAM_VIEWER_JOINED,
                routing_keys::STREAM_VIEWER_LEFT,
                routing_keys::STREAM_SESSION_ENDED,
            ]
        );

        let ended = h.fanout.payloads_for(routing_keys::STREAM_SESSION_ENDED);
        assert_eq!(ended[0]["viewers_disconnected"], 0);
    }

    #[test]
    fn transport_uids_stay_unique_across_viewers_and_cameras() {
        let h = harness();
        let owner = Uuid::new_v4();
        let stream = h.service.create(owner, "show", false).unwrap();
        h.service.start(stream.id, owner).unwrap();

        let mut uids: Vec<i64> = (0..5)
            .map(|_| {
                h.service
                    .join(stream.id, Uuid::new_v4())
                    .unwrap()
                    .viewer
                    .transport_uid
            })
            .collect();
        for i in 0..3 {
            let reg = h
                .service
                .register_camera(stream.id, owner, &format!("cam-{i}"), serde_json::json!({}))
                .unwrap();
            uids.push(reg.camera.transport_uid);
        }

        let mut deduped = uids.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), uids.len());
    }

    #[test]
    fn heartbeat_reports_camera_online() {
        let h = harness();
        let owner = Uuid::new_v4();
        let stream = h.service.create(owner, "show", false).unwrap();
        let cam = h
            .service
            .register_camera(stream.id, owner, "main", serde_json::json!({"model": "x1"}))
            .unwrap();

        let view = h.service.camera_heartbeat(cam.camera.id).unwrap();
        assert!(view.online);
    }
}
