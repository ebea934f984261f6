use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use luvo_shared::types::event::{payloads, routing_keys};
use luvo_shared::types::Event;

use crate::signaling::SignalingFanout;

const SOURCE: &str = "luvo-session";

/// Typed wrappers around the signaling fanout, one per domain event.
#[derive(Clone)]
pub struct EventPublisher {
    fanout: Arc<dyn SignalingFanout>,
}

impl EventPublisher {
    pub fn new(fanout: Arc<dyn SignalingFanout>) -> Self {
        Self { fanout }
    }

    fn emit<T: Serialize>(&self, routing_key: &'static str, user_id: Option<Uuid>, payload: T) {
        let data = match serde_json::to_value(payload) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(routing_key = %routing_key, error = %e, "unserializable event payload");
                return;
            }
        };
        let mut event = Event::new(SOURCE, routing_key, data);
        if let Some(user_id) = user_id {
            event = event.with_user(user_id);
        }
        self.fanout.publish(routing_key, event);
    }

    pub fn call_initiated(&self, payload: payloads::CallInitiated) {
        self.emit(
            routing_keys::CALL_SESSION_INITIATED,
            Some(payload.initiator_id),
            payload,
        );
    }

    pub fn call_ringing(&self, payload: payloads::CallRinging) {
        self.emit(routing_keys::CALL_SESSION_RINGING, Some(payload.user_id), payload);
    }

    pub fn call_answered(&self, payload: payloads::CallAnswered) {
        self.emit(routing_keys::CALL_SESSION_ANSWERED, Some(payload.user_id), payload);
    }

    pub fn call_ended(&self, payload: payloads::CallEnded) {
        self.emit(routing_keys::CALL_SESSION_ENDED, payload.ended_by, payload);
    }

    pub fn stream_started(&self, payload: payloads::StreamStarted) {
        self.emit(
            routing_keys::STREAM_SESSION_STARTED,
            Some(payload.owner_id),
            payload,
        );
    }

    pub fn stream_ended(&self, payload: payloads::StreamEnded) {
        self.emit(routing_keys::STREAM_SESSION_ENDED, Some(payload.owner_id), payload);
    }

    pub fn viewer_joined(&self, payload: payloads::ViewerJoined) {
        self.emit(routing_keys::STREAM_VIEWER_JOINED, Some(payload.user_id), payload);
    }

    pub fn viewer_left(&self, payload: payloads::ViewerLeft) {
        self.emit(routing_keys::STREAM_VIEWER_LEFT, Some(payload.user_id), payload);
    }

    pub fn camera_switched(&self, payload: payloads::CameraSwitched) {
        self.emit(
            routing_keys::STREAM_CAMERA_SWITCHED,
            Some(payload.actor_id),
            payload,
        );
    }
}
