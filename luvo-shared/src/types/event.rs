use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RabbitMQ Event envelope wrapping all domain events.
///
/// Routing key format: `luvo.{domain}.{entity}.{action}`
/// Example: `luvo.call.session.initiated`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T: Serialize> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            correlation_id: None,
            user_id: None,
            data,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_correlation(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

/// RabbitMQ routing keys
pub mod routing_keys {
    // Call lifecycle events
    pub const CALL_SESSION_INITIATED: &str = "luvo.call.session.initiated";
    pub const CALL_SESSION_RINGING: &str = "luvo.call.session.ringing";
    pub const CALL_SESSION_ANSWERED: &str = "luvo.call.session.answered";
    pub const CALL_SESSION_ENDED: &str = "luvo.call.session.ended";

    // Stream lifecycle events
    pub const STREAM_SESSION_STARTED: &str = "luvo.stream.session.started";
    pub const STREAM_SESSION_ENDED: &str = "luvo.stream.session.ended";
    pub const STREAM_VIEWER_JOINED: &str = "luvo.stream.viewer.joined";
    pub const STREAM_VIEWER_LEFT: &str = "luvo.stream.viewer.left";
    pub const STREAM_CAMERA_SWITCHED: &str = "luvo.stream.camera.switched";
}

/// Common event data payloads
pub mod payloads {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct CallInitiated {
        pub call_id: Uuid,
        pub initiator_id: Uuid,
        pub participant_ids: Vec<Uuid>,
        pub channel_name: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct CallRinging {
        pub call_id: Uuid,
        pub user_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct CallAnswered {
        pub call_id: Uuid,
        pub user_id: Uuid,
        pub connected_at: chrono::DateTime<chrono::Utc>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct CallEnded {
        pub call_id: Uuid,
        pub ended_by: Option<Uuid>,
        pub end_reason: String,
        pub duration_secs: i32,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct StreamStarted {
        pub stream_id: Uuid,
        pub owner_id: Uuid,
        pub channel_name: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct StreamEnded {
        pub stream_id: Uuid,
        pub owner_id: Uuid,
        pub viewers_disconnected: i32,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ViewerJoined {
        pub stream_id: Uuid,
        pub user_id: Uuid,
        pub current_viewers: i32,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ViewerLeft {
        pub stream_id: Uuid,
        pub user_id: Uuid,
        pub current_viewers: i32,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct CameraSwitched {
        pub stream_id: Uuid,
        pub from_camera_id: Option<Uuid>,
        pub to_camera_id: Uuid,
        pub actor_id: Uuid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_event_type_and_user() {
        let evt = Event::new(
            "luvo-session",
            routing_keys::CALL_SESSION_INITIATED,
            payloads::CallInitiated {
                call_id: Uuid::new_v4(),
                initiator_id: Uuid::new_v4(),
                participant_ids: vec![],
                channel_name: "ch_abc".into(),
            },
        )
        .with_user(Uuid::new_v4());

        assert_eq!(evt.event_type, "luvo.call.session.initiated");
        assert!(evt.user_id.is_some());

        let json = serde_json::to_value(&evt).unwrap();
        assert_eq!(json["event_type"], "luvo.call.session.initiated");
        assert_eq!(json["data"]["channel_name"], "ch_abc");
    }
}
