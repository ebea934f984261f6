use luvo_shared::clients::rabbitmq::RabbitMQClient;
use luvo_shared::types::Event;

/// Best-effort signaling fanout. Delivery is advisory: session state is
/// already durable when an event goes out, so a publish failure is logged
/// and never fails the request that caused it.
pub trait SignalingFanout: Send + Sync {
    fn publish(&self, routing_key: &'static str, event: Event<serde_json::Value>);
}

/// Fanout over the shared RabbitMQ topic exchange. The publish is detached
/// onto the runtime so handlers never wait on the broker.
pub struct RabbitFanout {
    client: RabbitMQClient,
}

impl RabbitFanout {
    pub fn new(client: RabbitMQClient) -> Self {
        Self { client }
    }
}

impl SignalingFanout for RabbitFanout {
    fn publish(&self, routing_key: &'static str, event: Event<serde_json::Value>) {
        let client = self.client.clone();
        tokio::spawn(async move {
            if let Err(e) = client.publish(routing_key, &event).await {
                tracing::error!(
                    routing_key = %routing_key,
                    event_id = %event.id,
                    error = %e,
                    "failed to publish signaling event"
                );
            }
        });
    }
}

/// Captures published events in memory for assertions.
#[cfg(test)]
pub mod test_support {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct RecordingFanout {
        events: Mutex<Vec<(&'static str, Event<serde_json::Value>)>>,
    }

    impl RecordingFanout {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn routing_keys(&self) -> Vec<&'static str> {
            self.events.lock().unwrap().iter().map(|(k, _)| *k).collect()
        }

        pub fn payloads_for(&self, routing_key: &str) -> Vec<serde_json::Value> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|(k, _)| *k == routing_key)
                .map(|(_, e)| e.data.clone())
                .collect()
        }
    }

    impl SignalingFanout for RecordingFanout {
        fn publish(&self, routing_key: &'static str, event: Event<serde_json::Value>) {
            self.events.lock().unwrap().push((routing_key, event));
        }
    }
}
