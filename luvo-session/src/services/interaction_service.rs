use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use luvo_shared::errors::AppResult;

use crate::lifecycle::interaction::ReactionKind;
use crate::store::{InteractionCounts, ReactionOutcome, SessionStore};

/// Likes, dislikes and shares. Reactions toggle per user; shares are
/// unbounded. Counters on the stream are always recomputed from the
/// interaction rows, never incremented in place.
pub struct InteractionService {
    store: Arc<dyn SessionStore>,
}

impl InteractionService {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn toggle_like(&self, stream_id: Uuid, user_id: Uuid) -> AppResult<ReactionOutcome> {
        self.store
            .toggle_reaction(stream_id, user_id, ReactionKind::Like, Utc::now())
    }

    pub fn toggle_dislike(&self, stream_id: Uuid, user_id: Uuid) -> AppResult<ReactionOutcome> {
        self.store
            .toggle_reaction(stream_id, user_id, ReactionKind::Dislike, Utc::now())
    }

    pub fn share(
        &self,
        stream_id: Uuid,
        user_id: Uuid,
        platform: Option<String>,
        metadata: Option<serde_json::Value>,
    ) -> AppResult<InteractionCounts> {
        self.store
            .add_share(stream_id, user_id, platform, metadata, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::interaction::ToggleAction;
    use crate::store::memory::MemoryStore;

    fn service_with_stream() -> (InteractionService, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let stream = store
            .create_stream(Uuid::new_v4(), "show", "ch_0000000000000000deadbeef", false)
            .unwrap();
        (InteractionService::new(store), stream.id)
    }

    #[test]
    fn like_then_dislike_flips() {
        let (service, stream_id) = service_with_stream();
        let user = Uuid::new_v4();

        let out = service.toggle_like(stream_id, user).unwrap();
        assert_eq!(out.action, ToggleAction::Added);
        assert_eq!((out.counts.likes, out.counts.dislikes), (1, 0));

        let out = service.toggle_dislike(stream_id, user).unwrap();
        assert_eq!(out.action, ToggleAction::Flipped);
        assert_eq!((out.counts.likes, out.counts.dislikes), (0, 1));

        let out = service.toggle_dislike(stream_id, user).unwrap();
        assert_eq!(out.action, ToggleAction::Removed);
        assert_eq!((out.counts.likes, out.counts.dislikes), (0, 0));
    }

    #[test]
    fn shares_accumulate_without_dedup() {
        let (service, stream_id) = service_with_stream();
        let user = Uuid::new_v4();

        for _ in 0..3 {
            service
                .share(stream_id, user, Some("app_x".into()), None)
                .unwrap();
        }
        let counts = service.share(stream_id, user, None, None).unwrap();
        assert_eq!(counts.shares, 4);
    }
}
