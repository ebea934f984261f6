use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use luvo_shared::errors::{AppError, AppResult, ErrorCode};
use luvo_shared::types::event::payloads;

use crate::events::EventPublisher;
use crate::lifecycle::call::EndReason;
use crate::lifecycle::keygen;
use crate::models::{CallParticipant, CallSession};
use crate::store::{CallDetail, SessionStore};
use crate::transport::{TokenIssuer, TransportCredential};

/// One minted credential per roster member.
#[derive(Debug, Clone, Serialize)]
pub struct RosterCredential {
    pub user_id: Uuid,
    pub transport_uid: i64,
    #[serde(flatten)]
    pub credential: TransportCredential,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitiatedCall {
    pub call: CallSession,
    pub participants: Vec<CallParticipant>,
    pub credentials: Vec<RosterCredential>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerResponse {
    pub call: CallSession,
    pub participant: CallParticipant,
    pub credential: TransportCredential,
}

pub struct CallService {
    store: Arc<dyn SessionStore>,
    tokens: Arc<dyn TokenIssuer>,
    publisher: EventPublisher,
}

impl CallService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        tokens: Arc<dyn TokenIssuer>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            store,
            tokens,
            publisher,
        }
    }

    /// Create a call in `initiated` with its full roster and mint a
    /// transport credential for every member. The invitee set is
    /// deduplicated and may not collapse to just the initiator.
    pub fn initiate(&self, initiator_id: Uuid, invitee_ids: &[Uuid]) -> AppResult<InitiatedCall> {
        let mut seen = HashSet::new();
        let invitees: Vec<Uuid> = invitee_ids
            .iter()
            .copied()
            .filter(|id| *id != initiator_id && seen.insert(*id))
            .collect();
        if invitees.is_empty() {
            return Err(AppError::new(
                ErrorCode::InvalidParticipantSet,
                "a call needs at least one invitee besides the initiator",
            ));
        }

        let channel_name = keygen::generate_unique("channel name", keygen::channel_name, |c| {
            self.store.channel_name_taken(c)
        })?;

        // Transport UIDs only have to be unique within the session.
        let mut used = HashSet::new();
        let mut next_uid = || loop {
            let uid = keygen::transport_uid();
            if used.insert(uid) {
                return uid;
            }
        };
        let initiator_uid = next_uid();
        let invitee_uids: Vec<i64> = invitees.iter().map(|_| next_uid()).collect();

        let detail = self.store.create_call(
            initiator_id,
            &channel_name,
            &invitees,
            &invitee_uids,
            initiator_uid,
            Utc::now(),
        )?;

        let credentials = self.mint_roster(&channel_name, &detail.participants)?;

        tracing::info!(
            call_id = %detail.call.id,
            initiator_id = %initiator_id,
            roster = detail.participants.len(),
            "call initiated"
        );
        self.publisher.call_initiated(payloads::CallInitiated {
            call_id: detail.call.id,
            initiator_id,
            participant_ids: detail.participants.iter().map(|p| p.user_id).collect(),
            channel_name: channel_name.clone(),
        });

        Ok(InitiatedCall {
            call: detail.call,
            participants: detail.participants,
            credentials,
        })
    }

    fn mint_roster(
        &self,
        channel_name: &str,
        participants: &[CallParticipant],
    ) -> AppResult<Vec<RosterCredential>> {
        participants
            .iter()
            .map(|p| {
                Ok(RosterCredential {
                    user_id: p.user_id,
                    transport_uid: p.transport_uid,
                    credential: self.tokens.mint(channel_name, p.transport_uid)?,
                })
            })
            .collect()
    }

    pub fn get(&self, call_id: Uuid) -> AppResult<CallDetail> {
        self.store.get_call(call_id)
    }

    /// An invitee's device acknowledged the call.
    pub fn ring(&self, call_id: Uuid, user_id: Uuid) -> AppResult<CallSession> {
        let call = self.store.mark_ringing(call_id, user_id, Utc::now())?;
        self.publisher
            .call_ringing(payloads::CallRinging { call_id, user_id });
        Ok(call)
    }

    /// A roster member picks up; re-mints their credential so a delayed
    /// answer still gets a live token.
    pub fn answer(&self, call_id: Uuid, user_id: Uuid) -> AppResult<AnswerResponse> {
        let answered = self.store.answer_call(call_id, user_id, Utc::now())?;
        let credential = self
            .tokens
            .mint(&answered.call.channel_name, answered.participant.transport_uid)?;

        if let Some(connected_at) = answered.call.connected_at {
            self.publisher.call_answered(payloads::CallAnswered {
                call_id,
                user_id,
                connected_at,
            });
        }

        Ok(AnswerResponse {
            call: answered.call,
            participant: answered.participant,
            credential,
        })
    }

    /// Idempotent terminal transition; the ended event fires only on the
    /// call that actually closed the session.
    pub fn end(
        &self,
        call_id: Uuid,
        ended_by: Option<Uuid>,
        reason: EndReason,
    ) -> AppResult<CallSession> {
        let ended = self.store.end_call(call_id, reason, Utc::now())?;
        if !ended.already_ended {
            tracing::info!(
                call_id = %call_id,
                status = %ended.call.status,
                reason = %reason,
                "call ended"
            );
            self.publisher.call_ended(payloads::CallEnded {
                call_id,
                ended_by,
                end_reason: reason.to_string(),
                duration_secs: ended.call.duration_secs.unwrap_or(0),
            });
        }
        Ok(ended.call)
    }

    /// Close out calls that never connected within the ring timeout.
    /// Returns how many were timed out.
    pub fn expire_stale(&self, ring_timeout: Duration) -> AppResult<usize> {
        let cutoff = Utc::now() - ring_timeout;
        let stale = self.store.stale_call_ids(cutoff)?;
        let mut expired = 0;
        for call_id in stale {
            match self.end(call_id, None, EndReason::Timeout) {
                Ok(_) => expired += 1,
                // Lost the race with a real answer/end; nothing to do.
                Err(e) => {
                    tracing::debug!(call_id = %call_id, error = %e, "stale call not expired")
                }
            }
        }
        if expired > 0 {
            tracing::info!(count = expired, "expired stale calls");
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signaling::test_support::RecordingFanout;
    use crate::store::memory::MemoryStore;
    use crate::transport::JwtTokenIssuer;
    use luvo_shared::types::event::routing_keys;

    fn service() -> (CallService, Arc<RecordingFanout>) {
        let fanout = Arc::new(RecordingFanout::new());
        let service = CallService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(JwtTokenIssuer::new("test-secret", 3600)),
            EventPublisher::new(fanout.clone()),
        );
        (service, fanout)
    }

    #[test]
    fn initiate_mints_a_credential_per_member() {
        let (service, _) = service();
        let initiator = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let initiated = service.initiate(initiator, &[a, b, a]).unwrap();
        assert_eq!(initiated.participants.len(), 3); // duplicate invitee dropped
        assert_eq!(initiated.credentials.len(), 3);

        let uids: HashSet<i64> = initiated.credentials.iter().map(|c| c.transport_uid).collect();
        assert_eq!(uids.len(), 3, "transport uids must be unique per session");
    }

    #[test]
    fn initiate_rejects_self_only_roster() {
        let (service, _) = service();
        let initiator = Uuid::new_v4();
        let err = service.initiate(initiator, &[initiator]).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InvalidParticipantSet);

        let err = service.initiate(initiator, &[]).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InvalidParticipantSet);
    }

    #[test]
    fn lifecycle_events_fire_once() {
        let (service, fanout) = service();
        let initiator = Uuid::new_v4();
        let invitee = Uuid::new_v4();

        let initiated = service.initiate(initiator, &[invitee]).unwrap();
        let call_id = initiated.call.id;
        service.ring(call_id, invitee).unwrap();
        service.answer(call_id, invitee).unwrap();
        service.end(call_id, Some(invitee), EndReason::Hangup).unwrap();
        // Second end is a no-op and must not re-publish.
        service.end(call_id, Some(initiator), EndReason::Hangup).unwrap();

        assert_eq!(
            fanout.routing_keys(),
            vec![
                routing_keys::CALL_SESSION_INITIATED,
                routing_keys::CALL_SESSION_RINGING,
                routing_keys::CALL_SESSION_ANSWERED,
                routing_keys::CALL_SESSION_ENDED,
            ]
        );
    }

    #[test]
    fn expire_stale_times_out_unanswered_calls() {
        let (service, fanout) = service();
        let initiator = Uuid::new_v4();
        let invitee = Uuid::new_v4();
        let initiated = service.initiate(initiator, &[invitee]).unwrap();

        // Nothing is stale yet.
        assert_eq!(service.expire_stale(Duration::seconds(120)).unwrap(), 0);
        // With a zero timeout the new call is already past the cutoff.
        assert_eq!(service.expire_stale(Duration::seconds(-1)).unwrap(), 1);

        let call = service.get(initiated.call.id).unwrap().call;
        assert_eq!(call.status, "missed");
        assert_eq!(call.end_reason.as_deref(), Some("timeout"));

        let ended = fanout.payloads_for(routing_keys::CALL_SESSION_ENDED);
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0]["end_reason"], "timeout");
    }
}
