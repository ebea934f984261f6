use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Call lifecycle: `initiated -> {ringing, connected} -> {ended, missed}`.
///
/// Reject and missed are not separate transitions; they are reason codes on
/// `end`, with the terminal status derived from whether the call ever
/// connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Initiated,
    Ringing,
    Connected,
    Ended,
    Missed,
}

impl CallStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallStatus::Ended | CallStatus::Missed)
    }

    /// Ring acknowledgement is only meaningful before anyone picked up.
    pub fn can_ring(&self) -> bool {
        matches!(self, CallStatus::Initiated)
    }

    /// Answering stays legal once connected so late participants of a
    /// multi-party call can still join.
    pub fn can_answer(&self) -> bool {
        matches!(
            self,
            CallStatus::Initiated | CallStatus::Ringing | CallStatus::Connected
        )
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CallStatus::Initiated => "initiated",
            CallStatus::Ringing => "ringing",
            CallStatus::Connected => "connected",
            CallStatus::Ended => "ended",
            CallStatus::Missed => "missed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for CallStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initiated" => Ok(CallStatus::Initiated),
            "ringing" => Ok(CallStatus::Ringing),
            "connected" => Ok(CallStatus::Connected),
            "ended" => Ok(CallStatus::Ended),
            "missed" => Ok(CallStatus::Missed),
            _ => Err(format!("unknown call status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    Hangup,
    Reject,
    Missed,
    Timeout,
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EndReason::Hangup => "hangup",
            EndReason::Reject => "reject",
            EndReason::Missed => "missed",
            EndReason::Timeout => "timeout",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for EndReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hangup" => Ok(EndReason::Hangup),
            "reject" => Ok(EndReason::Reject),
            "missed" => Ok(EndReason::Missed),
            "timeout" => Ok(EndReason::Timeout),
            _ => Err(format!("unknown end reason: {s}")),
        }
    }
}

/// Terminal status and duration for a call ending now.
///
/// A call that never connected closes as `missed` with zero duration.
/// Duration is `ended - connected`, clamped at zero in case of clock skew.
pub fn close_out(
    connected_at: Option<DateTime<Utc>>,
    ended_at: DateTime<Utc>,
) -> (CallStatus, i32) {
    match connected_at {
        Some(connected) => {
            let secs = (ended_at - connected).num_seconds().max(0);
            (CallStatus::Ended, secs as i32)
        }
        None => (CallStatus::Missed, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn status_round_trip() {
        for s in ["initiated", "ringing", "connected", "ended", "missed"] {
            let status: CallStatus = s.parse().unwrap();
            assert_eq!(status.to_string(), s);
        }
        assert!("rejected".parse::<CallStatus>().is_err());
    }

    #[test]
    fn answer_legality() {
        assert!(CallStatus::Initiated.can_answer());
        assert!(CallStatus::Ringing.can_answer());
        assert!(CallStatus::Connected.can_answer());
        assert!(!CallStatus::Ended.can_answer());
        assert!(!CallStatus::Missed.can_answer());
    }

    #[test]
    fn terminal_states() {
        assert!(CallStatus::Ended.is_terminal());
        assert!(CallStatus::Missed.is_terminal());
        assert!(!CallStatus::Connected.is_terminal());
    }

    #[test]
    fn close_out_computes_duration() {
        let connected = Utc::now();
        let ended = connected + Duration::seconds(95);
        assert_eq!(close_out(Some(connected), ended), (CallStatus::Ended, 95));
    }

    #[test]
    fn close_out_clamps_clock_skew() {
        let connected = Utc::now();
        let ended = connected - Duration::seconds(3);
        assert_eq!(close_out(Some(connected), ended), (CallStatus::Ended, 0));
    }

    #[test]
    fn never_connected_is_missed() {
        assert_eq!(close_out(None, Utc::now()), (CallStatus::Missed, 0));
    }
}
