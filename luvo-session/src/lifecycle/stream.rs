use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Stream lifecycle: `upcoming -> live -> ended`. Linear, no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    Upcoming,
    Live,
    Ended,
}

impl StreamStatus {
    pub fn can_start(&self) -> bool {
        matches!(self, StreamStatus::Upcoming)
    }

    pub fn can_end(&self) -> bool {
        matches!(self, StreamStatus::Live)
    }

    /// Viewers can only join a broadcast that is actually on air.
    pub fn accepts_viewers(&self) -> bool {
        matches!(self, StreamStatus::Live)
    }
}

impl std::fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StreamStatus::Upcoming => "upcoming",
            StreamStatus::Live => "live",
            StreamStatus::Ended => "ended",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for StreamStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upcoming" => Ok(StreamStatus::Upcoming),
            "live" => Ok(StreamStatus::Live),
            "ended" => Ok(StreamStatus::Ended),
            _ => Err(format!("unknown stream status: {s}")),
        }
    }
}

/// A camera is considered online for this long after its last heartbeat.
pub const CAMERA_FRESHNESS_SECS: i64 = 30;

/// Computed liveness predicate; there is no background sweep flipping flags.
pub fn camera_online(is_active: bool, last_seen_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    is_active && now - last_seen_at <= Duration::seconds(CAMERA_FRESHNESS_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_transitions() {
        assert!(StreamStatus::Upcoming.can_start());
        assert!(!StreamStatus::Live.can_start());
        assert!(!StreamStatus::Ended.can_start());

        assert!(StreamStatus::Live.can_end());
        assert!(!StreamStatus::Upcoming.can_end());
        assert!(!StreamStatus::Ended.can_end());

        assert!(StreamStatus::Live.accepts_viewers());
        assert!(!StreamStatus::Upcoming.accepts_viewers());
    }

    #[test]
    fn camera_freshness_window() {
        let now = Utc::now();
        assert!(camera_online(true, now - Duration::seconds(10), now));
        assert!(camera_online(true, now - Duration::seconds(30), now));
        assert!(!camera_online(true, now - Duration::seconds(31), now));
        assert!(!camera_online(false, now, now));
    }
}
