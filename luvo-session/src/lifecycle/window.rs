use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Result of evaluating a sliding-window quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowQuota {
    pub allowed: bool,
    pub remaining: u32,
    /// When the oldest in-window action expires and one slot frees up.
    /// `None` when no actions are currently counted.
    pub resets_at: Option<DateTime<Utc>>,
}

/// Sliding-window rate evaluation over a trailing duration ending `now`.
///
/// An action at `t` counts while `t + window > now`; at exactly
/// `t + window` it has expired. `resets_at` is the expiry of the oldest
/// still-counted action, which is the earliest instant the quota can free
/// a slot. This is not a fixed calendar bucket.
/// Actions still counted in the trailing window ending `now`. Unlike
/// [`evaluate`] this reports the raw count, which can exceed the limit
/// when concurrent writers overshoot it.
pub fn counted(action_times: &[DateTime<Utc>], now: DateTime<Utc>, window: Duration) -> u32 {
    action_times.iter().filter(|&&t| t + window > now).count() as u32
}

pub fn evaluate(
    action_times: &[DateTime<Utc>],
    now: DateTime<Utc>,
    limit: u32,
    window: Duration,
) -> WindowQuota {
    let mut counted = 0u32;
    let mut oldest: Option<DateTime<Utc>> = None;

    for &t in action_times {
        if t + window > now {
            counted += 1;
            if oldest.map_or(true, |o| t < o) {
                oldest = Some(t);
            }
        }
    }

    WindowQuota {
        allowed: counted < limit,
        remaining: limit.saturating_sub(counted),
        resets_at: oldest.map(|t| t + window),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_hour(h: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::hours(h)
    }

    #[test]
    fn trailing_window_denies_then_allows() {
        // Actions at t=0,1,2h; limit 2; window 12h.
        let actions = vec![at_hour(0), at_hour(1), at_hour(2)];
        let window = Duration::hours(12);

        // A 4th attempt at t=3h is denied; the oldest action frees a slot
        // at t=12h.
        let q = evaluate(&actions, at_hour(3), 2, window);
        assert!(!q.allowed);
        assert_eq!(q.remaining, 0);
        assert_eq!(q.resets_at, Some(at_hour(12)));

        // At t=13h the actions at 0h and 1h have expired (1h + 12h == 13h
        // is expiry, not in-window), leaving one counted action.
        let q = evaluate(&actions, at_hour(13), 2, window);
        assert!(q.allowed);
        assert_eq!(q.remaining, 1);
        assert_eq!(q.resets_at, Some(at_hour(14)));
    }

    #[test]
    fn empty_history_has_full_quota() {
        let q = evaluate(&[], at_hour(5), 10, Duration::hours(12));
        assert!(q.allowed);
        assert_eq!(q.remaining, 10);
        assert_eq!(q.resets_at, None);
    }

    #[test]
    fn counted_reports_overshoot_past_the_limit() {
        let actions = vec![at_hour(0), at_hour(1), at_hour(2)];
        let window = Duration::hours(12);
        // Raw count is not clamped by any limit.
        assert_eq!(counted(&actions, at_hour(3), window), 3);
        // Expired actions drop out.
        assert_eq!(counted(&actions, at_hour(13), window), 1);
    }

    #[test]
    fn at_limit_count_is_denied() {
        let actions = vec![at_hour(0), at_hour(1)];
        let q = evaluate(&actions, at_hour(2), 2, Duration::hours(12));
        assert!(!q.allowed);
        assert_eq!(q.remaining, 0);
    }

    #[test]
    fn unsorted_input_still_finds_oldest() {
        let actions = vec![at_hour(2), at_hour(0), at_hour(1)];
        let q = evaluate(&actions, at_hour(3), 5, Duration::hours(12));
        assert_eq!(q.remaining, 2);
        assert_eq!(q.resets_at, Some(at_hour(12)));
    }
}
