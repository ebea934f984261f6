use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use luvo_shared::clients::redis::RedisClient;
use luvo_shared::errors::{AppError, AppResult, ErrorCode};

use crate::lifecycle::window::{self, WindowQuota};

/// Sliding-window swipe limiter over Redis sorted sets.
///
/// One set per `(scope, user)`, members scored by action time in epoch
/// millis. Each evaluation prunes expired members first, so the set stays
/// bounded by the limit plus in-flight writes. The daily "swipes" scope is
/// the primary consumer; scopes are free-form so other interaction budgets
/// can share the mechanism.
pub struct SwipeService {
    redis: RedisClient,
    limit: u32,
    window: Duration,
}

impl SwipeService {
    pub fn new(redis: RedisClient, limit: u32, window_hours: i64) -> Self {
        Self {
            redis,
            limit,
            window: Duration::hours(window_hours),
        }
    }

    fn key(scope: &str, user_id: Uuid) -> String {
        format!("swipes:actions:{scope}:{user_id}")
    }

    async fn action_times(&self, key: &str, now: DateTime<Utc>) -> AppResult<Vec<DateTime<Utc>>> {
        // Members at exactly `now - window` have expired; the removal range
        // is inclusive, which matches.
        let cutoff = (now - self.window).timestamp_millis() as f64;
        self.redis
            .zremrangebyscore(key, f64::NEG_INFINITY, cutoff)
            .await
            .map_err(redis_err)?;

        let entries = self
            .redis
            .zrangebyscore_withscores(key, f64::NEG_INFINITY, f64::INFINITY)
            .await
            .map_err(redis_err)?;

        Ok(entries
            .into_iter()
            .filter_map(|(_, score)| Utc.timestamp_millis_opt(score as i64).single())
            .collect())
    }

    /// Current quota without consuming anything.
    pub async fn quota(&self, scope: &str, user_id: Uuid) -> AppResult<WindowQuota> {
        let now = Utc::now();
        let times = self.action_times(&Self::key(scope, user_id), now).await?;
        Ok(window::evaluate(&times, now, self.limit, self.window))
    }

    /// Consume one slot, or fail with `SwipeLimitReached` carrying the
    /// reset time. The recorded action lands with the instant it was
    /// checked against, so check and spend agree on the window.
    pub async fn record(&self, scope: &str, user_id: Uuid) -> AppResult<WindowQuota> {
        let now = Utc::now();
        let key = Self::key(scope, user_id);
        let times = self.action_times(&key, now).await?;

        let quota = window::evaluate(&times, now, self.limit, self.window);
        if !quota.allowed {
            return Err(self.limit_reached(quota.resets_at));
        }

        let millis = now.timestamp_millis();
        let member = format!("{millis}:{}", Uuid::new_v4());
        self.redis
            .zadd(&key, &member, millis as f64)
            .await
            .map_err(redis_err)?;
        // Safety net so abandoned sets do not outlive their usefulness.
        self.redis
            .expire(&key, self.window.num_seconds() + 60)
            .await
            .map_err(redis_err)?;

        // Re-read after the write: two racing records can both pass the
        // check above, and the set is the single source of truth for how
        // many landed. An overshooting writer takes its own member back
        // out, so the window never holds more than `limit` actions.
        let times = self.action_times(&key, now).await?;
        if window::counted(&times, now, self.window) > self.limit {
            self.redis.zrem(&key, &member).await.map_err(redis_err)?;
            let quota = window::evaluate(&times, now, self.limit, self.window);
            return Err(self.limit_reached(quota.resets_at));
        }

        Ok(window::evaluate(&times, now, self.limit, self.window))
    }

    fn limit_reached(&self, resets_at: Option<DateTime<Utc>>) -> AppError {
        AppError::with_details(
            ErrorCode::SwipeLimitReached,
            format!("swipe limit of {} per window reached", self.limit),
            serde_json::json!({ "remaining": 0, "resets_at": resets_at }),
        )
    }
}

fn redis_err(e: redis::RedisError) -> AppError {
    AppError::internal(format!("redis error: {e}"))
}
