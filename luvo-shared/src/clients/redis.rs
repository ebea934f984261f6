use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Thin wrapper over a multiplexed connection, exposing the sorted-set
/// operations the sliding-window gates use.
#[derive(Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
}

impl RedisClient {
    pub async fn connect(url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        tracing::info!(url = %url, "connected to Redis");
        Ok(Self { conn })
    }

    pub async fn expire(&self, key: &str, ttl_secs: i64) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.expire(key, ttl_secs).await
    }

    pub async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.zadd(key, member, score).await
    }

    pub async fn zrem(&self, key: &str, member: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.zrem(key, member).await
    }

    /// Drop members with scores in `[min, max]` (epoch millis for action sets).
    pub async fn zremrangebyscore(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<u64, redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.zrembyscore(key, min, max).await
    }

    /// Members with scores in `[min, max]`, with their scores, ascending.
    pub async fn zrangebyscore_withscores(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<(String, f64)>, redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.zrangebyscore_withscores(key, min, max).await
    }
}
