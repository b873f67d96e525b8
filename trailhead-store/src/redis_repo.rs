use redis::RedisResult;
use tracing::debug;

const KEY_PREFIX: &str = "trailhead:ratelimit";

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub fn new(url: &str) -> Result<Self, redis::RedisError> {
        Ok(Self {
            client: redis::Client::open(url)?,
        })
    }

    /// Fixed window per caller. `Ok(false)` once `limit` requests were seen
    /// inside the current window.
    pub async fn allow_request(&self, caller: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let key = window_key(caller);
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (hits, ttl): (i64, i64) = redis::pipe()
            .atomic()
            .incr(&key, 1)
            .ttl(&key)
            .query_async(&mut conn)
            .await?;

        // The window starts with its first hit and is never extended
        if needs_expiry(hits, ttl) {
            let _: i64 = redis::cmd("EXPIRE")
                .arg(&key)
                .arg(window_seconds)
                .query_async(&mut conn)
                .await?;
        }

        if hits > limit {
            debug!("{} over limit ({} of {})", key, hits, limit);
        }
        Ok(hits <= limit)
    }
}

/// TTL of -1 means the key exists without expiry, e.g. when the EXPIRE
/// after a first hit never arrived.
fn needs_expiry(hits: i64, ttl: i64) -> bool {
    hits == 1 || ttl == -1
}

fn window_key(caller: &str) -> String {
    format!("{}:{}", KEY_PREFIX, caller)
}
