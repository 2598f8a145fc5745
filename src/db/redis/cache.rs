use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Recommendation set for one external user id
    Recommendations(i64),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Recommendations(external_id) => write!(f, "recs:{}", external_id),
        }
    }
}

/// Creates a Redis client for caching
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Best-effort JSON cache over Redis.
///
/// Reads and writes never propagate Redis failures: an unreachable cache reads
/// as a miss and a failed write is dropped with a warning. Cached data here is
/// always refetchable from the remote service.
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
}

impl Cache {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }

    /// Retrieves and deserializes a cached value, treating every failure
    /// (connection, missing key, stale payload shape) as a miss.
    pub async fn get<T: serde::de::DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let mut conn = match self.redis_client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Cache unavailable, treating as miss");
                return None;
            }
        };

        let cached: Option<String> = match conn.get(format!("{}", key)).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Cache read failed, treating as miss");
                return None;
            }
        };

        cached.and_then(|json| match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Cache payload did not deserialize");
                None
            }
        })
    }

    /// Serializes and stores a value with a TTL. Failures are logged and
    /// swallowed.
    pub async fn set<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, key = %key, "Cache serialization error");
                return;
            }
        };

        let mut conn = match self.redis_client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Cache unavailable, dropping write");
                return;
            }
        };

        let result: Result<(), redis::RedisError> = conn.set_ex(format!("{}", key), json, ttl).await;
        if let Err(e) = result {
            tracing::warn!(error = %e, key = %key, "Cache write failed");
        } else {
            tracing::debug!(key = %key, ttl = ttl, "Cached value");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_display_recommendations() {
        let key = CacheKey::Recommendations(42);
        assert_eq!(format!("{}", key), "recs:42");
    }

    #[tokio::test]
    async fn test_unreachable_cache_reads_as_miss() {
        // Nothing listens on this port; get() must degrade, not error.
        let client = create_redis_client("redis://127.0.0.1:1").unwrap();
        let cache = Cache::new(client);

        let value: Option<Vec<i64>> = cache.get(&CacheKey::Recommendations(1)).await;
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_unreachable_cache_drops_write() {
        let client = create_redis_client("redis://127.0.0.1:1").unwrap();
        let cache = Cache::new(client);

        // Must not panic or block.
        cache
            .set(&CacheKey::Recommendations(1), &vec![1i64, 2, 3], 60)
            .await;
    }
}
