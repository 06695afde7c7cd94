// Cache module
// Redis cache for the public approved-groups listing

use std::sync::Arc;

use redis::{AsyncCommands, Client as RedisClient};
use serde::{Serialize, de::DeserializeOwned};

const APPROVED_GROUPS_KEY: &str = "groups:approved";

/// Cache failures are logged and treated as misses; the store stays the
/// source of truth.
#[derive(Clone)]
pub struct GroupCache {
    redis: Arc<RedisClient>,
    ttl_secs: u64,
}

impl GroupCache {
    pub fn new(redis: Arc<RedisClient>, ttl_secs: u64) -> Self {
        Self { redis, ttl_secs }
    }

    pub async fn approved_groups<T: DeserializeOwned>(&self) -> Option<T> {
        let mut conn = match self.redis.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!("Redis unavailable, skipping cache read: {}", e);
                return None;
            }
        };

        let cached: redis::RedisResult<Option<String>> = conn.get(APPROVED_GROUPS_KEY).await;
        match cached {
            Ok(Some(json_str)) => match serde_json::from_str(&json_str) {
                Ok(value) => {
                    tracing::debug!("Get approved groups from cache");
                    Some(value)
                }
                Err(e) => {
                    tracing::warn!("Discarding unreadable cache entry: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Cache read failed: {}", e);
                None
            }
        }
    }

    pub async fn store_approved_groups<T: Serialize>(&self, groups: &T) {
        let Ok(json_str) = serde_json::to_string(groups) else {
            return;
        };
        if let Ok(mut conn) = self.redis.get_multiplexed_async_connection().await {
            let result: redis::RedisResult<()> = conn
                .set_ex(APPROVED_GROUPS_KEY, json_str, self.ttl_secs)
                .await;
            match result {
                Ok(()) => tracing::debug!("Set approved groups to cache"),
                Err(e) => tracing::warn!("Cache write failed: {}", e),
            }
        }
    }

    /// Called after any group mutation.
    pub async fn invalidate(&self) {
        if let Ok(mut conn) = self.redis.get_multiplexed_async_connection().await {
            let result: redis::RedisResult<()> = conn.del(APPROVED_GROUPS_KEY).await;
            if let Err(e) = result {
                tracing::warn!("Cache invalidation failed: {}", e);
            }
        }
    }
}
