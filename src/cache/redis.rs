use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;

use super::{CacheError, CacheStore};
use crate::redis_client::RedisClient;

/// Redis-backed snapshots, stored as JSON strings under `SET EX`.
#[derive(Clone)]
pub struct RedisCacheStore {
    redis: RedisClient,
}

impl RedisCacheStore {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.redis.conn.clone();
        let data: Option<String> = conn.get(key).await?;
        Ok(data)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.redis.conn.clone();
        // EX 0 отвергается Redis
        let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.redis.conn.clone();
        let _: () = conn.del(keys).await?;
        Ok(())
    }
}
