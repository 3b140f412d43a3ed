use redis::{aio::ConnectionManager, Client};

/// Shared Redis handle; the connection manager reconnects on its own after
/// the server drops, so cache outages heal without a restart.
#[derive(Clone)]
pub struct RedisClient {
    pub conn: ConnectionManager,
}

impl RedisClient {
    pub async fn new(redis_url: &str) -> redis::RedisResult<Self> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(RedisClient { conn })
    }
}
