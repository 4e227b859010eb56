//! Redis-backed counter store.
//!
//! Counter increments ride an atomic pipeline (`MULTI` .. `INCRBY` +
//! `EXPIRE` .. `EXEC`) so a counter is never visible without its expiry;
//! size snapshots use `SETEX`. One connection per store instance; the
//! relay worker owns it exclusively and never shares or pools it.

use super::{CounterStore, StoreError};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Protocol(e.to_string())
    }
}

pub struct RedisCounterStore {
    conn: MultiplexedConnection,
}

impl RedisCounterStore {
    /// Connect to the store at `url` (e.g. `redis://127.0.0.1:6379/`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(RedisCounterStore { conn })
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr_by_expire(&self, key: &str, delta: i64, ttl_secs: u64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .cmd("INCRBY")
            .arg(key)
            .arg(delta)
            .ignore()
            .cmd("EXPIRE")
            .arg(key)
            .arg(ttl_secs)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn set_with_ttl(&self, key: &str, value: i64, ttl_secs: u64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SETEX")
            .arg(key)
            .arg(ttl_secs)
            .arg(value)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}
