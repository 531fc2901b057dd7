//! Redis-backed cache store.
//!
//! Values are written with `SETEX` so Redis owns expiry. The multiplexed
//! connection is opened lazily and dropped after any command error so the
//! next call reconnects.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client, RedisError, aio::MultiplexedConnection};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::application::repos::{CacheError, CacheStore};
use crate::config::CacheSettings;
use crate::infra::error::InfraError;
use crate::infra::pool::{ConnectionGate, GateError};

#[derive(Debug)]
pub struct RedisCacheStore {
    client: Client,
    connection: RwLock<Option<MultiplexedConnection>>,
    gate: ConnectionGate,
    command_timeout: Duration,
}

impl RedisCacheStore {
    /// Parse the cache URL. No connection is made until the first command.
    pub fn new(url: &str, settings: &CacheSettings) -> Result<Self, InfraError> {
        let client = Client::open(url)
            .map_err(|err| InfraError::cache(format!("invalid cache URL: {err}")))?;
        Ok(Self {
            client,
            connection: RwLock::new(None),
            gate: ConnectionGate::new(
                settings.max_connections.get() as usize,
                settings.acquire_timeout,
            ),
            command_timeout: settings.command_timeout,
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        if let Some(conn) = self.connection.read().await.as_ref() {
            return Ok(conn.clone());
        }

        let conn = self
            .bounded(self.client.get_multiplexed_async_connection())
            .await?;
        *self.connection.write().await = Some(conn.clone());
        debug!("cache connection established");
        Ok(conn)
    }

    async fn mark_connection_failed(&self) {
        *self.connection.write().await = None;
    }

    async fn bounded<T>(
        &self,
        command: impl Future<Output = Result<T, RedisError>>,
    ) -> Result<T, CacheError> {
        match tokio::time::timeout(self.command_timeout, command).await {
            Ok(result) => result.map_err(CacheError::unavailable),
            Err(_) => Err(CacheError::Timeout),
        }
    }

    async fn run<T, F, Fut>(&self, command: F) -> Result<T, CacheError>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: Future<Output = Result<T, RedisError>>,
    {
        let _permit = self.gate.acquire().await.map_err(|err| match err {
            GateError::Exhausted(waited) => CacheError::PoolExhausted(waited),
            GateError::Closed => CacheError::unavailable(err),
        })?;
        let conn = self.connection().await?;
        let result = self.bounded(command(conn)).await;
        if let Err(CacheError::Unavailable(reason)) = &result {
            warn!(%reason, "cache command failed, dropping connection");
            self.mark_connection_failed().await;
        }
        result
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.run(|mut conn| async move { conn.get::<_, Option<Vec<u8>>>(key).await })
            .await
    }

    async fn set_raw(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let seconds = ttl.as_secs().max(1);
        self.run(|mut conn| async move { conn.set_ex::<_, _, ()>(key, value, seconds).await })
            .await
    }

    async fn ping(&self) -> bool {
        self.run(|mut conn| async move {
            let _: () = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(())
        })
        .await
        .is_ok()
    }
}
