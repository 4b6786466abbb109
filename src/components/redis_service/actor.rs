use crate::config::Config;
use crate::error::{google_calendar_error, BotResult, Error};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client as RedisClient};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};

// Redis key constants
pub mod keys {
    pub const CALENDAR_TOKEN_PREFIX: &str = "calendar_token:";

    /// Key holding one user's OAuth token
    pub fn calendar_token(user_id: &str) -> String {
        format!("{}{}", CALENDAR_TOKEN_PREFIX, user_id)
    }
}

/// The Redis actor that owns per-user calendar tokens
pub struct RedisActor {
    config: Arc<RwLock<Config>>,
    connection: Option<MultiplexedConnection>,
    command_rx: mpsc::Receiver<RedisCommand>,
}

/// Commands that can be sent to the Redis actor
pub enum RedisCommand {
    GetToken(String, mpsc::Sender<BotResult<Option<Value>>>),
    SaveToken(String, Value, mpsc::Sender<BotResult<()>>),
    DeleteToken(String, mpsc::Sender<BotResult<bool>>),
    HasToken(String, mpsc::Sender<BotResult<bool>>),
    Shutdown,
}

/// Handle for communicating with the Redis actor
#[derive(Clone, Debug)]
pub struct RedisActorHandle {
    command_tx: mpsc::Sender<RedisCommand>,
}

impl RedisActorHandle {
    /// Create a handle with no actor behind it; every call fails
    pub fn empty() -> Self {
        let (command_tx, _) = mpsc::channel(32);
        Self { command_tx }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(mpsc::Sender<BotResult<T>>) -> RedisCommand,
    ) -> BotResult<T> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(build(response_tx))
            .await
            .map_err(|e| google_calendar_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| google_calendar_error("Response channel closed"))?
    }

    /// Get a user's token
    pub async fn get_token(&self, user_id: &str) -> BotResult<Option<Value>> {
        let user_id = user_id.to_string();
        self.request(|tx| RedisCommand::GetToken(user_id, tx)).await
    }

    /// Save a user's token
    pub async fn save_token(&self, user_id: &str, token: Value) -> BotResult<()> {
        let user_id = user_id.to_string();
        self.request(|tx| RedisCommand::SaveToken(user_id, token, tx))
            .await
    }

    /// Remove a user's token, returning whether one existed
    pub async fn delete_token(&self, user_id: &str) -> BotResult<bool> {
        let user_id = user_id.to_string();
        self.request(|tx| RedisCommand::DeleteToken(user_id, tx)).await
    }

    /// Check whether a user has a stored token
    pub async fn has_token(&self, user_id: &str) -> BotResult<bool> {
        let user_id = user_id.to_string();
        self.request(|tx| RedisCommand::HasToken(user_id, tx)).await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> BotResult<()> {
        let _ = self.command_tx.send(RedisCommand::Shutdown).await;
        Ok(())
    }
}

impl RedisActor {
    /// Create a new actor and return its handle
    pub fn new(config: Arc<RwLock<Config>>) -> (Self, RedisActorHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);

        let actor = Self {
            config,
            connection: None,
            command_rx,
        };

        let handle = RedisActorHandle { command_tx };

        (actor, handle)
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Redis actor started");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                RedisCommand::GetToken(user_id, response_tx) => {
                    let result = self.get_token_from_redis(&user_id).await;
                    let _ = response_tx.send(result).await;
                }
                RedisCommand::SaveToken(user_id, token, response_tx) => {
                    let result = self.save_token_to_redis(&user_id, token).await;
                    let _ = response_tx.send(result).await;
                }
                RedisCommand::DeleteToken(user_id, response_tx) => {
                    let result = self.delete_token_from_redis(&user_id).await;
                    let _ = response_tx.send(result).await;
                }
                RedisCommand::HasToken(user_id, response_tx) => {
                    let result = self.token_exists(&user_id).await;
                    let _ = response_tx.send(result).await;
                }
                RedisCommand::Shutdown => {
                    info!("Redis actor shutting down");
                    break;
                }
            }
        }

        info!("Redis actor shut down");
    }

    /// Get a redis connection, reusing the last one
    async fn connection(&mut self) -> BotResult<MultiplexedConnection> {
        if let Some(connection) = &self.connection {
            return Ok(connection.clone());
        }

        let redis_url = {
            let config_guard = self.config.read().await;
            config_guard.redis_url.clone()
        };

        let client = RedisClient::open(redis_url)
            .map_err(|e| google_calendar_error(&format!("Failed to create Redis client: {}", e)))?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to connect to Redis: {}", e)))?;

        debug!("Connected to Redis");
        self.connection = Some(connection.clone());
        Ok(connection)
    }

    /// Drop the cached connection after a failure so the next command reconnects
    fn on_redis_error(&mut self, context: &str, err: redis::RedisError) -> Error {
        self.connection = None;
        google_calendar_error(&format!("{}: {}", context, err))
    }

    async fn get_token_from_redis(&mut self, user_id: &str) -> BotResult<Option<Value>> {
        let mut conn = self.connection().await?;

        let token_json: Option<String> = match conn.get(keys::calendar_token(user_id)).await {
            Ok(value) => value,
            Err(e) => return Err(self.on_redis_error("Failed to read token from Redis", e)),
        };

        match token_json {
            Some(json) => {
                let token: Value = serde_json::from_str(&json).map_err(|e| {
                    google_calendar_error(&format!("Failed to deserialize token: {}", e))
                })?;
                Ok(Some(token))
            }
            None => Ok(None),
        }
    }

    async fn save_token_to_redis(&mut self, user_id: &str, token: Value) -> BotResult<()> {
        let mut conn = self.connection().await?;

        let result: redis::RedisResult<()> =
            conn.set(keys::calendar_token(user_id), token.to_string()).await;
        result.map_err(|e| self.on_redis_error("Failed to save token to Redis", e))
    }

    async fn delete_token_from_redis(&mut self, user_id: &str) -> BotResult<bool> {
        let mut conn = self.connection().await?;

        let result: redis::RedisResult<u64> = conn.del(keys::calendar_token(user_id)).await;
        result
            .map(|removed| removed > 0)
            .map_err(|e| self.on_redis_error("Failed to delete token from Redis", e))
    }

    async fn token_exists(&mut self, user_id: &str) -> BotResult<bool> {
        let mut conn = self.connection().await?;

        let result: redis::RedisResult<bool> = conn.exists(keys::calendar_token(user_id)).await;
        result.map_err(|e| self.on_redis_error("Redis error", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_key_is_per_user() {
        assert_eq!(keys::calendar_token("42"), "calendar_token:42");
        assert_ne!(keys::calendar_token("1"), keys::calendar_token("2"));
    }

    #[tokio::test]
    async fn test_empty_handle_fails_instead_of_hanging() {
        let handle = RedisActorHandle::empty();
        assert!(handle.has_token("42").await.is_err());
        assert!(handle.shutdown().await.is_ok());
    }
}
