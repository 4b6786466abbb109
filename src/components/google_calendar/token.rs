use crate::components::redis_service::RedisActorHandle;
use crate::config::Config;
use crate::error::{google_calendar_error, BotResult};
use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Google's OAuth token endpoint
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Refresh a little early so a token never expires mid-request
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Per-user OAuth tokens stored in Redis
#[derive(Clone)]
pub struct TokenManager {
    config: Arc<RwLock<Config>>,
    redis_handle: RedisActorHandle,
    client: Client,
}

impl TokenManager {
    pub fn new(config: Arc<RwLock<Config>>, redis_handle: RedisActorHandle) -> Self {
        Self {
            config,
            redis_handle,
            client: Client::new(),
        }
    }

    /// Get a usable access token for a user, refreshing it if it has expired
    pub async fn get_access_token(&self, user_id: &str) -> BotResult<String> {
        let token = self
            .redis_handle
            .get_token(user_id)
            .await?
            .ok_or_else(|| google_calendar_error(&format!("No calendar linked for user {}", user_id)))?;

        let token = if is_expired(&token, Utc::now().timestamp()) {
            debug!("Refreshing calendar token for user {}", user_id);
            self.refresh_token(user_id, &token).await?
        } else {
            token
        };

        token
            .get("access_token")
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .ok_or_else(|| google_calendar_error("No access token available"))
    }

    /// Refresh an expired token and store the result
    async fn refresh_token(&self, user_id: &str, token: &Value) -> BotResult<Value> {
        let refresh_token = token
            .get("refresh_token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| google_calendar_error("No refresh token in token data"))?;

        let (client_id, client_secret) = {
            let config_read = self.config.read().await;
            (
                config_read.google_client_id.clone(),
                config_read.google_client_secret.clone(),
            )
        };

        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token.to_string()),
            ("grant_type", "refresh_token".to_string()),
        ];

        let response = self
            .client
            .post(TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to refresh token: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(google_calendar_error(&format!(
                "Failed to refresh token: HTTP {} - {}",
                status, error_body
            )));
        }

        let new_token: Value = response
            .json()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to parse token response: {}", e)))?;

        let token_data = merge_refreshed_token(&new_token, refresh_token, Utc::now().timestamp())?;
        self.redis_handle
            .save_token(user_id, token_data.clone())
            .await?;

        Ok(token_data)
    }
}

/// Tokens without `expires_at` are treated as expired
fn is_expired(token: &Value, now: i64) -> bool {
    match token.get("expires_at").and_then(|v| v.as_i64()) {
        Some(expires_at) => expires_at <= now + EXPIRY_MARGIN_SECS,
        None => true,
    }
}

/// Combine a refresh response with the refresh token we already hold
fn merge_refreshed_token(new_token: &Value, refresh_token: &str, now: i64) -> BotResult<Value> {
    let access_token = new_token
        .get("access_token")
        .cloned()
        .ok_or_else(|| google_calendar_error("Token response missing 'access_token' field"))?;

    let expires_in = new_token
        .get("expires_in")
        .and_then(|v| v.as_i64())
        .unwrap_or(3600);

    Ok(json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "expires_at": now + expires_in,
    }))
}

/// Add `expires_at` to a fresh authorization-code response
pub fn stamp_expiry(mut token: Value, now: i64) -> BotResult<Value> {
    let expires_in = token
        .get("expires_in")
        .and_then(|v| v.as_i64())
        .unwrap_or(3600);

    let obj = token
        .as_object_mut()
        .ok_or_else(|| google_calendar_error("Token data is not an object"))?;
    obj.insert("expires_at".to_string(), json!(now + expires_in));
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_expired() {
        let now = 1_700_000_000;
        assert!(!is_expired(&json!({ "expires_at": now + 3600 }), now));
        assert!(is_expired(&json!({ "expires_at": now + 30 }), now));
        assert!(is_expired(&json!({ "expires_at": now - 1 }), now));
        assert!(is_expired(&json!({ "access_token": "a" }), now));
    }

    #[test]
    fn test_merge_refreshed_token() {
        let merged = merge_refreshed_token(
            &json!({ "access_token": "fresh", "expires_in": 1800 }),
            "keep-me",
            100,
        )
        .unwrap();

        assert_eq!(merged["access_token"], "fresh");
        assert_eq!(merged["refresh_token"], "keep-me");
        assert_eq!(merged["expires_at"], 1900);

        assert!(merge_refreshed_token(&json!({ "error": "invalid_grant" }), "r", 0).is_err());
    }

    #[test]
    fn test_stamp_expiry() {
        let token = stamp_expiry(json!({ "access_token": "a", "expires_in": 60 }), 1000).unwrap();
        assert_eq!(token["expires_at"], 1060);
        assert_eq!(token["access_token"], "a");

        assert!(stamp_expiry(json!("not an object"), 0).is_err());
    }
}
