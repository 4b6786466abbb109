use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use execumate::components::meal_reminder::{
    CredentialStore, CycleMode, ReminderScheduler, ReminderStateHandle, SchedulerSettings,
    SyntheticFallbackSource,
};
use execumate::components::notifier::{NotificationPayload, NotificationSink};
use execumate::components::redis_service::keys;
use execumate::config::ReminderSettings;
use execumate::error::{google_calendar_error, BotResult};
use execumate::utils::clock::FixedClock;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-memory stand-in for the Redis token store
#[derive(Debug, Clone, Default)]
pub struct MockRedis {
    data: Arc<Mutex<HashMap<String, String>>>,
}

impl MockRedis {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn save_token(&self, user_id: &str, token: Value) -> BotResult<()> {
        let mut data = self.data.lock().await;
        data.insert(keys::calendar_token(user_id), token.to_string());
        Ok(())
    }

    pub async fn get_token(&self, user_id: &str) -> BotResult<Option<Value>> {
        let data = self.data.lock().await;
        match data.get(&keys::calendar_token(user_id)) {
            Some(token_json) => {
                let token = serde_json::from_str(token_json).map_err(|e| {
                    google_calendar_error(&format!("Failed to deserialize token: {e}"))
                })?;
                Ok(Some(token))
            }
            None => Ok(None),
        }
    }

    pub async fn delete_token(&self, user_id: &str) -> BotResult<bool> {
        let mut data = self.data.lock().await;
        Ok(data.remove(&keys::calendar_token(user_id)).is_some())
    }
}

#[async_trait]
impl CredentialStore for MockRedis {
    async fn has_credentials(&self, user_id: &str) -> BotResult<bool> {
        Ok(self.get_token(user_id).await?.is_some())
    }
}

struct NullSink;

impl NotificationSink for NullSink {
    fn emit(&self, _event_name: &str, _payload: NotificationPayload, _target: &str) {}
}

#[tokio::test]
async fn test_token_round_trip_uses_per_user_keys() {
    let redis = MockRedis::new();
    let token = json!({ "access_token": "a", "refresh_token": "r", "expires_at": 100 });

    redis.save_token("42", token.clone()).await.unwrap();
    assert_eq!(redis.get_token("42").await.unwrap(), Some(token));
    assert_eq!(redis.get_token("43").await.unwrap(), None);
    assert!(redis
        .data
        .lock()
        .await
        .contains_key("calendar_token:42"));

    assert!(redis.delete_token("42").await.unwrap());
    assert!(!redis.delete_token("42").await.unwrap());
}

/// Linking the first calendar takes the scheduler out of fallback mode,
/// unlinking the last one puts it back
#[tokio::test]
async fn test_linking_switches_cycle_mode() {
    let redis = Arc::new(MockRedis::new());
    let state = ReminderStateHandle::spawn();
    state.register_user("42").await.unwrap();
    state.register_user("43").await.unwrap();

    let tz = chrono_tz::UTC;
    let settings = SchedulerSettings::from_reminder_settings(&ReminderSettings::default()).unwrap();
    let synthetic = Arc::new(SyntheticFallbackSource::new(tz, settings.fallback_event_time));
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(),
    ));

    // The synthetic source doubles as the "real" calendar; only the mode matters here
    let scheduler = ReminderScheduler::new(
        settings,
        tz,
        synthetic,
        redis.clone(),
        Arc::new(NullSink),
        state,
    )
    .with_clock(clock);

    assert_eq!(scheduler.run_cycle().await.mode, CycleMode::Fallback);

    redis
        .save_token("43", json!({ "access_token": "a" }))
        .await
        .unwrap();
    let report = scheduler.run_cycle().await;
    assert_eq!(report.mode, CycleMode::Normal);
    assert_eq!(report.users, 2);

    redis.delete_token("43").await.unwrap();
    assert_eq!(scheduler.run_cycle().await.mode, CycleMode::Fallback);
}
