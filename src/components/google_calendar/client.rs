use super::models::CalendarEvent;
use super::token::TokenManager;
use crate::components::meal_reminder::{CredentialStore, EventSource};
use crate::components::redis_service::RedisActorHandle;
use crate::config::Config;
use crate::error::{google_calendar_error, BotResult};
use crate::utils::time::local_day_bounds;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use chrono_tz::Tz;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

/// Calendar API root
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Reads each user's primary Google Calendar with their own token
#[derive(Clone)]
pub struct GoogleCalendarClient {
    token_manager: TokenManager,
    redis_handle: RedisActorHandle,
    client: Client,
    api_base: String,
    timezone: Tz,
}

impl GoogleCalendarClient {
    pub fn new(config: Arc<RwLock<Config>>, redis_handle: RedisActorHandle, timezone: Tz) -> Self {
        Self {
            token_manager: TokenManager::new(config, redis_handle.clone()),
            redis_handle,
            client: Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            timezone,
        }
    }

    /// Point the client at a different API root
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Build the `events.list` URL for a time range
    fn events_url(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> BotResult<Url> {
        let url_str = format!("{}/calendars/primary/events", self.api_base.trim_end_matches('/'));
        let mut url = Url::parse(&url_str)
            .map_err(|e| google_calendar_error(&format!("Failed to parse URL: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("timeMin", &start.to_rfc3339_opts(SecondsFormat::Secs, true))
            .append_pair("timeMax", &end.to_rfc3339_opts(SecondsFormat::Secs, true))
            .append_pair("singleEvents", "true")
            .append_pair("orderBy", "startTime");

        Ok(url)
    }

    async fn list_events(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BotResult<Vec<CalendarEvent>> {
        let access_token = self.token_manager.get_access_token(user_id).await?;
        let url = self.events_url(start, end)?;

        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to fetch events: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(google_calendar_error(&format!(
                "Failed to fetch events: HTTP {} - {}",
                status, error_body
            )));
        }

        let response_data: Value = response
            .json()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to parse events response: {}", e)))?;

        let events = parse_events(&response_data)?;
        debug!("Fetched {} events for user {}", events.len(), user_id);
        Ok(events)
    }
}

/// Convert an `events.list` response body into events
pub fn parse_events(response: &Value) -> BotResult<Vec<CalendarEvent>> {
    let items = response
        .get("items")
        .and_then(|i| i.as_array())
        .ok_or_else(|| google_calendar_error("No items in response"))?;

    Ok(items.iter().map(CalendarEvent::from_api).collect())
}

#[async_trait]
impl EventSource for GoogleCalendarClient {
    fn name(&self) -> &'static str {
        "google_calendar"
    }

    async fn events_for_day(&self, user_id: &str, date: NaiveDate) -> BotResult<Vec<CalendarEvent>> {
        let (start, end) = local_day_bounds(date, &self.timezone)
            .ok_or_else(|| google_calendar_error(&format!("Cannot resolve day {}", date)))?;
        self.list_events(user_id, start, end).await
    }

    async fn events_in_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BotResult<Vec<CalendarEvent>> {
        self.list_events(user_id, start, end).await
    }
}

#[async_trait]
impl CredentialStore for GoogleCalendarClient {
    async fn has_credentials(&self, user_id: &str) -> BotResult<bool> {
        self.redis_handle.has_token(user_id).await
    }
}
