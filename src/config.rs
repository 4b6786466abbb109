use crate::components::meal_reminder::SchedulerSettings;
use crate::error::{config_error, env_error, BotResult};
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

/// Default activity text for the bot
pub const DEFAULT_ACTIVITY: &str = "Watching the lunch clock";

/// Default Redis connection used for calendar tokens
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default browser-automation agent endpoint
pub const DEFAULT_ORDER_AGENT_URL: &str = "http://localhost:9000";

/// Default OpenAI-compatible chat endpoint
pub const DEFAULT_ASSISTANT_API_URL: &str = "https://cloud.highrise.ai/highrise-api/maas/ai";

const COMPONENTS_FILE: &str = "config/components.toml";
const REMINDERS_FILE: &str = "config/reminders.toml";

/// Main configuration structure for the bot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Discord bot token
    pub discord_token: String,
    /// Google Calendar API client ID
    pub google_client_id: String,
    /// Google Calendar API client secret
    pub google_client_secret: String,
    /// Redis URL holding per-user calendar tokens
    pub redis_url: String,
    /// Map of component names to their enabled status
    pub components: HashMap<String, bool>,
    /// Timezone used to read meal windows
    pub timezone: String,
    /// Bot activity status text
    pub activity: String,
    /// Locale for user-facing messages
    pub bot_locale: String,
    /// Post reminders here instead of direct messages
    pub reminder_channel_id: Option<u64>,
    /// Browser-automation agent base URL
    pub order_agent_url: String,
    /// Chat completion endpoint base URL
    pub assistant_api_url: String,
    pub assistant_api_key: Option<String>,
    pub assistant_model: String,
    /// Meal reminder tuning
    pub reminders: ReminderSettings,
}

/// A time-of-day window as written in the config file ("HH:MM")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub start: String,
    pub end: String,
}

impl WindowConfig {
    pub fn new(start: &str, end: &str) -> Self {
        Self {
            start: start.to_string(),
            end: end.to_string(),
        }
    }
}

/// Tuning knobs for the meal reminder scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderSettings {
    /// Seconds between polling cycles when calendars are linked
    pub poll_interval_secs: u64,
    /// Seconds between polling cycles in fallback mode
    pub fallback_poll_interval_secs: u64,
    /// How long before an event a reminder may fire
    pub lead_minutes: i64,
    /// How long a fired reminder blocks the same key
    pub retention_hours: i64,
    /// Upper bound on a single calendar fetch
    pub fetch_timeout_secs: u64,
    pub lunch: WindowConfig,
    pub dinner: WindowConfig,
    pub lunch_nudge: WindowConfig,
    pub dinner_nudge: WindowConfig,
    /// Substitute synthetic events when nobody has linked a calendar
    pub fallback_enabled: bool,
    /// Start time of the synthetic fallback event
    pub fallback_event_time: String,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 300,
            fallback_poll_interval_secs: 60,
            lead_minutes: 60,
            retention_hours: 3,
            fetch_timeout_secs: 30,
            lunch: WindowConfig::new("11:00", "14:00"),
            dinner: WindowConfig::new("17:00", "20:00"),
            lunch_nudge: WindowConfig::new("11:30", "11:45"),
            dinner_nudge: WindowConfig::new("17:45", "18:00"),
            fallback_enabled: true,
            fallback_event_time: "12:30".to_string(),
        }
    }
}

impl ReminderSettings {
    /// Parse settings from TOML, filling anything missing with defaults
    pub fn from_toml_str(content: &str) -> BotResult<Self> {
        let settings: ReminderSettings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a file, or defaults when the file does not exist
    pub fn load_from(path: impl AsRef<Path>) -> BotResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Reject settings the scheduler could not run with
    pub fn validate(&self) -> BotResult<()> {
        SchedulerSettings::from_reminder_settings(self).map(|_| ())
    }
}

impl Config {
    /// Load configuration from environment and config files
    pub fn load() -> BotResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        // Required environment variables
        let discord_token = env::var("DISCORD_TOKEN").map_err(|_| env_error("DISCORD_TOKEN"))?;
        // Without client credentials there is no calendar integration at all
        let google_client_id =
            env::var("GOOGLE_CLIENT_ID").map_err(|_| env_error("GOOGLE_CLIENT_ID"))?;
        let google_client_secret =
            env::var("GOOGLE_CLIENT_SECRET").map_err(|_| env_error("GOOGLE_CLIENT_SECRET"))?;

        let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string());
        let timezone = env::var("TIMEZONE").unwrap_or_else(|_| String::from("UTC"));
        let activity = env::var("BOT_ACTIVITY").unwrap_or_else(|_| String::from(DEFAULT_ACTIVITY));
        let bot_locale = env::var("BOT_LOCALE").unwrap_or_else(|_| String::from("en"));

        let reminder_channel_id = match env::var("REMINDER_CHANNEL_ID") {
            Ok(value) => Some(
                value
                    .parse::<u64>()
                    .map_err(|_| config_error("Invalid REMINDER_CHANNEL_ID format"))?,
            ),
            Err(_) => None,
        };

        let order_agent_url =
            env::var("ORDER_AGENT_URL").unwrap_or_else(|_| DEFAULT_ORDER_AGENT_URL.to_string());
        let assistant_api_url = env::var("ASSISTANT_API_URL")
            .unwrap_or_else(|_| DEFAULT_ASSISTANT_API_URL.to_string());
        let assistant_api_key = env::var("ASSISTANT_API_KEY").ok();
        let assistant_model =
            env::var("ASSISTANT_MODEL").unwrap_or_else(|_| String::from("DeepSeek-R1"));

        let reminders = ReminderSettings::load_from(REMINDERS_FILE)?;

        let config = Config {
            discord_token,
            google_client_id,
            google_client_secret,
            redis_url,
            components: load_components(),
            timezone,
            activity,
            bot_locale,
            reminder_channel_id,
            order_agent_url,
            assistant_api_url,
            assistant_api_key,
            assistant_model,
            reminders,
        };

        // Fail now rather than inside the polling loop
        config.tz()?;

        Ok(config)
    }

    /// Parsed timezone
    pub fn tz(&self) -> BotResult<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| config_error(&format!("Unknown timezone: {}", self.timezone)))
    }

    /// Check if a component is enabled
    pub fn is_component_enabled(&self, name: &str) -> bool {
        *self.components.get(name).unwrap_or(&false)
    }
}

/// Component toggles: defaults merged with config/components.toml
fn load_components() -> HashMap<String, bool> {
    let mut components = HashMap::new();
    components.insert("meal_reminder".to_string(), true);
    components.insert("ordering".to_string(), true);
    components.insert("assistant".to_string(), true);

    if let Ok(content) = fs::read_to_string(COMPONENTS_FILE) {
        if let Ok(file_components) = toml::from_str::<HashMap<String, bool>>(&content) {
            for (key, value) in file_components {
                components.insert(key, value);
            }
        }
    }

    components
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        assert!(ReminderSettings::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = ReminderSettings::from_toml_str(
            r#"
            lead_minutes = 45

            [dinner]
            start = "18:00"
            end = "21:00"
            "#,
        )
        .unwrap();

        assert_eq!(settings.lead_minutes, 45);
        assert_eq!(settings.dinner, WindowConfig::new("18:00", "21:00"));
        assert_eq!(settings.lunch, WindowConfig::new("11:00", "14:00"));
        assert_eq!(settings.poll_interval_secs, 300);
        assert_eq!(settings.retention_hours, 3);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        assert!(ReminderSettings::from_toml_str("poll_interval_secs = 0").is_err());
        assert!(ReminderSettings::from_toml_str("fallback_event_time = \"25:00\"").is_err());
        assert!(ReminderSettings::from_toml_str(
            "[lunch]\nstart = \"14:00\"\nend = \"11:00\""
        )
        .is_err());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let settings = ReminderSettings::load_from("config/does-not-exist.toml").unwrap();
        assert_eq!(settings, ReminderSettings::default());
    }
}
