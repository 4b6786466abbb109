use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Discord API error: {0}")]
    #[diagnostic(code(execumate::discord_api))]
    DiscordApi(#[from] serenity::Error),

    #[error("Poise framework error: {0}")]
    #[diagnostic(code(execumate::poise))]
    Poise(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("Environment error: {0}")]
    #[diagnostic(code(execumate::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(execumate::config),
        help("check .env and config/reminders.toml")
    )]
    Config(String),

    #[error("Google Calendar API error: {0}")]
    #[diagnostic(code(execumate::google_calendar))]
    GoogleCalendar(String),

    #[error("Reminder error: {0}")]
    #[diagnostic(code(execumate::reminder))]
    Reminder(String),

    #[error("Order service error: {0}")]
    #[diagnostic(code(execumate::order))]
    Order(String),

    #[error("Assistant error: {0}")]
    #[diagnostic(code(execumate::assistant))]
    Assistant(String),

    #[error("Component error: {0}")]
    #[diagnostic(code(execumate::component))]
    Component(String),

    #[error(transparent)]
    #[diagnostic(code(execumate::io))]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    #[diagnostic(code(execumate::http))]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(execumate::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(execumate::other))]
    Other(String),
}

// Implement From for TOML deserialization errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type BotResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create component errors
pub fn component_error(message: &str) -> Error {
    Error::Component(message.to_string())
}

/// Helper to create Google Calendar errors
pub fn google_calendar_error(message: &str) -> Error {
    Error::GoogleCalendar(message.to_string())
}

/// Helper to create reminder state errors
pub fn reminder_error(message: &str) -> Error {
    Error::Reminder(message.to_string())
}

/// Helper to create order service errors
pub fn order_error(message: &str) -> Error {
    Error::Order(message.to_string())
}

/// Helper to create assistant errors
pub fn assistant_error(message: &str) -> Error {
    Error::Assistant(message.to_string())
}

/// Helper to create other errors
pub fn other_error(message: &str) -> Error {
    Error::Other(message.to_string())
}
