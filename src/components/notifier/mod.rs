mod discord;

pub use discord::DiscordNotifier;

use crate::components::google_calendar::CalendarEvent;
use crate::components::meal_reminder::MealType;
use serde::Serialize;

/// Event names pushed to clients
pub mod events {
    pub const REMINDER: &str = "reminder";
    pub const ORDER_PLACED: &str = "order_placed";
    pub const ORDER_FAILED: &str = "order_failed";
}

/// What a notification carries to the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationPayload {
    pub user_id: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meal: Option<MealType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<CalendarEvent>,
}

impl NotificationPayload {
    pub fn new(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            message: message.into(),
            meal: None,
            event: None,
        }
    }

    pub fn with_meal(mut self, meal: MealType) -> Self {
        self.meal = Some(meal);
        self
    }

    pub fn with_event(mut self, event: CalendarEvent) -> Self {
        self.event = Some(event);
        self
    }
}

/// Push channel to connected clients. Delivery is fire-and-forget:
/// implementations must not block the caller and report nothing back.
pub trait NotificationSink: Send + Sync {
    fn emit(&self, event_name: &str, payload: NotificationPayload, target: &str);
}
