mod client;
pub mod models;
pub mod token;

pub use client::{parse_events, GoogleCalendarClient, DEFAULT_API_BASE};
pub use models::CalendarEvent;
