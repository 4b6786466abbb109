use crate::error::{google_calendar_error, BotResult};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Simplified calendar event representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    /// RFC 3339 start for timed events
    pub start_date_time: Option<String>,
    /// YYYY-MM-DD start for all-day events
    pub start_date: Option<String>,
    pub end_date_time: Option<String>,
    pub end_date: Option<String>,
}

impl CalendarEvent {
    /// Timed event starting at an RFC 3339 instant
    pub fn timed(id: impl Into<String>, summary: impl Into<String>, start: &str) -> Self {
        Self {
            id: id.into(),
            summary: Some(summary.into()),
            start_date_time: Some(start.to_string()),
            ..Default::default()
        }
    }

    /// All-day event on a YYYY-MM-DD date
    pub fn all_day(id: impl Into<String>, summary: impl Into<String>, date: &str) -> Self {
        Self {
            id: id.into(),
            summary: Some(summary.into()),
            start_date: Some(date.to_string()),
            ..Default::default()
        }
    }

    /// Events with only a start date carry no time of day
    pub fn is_all_day(&self) -> bool {
        self.start_date_time.is_none()
    }

    /// Concrete start instant, or `None` for all-day events
    pub fn start_time(&self) -> BotResult<Option<DateTime<FixedOffset>>> {
        match &self.start_date_time {
            Some(start) => DateTime::parse_from_rfc3339(start)
                .map(Some)
                .map_err(|e| {
                    google_calendar_error(&format!(
                        "Failed to parse start of event {}: {}",
                        self.id, e
                    ))
                }),
            None => Ok(None),
        }
    }

    /// Build an event from one item of the Calendar API `events.list` response
    pub fn from_api(event: &Value) -> Self {
        let text = |field: &str| event.get(field).and_then(|v| v.as_str()).map(str::to_string);
        let nested = |outer: &str, inner: &str| {
            event
                .get(outer)
                .and_then(|o| o.as_object())
                .and_then(|o| o.get(inner))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };

        CalendarEvent {
            id: text("id").unwrap_or_default(),
            summary: text("summary"),
            description: text("description"),
            start_date_time: nested("start", "dateTime"),
            start_date: nested("start", "date"),
            end_date_time: nested("end", "dateTime"),
            end_date: nested("end", "date"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_api_timed_event() {
        let event = CalendarEvent::from_api(&json!({
            "id": "abc",
            "summary": "Team sync",
            "start": { "dateTime": "2024-03-04T12:00:00+02:00" },
            "end": { "dateTime": "2024-03-04T13:00:00+02:00" }
        }));

        assert_eq!(event.id, "abc");
        assert_eq!(event.summary.as_deref(), Some("Team sync"));
        assert!(!event.is_all_day());
        let start = event.start_time().unwrap().unwrap();
        assert_eq!(start.to_rfc3339(), "2024-03-04T12:00:00+02:00");
    }

    #[test]
    fn test_all_day_event_has_no_start_time() {
        let event = CalendarEvent::from_api(&json!({
            "id": "holiday",
            "start": { "date": "2024-03-04" },
            "end": { "date": "2024-03-05" }
        }));

        assert!(event.is_all_day());
        assert_eq!(event.start_date.as_deref(), Some("2024-03-04"));
        assert_eq!(event.start_time().unwrap(), None);
    }

    #[test]
    fn test_bad_start_is_an_error() {
        let event = CalendarEvent::timed("x", "Broken", "tomorrow at noon");
        assert!(event.start_time().is_err());
    }
}
