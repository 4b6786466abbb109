use crate::components::google_calendar::CalendarEvent;
use crate::error::BotResult;
use crate::utils::time::local_datetime;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;

/// Where the scheduler gets a user's events from
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// All events starting on a local calendar day
    async fn events_for_day(&self, user_id: &str, date: NaiveDate) -> BotResult<Vec<CalendarEvent>>;

    /// All events starting in `[start, end)`
    async fn events_in_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BotResult<Vec<CalendarEvent>>;
}

/// Answers whether a user has linked a calendar
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn has_credentials(&self, user_id: &str) -> BotResult<bool>;
}

/// Id of the event produced by [`SyntheticFallbackSource`]
pub const SYNTHETIC_EVENT_ID: &str = "synthetic_lunch";

/// Stand-in calendar used when nobody has linked one: a single lunch
/// meeting per user per day at a fixed local time.
#[derive(Debug, Clone)]
pub struct SyntheticFallbackSource {
    timezone: Tz,
    start_time: NaiveTime,
}

impl SyntheticFallbackSource {
    pub fn new(timezone: Tz, start_time: NaiveTime) -> Self {
        Self {
            timezone,
            start_time,
        }
    }

    fn event_on(&self, date: NaiveDate) -> Option<CalendarEvent> {
        let start = local_datetime(date, self.start_time, &self.timezone)?;
        Some(CalendarEvent::timed(
            SYNTHETIC_EVENT_ID,
            "Lunch meeting",
            &start.to_rfc3339(),
        ))
    }
}

#[async_trait]
impl EventSource for SyntheticFallbackSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    async fn events_for_day(&self, _user_id: &str, date: NaiveDate) -> BotResult<Vec<CalendarEvent>> {
        Ok(self.event_on(date).into_iter().collect())
    }

    async fn events_in_range(
        &self,
        _user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BotResult<Vec<CalendarEvent>> {
        let first = start.with_timezone(&self.timezone).date_naive();
        let last = end.with_timezone(&self.timezone).date_naive();

        let events = first
            .iter_days()
            .take_while(|date| *date <= last)
            .filter_map(|date| self.event_on(date))
            .filter(|event| {
                matches!(event.start_time(), Ok(Some(s)) if s >= start && s < end)
            })
            .collect();
        Ok(events)
    }
}
