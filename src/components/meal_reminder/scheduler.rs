use super::classifier::{MealType, MealWindow, MealWindows};
use super::messages;
use super::source::{CredentialStore, EventSource, SyntheticFallbackSource};
use super::state::{ReminderKey, ReminderStateHandle};
use crate::components::google_calendar::CalendarEvent;
use crate::components::notifier::{events, NotificationPayload, NotificationSink};
use crate::config::ReminderSettings;
use crate::error::{config_error, google_calendar_error, BotResult};
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::time::{hour_bucket, parse_time};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Validated scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub windows: MealWindows,
    pub lunch_nudge: MealWindow,
    pub dinner_nudge: MealWindow,
    /// Reminders may fire from `start - lead` up to `start`
    pub lead: Duration,
    /// Fired reminders older than this are forgotten
    pub retention: Duration,
    pub poll_interval: StdDuration,
    pub fallback_poll_interval: StdDuration,
    pub fetch_timeout: StdDuration,
    pub fallback_enabled: bool,
    pub fallback_event_time: NaiveTime,
}

impl SchedulerSettings {
    pub fn from_reminder_settings(settings: &ReminderSettings) -> BotResult<Self> {
        if settings.poll_interval_secs == 0 || settings.fallback_poll_interval_secs == 0 {
            return Err(config_error("Poll intervals must be greater than zero"));
        }
        if settings.fetch_timeout_secs == 0 {
            return Err(config_error("fetch_timeout_secs must be greater than zero"));
        }
        if settings.lead_minutes < 0 {
            return Err(config_error("lead_minutes cannot be negative"));
        }
        if settings.retention_hours <= 0 {
            return Err(config_error("retention_hours must be greater than zero"));
        }
        // A record must outlive the lead window of its event, or the event fires again
        if Duration::minutes(settings.lead_minutes) >= Duration::hours(settings.retention_hours) {
            return Err(config_error("lead_minutes must be shorter than retention_hours"));
        }

        let fallback_event_time = parse_time(&settings.fallback_event_time).ok_or_else(|| {
            config_error(&format!(
                "Invalid fallback_event_time: {}",
                settings.fallback_event_time
            ))
        })?;

        Ok(Self {
            windows: MealWindows {
                lunch: MealWindow::from_config("lunch", &settings.lunch)?,
                dinner: MealWindow::from_config("dinner", &settings.dinner)?,
            },
            lunch_nudge: MealWindow::from_config("lunch_nudge", &settings.lunch_nudge)?,
            dinner_nudge: MealWindow::from_config("dinner_nudge", &settings.dinner_nudge)?,
            lead: Duration::minutes(settings.lead_minutes),
            retention: Duration::hours(settings.retention_hours),
            poll_interval: StdDuration::from_secs(settings.poll_interval_secs),
            fallback_poll_interval: StdDuration::from_secs(settings.fallback_poll_interval_secs),
            fetch_timeout: StdDuration::from_secs(settings.fetch_timeout_secs),
            fallback_enabled: settings.fallback_enabled,
            fallback_event_time,
        })
    }

    /// Sleep between cycles for a mode
    pub fn interval_for(&self, mode: CycleMode) -> StdDuration {
        match mode {
            CycleMode::Normal => self.poll_interval,
            CycleMode::Fallback => self.fallback_poll_interval,
        }
    }

    pub fn nudge_window(&self, meal: MealType) -> &MealWindow {
        match meal {
            MealType::Lunch => &self.lunch_nudge,
            MealType::Dinner => &self.dinner_nudge,
        }
    }
}

/// How a cycle gets its events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleMode {
    /// Real calendars for users who linked one
    #[default]
    Normal,
    /// Nobody has linked a calendar; synthetic events stand in
    Fallback,
}

impl fmt::Display for CycleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleMode::Normal => f.write_str("normal"),
            CycleMode::Fallback => f.write_str("fallback"),
        }
    }
}

/// Outcome of one polling cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub mode: CycleMode,
    pub users: usize,
    /// Event reminders sent
    pub fired: usize,
    /// General meal nudges sent
    pub nudges: usize,
    pub failed_users: Vec<String>,
    pub purged: usize,
}

#[derive(Debug, Default)]
struct UserOutcome {
    fired: usize,
    nudges: usize,
}

/// Polls calendars, decides which meal reminders are due and sends each one once
pub struct ReminderScheduler {
    settings: SchedulerSettings,
    timezone: Tz,
    calendar: Arc<dyn EventSource>,
    fallback: Arc<dyn EventSource>,
    credentials: Arc<dyn CredentialStore>,
    sink: Arc<dyn NotificationSink>,
    state: ReminderStateHandle,
    clock: Arc<dyn Clock>,
}

impl ReminderScheduler {
    pub fn new(
        settings: SchedulerSettings,
        timezone: Tz,
        calendar: Arc<dyn EventSource>,
        credentials: Arc<dyn CredentialStore>,
        sink: Arc<dyn NotificationSink>,
        state: ReminderStateHandle,
    ) -> Self {
        let fallback = Arc::new(SyntheticFallbackSource::new(
            timezone,
            settings.fallback_event_time,
        ));

        Self {
            settings,
            timezone,
            calendar,
            fallback,
            credentials,
            sink,
            state,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the wall clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the synthetic source used in fallback mode
    pub fn with_fallback_source(mut self, fallback: Arc<dyn EventSource>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Run cycles until `shutdown` is cancelled. Cancellation is observed
    /// between cycles; a cycle in progress always completes.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            "Meal reminder scheduler started (poll every {}s, fallback every {}s)",
            self.settings.poll_interval.as_secs(),
            self.settings.fallback_poll_interval.as_secs()
        );

        while !shutdown.is_cancelled() {
            let report = self.run_cycle().await;
            let wait = self.settings.interval_for(report.mode);

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = sleep(wait) => {}
            }
        }

        info!("Meal reminder scheduler stopped");
    }

    /// One polling cycle over every known user
    pub async fn run_cycle(&self) -> CycleReport {
        let now = self.clock.now();
        let mut report = CycleReport::default();

        let users = match self.state.known_users().await {
            Ok(users) => users,
            Err(e) => {
                error!("Failed to read known users: {}", e);
                return report;
            }
        };
        report.users = users.len();

        let linked = self.linked_users(&users).await;
        report.mode = self.select_mode(&users, &linked);

        for user_id in &users {
            let result = match report.mode {
                CycleMode::Normal => {
                    self.process_user(user_id, linked.contains(user_id), now)
                        .await
                }
                CycleMode::Fallback => self.process_fallback_user(user_id, now).await,
            };

            match result {
                Ok(outcome) => {
                    report.fired += outcome.fired;
                    report.nudges += outcome.nudges;
                }
                Err(e) => {
                    error!("Meal reminder check failed for user {}: {}", user_id, e);
                    report.failed_users.push(user_id.clone());
                }
            }
        }

        match self.state.purge_older_than(now - self.settings.retention).await {
            Ok(purged) => report.purged = purged,
            Err(e) => error!("Failed to purge old reminders: {}", e),
        }

        if report.fired > 0 || report.nudges > 0 || !report.failed_users.is_empty() {
            info!(
                "Meal reminder cycle ({}): {} users, {} reminders, {} nudges, {} failed",
                report.mode,
                report.users,
                report.fired,
                report.nudges,
                report.failed_users.len()
            );
        } else {
            debug!(
                "Meal reminder cycle ({}): {} users, nothing due, {} purged",
                report.mode, report.users, report.purged
            );
        }

        report
    }

    /// Users with a linked calendar; lookup failures count as unlinked
    async fn linked_users(&self, users: &[String]) -> HashSet<String> {
        let mut linked = HashSet::new();
        for user_id in users {
            match timeout(self.settings.fetch_timeout, self.credentials.has_credentials(user_id)).await {
                Ok(Ok(true)) => {
                    linked.insert(user_id.clone());
                }
                Ok(Ok(false)) => {}
                Ok(Err(e)) => warn!("Credential check failed for user {}: {}", user_id, e),
                Err(_) => warn!("Credential check timed out for user {}", user_id),
            }
        }
        linked
    }

    fn select_mode(&self, users: &[String], linked: &HashSet<String>) -> CycleMode {
        if self.settings.fallback_enabled && !users.is_empty() && linked.is_empty() {
            CycleMode::Fallback
        } else {
            CycleMode::Normal
        }
    }

    async fn fetch_events(
        &self,
        source: &dyn EventSource,
        user_id: &str,
        date: NaiveDate,
    ) -> BotResult<Vec<CalendarEvent>> {
        timeout(self.settings.fetch_timeout, source.events_for_day(user_id, date))
            .await
            .map_err(|_| {
                google_calendar_error(&format!(
                    "{} fetch for user {} timed out after {}s",
                    source.name(),
                    user_id,
                    self.settings.fetch_timeout.as_secs()
                ))
            })?
    }

    /// `now` lies in `[start - lead, start]`
    pub fn is_eligible(&self, start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now >= start - self.settings.lead && now <= start
    }

    async fn process_user(
        &self,
        user_id: &str,
        linked: bool,
        now: DateTime<Utc>,
    ) -> BotResult<UserOutcome> {
        let local_now = now.with_timezone(&self.timezone);
        let today = local_now.date_naive();
        let mut outcome = UserOutcome::default();
        let mut meals_today = HashSet::new();

        if linked {
            let events = self.fetch_events(self.calendar.as_ref(), user_id, today).await?;

            for event in &events {
                let start = match event.start_time()? {
                    Some(start) => start.with_timezone(&self.timezone),
                    None => continue,
                };
                let meal = match self.settings.windows.classify(start.time()) {
                    Some(meal) => meal,
                    None => continue,
                };
                if start.date_naive() == today {
                    meals_today.insert(meal);
                }

                let start_utc = start.with_timezone(&Utc);
                if start_utc < now || !self.is_eligible(start_utc, now) {
                    continue;
                }

                if self.state.try_fire(ReminderKey::event(user_id, &event.id), now).await? {
                    let payload = NotificationPayload::new(
                        user_id,
                        messages::event_reminder(event, &start, meal),
                    )
                    .with_meal(meal)
                    .with_event(event.clone());
                    self.sink.emit(events::REMINDER, payload, user_id);
                    info!("Sent {} reminder to {} for event {}", meal, user_id, event.id);
                    outcome.fired += 1;
                }
            }
        } else {
            debug!("User {} has no linked calendar, skipping event reminders", user_id);
        }

        outcome.nudges = self.evaluate_nudges(user_id, &meals_today, now).await?;
        Ok(outcome)
    }

    /// Fallback mode: synthetic events fire once per local hour, eligibility window aside
    async fn process_fallback_user(&self, user_id: &str, now: DateTime<Utc>) -> BotResult<UserOutcome> {
        let local_now = now.with_timezone(&self.timezone);
        let today = local_now.date_naive();
        let bucket = hour_bucket(&local_now);
        let mut outcome = UserOutcome::default();

        let events = self.fetch_events(self.fallback.as_ref(), user_id, today).await?;
        for event in &events {
            let start = match event.start_time()? {
                Some(start) => start.with_timezone(&self.timezone),
                None => continue,
            };
            let meal = match self.settings.windows.classify(start.time()) {
                Some(meal) => meal,
                None => continue,
            };

            let key = ReminderKey::hourly(user_id, &event.id, &bucket);
            if self.state.try_fire(key, now).await? {
                let payload =
                    NotificationPayload::new(user_id, messages::event_reminder(event, &start, meal))
                        .with_meal(meal)
                        .with_event(event.clone());
                self.sink.emit(events::REMINDER, payload, user_id);
                debug!("Sent fallback {} reminder to {}", meal, user_id);
                outcome.fired += 1;
            }
        }

        outcome.nudges = self.evaluate_nudges(user_id, &HashSet::new(), now).await?;
        Ok(outcome)
    }

    /// Once-a-day nudges for meals the user has no meeting for
    async fn evaluate_nudges(
        &self,
        user_id: &str,
        meals_today: &HashSet<MealType>,
        now: DateTime<Utc>,
    ) -> BotResult<usize> {
        let local_now = now.with_timezone(&self.timezone);
        let mut sent = 0;

        for meal in MealType::ALL {
            if !self.settings.nudge_window(meal).contains(local_now.time()) {
                continue;
            }
            if meals_today.contains(&meal) {
                debug!("User {} has a {} meeting today, no nudge", user_id, meal);
                continue;
            }

            let key = ReminderKey::general(user_id, meal, local_now.date_naive());
            if self.state.try_fire(key, now).await? {
                let payload = NotificationPayload::new(user_id, messages::general_nudge(meal))
                    .with_meal(meal);
                self.sink.emit(events::REMINDER, payload, user_id);
                info!("Sent general {} nudge to {}", meal, user_id);
                sent += 1;
            }
        }

        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindowConfig;

    fn settings() -> SchedulerSettings {
        SchedulerSettings::from_reminder_settings(&ReminderSettings::default()).unwrap()
    }

    #[test]
    fn test_default_settings() {
        let settings = settings();
        assert_eq!(settings.lead, Duration::hours(1));
        assert_eq!(settings.retention, Duration::hours(3));
        assert_eq!(settings.interval_for(CycleMode::Normal), StdDuration::from_secs(300));
        assert_eq!(settings.interval_for(CycleMode::Fallback), StdDuration::from_secs(60));
        assert_eq!(
            settings.nudge_window(MealType::Lunch).start,
            NaiveTime::from_hms_opt(11, 30, 0).unwrap()
        );
        assert_eq!(
            settings.nudge_window(MealType::Dinner).end,
            NaiveTime::from_hms_opt(18, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_settings_reject_bad_values() {
        let bad = [
            ReminderSettings {
                retention_hours: 0,
                ..Default::default()
            },
            ReminderSettings {
                lead_minutes: -5,
                ..Default::default()
            },
            ReminderSettings {
                fetch_timeout_secs: 0,
                ..Default::default()
            },
            ReminderSettings {
                lead_minutes: 180,
                retention_hours: 3,
                ..Default::default()
            },
            ReminderSettings {
                lead_minutes: 300,
                ..Default::default()
            },
            ReminderSettings {
                lunch_nudge: WindowConfig::new("11:45", "11:30"),
                ..Default::default()
            },
        ];

        for settings in bad {
            assert!(SchedulerSettings::from_reminder_settings(&settings).is_err());
        }
    }

    #[test]
    fn test_cycle_mode_display() {
        assert_eq!(CycleMode::Normal.to_string(), "normal");
        assert_eq!(CycleMode::Fallback.to_string(), "fallback");
        assert_eq!(CycleMode::default(), CycleMode::Normal);
    }
}
