use super::classifier::MealType;
use crate::error::{reminder_error, BotResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Identifies one reminder for one user; firing is idempotent per key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ReminderKey {
    pub user_id: String,
    pub key: String,
}

impl ReminderKey {
    /// Reminder for a calendar event
    pub fn event(user_id: &str, event_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            key: event_id.to_string(),
        }
    }

    /// Once-a-day meal nudge, e.g. `general_lunch_2024-03-04`
    pub fn general(user_id: &str, meal: MealType, date: NaiveDate) -> Self {
        Self {
            user_id: user_id.to_string(),
            key: format!("general_{}_{}", meal, date.format("%Y-%m-%d")),
        }
    }

    /// Event reminder that may repeat once per hour bucket
    pub fn hourly(user_id: &str, event_id: &str, bucket: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            key: format!("{}_{}", event_id, bucket),
        }
    }
}

impl fmt::Display for ReminderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.user_id, self.key)
    }
}

/// A fired reminder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderRecord {
    pub key: ReminderKey,
    pub fired_at: DateTime<Utc>,
}

/// Known users and fired reminders
#[derive(Debug, Default)]
pub struct ReminderState {
    users: Vec<String>,
    user_set: HashSet<String>,
    records: HashMap<ReminderKey, DateTime<Utc>>,
}

impl ReminderState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true the first time a user is seen
    pub fn register_user(&mut self, user_id: &str) -> bool {
        if self.user_set.insert(user_id.to_string()) {
            self.users.push(user_id.to_string());
            true
        } else {
            false
        }
    }

    pub fn known_users(&self) -> Vec<String> {
        self.users.clone()
    }

    /// Record a firing unless the key already fired; true means "go ahead and notify"
    pub fn try_fire(&mut self, key: ReminderKey, now: DateTime<Utc>) -> bool {
        if self.records.contains_key(&key) {
            return false;
        }
        self.records.insert(key, now);
        true
    }

    pub fn is_fired(&self, key: &ReminderKey) -> bool {
        self.records.contains_key(key)
    }

    /// Drop records fired strictly before `cutoff`
    pub fn purge_older_than(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.records.len();
        self.records.retain(|_, fired_at| *fired_at >= cutoff);
        before - self.records.len()
    }

    /// A user's records, oldest first
    pub fn records_for(&self, user_id: &str) -> Vec<ReminderRecord> {
        let mut records: Vec<ReminderRecord> = self
            .records
            .iter()
            .filter(|(key, _)| key.user_id == user_id)
            .map(|(key, fired_at)| ReminderRecord {
                key: key.clone(),
                fired_at: *fired_at,
            })
            .collect();
        records.sort_by(|a, b| a.fired_at.cmp(&b.fired_at).then_with(|| a.key.key.cmp(&b.key.key)));
        records
    }
}

/// The actor that owns [`ReminderState`]; every mutation goes through its mailbox
pub struct ReminderStateActor {
    state: ReminderState,
    command_rx: mpsc::Receiver<ReminderStateCommand>,
}

/// Commands that can be sent to the reminder state actor
pub enum ReminderStateCommand {
    RegisterUser(String, mpsc::Sender<bool>),
    KnownUsers(mpsc::Sender<Vec<String>>),
    TryFire(ReminderKey, DateTime<Utc>, mpsc::Sender<bool>),
    IsFired(ReminderKey, mpsc::Sender<bool>),
    PurgeOlderThan(DateTime<Utc>, mpsc::Sender<usize>),
    RecordsFor(String, mpsc::Sender<Vec<ReminderRecord>>),
    Shutdown,
}

/// Handle for communicating with the reminder state actor
#[derive(Clone)]
pub struct ReminderStateHandle {
    command_tx: mpsc::Sender<ReminderStateCommand>,
}

impl ReminderStateHandle {
    /// Spawn a fresh actor and return its handle
    pub fn spawn() -> Self {
        let (mut actor, handle) = ReminderStateActor::new();
        tokio::spawn(async move {
            actor.run().await;
        });
        handle
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(mpsc::Sender<T>) -> ReminderStateCommand,
    ) -> BotResult<T> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(build(response_tx))
            .await
            .map_err(|e| reminder_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| reminder_error("Response channel closed"))
    }

    /// Mark a user as known; true if they were new
    pub async fn register_user(&self, user_id: &str) -> BotResult<bool> {
        let user_id = user_id.to_string();
        self.request(|tx| ReminderStateCommand::RegisterUser(user_id, tx))
            .await
    }

    pub async fn known_users(&self) -> BotResult<Vec<String>> {
        self.request(ReminderStateCommand::KnownUsers).await
    }

    /// Atomic check-and-set for a reminder key
    pub async fn try_fire(&self, key: ReminderKey, now: DateTime<Utc>) -> BotResult<bool> {
        self.request(|tx| ReminderStateCommand::TryFire(key, now, tx))
            .await
    }

    pub async fn is_fired(&self, key: ReminderKey) -> BotResult<bool> {
        self.request(|tx| ReminderStateCommand::IsFired(key, tx))
            .await
    }

    /// Remove records fired before `cutoff`, returning how many went
    pub async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> BotResult<usize> {
        self.request(|tx| ReminderStateCommand::PurgeOlderThan(cutoff, tx))
            .await
    }

    pub async fn records_for(&self, user_id: &str) -> BotResult<Vec<ReminderRecord>> {
        let user_id = user_id.to_string();
        self.request(|tx| ReminderStateCommand::RecordsFor(user_id, tx))
            .await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> BotResult<()> {
        let _ = self.command_tx.send(ReminderStateCommand::Shutdown).await;
        Ok(())
    }
}

impl ReminderStateActor {
    /// Create a new actor and return its handle
    pub fn new() -> (Self, ReminderStateHandle) {
        let (command_tx, command_rx) = mpsc::channel(64);

        let actor = Self {
            state: ReminderState::new(),
            command_rx,
        };

        (actor, ReminderStateHandle { command_tx })
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Reminder state actor started");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                ReminderStateCommand::RegisterUser(user_id, response_tx) => {
                    let added = self.state.register_user(&user_id);
                    if added {
                        info!("New user registered for meal reminders: {}", user_id);
                    }
                    let _ = response_tx.send(added).await;
                }
                ReminderStateCommand::KnownUsers(response_tx) => {
                    let _ = response_tx.send(self.state.known_users()).await;
                }
                ReminderStateCommand::TryFire(key, now, response_tx) => {
                    let fired = self.state.try_fire(key.clone(), now);
                    if !fired {
                        debug!("Reminder {} already fired", key);
                    }
                    let _ = response_tx.send(fired).await;
                }
                ReminderStateCommand::IsFired(key, response_tx) => {
                    let _ = response_tx.send(self.state.is_fired(&key)).await;
                }
                ReminderStateCommand::PurgeOlderThan(cutoff, response_tx) => {
                    let _ = response_tx
                        .send(self.state.purge_older_than(cutoff))
                        .await;
                }
                ReminderStateCommand::RecordsFor(user_id, response_tx) => {
                    let _ = response_tx.send(self.state.records_for(&user_id)).await;
                }
                ReminderStateCommand::Shutdown => {
                    info!("Reminder state actor shutting down");
                    break;
                }
            }
        }

        info!("Reminder state actor shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, h, m, 0).unwrap()
    }

    #[test]
    fn test_key_formats() {
        assert_eq!(ReminderKey::event("U", "e1").to_string(), "U_e1");
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert_eq!(
            ReminderKey::general("U", MealType::Lunch, date).to_string(),
            "U_general_lunch_2024-03-04"
        );
        assert_eq!(
            ReminderKey::hourly("U", "synthetic_lunch", "2024-03-04-11").to_string(),
            "U_synthetic_lunch_2024-03-04-11"
        );
    }

    #[test]
    fn test_try_fire_is_idempotent() {
        let mut state = ReminderState::new();
        let key = ReminderKey::event("U", "e1");

        assert!(state.try_fire(key.clone(), at(11, 30)));
        assert!(!state.try_fire(key.clone(), at(11, 35)));
        assert!(state.is_fired(&key));
        assert_eq!(state.records_for("U")[0].fired_at, at(11, 30));
    }

    #[test]
    fn test_purge_only_removes_older_records() {
        let mut state = ReminderState::new();
        state.try_fire(ReminderKey::event("U", "old"), at(8, 0));
        state.try_fire(ReminderKey::event("U", "edge"), at(9, 0));
        state.try_fire(ReminderKey::event("U", "new"), at(11, 0));

        let removed = state.purge_older_than(at(12, 0) - Duration::hours(3));
        assert_eq!(removed, 1);
        assert!(!state.is_fired(&ReminderKey::event("U", "old")));
        assert!(state.is_fired(&ReminderKey::event("U", "edge")));

        // Purged keys may fire again
        assert!(state.try_fire(ReminderKey::event("U", "old"), at(12, 0)));
    }

    #[test]
    fn test_users_are_append_only_and_ordered() {
        let mut state = ReminderState::new();
        assert!(state.register_user("b"));
        assert!(state.register_user("a"));
        assert!(!state.register_user("b"));
        assert_eq!(state.known_users(), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_records_are_per_user() {
        let mut state = ReminderState::new();
        state.try_fire(ReminderKey::event("U", "e1"), at(11, 0));
        state.try_fire(ReminderKey::event("V", "e1"), at(11, 0));

        assert_eq!(state.records_for("U").len(), 1);
        assert_eq!(state.records_for("V").len(), 1);
        assert!(state.records_for("W").is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_try_fire_fires_once() {
        let handle = ReminderStateHandle::spawn();
        let key = ReminderKey::event("U", "e1");

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let handle = handle.clone();
            let key = key.clone();
            tasks.push(tokio::spawn(async move {
                handle.try_fire(key, at(11, 30)).await.unwrap()
            }));
        }

        let mut fired = 0;
        for task in tasks {
            if task.await.unwrap() {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
        assert!(handle.is_fired(key).await.unwrap());
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_handle_after_shutdown_errors() {
        let handle = ReminderStateHandle::spawn();
        handle.register_user("U").await.unwrap();
        handle.shutdown().await.unwrap();

        // Queued behind the shutdown, so it is never answered
        assert!(handle.known_users().await.is_err());
    }
}
