mod classifier;
pub mod messages;
mod scheduler;
mod source;
mod state;

pub use classifier::{MealType, MealWindow, MealWindows};
pub use scheduler::{CycleMode, CycleReport, ReminderScheduler, SchedulerSettings};
pub use source::{CredentialStore, EventSource, SyntheticFallbackSource, SYNTHETIC_EVENT_ID};
pub use state::{
    ReminderKey, ReminderRecord, ReminderState, ReminderStateActor, ReminderStateCommand,
    ReminderStateHandle,
};

use super::google_calendar::GoogleCalendarClient;
use super::notifier::DiscordNotifier;
use super::redis_service::RedisActorHandle;
use crate::config::Config;
use crate::error::{component_error, BotResult};
use crate::utils::clock::SystemClock;
use async_trait::async_trait;
use lazy_static::lazy_static;
use poise::serenity_prelude as serenity;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

lazy_static! {
    static ref SCHEDULER_STARTED: AtomicBool = AtomicBool::new(false);
}

/// Meal reminder component: owns the fired-reminder state and the polling loop
pub struct MealReminder {
    state: ReminderStateHandle,
    // Spawned on first init
    actor: Mutex<Option<ReminderStateActor>>,
    shutdown: CancellationToken,
}

impl Default for MealReminder {
    fn default() -> Self {
        Self::new()
    }
}

impl MealReminder {
    pub fn new() -> Self {
        let (actor, state) = ReminderStateActor::new();
        Self {
            state,
            actor: Mutex::new(Some(actor)),
            shutdown: CancellationToken::new(),
        }
    }

    /// Handle to the shared reminder state
    pub fn get_state_handle(&self) -> ReminderStateHandle {
        self.state.clone()
    }

    fn start_state_actor(&self) -> BotResult<()> {
        let actor = self
            .actor
            .lock()
            .map_err(|_| component_error("Reminder state lock poisoned"))?
            .take();

        if let Some(mut actor) = actor {
            tokio::spawn(async move {
                actor.run().await;
            });
        }
        Ok(())
    }
}

#[async_trait]
impl super::Component for MealReminder {
    fn name(&self) -> &'static str {
        "meal_reminder"
    }

    async fn init(
        &self,
        ctx: &serenity::Context,
        config: Arc<RwLock<Config>>,
        redis_handle: RedisActorHandle,
    ) -> BotResult<()> {
        self.start_state_actor()?;

        let (settings, tz, channel_id) = {
            let config = config.read().await;
            (
                SchedulerSettings::from_reminder_settings(&config.reminders)?,
                config.tz()?,
                config.reminder_channel_id,
            )
        };

        let calendar = Arc::new(GoogleCalendarClient::new(config.clone(), redis_handle, tz));

        if SCHEDULER_STARTED.swap(true, Ordering::SeqCst) {
            warn!("Meal reminder scheduler is already running, skipping initialization");
            return Ok(());
        }

        let sink = Arc::new(DiscordNotifier::new(Arc::clone(&ctx.http), channel_id));
        let scheduler = ReminderScheduler::new(
            settings,
            tz,
            calendar.clone(),
            calendar,
            sink,
            self.state.clone(),
        )
        .with_clock(Arc::new(SystemClock));

        info!("Starting meal reminder scheduler in timezone {}", tz);
        let token = self.shutdown.clone();
        tokio::spawn(async move {
            scheduler.run(token).await;
        });

        Ok(())
    }

    async fn shutdown(&self) -> BotResult<()> {
        self.shutdown.cancel();
        SCHEDULER_STARTED.store(false, Ordering::SeqCst);

        // Shutdown is a queued command, so the actor must be running to see it
        self.start_state_actor()?;
        self.state.shutdown().await
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
