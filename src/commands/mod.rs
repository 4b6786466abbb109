use crate::components::redis_service::RedisActorHandle;
use crate::components::{Assistant, ComponentManager, MealReminder, Ordering};
use crate::config::Config;
use crate::error::BotResult;
use poise::serenity_prelude::{Colour, CreateEmbed};
use std::sync::Arc;
use tokio::sync::RwLock;

// Export submodules
pub mod assistant;
pub mod order;
pub mod reminders;
pub mod util;

/// Shared context for all commands
#[derive(Debug)]
pub struct CommandContext {
    pub config: Arc<RwLock<Config>>,
    pub component_manager: Option<Arc<ComponentManager>>,
    pub redis_handle: RedisActorHandle,
}

impl CommandContext {
    /// Create a new command context
    pub fn new(config: Arc<RwLock<Config>>, redis_handle: RedisActorHandle) -> Self {
        Self {
            config,
            component_manager: None,
            redis_handle,
        }
    }

    /// Set the component manager
    pub fn with_component_manager(mut self, component_manager: Arc<ComponentManager>) -> Self {
        self.component_manager = Some(component_manager);
        self
    }

    pub fn meal_reminder(&self) -> Option<&MealReminder> {
        self.component_manager.as_ref()?.get("meal_reminder")
    }

    pub fn ordering(&self) -> Option<&Ordering> {
        self.component_manager.as_ref()?.get("ordering")
    }

    pub fn assistant(&self) -> Option<&Assistant> {
        self.component_manager.as_ref()?.get("assistant")
    }

    /// Remember a Discord user so the scheduler starts checking their calendar
    pub async fn register_user(&self, user_id: &str) {
        if let Some(reminder) = self.meal_reminder() {
            if let Err(e) = reminder.get_state_handle().register_user(user_id).await {
                tracing::warn!("Could not register user {}: {}", user_id, e);
            }
        }
    }
}

/// Type alias for command result
pub type CommandResult = BotResult<()>;

/// Type alias for poise context
pub type Context<'a> = poise::Context<'a, CommandContext, crate::error::Error>;

pub fn create_success_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::new()
        .title(title)
        .description(description)
        .colour(Colour::DARK_GREEN)
}

pub fn create_error_embed(title: &str, description: &str) -> CreateEmbed {
    CreateEmbed::new()
        .title(title)
        .description(description)
        .colour(Colour::RED)
}

/// All application commands
pub fn get_all_application_commands() -> Vec<poise::Command<CommandContext, crate::error::Error>> {
    vec![
        // Utility commands
        util::ping(),
        // Reminder commands
        reminders::reminders(),
        reminders::calendar_status(),
        reminders::unlink_calendar(),
        // Ordering commands
        order::lunch_options(),
        order::find_food(),
        order::order(),
        // Assistant
        assistant::ask(),
    ]
}
