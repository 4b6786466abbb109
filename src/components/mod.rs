use crate::components::redis_service::RedisActorHandle;
use crate::config::Config;
use crate::error::BotResult;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

// Export components
pub mod assistant;
pub mod google_calendar;
pub mod meal_reminder;
pub mod notifier;
pub mod ordering;
pub mod redis_service;

pub use assistant::Assistant;
pub use meal_reminder::MealReminder;
pub use ordering::Ordering;

/// Component trait that all components must implement
#[async_trait]
pub trait Component: Send + Sync + Any {
    /// Get the name of the component
    fn name(&self) -> &'static str;

    /// Initialize the component
    async fn init(
        &self,
        ctx: &serenity::Context,
        config: Arc<RwLock<Config>>,
        redis_handle: RedisActorHandle,
    ) -> BotResult<()>;

    /// Shutdown the component
    async fn shutdown(&self) -> BotResult<()>;

    /// Convert to Any for downcasting
    fn as_any(&self) -> &dyn Any;
}

/// Manager for all components
pub struct ComponentManager {
    components: Vec<Box<dyn Component>>,
    config: Arc<RwLock<Config>>,
}

impl fmt::Debug for ComponentManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentManager")
            .field("component_count", &self.components.len())
            .field("config", &self.config)
            .finish()
    }
}

impl ComponentManager {
    /// Create a new component manager
    pub fn new(config: Arc<RwLock<Config>>) -> Self {
        Self {
            components: Vec::new(),
            config,
        }
    }

    /// Get the configuration
    #[allow(dead_code)]
    pub fn get_config(&self) -> Arc<RwLock<Config>> {
        Arc::clone(&self.config)
    }

    /// Register a component
    pub fn register<T: Component + 'static>(&mut self, component: T) {
        info!("Registering component: {}", component.name());
        self.components.push(Box::new(component));
    }

    /// Initialize all registered components
    pub async fn init_all(
        &self,
        ctx: &serenity::Context,
        config: Arc<RwLock<Config>>,
        redis_handle: RedisActorHandle,
    ) -> BotResult<()> {
        for component in &self.components {
            info!("Initializing component: {}", component.name());

            if let Err(e) = component
                .init(ctx, config.clone(), redis_handle.clone())
                .await
            {
                // Log error but continue with other components
                tracing::error!("Error initializing component {}: {:?}", component.name(), e);
            }
        }

        Ok(())
    }

    /// Shutdown all components
    pub async fn shutdown_all(&self) -> BotResult<()> {
        info!("Shutting down all components");

        for component in &self.components {
            info!("Shutting down component: {}", component.name());

            if let Err(e) = component.shutdown().await {
                // Log error but continue with other components
                tracing::error!(
                    "Error shutting down component {}: {:?}",
                    component.name(),
                    e
                );
            }
        }

        Ok(())
    }

    /// Get a component by name
    pub fn get_component_by_name(&self, name: &str) -> Option<&dyn Component> {
        self.components
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.as_ref())
    }

    /// Get a component by its concrete type
    pub fn get<T: Component + 'static>(&self, name: &str) -> Option<&T> {
        self.get_component_by_name(name)
            .and_then(|c| c.as_any().downcast_ref::<T>())
    }

    /// Names of all registered components, in registration order
    pub fn names(&self) -> Vec<&'static str> {
        self.components.iter().map(|c| c.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn test_config() -> Config {
        Config {
            discord_token: String::new(),
            google_client_id: String::new(),
            google_client_secret: String::new(),
            redis_url: String::new(),
            components: HashMap::new(),
            timezone: "UTC".to_string(),
            activity: String::new(),
            bot_locale: "en".to_string(),
            reminder_channel_id: None,
            order_agent_url: String::new(),
            assistant_api_url: String::new(),
            assistant_api_key: None,
            assistant_model: String::new(),
            reminders: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_lookup_by_name_and_type() {
        let mut manager = ComponentManager::new(Arc::new(RwLock::new(test_config())));
        manager.register(MealReminder::new());
        manager.register(Ordering::new());

        assert_eq!(manager.names(), vec!["meal_reminder", "ordering"]);
        assert!(manager.get::<MealReminder>("meal_reminder").is_some());
        assert!(manager.get::<Ordering>("meal_reminder").is_none());
        assert!(manager.get_component_by_name("assistant").is_none());
    }

    #[tokio::test]
    async fn test_shutdown_all_stops_reminder_state() {
        let mut manager = ComponentManager::new(Arc::new(RwLock::new(test_config())));
        manager.register(MealReminder::new());
        let state = manager
            .get::<MealReminder>("meal_reminder")
            .map(|c| c.get_state_handle())
            .unwrap();

        manager.shutdown_all().await.unwrap();
        tokio::task::yield_now().await;
        assert!(state.known_users().await.is_err());
    }
}
