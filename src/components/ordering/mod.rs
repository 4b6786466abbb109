mod agent;
mod dispatcher;
pub mod models;

pub use agent::{BrowserAgentClient, MenuOrderService};
pub use dispatcher::OrderDispatcher;
pub use models::{MenuItem, MenuItems, OrderReceipt, OrderRequest};

use super::notifier::DiscordNotifier;
use super::redis_service::RedisActorHandle;
use crate::config::Config;
use crate::error::BotResult;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Ordering component: menu search and detached order placement
#[derive(Default)]
pub struct Ordering {
    dispatcher: RwLock<Option<OrderDispatcher>>,
}

impl Ordering {
    pub fn new() -> Self {
        Self {
            dispatcher: RwLock::new(None),
        }
    }

    /// Get the dispatcher if the component is initialized
    pub async fn get_dispatcher(&self) -> Option<OrderDispatcher> {
        self.dispatcher.read().await.clone()
    }
}

#[async_trait]
impl super::Component for Ordering {
    fn name(&self) -> &'static str {
        "ordering"
    }

    async fn init(
        &self,
        ctx: &serenity::Context,
        config: Arc<RwLock<Config>>,
        _redis_handle: RedisActorHandle,
    ) -> BotResult<()> {
        let (agent_url, channel_id) = {
            let config = config.read().await;
            (config.order_agent_url.clone(), config.reminder_channel_id)
        };

        let service = Arc::new(BrowserAgentClient::new(agent_url.as_str())?);
        let sink = Arc::new(DiscordNotifier::new(Arc::clone(&ctx.http), channel_id));
        *self.dispatcher.write().await = Some(OrderDispatcher::new(service, sink));

        info!("Ordering agent at {}", agent_url);
        Ok(())
    }

    async fn shutdown(&self) -> BotResult<()> {
        *self.dispatcher.write().await = None;
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
