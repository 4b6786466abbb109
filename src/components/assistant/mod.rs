mod client;
mod conversation;

pub use client::{ChatBackend, ChatClient};
pub use conversation::{ChatMessage, ConversationStore, Role, HISTORY_LIMIT};

use super::redis_service::RedisActorHandle;
use crate::config::Config;
use crate::error::BotResult;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use rust_i18n::t;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

const SYSTEM_PROMPT: &str = "You are ExecuMate, an executive assistant that helps busy people \
keep track of their schedule and get food ordered. You suggest restaurants and meals that fit \
around their meetings and place orders when asked. Be conversational, professional and brief.";

/// Conversational assistant component
#[derive(Default)]
pub struct Assistant {
    backend: RwLock<Option<Arc<dyn ChatBackend>>>,
    conversations: ConversationStore,
}

impl Assistant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an assistant around an existing backend
    pub fn with_backend(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend: RwLock::new(Some(backend)),
            conversations: ConversationStore::new(),
        }
    }

    /// Reply to a user message. Never fails: any problem turns into an apology.
    pub async fn respond(&self, user_id: &str, message: &str) -> String {
        self.conversations
            .push(user_id, ChatMessage::user(message))
            .await;

        let backend = match self.backend.read().await.clone() {
            Some(backend) => backend,
            None => {
                warn!("Assistant asked to respond before initialization");
                return t!("assistant_apology").to_string();
            }
        };

        let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];
        messages.extend(self.conversations.recent(user_id).await);

        match backend.complete(&messages).await {
            Ok(reply) => {
                self.conversations
                    .push(user_id, ChatMessage::assistant(reply.clone()))
                    .await;
                reply
            }
            Err(e) => {
                error!("Error generating response for {}: {}", user_id, e);
                t!("assistant_apology").to_string()
            }
        }
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }
}

#[async_trait]
impl super::Component for Assistant {
    fn name(&self) -> &'static str {
        "assistant"
    }

    async fn init(
        &self,
        _ctx: &serenity::Context,
        config: Arc<RwLock<Config>>,
        _redis_handle: RedisActorHandle,
    ) -> BotResult<()> {
        let config = config.read().await;
        if config.assistant_api_key.is_none() {
            warn!("ASSISTANT_API_KEY is not set; chat requests will be sent unauthenticated");
        }

        let client = ChatClient::new(
            config.assistant_api_url.as_str(),
            config.assistant_api_key.clone(),
            config.assistant_model.as_str(),
        );
        *self.backend.write().await = Some(Arc::new(client));

        info!("Assistant using model {}", config.assistant_model);
        Ok(())
    }

    async fn shutdown(&self) -> BotResult<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::assistant_error;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedBackend {
        fail: bool,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn complete(&self, messages: &[ChatMessage]) -> BotResult<String> {
            self.seen.lock().unwrap().push(messages.to_vec());
            if self.fail {
                Err(assistant_error("upstream down"))
            } else {
                Ok(format!("reply {}", messages.len()))
            }
        }
    }

    #[tokio::test]
    async fn test_prompt_has_system_message_and_history() {
        let backend = Arc::new(ScriptedBackend::default());
        let assistant = Assistant::with_backend(backend.clone());

        assert_eq!(assistant.respond("u1", "hello").await, "reply 2");
        assistant.respond("u1", "what's for lunch?").await;

        let seen = backend.seen.lock().unwrap();
        let last = seen.last().unwrap();
        assert_eq!(last[0].role, Role::System);
        assert_eq!(last.len(), 4);
        assert_eq!(last[3], ChatMessage::user("what's for lunch?"));
    }

    #[tokio::test]
    async fn test_prompt_window_is_bounded() {
        let backend = Arc::new(ScriptedBackend::default());
        let assistant = Assistant::with_backend(backend.clone());

        for i in 0..8 {
            assistant.respond("u1", &format!("message {}", i)).await;
        }

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.last().unwrap().len(), HISTORY_LIMIT + 1);
    }

    #[tokio::test]
    async fn test_failure_returns_apology() {
        let backend = Arc::new(ScriptedBackend {
            fail: true,
            ..Default::default()
        });
        let assistant = Assistant::with_backend(backend);

        let reply = assistant.respond("u1", "hello").await;
        assert_eq!(
            reply,
            "I'm having trouble processing your request right now. Please try again later."
        );
    }

    #[tokio::test]
    async fn test_uninitialized_assistant_apologizes() {
        let assistant = Assistant::new();
        assert!(assistant.respond("u1", "hello").await.contains("Please try again later"));
    }
}
